//! TUI widget implementations.

pub mod header_view;
pub mod message_viewer;
pub mod pager;
pub mod part_switcher;
pub mod part_viewer;
pub mod status_bar;
