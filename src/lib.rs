//! `mimeview` — a terminal viewer for multi-part MIME messages.
//!
//! This crate provides the rendering core (part flattening, alternative
//! selection, filter matching and the per-part pipeline that streams a part
//! through an optional filter into a pager) together with the message
//! parsing, storage and TUI layers built around it.

pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod store;
pub mod tui;
pub mod viewer;
