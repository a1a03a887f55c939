//! The multi-part rendering core: flattening, selection, filters and the
//! per-part pipeline that feeds the pager.

pub mod filter;
pub mod flatten;
pub mod oneshot;
pub mod pipeline;
pub mod redraw;

pub use filter::{compile_filters, match_filter, FilterRule};
pub use flatten::{flatten_parts, select_alternative};
pub use oneshot::render_part;
pub use pipeline::{PipelineStatus, RenderPipeline};
pub use redraw::{Redraw, RedrawScheduler};
