//! Rendering one part outside the TUI, straight into a writer.

use std::io::Write;
use std::time::Duration;

use crossbeam_channel::bounded;

use super::filter::compile_filters;
use super::flatten::{flatten_parts, select_alternative};
use super::pipeline::{PagerInput, PipelineStatus, RenderPipeline};
use super::redraw::RedrawScheduler;
use crate::config::Config;
use crate::error::{Result, ViewerError};
use crate::model::message::MessageInfo;
use crate::store::FetchService;

/// Run the pipeline for one part with `sink` standing in for the pager.
///
/// `index` picks the part; without it the alternative selector decides.
/// Blocks until the pipeline settles and returns its final status.
pub fn render_part<W>(
    msg: &MessageInfo,
    store: &dyn FetchService,
    config: &Config,
    index: Option<&[u32]>,
    sink: W,
) -> Result<PipelineStatus>
where
    W: Write + Send + 'static,
{
    let parts = flatten_parts(&msg.body_structure);
    let pos = match index {
        Some(index) => parts
            .iter()
            .position(|p| p.is_selectable() && p.index == index)
            .ok_or_else(|| ViewerError::fetch(index, "no such leaf part"))?,
        None => select_alternative(&parts, &config.viewer.alternatives)
            .ok_or_else(|| ViewerError::Parse("message has no displayable part".into()))?,
    };

    let rules = compile_filters(&config.filters);
    let scheduler = RedrawScheduler::new();
    let mut pipeline = RenderPipeline::new(
        msg,
        parts[pos].clone(),
        &rules,
        config.viewer.show_headers,
        scheduler.handle(),
    );

    let (tx, rx) = bounded::<PagerInput>(1);
    let _ = tx.send(Box::new(sink));
    pipeline.start(store, rx);

    loop {
        let status = pipeline.status();
        if status.is_settled() {
            return Ok(status);
        }
        scheduler.wait(Duration::from_millis(100));
    }
}
