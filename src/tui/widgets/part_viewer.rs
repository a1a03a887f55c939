//! One part on screen: its rendering pipeline plus the pager it feeds.

use std::sync::Arc;

use crossterm::event::KeyEvent;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

use super::pager::PagerTerminal;
use crate::error::{Result, ViewerError};
use crate::model::message::MessageInfo;
use crate::model::part::PartHandle;
use crate::store::FetchService;
use crate::tui::component::Component;
use crate::tui::theme::current_theme;
use crate::viewer::filter::FilterRule;
use crate::viewer::pipeline::{PipelineStatus, RenderPipeline, NO_FILTER_MESSAGE};
use crate::viewer::redraw::Redraw;

/// Split the configured pager command into argv.
pub fn parse_pager(command: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command)
        .map_err(|e| ViewerError::Config(format!("invalid pager command '{command}': {e}")))?;
    if argv.is_empty() {
        return Err(ViewerError::Config("pager command is empty".to_string()));
    }
    Ok(argv)
}

/// Displays one leaf. The pager is launched and the part fetched the
/// first time it is drawn.
pub struct PartViewer {
    pipeline: RenderPipeline,
    pager_argv: Vec<String>,
    store: Arc<dyn FetchService>,
    redraw: Redraw,
    terminal: Option<PagerTerminal>,
    focused: bool,
}

impl PartViewer {
    pub fn new(
        msg: &MessageInfo,
        handle: PartHandle,
        rules: &[FilterRule],
        show_headers: bool,
        pager_argv: Vec<String>,
        store: Arc<dyn FetchService>,
        redraw: Redraw,
    ) -> Self {
        let pipeline = RenderPipeline::new(msg, handle, rules, show_headers, redraw.clone());
        Self {
            pipeline,
            pager_argv,
            store,
            redraw,
            terminal: None,
            focused: false,
        }
    }

    pub fn status(&self) -> PipelineStatus {
        self.pipeline.status()
    }

    pub fn handle(&self) -> &PartHandle {
        self.pipeline.handle()
    }

    pub fn terminal(&self) -> Option<&PagerTerminal> {
        self.terminal.as_ref()
    }

    /// Launch the pager and request the part. Does nothing after the first call.
    fn activate(&mut self) {
        if self.pipeline.is_fetched() || self.terminal.is_some() {
            return;
        }
        let mut terminal = PagerTerminal::new(self.pager_argv.clone(), self.redraw.clone());
        if let Some(start) = terminal.take_start() {
            self.pipeline.start(self.store.as_ref(), start);
        }
        terminal.focus(self.focused);
        self.terminal = Some(terminal);
    }
}

impl Component for PartViewer {
    fn draw(&mut self, frame: &mut Frame, area: Rect) {
        let theme = current_theme();
        match self.pipeline.status() {
            PipelineStatus::Unsupported => {
                let text = Paragraph::new(Line::styled(NO_FILTER_MESSAGE, theme.error));
                frame.render_widget(text, area);
                return;
            }
            PipelineStatus::Failed(msg) => {
                let text = Paragraph::new(Line::styled(msg, theme.error)).wrap(Wrap { trim: false });
                frame.render_widget(text, area);
                return;
            }
            _ => {}
        }

        self.activate();
        if let Some(terminal) = self.terminal.as_mut() {
            terminal.draw(frame, area);
        }
    }

    fn focus(&mut self, focused: bool) {
        self.focused = focused;
        if let Some(terminal) = self.terminal.as_mut() {
            terminal.focus(focused);
        }
    }

    fn event(&mut self, key: KeyEvent) -> bool {
        match self.terminal.as_mut() {
            Some(terminal) => terminal.event(key),
            None => false,
        }
    }
}
