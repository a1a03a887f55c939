//! The message viewer: header summary on top, part switcher below.

use std::sync::Arc;

use crossterm::event::KeyEvent;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;
use tracing::warn;

use super::header_view::HeaderView;
use super::part_switcher::PartSwitcher;
use crate::config::{Config, ViewerConfig};
use crate::model::message::MessageInfo;
use crate::model::part::PartInfo;
use crate::store::FetchService;
use crate::tui::component::Component;
use crate::tui::theme::current_theme;
use crate::viewer::filter::{compile_filters, FilterRule};
use crate::viewer::redraw::Redraw;

pub struct MessageViewer {
    msg: MessageInfo,
    config: ViewerConfig,
    rules: Vec<FilterRule>,
    store: Arc<dyn FetchService>,
    redraw: Redraw,
    header: HeaderView,
    /// The part switcher, or the configuration error that prevented it.
    content: Result<PartSwitcher, String>,
    focused: bool,
}

impl MessageViewer {
    pub fn new(
        msg: MessageInfo,
        config: &Config,
        store: Arc<dyn FetchService>,
        redraw: Redraw,
    ) -> Self {
        let rules = compile_filters(&config.filters);
        let header = HeaderView::new(&msg, &config.viewer.header_layout);
        let content = PartSwitcher::new(&msg, &config.viewer, &rules, Arc::clone(&store), redraw.clone())
            .map_err(|e| {
                warn!(error = %e, "Cannot build message viewer");
                e.to_string()
            });
        Self {
            msg,
            config: config.viewer.clone(),
            rules,
            store,
            redraw,
            header,
            content,
            focused: false,
        }
    }

    /// The configuration error drawn instead of the message, if any.
    pub fn error(&self) -> Option<&str> {
        self.content.as_ref().err().map(String::as_str)
    }

    pub fn switcher(&self) -> Option<&PartSwitcher> {
        self.content.as_ref().ok()
    }

    pub fn show_headers(&self) -> bool {
        self.config.show_headers
    }

    /// Flip header injection and rebuild every part pipeline.
    pub fn toggle_headers(&mut self) {
        self.config.show_headers = !self.config.show_headers;
        let previous = self.content.as_ref().ok().map(PartSwitcher::selected);
        match PartSwitcher::new(
            &self.msg,
            &self.config,
            &self.rules,
            Arc::clone(&self.store),
            self.redraw.clone(),
        ) {
            Ok(mut switcher) => {
                if let Some(index) = previous {
                    switcher.select(index);
                }
                switcher.focus(self.focused);
                self.content = Ok(switcher);
            }
            Err(e) => warn!(error = %e, "Failed to rebuild parts after toggling headers"),
        }
        self.redraw.request();
    }

    pub fn next_part(&mut self) {
        if let Ok(switcher) = self.content.as_mut() {
            switcher.next();
            self.redraw.request();
        }
    }

    pub fn previous_part(&mut self) {
        if let Ok(switcher) = self.content.as_mut() {
            switcher.previous();
            self.redraw.request();
        }
    }

    pub fn selected_part(&self) -> Option<PartInfo> {
        self.content.as_ref().ok()?.selected_part()
    }
}

impl Component for MessageViewer {
    fn draw(&mut self, frame: &mut Frame, area: Rect) {
        let switcher = match self.content.as_mut() {
            Ok(switcher) => switcher,
            Err(msg) => {
                let theme = current_theme();
                let text = Paragraph::new(Line::styled(msg.clone(), theme.error))
                    .wrap(Wrap { trim: false });
                frame.render_widget(text, area);
                return;
            }
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(self.header.height()), Constraint::Min(0)])
            .split(area);
        self.header.draw(frame, chunks[0]);
        switcher.draw(frame, chunks[1]);
    }

    fn focus(&mut self, focused: bool) {
        self.focused = focused;
        if let Ok(switcher) = self.content.as_mut() {
            switcher.focus(focused);
        }
    }

    fn event(&mut self, key: KeyEvent) -> bool {
        match self.content.as_mut() {
            Ok(switcher) => switcher.event(key),
            Err(_) => false,
        }
    }
}
