//! Part selector: the flattened part list, the current selection and the
//! viewer for each leaf.

use std::sync::Arc;

use crossterm::event::KeyEvent;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::part_viewer::{parse_pager, PartViewer};
use crate::config::ViewerConfig;
use crate::error::Result;
use crate::model::message::MessageInfo;
use crate::model::part::{PartHandle, PartInfo};
use crate::store::FetchService;
use crate::tui::component::Component;
use crate::tui::theme::current_theme;
use crate::viewer::filter::FilterRule;
use crate::viewer::flatten::{flatten_parts, select_alternative};
use crate::viewer::pipeline::PipelineStatus;
use crate::viewer::redraw::Redraw;

pub struct PartSwitcher {
    uid: u32,
    parts: Vec<PartHandle>,
    /// One viewer per leaf, `None` for markers. Same length as `parts`.
    viewers: Vec<Option<PartViewer>>,
    selected: usize,
    always_show_mime: bool,
    focused: bool,
}

impl PartSwitcher {
    /// Flatten `msg`, build a viewer for every leaf and pick the initial part.
    ///
    /// Fails only when the pager command cannot be parsed.
    pub fn new(
        msg: &MessageInfo,
        config: &ViewerConfig,
        rules: &[FilterRule],
        store: Arc<dyn FetchService>,
        redraw: Redraw,
    ) -> Result<Self> {
        let pager_argv = parse_pager(&config.pager)?;
        let parts = flatten_parts(&msg.body_structure);
        let viewers = parts
            .iter()
            .map(|handle| {
                handle.is_selectable().then(|| {
                    PartViewer::new(
                        msg,
                        handle.clone(),
                        rules,
                        config.show_headers,
                        pager_argv.clone(),
                        Arc::clone(&store),
                        redraw.clone(),
                    )
                })
            })
            .collect();
        let selected = select_alternative(&parts, &config.alternatives).unwrap_or(0);
        tracing::debug!(parts = parts.len(), selected, "Built part list");

        Ok(Self {
            uid: msg.uid,
            parts,
            viewers,
            selected,
            always_show_mime: config.always_show_mime,
            focused: false,
        })
    }

    pub fn parts(&self) -> &[PartHandle] {
        &self.parts
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Pipeline status of the entry at `index`; `None` for markers.
    pub fn status(&self, index: usize) -> Option<PipelineStatus> {
        self.viewers.get(index)?.as_ref().map(PartViewer::status)
    }

    pub fn viewer(&self, index: usize) -> Option<&PartViewer> {
        self.viewers.get(index)?.as_ref()
    }

    fn selectable_count(&self) -> usize {
        self.parts.iter().filter(|p| p.is_selectable()).count()
    }

    /// Move to the next leaf, wrapping around.
    pub fn next(&mut self) {
        self.step(true);
    }

    /// Move to the previous leaf, wrapping around.
    pub fn previous(&mut self) {
        self.step(false);
    }

    fn step(&mut self, forward: bool) {
        let len = self.parts.len();
        let mut i = self.selected;
        for _ in 0..len {
            i = if forward { (i + 1) % len } else { (i + len - 1) % len };
            if self.parts[i].is_selectable() {
                self.select(i);
                return;
            }
        }
    }

    /// Select the entry at `index`. Markers and out-of-range indices are
    /// refused. Focus moves from the old part to the new one.
    pub fn select(&mut self, index: usize) -> bool {
        if !self.parts.get(index).is_some_and(PartHandle::is_selectable) {
            return false;
        }
        if self.focused {
            if let Some(old) = self.current_mut() {
                old.focus(false);
            }
        }
        self.selected = index;
        if self.focused {
            if let Some(new) = self.current_mut() {
                new.focus(true);
            }
        }
        true
    }

    /// The selected part, as commands acting on it need it.
    pub fn selected_part(&self) -> Option<PartInfo> {
        let handle = self.parts.get(self.selected)?;
        handle.is_selectable().then(|| PartInfo {
            uid: self.uid,
            index: handle.index.clone(),
            part: handle.part.clone(),
        })
    }

    fn current_mut(&mut self) -> Option<&mut PartViewer> {
        self.viewers.get_mut(self.selected)?.as_mut()
    }

    fn strip_lines(&self) -> Vec<Line<'static>> {
        let theme = current_theme();
        self.parts
            .iter()
            .enumerate()
            .map(|(i, handle)| {
                let text = format!("{}{}", "  ".repeat(handle.index.len()), handle.label());
                let style = if i == self.selected {
                    theme.part_selected
                } else if handle.is_selectable() {
                    theme.part_row
                } else {
                    theme.part_marker
                };
                Line::from(Span::styled(text, style))
            })
            .collect()
    }
}

impl Component for PartSwitcher {
    fn draw(&mut self, frame: &mut Frame, area: Rect) {
        if self.selectable_count() == 1 && !self.always_show_mime {
            if let Some(viewer) = self.current_mut() {
                viewer.draw(frame, area);
            }
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(self.parts.len() as u16),
            ])
            .split(area);

        frame.render_widget(Paragraph::new(self.strip_lines()), chunks[1]);
        if let Some(viewer) = self.current_mut() {
            viewer.draw(frame, chunks[0]);
        }
    }

    fn focus(&mut self, focused: bool) {
        self.focused = focused;
        if let Some(viewer) = self.current_mut() {
            viewer.focus(focused);
        }
    }

    fn event(&mut self, key: KeyEvent) -> bool {
        match self.current_mut() {
            Some(viewer) => viewer.event(key),
            None => false,
        }
    }
}
