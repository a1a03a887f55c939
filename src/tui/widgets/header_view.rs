//! Header summary grid above the message parts.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::model::message::MessageInfo;
use crate::tui::component::Component;
use crate::tui::theme::current_theme;

/// One cell of the summary: header name and its display value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub name: String,
    pub value: String,
}

/// Resolve `layout` against `msg`.
///
/// A row is dropped only when every column in it is empty; otherwise it is
/// kept whole, empty columns included, so columns line up across rows.
pub fn present_headers(msg: &MessageInfo, layout: &[Vec<String>]) -> Vec<Vec<HeaderCell>> {
    layout
        .iter()
        .map(|row| {
            row.iter()
                .map(|name| HeaderCell {
                    name: name.clone(),
                    value: msg.format_header(name),
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| row.iter().any(|cell| !cell.value.is_empty()))
        .collect()
}

/// Cut `text` to `width` columns, ending in `…` when something was dropped.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Draws the present header rows followed by one spacer row.
pub struct HeaderView {
    rows: Vec<Vec<HeaderCell>>,
}

impl HeaderView {
    pub fn new(msg: &MessageInfo, layout: &[Vec<String>]) -> Self {
        Self {
            rows: present_headers(msg, layout),
        }
    }

    pub fn rows(&self) -> &[Vec<HeaderCell>] {
        &self.rows
    }

    /// Rows needed, spacer included.
    pub fn height(&self) -> u16 {
        self.rows.len() as u16 + 1
    }
}

impl Component for HeaderView {
    fn draw(&mut self, frame: &mut Frame, area: Rect) {
        let theme = current_theme();
        for (row_idx, row) in self.rows.iter().enumerate() {
            let y = area.y + row_idx as u16;
            if y >= area.bottom() || row.is_empty() {
                continue;
            }
            let line_area = Rect::new(area.x, y, area.width, 1);
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, row.len() as u32); row.len()])
                .split(line_area);

            for (cell, col) in row.iter().zip(columns.iter()) {
                let room = (col.width as usize).saturating_sub(cell.name.width() + 1);
                let line = Line::from(vec![
                    Span::styled(cell.name.as_str(), theme.header_label),
                    Span::styled(
                        format!(" {}", truncate_to_width(&cell.value, room)),
                        theme.header_value,
                    ),
                ]);
                frame.render_widget(Paragraph::new(line), *col);
            }
        }
    }
}
