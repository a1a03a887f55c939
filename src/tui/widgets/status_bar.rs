//! Bottom status bar showing transient messages or keyboard hints.

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::model::part::format_index;
use crate::tui::app::App;
use crate::tui::theme::current_theme;

/// Version string shown at the right edge of the status bar.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Render the status bar with hints, the selected part and version.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = current_theme();

    let part = app
        .viewer
        .selected_part()
        .map(|p| format!("[{}] {} ", format_index(&p.index), p.part.mime()))
        .unwrap_or_default();
    let right_text = format!("{part}v{VERSION} ");
    let right_width = right_text.chars().count() as u16;

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(right_width)])
        .split(area);

    let content = if let Some((msg, _)) = &app.status_message {
        Line::from(Span::styled(format!(" {msg}"), theme.status_bar))
    } else {
        let mut spans = Vec::new();
        for (i, (key, desc)) in build_hints(app).iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" ", theme.status_bar));
            }
            spans.push(Span::styled(format!(" {key}"), theme.status_key));
            spans.push(Span::styled(format!(":{desc}"), theme.status_bar));
        }
        Line::from(spans)
    };

    frame.render_widget(Paragraph::new(content).style(theme.status_bar), chunks[0]);

    let right = Paragraph::new(Line::from(Span::styled(right_text, theme.status_bar)))
        .alignment(Alignment::Right)
        .style(theme.status_bar);
    frame.render_widget(right, chunks[1]);
}

/// Hint pairs (key, description).
fn build_hints(app: &App) -> Vec<(&'static str, &'static str)> {
    let mut hints = vec![("j/k", "scroll")];
    if app.viewer.error().is_none() {
        hints.push(("J/K", "part"));
        hints.push((
            "H",
            if app.viewer.show_headers() {
                "hide headers"
            } else {
                "show headers"
            },
        ));
    }
    hints.push(("q", "quit"));
    hints
}
