//! Color theme definitions for the TUI.

use ratatui::style::{Color, Modifier, Style};

/// A complete color theme for the TUI.
pub struct Theme {
    pub status_bar: Style,
    pub status_key: Style,
    pub header_label: Style,
    pub header_value: Style,
    pub body: Style,
    pub part_row: Style,
    pub part_marker: Style,
    pub part_selected: Style,
    pub error: Style,
    pub notice: Style,
}

impl Theme {
    /// Dark theme (default).
    pub fn dark() -> Self {
        Self {
            status_bar: Style::default()
                .fg(Color::Rgb(150, 150, 170))
                .bg(Color::Rgb(30, 30, 46)),
            status_key: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            header_label: Style::default()
                .fg(Color::Rgb(130, 170, 255))
                .add_modifier(Modifier::BOLD),
            header_value: Style::default().fg(Color::Rgb(220, 220, 230)),
            body: Style::default().fg(Color::Rgb(220, 220, 230)),
            part_row: Style::default().fg(Color::Rgb(200, 200, 220)),
            part_marker: Style::default().fg(Color::Rgb(120, 120, 140)),
            part_selected: Style::default().add_modifier(Modifier::REVERSED),
            error: Style::default().fg(Color::Red),
            notice: Style::default().fg(Color::Rgb(150, 150, 170)),
        }
    }
}

/// Return the active theme.
pub fn current_theme() -> Theme {
    Theme::dark()
}
