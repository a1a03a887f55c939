//! Keyboard event handling.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::App;
use crate::model::part::format_index;
use crate::tui::component::Component;

/// Process a key event and update the application state.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> anyhow::Result<()> {
    app.dirty = true;
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Char('q')) => {
            app.should_quit = true;
        }
        (_, KeyCode::Char('J')) => app.viewer.next_part(),
        (_, KeyCode::Char('K')) => app.viewer.previous_part(),
        (_, KeyCode::Char('H')) => {
            app.viewer.toggle_headers();
            let state = if app.viewer.show_headers() { "on" } else { "off" };
            app.set_status(&format!("Headers in pager: {state}"));
        }
        (_, KeyCode::Char('i')) => {
            let status = match app.viewer.selected_part() {
                Some(part) => format!(
                    "Part {} {} ({} bytes, {})",
                    format_index(&part.index),
                    part.part.mime(),
                    part.part.size,
                    part.part.encoding
                ),
                None => "No part selected".to_string(),
            };
            app.set_status(&status);
        }
        _ => {
            app.viewer.event(key);
        }
    }
    Ok(())
}
