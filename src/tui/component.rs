//! The capability every drawable piece of the viewer implements.

use crossterm::event::KeyEvent;
use ratatui::layout::Rect;
use ratatui::Frame;

/// Draw, focus and keyboard handling for one region of the screen.
pub trait Component {
    fn draw(&mut self, frame: &mut Frame, area: Rect);

    /// Grant or revoke keyboard focus.
    fn focus(&mut self, _focused: bool) {}

    /// Handle a key. Returns `true` if it was consumed.
    fn event(&mut self, _key: KeyEvent) -> bool {
        false
    }
}
