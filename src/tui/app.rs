//! Global application state for the TUI.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::parser::eml;
use crate::store::reader::MessageStore;
use crate::tui::component::Component;
use crate::tui::widgets::message_viewer::MessageViewer;
use crate::viewer::redraw::{Redraw, RedrawScheduler};

/// Identifier of the single message a session shows.
pub const MESSAGE_UID: u32 = 1;

/// Complete TUI state.
pub struct App {
    /// Path of the open message file.
    pub path: PathBuf,
    pub viewer: MessageViewer,
    /// Receives redraw requests from background tasks.
    pub scheduler: RedrawScheduler,
    /// Should the app exit?
    pub should_quit: bool,
    /// Transient status message with its timestamp.
    pub status_message: Option<(String, Instant)>,
    /// Draw on the next loop iteration.
    pub dirty: bool,
}

impl App {
    /// Load the message at `path` and build its viewer.
    pub fn new(path: PathBuf, config: &Config) -> anyhow::Result<Self> {
        let (raw, msg) = eml::load_eml(&path, MESSAGE_UID)?;
        let store = Arc::new(MessageStore::new(MESSAGE_UID, raw));
        Ok(Self::with_viewer(path, |redraw| {
            MessageViewer::new(msg, config, store, redraw)
        }))
    }

    /// Build the app around a viewer wired to this app's redraw scheduler.
    pub fn with_viewer(
        path: PathBuf,
        build: impl FnOnce(Redraw) -> MessageViewer,
    ) -> Self {
        let scheduler = RedrawScheduler::new();
        let mut viewer = build(scheduler.handle());
        viewer.focus(true);
        Self {
            path,
            viewer,
            scheduler,
            should_quit: false,
            status_message: None,
            dirty: true,
        }
    }

    /// Show a status message in the status bar.
    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some((msg.to_string(), Instant::now()));
        self.dirty = true;
    }

    /// Called every tick: picks up redraw requests and clears expired
    /// status messages.
    pub fn tick(&mut self) {
        if self.scheduler.take_pending() {
            self.dirty = true;
        }
        if let Some((_, when)) = &self.status_message {
            if when.elapsed().as_secs() >= 5 {
                self.status_message = None;
                self.dirty = true;
            }
        }
    }
}
