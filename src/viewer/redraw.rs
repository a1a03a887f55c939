//! Redraw signalling from background tasks to the UI thread.
//!
//! Every component that can change state off the UI thread holds a
//! [`Redraw`] handle. The event loop owns the [`RedrawScheduler`] and drains
//! it once per iteration; any pending request means "draw again".

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Cloneable handle used to request a redraw.
#[derive(Debug, Clone)]
pub struct Redraw {
    tx: Sender<()>,
}

impl Redraw {
    /// Request a redraw. Never blocks; a closed scheduler is ignored.
    pub fn request(&self) {
        let _ = self.tx.send(());
    }

    /// A handle whose requests go nowhere, for components built without a UI.
    pub fn detached() -> Self {
        let (tx, _rx) = unbounded();
        Self { tx }
    }
}

/// The single receiver of redraw requests.
#[derive(Debug)]
pub struct RedrawScheduler {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Default for RedrawScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RedrawScheduler {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn handle(&self) -> Redraw {
        Redraw {
            tx: self.tx.clone(),
        }
    }

    /// Drain all pending requests. True if there was at least one.
    pub fn take_pending(&self) -> bool {
        let mut pending = false;
        while self.rx.try_recv().is_ok() {
            pending = true;
        }
        pending
    }

    /// Wait up to `timeout` for a request, then drain the rest.
    pub fn wait(&self, timeout: std::time::Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => {
                self.take_pending();
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_requests_coalesce() {
        let scheduler = RedrawScheduler::new();
        let handle = scheduler.handle();
        assert!(!scheduler.take_pending());
        handle.request();
        handle.clone().request();
        assert!(scheduler.take_pending());
        assert!(!scheduler.take_pending());
    }

    #[test]
    fn test_wait_sees_request_from_thread() {
        let scheduler = RedrawScheduler::new();
        let handle = scheduler.handle();
        std::thread::spawn(move || handle.request());
        assert!(scheduler.wait(Duration::from_secs(5)));
    }

    #[test]
    fn test_detached_handle_does_not_panic() {
        Redraw::detached().request();
    }
}
