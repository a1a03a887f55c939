//! Embedded pager: runs the pager command and shows what it prints.
//!
//! The pager's stdin is handed out through a one-shot start channel once
//! the process is running. Its stdout is captured line by line with escape
//! sequences removed, so this is a plain scrollback view rather than a
//! terminal emulator.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use regex::Regex;
use tracing::{debug, warn};

use crate::tui::component::Component;
use crate::tui::theme::current_theme;
use crate::viewer::pipeline::PagerInput;
use crate::viewer::redraw::Redraw;

/// CSI, OSC and two-byte escape sequences.
static ESCAPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]|\x1B\][^\x07\x1B]*(?:\x07|\x1B\\)|\x1B[@-Z\\-_]")
        .expect("valid escape pattern")
});

/// A running pager and the output it has produced so far.
pub struct PagerTerminal {
    lines: Arc<Mutex<Vec<String>>>,
    finished: Arc<AtomicBool>,
    child: Arc<Mutex<Option<Child>>>,
    start: Option<Receiver<PagerInput>>,
    scroll: usize,
    viewport: usize,
    focused: bool,
}

impl PagerTerminal {
    /// Launch `argv` on a background thread.
    pub fn new(argv: Vec<String>, redraw: Redraw) -> Self {
        let (tx, rx) = bounded(1);
        let term = Self {
            lines: Arc::new(Mutex::new(Vec::new())),
            finished: Arc::new(AtomicBool::new(false)),
            child: Arc::new(Mutex::new(None)),
            start: Some(rx),
            scroll: 0,
            viewport: 0,
            focused: false,
        };

        let lines = Arc::clone(&term.lines);
        let finished = Arc::clone(&term.finished);
        let child = Arc::clone(&term.child);
        thread::spawn(move || launch(argv, tx, lines, finished, child, redraw));
        term
    }

    /// Receiver that yields the pager's stdin once it has started. Can be
    /// taken once; a closed channel means the pager never started.
    pub fn take_start(&mut self) -> Option<Receiver<PagerInput>> {
        self.start.take()
    }

    /// Snapshot of the captured output.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// True once the pager closed its output.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    fn max_scroll(&self) -> usize {
        let total = self.lines.lock().map(|l| l.len()).unwrap_or(0);
        total.saturating_sub(self.viewport.max(1))
    }

    fn scroll_by(&mut self, delta: isize) {
        let target = self.scroll.saturating_add_signed(delta);
        self.scroll = target.min(self.max_scroll());
    }
}

fn launch(
    argv: Vec<String>,
    started: Sender<PagerInput>,
    lines: Arc<Mutex<Vec<String>>>,
    finished: Arc<AtomicBool>,
    slot: Arc<Mutex<Option<Child>>>,
    redraw: Redraw,
) {
    let Some((program, args)) = argv.split_first() else {
        return;
    };
    debug!(program = %program, "Starting pager");
    let spawned = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            warn!(program = %program, error = %e, "Failed to start pager");
            if let Ok(mut lines) = lines.lock() {
                lines.push(format!("Failed to start pager '{program}': {e}"));
            }
            finished.store(true, Ordering::SeqCst);
            redraw.request();
            return;
        }
    };

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    if let Ok(mut slot) = slot.lock() {
        *slot = Some(child);
    }

    if let Some(stdout) = stdout {
        thread::spawn(move || capture(stdout, lines, finished, slot, redraw));
    }

    if let Some(stdin) = stdin {
        let _ = started.send(Box::new(stdin));
    }
}

fn capture(
    stdout: std::process::ChildStdout,
    lines: Arc<Mutex<Vec<String>>>,
    finished: Arc<AtomicBool>,
    slot: Arc<Mutex<Option<Child>>>,
    redraw: Redraw,
) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let raw = String::from_utf8_lossy(&buf);
                let text = raw.trim_end_matches(['\n', '\r']);
                let clean = ESCAPES.replace_all(text, "").replace('\t', "    ");
                if let Ok(mut lines) = lines.lock() {
                    lines.push(clean);
                }
                redraw.request();
            }
            Err(e) => {
                debug!(error = %e, "Pager output closed");
                break;
            }
        }
    }
    finished.store(true, Ordering::SeqCst);
    if let Some(mut child) = slot.lock().ok().and_then(|mut s| s.take()) {
        let _ = child.wait();
    }
    redraw.request();
}

impl Component for PagerTerminal {
    fn draw(&mut self, frame: &mut Frame, area: Rect) {
        let theme = current_theme();
        self.viewport = area.height as usize;
        self.scroll = self.scroll.min(self.max_scroll());

        let visible: Vec<Line> = match self.lines.lock() {
            Ok(lines) => lines
                .iter()
                .skip(self.scroll)
                .take(area.height as usize)
                .map(|l| Line::raw(l.clone()))
                .collect(),
            Err(_) => Vec::new(),
        };
        frame.render_widget(Paragraph::new(visible).style(theme.body), area);
    }

    fn focus(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn event(&mut self, key: KeyEvent) -> bool {
        if !self.focused {
            return false;
        }
        let page = self.viewport.max(1) as isize;
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.scroll_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_by(-1),
            KeyCode::PageDown | KeyCode::Char(' ') => self.scroll_by(page),
            KeyCode::PageUp => self.scroll_by(-page),
            KeyCode::Char('g') | KeyCode::Home => self.scroll = 0,
            KeyCode::Char('G') | KeyCode::End => self.scroll = self.max_scroll(),
            _ => return false,
        }
        true
    }
}

impl Drop for PagerTerminal {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.lock().ok().and_then(|mut s| s.take()) {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::io::Write;
    use std::time::{Duration, Instant};

    fn feed(term: &mut PagerTerminal, text: &str) {
        let rx = term.take_start().unwrap();
        let mut stdin = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        stdin.write_all(text.as_bytes()).unwrap();
        drop(stdin);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !term.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_captures_output_without_escapes() {
        let mut term = PagerTerminal::new(vec!["cat".into()], Redraw::detached());
        feed(&mut term, "\x1b[1mbold\x1b[0m\nsecond\n");
        assert!(term.is_finished());
        assert_eq!(term.lines(), vec!["bold", "second"]);
    }

    #[test]
    fn test_missing_program_reports_and_closes_start() {
        let mut term =
            PagerTerminal::new(vec!["/nonexistent/pager".into()], Redraw::detached());
        let rx = term.take_start().unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
        assert!(term.lines()[0].contains("Failed to start pager"));
    }

    #[test]
    fn test_scrolls_only_when_focused() {
        let mut term = PagerTerminal::new(vec!["cat".into()], Redraw::detached());
        let text: String = (0..20).map(|i| format!("line {i}\n")).collect();
        feed(&mut term, &text);

        let mut terminal = Terminal::new(TestBackend::new(20, 5)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                term.draw(f, area);
            })
            .unwrap();

        assert!(!term.event(key(KeyCode::Char('j'))));
        term.focus(true);
        assert!(term.event(key(KeyCode::Char('j'))));
        assert_eq!(term.scroll(), 1);
        term.event(key(KeyCode::Char('G')));
        assert_eq!(term.scroll(), 15);
        term.event(key(KeyCode::PageDown));
        assert_eq!(term.scroll(), 15);
        term.event(key(KeyCode::Char('g')));
        assert_eq!(term.scroll(), 0);
        assert!(!term.event(key(KeyCode::Char('x'))));
    }
}
