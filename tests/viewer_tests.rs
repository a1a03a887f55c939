//! Integration tests for the part list, selection, pipelines and widgets,
//! driven by the `.eml` fixtures.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use predicates::prelude::*;
use ratatui::backend::TestBackend;
use ratatui::Terminal;

use mimeview::config::{Config, FilterConfig};
use mimeview::model::message::MessageInfo;
use mimeview::model::part::PartKind;
use mimeview::parser::eml::load_eml;
use mimeview::store::reader::MessageStore;
use mimeview::tui::component::Component;
use mimeview::tui::widgets::message_viewer::MessageViewer;
use mimeview::viewer::pipeline::{copy_filter_output, PipelineStatus};
use mimeview::viewer::{flatten_parts, render_part, select_alternative, Redraw};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(name: &str) -> (Arc<MessageStore>, MessageInfo) {
    let (raw, msg) = load_eml(fixture(name), 1).unwrap();
    (Arc::new(MessageStore::new(1, raw)), msg)
}

fn text_filter(command: &str) -> FilterConfig {
    FilterConfig {
        mimetype: Some("text/*".into()),
        command: command.into(),
        ..Default::default()
    }
}

fn config(alternatives: &[&str], filters: Vec<FilterConfig>) -> Config {
    let mut cfg = Config::default();
    cfg.viewer.alternatives = alternatives.iter().map(|s| s.to_string()).collect();
    cfg.filters = filters;
    cfg
}

/// In-memory pager input that notes when it is closed.
#[derive(Clone, Default)]
struct Sink {
    buf: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
}

struct SinkWriter(Sink);

impl Write for SinkWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SinkWriter {
    fn drop(&mut self) {
        self.0.closed.store(true, Ordering::SeqCst);
    }
}

impl Sink {
    fn writer(&self) -> SinkWriter {
        SinkWriter(self.clone())
    }
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}

fn screen(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    let area = buffer.area;
    (0..area.height)
        .map(|y| {
            (0..area.width)
                .map(|x| buffer[(x, y)].symbol().to_string())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

// ─── Flattening and selection on real messages ──────────────────────

#[test]
fn test_mixed_scenario_flattening() {
    let (_, msg) = load("mixed.eml");
    let parts = flatten_parts(&msg.body_structure);
    let shape: Vec<(PartKind, Vec<u32>, String)> = parts
        .iter()
        .map(|p| (p.kind, p.index.clone(), p.part.mime()))
        .collect();
    assert_eq!(
        shape,
        vec![
            (PartKind::Marker, vec![], "multipart/mixed".to_string()),
            (PartKind::Leaf, vec![1], "text/plain".to_string()),
            (PartKind::Leaf, vec![2], "image/png".to_string()),
        ]
    );
    assert_eq!(parts[2].label(), "image/png (a.png)");
    assert_eq!(select_alternative(&parts, &[]), Some(1));
}

#[test]
fn test_mixed_scenario_image_has_no_filter() {
    let (store, msg) = load("mixed.eml");
    let cfg = config(&[], vec![text_filter("cat")]);
    let mut viewer = MessageViewer::new(msg, &cfg, store, Redraw::detached());
    let switcher = viewer.switcher().unwrap();
    assert_eq!(switcher.selected(), 1);
    assert_eq!(switcher.status(2), Some(PipelineStatus::Unsupported));

    viewer.next_part();
    assert_eq!(viewer.selected_part().unwrap().index, vec![2]);

    let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
    terminal
        .draw(|f| {
            let area = f.area();
            viewer.draw(f, area);
        })
        .unwrap();
    let text = screen(&terminal);
    assert!(text.contains("No filter configured for this mimetype"));
    assert!(text.contains("  image/png (a.png)"));
    assert!(text.contains("From Alice Example"));
}

#[test]
fn test_alternative_fixture_selection() {
    let (_, msg) = load("alternative.eml");
    let parts = flatten_parts(&msg.body_structure);
    assert_eq!(parts.len(), 5);
    assert_eq!(parts[4].part.filename(), Some("agenda.pdf"));

    let prefer = |list: &[&str]| {
        let list: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        parts[select_alternative(&parts, &list).unwrap()].part.mime()
    };
    assert_eq!(prefer(&["text/plain", "text/html"]), "text/html");
    assert_eq!(prefer(&["text/plain"]), "text/plain");
    assert_eq!(prefer(&["application/pdf", "text/html"]), "application/pdf");
    assert_eq!(prefer(&[]), "text/plain");
}

#[test]
fn test_headers_are_decoded() {
    let (_, msg) = load("alternative.eml");
    assert_eq!(msg.envelope.subject, "Weekly update");
    assert_eq!(msg.format_header("From"), "José García <jose@example.com>");
    assert_eq!(msg.format_header("Cc"), "lead@example.com");
}

// ─── Pipelines end to end ───────────────────────────────────────────

#[test]
fn test_render_direct_strips_leading_escape() {
    let (store, msg) = load("mixed.eml");
    let sink = Sink::default();
    let cfg = config(&[], vec![text_filter("")]);
    let status = render_part(&msg, store.as_ref(), &cfg, None, sink.writer()).unwrap();
    assert_eq!(status, PipelineStatus::Ready);
    let out = sink.text();
    assert!(predicate::str::contains("Hi Bob,\nhere are the photos.").eval(&out));
    assert!(!out.contains('\x1b'));
    assert!(sink.closed.load(Ordering::SeqCst));
}

#[test]
fn test_render_decodes_charset_and_transfer_encoding() {
    let (store, msg) = load("alternative.eml");
    let sink = Sink::default();
    let cfg = config(&[], vec![text_filter("")]);
    render_part(&msg, store.as_ref(), &cfg, Some(&[1, 1]), sink.writer()).unwrap();
    assert!(sink.text().starts_with("Café at noon."));
}

#[cfg(unix)]
#[test]
fn test_render_filtered_with_headers_first() {
    let (store, msg) = load("mixed.eml");
    let sink = Sink::default();
    let mut cfg = config(&[], vec![text_filter("tr a-z A-Z; echo done >&2")]);
    cfg.viewer.show_headers = true;

    let status = render_part(&msg, store.as_ref(), &cfg, None, sink.writer()).unwrap();
    assert_eq!(status, PipelineStatus::Ready);

    let out = sink.text();
    let (headers, body) = out.split_once("\n\n").unwrap();
    assert!(headers.starts_with("From: Alice Example <alice@example.com>\n"));
    assert!(headers.contains("Subject: Photos from the trip"));
    assert!(body.contains("HI BOB,"));
    assert!(body.contains("done"));
    assert!(!headers.contains("HI BOB"));
}

#[test]
fn test_render_unsupported_part() {
    let (store, msg) = load("mixed.eml");
    let sink = Sink::default();
    let cfg = config(&[], vec![text_filter("cat")]);
    let status = render_part(&msg, store.as_ref(), &cfg, Some(&[2]), sink.writer()).unwrap();
    assert_eq!(status, PipelineStatus::Unsupported);
    assert!(sink.text().is_empty());
}

#[test]
fn test_render_rejects_marker_index() {
    let (store, msg) = load("alternative.eml");
    let cfg = config(&[], vec![text_filter("cat")]);
    assert!(render_part(&msg, store.as_ref(), &cfg, Some(&[1]), io::sink()).is_err());
}

#[cfg(unix)]
#[test]
fn test_failing_filter_command_fails_only_that_part() {
    let (store, msg) = load("alternative.eml");
    let cfg = config(
        &[],
        vec![
            FilterConfig {
                mimetype: Some("text/plain".into()),
                command: "cat".into(),
                ..Default::default()
            },
            FilterConfig {
                mimetype: Some("application/*".into()),
                command: "cat".into(),
                ..Default::default()
            },
        ],
    );

    let pdf_sink = Sink::default();
    struct Refuse;
    impl Write for Refuse {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pager gone"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
    let status = render_part(&msg, store.as_ref(), &cfg, Some(&[1, 1]), Refuse).unwrap();
    assert!(status.is_failed());

    let status = render_part(&msg, store.as_ref(), &cfg, Some(&[2]), pdf_sink.writer()).unwrap();
    assert_eq!(status, PipelineStatus::Ready);
    assert!(pdf_sink.text().starts_with("%PDF-1.4"));
}

#[test]
fn test_stdout_failure_still_closes_pager_input() {
    struct Fails;
    impl Read for Fails {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("stdout broke"))
        }
    }
    let sink = Sink::default();
    let stderr = io::Cursor::new(b"stderr survives\n".to_vec());
    let err = copy_filter_output(Fails, stderr, sink.writer()).unwrap_err();
    assert!(err.to_string().contains("stdout broke"));
    assert_eq!(sink.text(), "stderr survives\n");
    assert!(sink.closed.load(Ordering::SeqCst));
}

// ─── Viewer widget ──────────────────────────────────────────────────

#[cfg(unix)]
#[test]
fn test_viewer_draws_pager_output() {
    let (store, msg) = load("single.eml");
    let mut cfg = config(&[], vec![text_filter("cat")]);
    cfg.viewer.pager = "cat".into();
    let mut viewer = MessageViewer::new(msg, &cfg, store, Redraw::detached());
    viewer.focus(true);

    let mut terminal = Terminal::new(TestBackend::new(50, 10)).unwrap();
    terminal
        .draw(|f| {
            let area = f.area();
            viewer.draw(f, area);
        })
        .unwrap();

    let done = wait_until(|| {
        let switcher = viewer.switcher().unwrap();
        let part = switcher.viewer(switcher.selected()).unwrap();
        part.status() == PipelineStatus::Ready
            && part.terminal().is_some_and(|t| t.is_finished())
    });
    assert!(done);

    terminal
        .draw(|f| {
            let area = f.area();
            viewer.draw(f, area);
        })
        .unwrap();
    let text = screen(&terminal);
    assert!(text.contains("Just one part."));
    assert!(text.contains("Second line."));
    // Single part and always_show_mime off: no selector strip.
    assert!(!text.contains("text/plain"));
}

#[test]
fn test_always_show_mime_draws_strip_for_single_part() {
    let (store, msg) = load("single.eml");
    let mut cfg = config(&[], vec![]);
    cfg.viewer.always_show_mime = true;
    let mut viewer = MessageViewer::new(msg, &cfg, store, Redraw::detached());

    let mut terminal = Terminal::new(TestBackend::new(50, 8)).unwrap();
    terminal
        .draw(|f| {
            let area = f.area();
            viewer.draw(f, area);
        })
        .unwrap();
    let text = screen(&terminal);
    assert!(text.contains("No filter configured for this mimetype"));
    assert!(text.lines().last().unwrap().contains("  text/plain"));
}

#[test]
fn test_bad_pager_replaces_everything() {
    let (store, msg) = load("mixed.eml");
    let mut cfg = config(&[], vec![text_filter("cat")]);
    cfg.viewer.pager = "less \"unterminated".into();
    let mut viewer = MessageViewer::new(msg, &cfg, store, Redraw::detached());
    assert!(viewer.error().is_some());
    assert!(viewer.selected_part().is_none());

    let mut terminal = Terminal::new(TestBackend::new(60, 6)).unwrap();
    terminal
        .draw(|f| {
            let area = f.area();
            viewer.draw(f, area);
        })
        .unwrap();
    let text = screen(&terminal);
    assert!(text.starts_with("Configuration error"));
    assert!(!text.contains("From:"));
}

#[test]
fn test_toggle_headers_keeps_selection() {
    let (store, msg) = load("alternative.eml");
    let cfg = config(&["text/plain", "text/html"], vec![text_filter("cat")]);
    let mut viewer = MessageViewer::new(msg, &cfg, store, Redraw::detached());
    viewer.next_part();
    let before = viewer.selected_part().unwrap().index;
    assert_eq!(before, vec![2]);

    assert!(!viewer.show_headers());
    viewer.toggle_headers();
    assert!(viewer.show_headers());
    assert_eq!(viewer.selected_part().unwrap().index, before);
}
