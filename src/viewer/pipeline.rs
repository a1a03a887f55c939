//! Per-part rendering pipeline: fetch, optional filter, pager input.
//!
//! A [`RenderPipeline`] belongs to one leaf. On [`RenderPipeline::start`] it
//! asks the fetch service for the part's bytes; once they arrive a
//! background thread waits for the pager to signal that it started, writes
//! the header block (if enabled) and then streams the body into the pager,
//! either directly or through `sh -c <filter>`.
//!
//! The UI thread only ever reads [`PipelineStatus`]; every transition is
//! made by the single background task that owns the part and is followed by
//! a redraw request.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use regex::bytes::Regex;
use tracing::{debug, warn};

use super::filter::{match_filter, FilterRule};
use super::redraw::Redraw;
use crate::error::{Result, ViewerError};
use crate::model::message::{HeaderFields, MessageInfo};
use crate::model::part::{format_index, PartHandle};
use crate::store::{FetchService, PartSource};

/// Writable end of a running pager, handed over once the pager has started.
pub type PagerInput = Box<dyn Write + Send>;

/// Shown instead of content when no filter rule applies.
pub const NO_FILTER_MESSAGE: &str = "No filter configured for this mimetype";

/// A CSI escape at the very start of a line.
static LEADING_CSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\x1B\[[0-?]*[ -/]*[@-~]").expect("valid CSI pattern"));

/// Where a part's pipeline currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStatus {
    /// Not drawn yet; nothing requested.
    Unfetched,
    /// Waiting on the fetch service.
    Fetching,
    /// Streaming through a filter process.
    Filtered,
    /// Streaming straight into the pager.
    Direct,
    /// All bytes delivered and the pager input closed.
    Ready,
    /// Something went wrong; the message replaces the content.
    Failed(String),
    /// No filter rule matched this part.
    Unsupported,
}

impl PipelineStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// True once nothing will change any more.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_) | Self::Unsupported)
    }
}

// ── Shared state ────────────────────────────────────────────────

/// Status written by the background task, read by the UI on draw.
#[derive(Debug)]
struct Shared {
    status: Mutex<PipelineStatus>,
    redraw: Redraw,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PipelineStatus> {
        self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn get(&self) -> PipelineStatus {
        self.lock().clone()
    }

    /// Move to `next` unless the pipeline already failed.
    fn set(&self, next: PipelineStatus) {
        {
            let mut status = self.lock();
            if !status.is_failed() {
                *status = next;
            }
        }
        self.redraw.request();
    }

    /// Record a failure. Only the first one is kept.
    fn fail(&self, index: &[u32], err: &ViewerError) {
        warn!(part = %format_index(index), error = %err, "Part pipeline failed");
        {
            let mut status = self.lock();
            if !status.is_failed() {
                *status = PipelineStatus::Failed(err.to_string());
            }
        }
        self.redraw.request();
    }
}

/// First error reported by any of a group of concurrent copies.
#[derive(Default)]
struct FirstError(Mutex<Option<ViewerError>>);

impl FirstError {
    fn record(&self, err: ViewerError) {
        let mut slot = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn take(&self) -> Option<ViewerError> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

// ── Pipeline ────────────────────────────────────────────────────

/// Rendering state for one leaf of the part list.
#[derive(Debug)]
pub struct RenderPipeline {
    uid: u32,
    handle: PartHandle,
    filter: Option<FilterRule>,
    headers: Option<HeaderFields>,
    fetched: bool,
    shared: Arc<Shared>,
}

impl RenderPipeline {
    /// Match `handle` against `rules` and set up an idle pipeline.
    ///
    /// With `show_headers` the message's header fields are written into the
    /// pager ahead of the body.
    pub fn new(
        msg: &MessageInfo,
        handle: PartHandle,
        rules: &[FilterRule],
        show_headers: bool,
        redraw: Redraw,
    ) -> Self {
        let filter = match_filter(rules, &handle.part, msg).cloned();
        let status = if filter.is_some() {
            PipelineStatus::Unfetched
        } else {
            debug!(part = %format_index(&handle.index), mime = %handle.part.mime(), "No filter matches part");
            PipelineStatus::Unsupported
        };
        Self {
            uid: msg.uid,
            handle,
            filter,
            headers: show_headers.then(|| msg.headers.clone()),
            fetched: false,
            shared: Arc::new(Shared {
                status: Mutex::new(status),
                redraw,
            }),
        }
    }

    pub fn status(&self) -> PipelineStatus {
        self.shared.get()
    }

    pub fn handle(&self) -> &PartHandle {
        &self.handle
    }

    pub fn is_fetched(&self) -> bool {
        self.fetched
    }

    /// Request the part's bytes and stream them into the pager once it
    /// starts. Returns `false` (and does nothing) if the part was already
    /// requested or has no matching filter.
    pub fn start(&mut self, store: &dyn FetchService, pager: Receiver<PagerInput>) -> bool {
        if self.fetched {
            return false;
        }
        let Some(rule) = &self.filter else {
            return false;
        };
        self.fetched = true;
        self.shared.set(PipelineStatus::Fetching);
        debug!(part = %format_index(&self.handle.index), "Fetching part");

        let job = Job {
            index: self.handle.index.clone(),
            command: rule.command.clone(),
            is_text: self.handle.part.is_text(),
            headers: self.headers.clone(),
            shared: Arc::clone(&self.shared),
        };
        store.fetch_body_part(
            self.uid,
            &self.handle.index,
            Box::new(move |result: Result<PartSource>| match result {
                Ok(source) => {
                    thread::spawn(move || job.run(source, pager));
                }
                Err(e) => job.shared.fail(&job.index, &e),
            }),
        );
        true
    }
}

/// Everything the background task needs, detached from the UI-owned state.
struct Job {
    index: Vec<u32>,
    command: String,
    is_text: bool,
    headers: Option<HeaderFields>,
    shared: Arc<Shared>,
}

impl Job {
    fn run(self, source: PartSource, pager: Receiver<PagerInput>) {
        match self.render(source, pager) {
            Ok(()) => {
                debug!(part = %format_index(&self.index), "Part delivered to pager");
                self.shared.set(PipelineStatus::Ready);
            }
            Err(e) => self.shared.fail(&self.index, &e),
        }
    }

    fn render(&self, source: PartSource, pager: Receiver<PagerInput>) -> Result<()> {
        let direct = self.command.is_empty();
        self.shared.set(if direct {
            PipelineStatus::Direct
        } else {
            PipelineStatus::Filtered
        });

        let mut sink = pager.recv().map_err(|_| {
            ViewerError::copy(
                "pager start",
                io::Error::new(io::ErrorKind::BrokenPipe, "pager exited before it started"),
            )
        })?;

        if let Some(headers) = &self.headers {
            write_headers(headers, &mut sink).map_err(|e| ViewerError::copy("headers", e))?;
        }

        if direct {
            transfer_body(source, self.is_text, &mut sink)
                .map_err(|e| ViewerError::copy("body", e))?;
            sink.flush().map_err(|e| ViewerError::copy("body", e))?;
            return Ok(());
        }

        run_filter(&self.command, source, self.is_text, sink)
    }
}

// ── Stream stages ───────────────────────────────────────────────

/// Pipe `source` through `sh -c command` into `sink`.
///
/// The source is fed on its own thread and the filter's stdin is closed as
/// soon as it is exhausted. stdout and stderr are copied concurrently; the
/// sink is dropped (closing the pager input) only after both copies and
/// the feeder have finished.
pub fn run_filter<R, W>(command: &str, source: R, is_text: bool, sink: W) -> Result<()>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    debug!(command, "Spawning filter");
    let filter_error = |source| ViewerError::Filter {
        command: command.to_string(),
        source,
    };

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(filter_error)?;

    let (Some(stdin), Some(stdout), Some(stderr)) =
        (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(filter_error(io::Error::other("filter pipes unavailable")));
    };

    let feeder = thread::spawn(move || feed_filter(source, is_text, stdin));
    let copied = copy_filter_output(stdout, stderr, sink);
    let fed = match feeder.join() {
        Ok(result) => result.map_err(|e| ViewerError::copy("filter stdin", e)),
        Err(_) => Err(ViewerError::copy(
            "filter stdin",
            io::Error::other("feeder task panicked"),
        )),
    };

    let status = child.wait().map_err(filter_error)?;
    if !status.success() {
        warn!(command, %status, "Filter exited unsuccessfully");
    }

    copied.and(fed)
}

fn feed_filter<R: Read>(source: R, is_text: bool, mut stdin: std::process::ChildStdin) -> io::Result<()> {
    let result = transfer_body(source, is_text, &mut stdin).map(|_| ());
    drop(stdin);
    match result {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("Filter closed its input before the part was consumed");
            Ok(())
        }
        other => other,
    }
}

/// Copy a filter's stdout and stderr into `sink` concurrently.
///
/// Both copies always run to completion: a copy whose writes fail keeps
/// draining its reader so the filter is never left blocked on a full pipe.
/// The first error in time is returned after both have finished, and
/// `sink` is dropped before returning.
pub fn copy_filter_output<O, E, W>(stdout: O, stderr: E, sink: W) -> Result<()>
where
    O: Read + Send + 'static,
    E: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let sink = Arc::new(Mutex::new(sink));
    let first = Arc::new(FirstError::default());

    let handles = [
        spawn_copy("filter stdout", stdout, Arc::clone(&sink), Arc::clone(&first)),
        spawn_copy("filter stderr", stderr, Arc::clone(&sink), Arc::clone(&first)),
    ];
    for (stage, handle) in handles {
        if handle.join().is_err() {
            first.record(ViewerError::copy(stage, io::Error::other("copy task panicked")));
        }
    }
    drop(sink);

    match first.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn spawn_copy<R, W>(
    stage: &'static str,
    mut reader: R,
    sink: Arc<Mutex<W>>,
    first: Arc<FirstError>,
) -> (&'static str, JoinHandle<()>)
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let handle = thread::spawn(move || {
        if let Err(e) = copy_chunks(&mut reader, &sink) {
            debug!(stage, error = %e, "Copy into pager failed");
            first.record(ViewerError::copy(stage, e));
            let _ = io::copy(&mut reader, &mut io::sink());
        }
    });
    (stage, handle)
}

fn copy_chunks<R: Read, W: Write>(reader: &mut R, sink: &Mutex<W>) -> io::Result<()> {
    let mut buf = [0u8; 8192];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let mut sink = sink
            .lock()
            .map_err(|_| io::Error::other("pager input lock poisoned"))?;
        sink.write_all(&buf[..n])?;
        sink.flush()?;
    }
}

/// Write `"Name: Value\n"` for every field in source order, then a blank line.
pub fn write_headers<W: Write + ?Sized>(headers: &HeaderFields, sink: &mut W) -> io::Result<()> {
    for (name, value) in headers.iter() {
        writeln!(sink, "{name}: {value}")?;
    }
    sink.write_all(b"\n")
}

/// Copy a part body into `sink`.
///
/// Text is rewritten line by line with `\n` endings and any CSI escape at
/// the start of a line removed. Everything else is copied as is.
pub fn transfer_body<R: Read, W: Write + ?Sized>(
    source: R,
    is_text: bool,
    sink: &mut W,
) -> io::Result<u64> {
    if !is_text {
        let mut source = source;
        return io::copy(&mut source, sink);
    }

    let mut reader = BufReader::new(source);
    let mut line = Vec::new();
    let mut written = 0u64;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(written);
        }
        let content = trim_line_ending(&line);
        let content = strip_leading_csi(content);
        sink.write_all(content)?;
        sink.write_all(b"\n")?;
        written += content.len() as u64 + 1;
    }
}

/// `line` without one leading CSI escape sequence.
pub fn strip_leading_csi(line: &[u8]) -> &[u8] {
    match LEADING_CSI.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
