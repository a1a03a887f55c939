//! Part retrieval: the fetch service the rendering pipeline depends on.

pub mod reader;

use std::io::Read;

use crate::error::Result;

/// Byte source for one part's decoded content.
pub type PartSource = Box<dyn Read + Send>;

/// Invoked exactly once with the part's content, or why it could not be had.
pub type FetchCallback = Box<dyn FnOnce(Result<PartSource>) + Send>;

/// Anything that can hand out part contents asynchronously.
///
/// `fetch_body_part` must return promptly; the callback runs later, on
/// whatever thread the implementation chooses.
pub trait FetchService: Send + Sync {
    fn fetch_body_part(&self, uid: u32, index: &[u32], on_ready: FetchCallback);
}
