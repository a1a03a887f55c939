//! In-memory message store: serves decoded parts of one raw message.

use std::io::Cursor;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::debug;

use super::{FetchCallback, FetchService, PartSource};
use crate::error::{Result, ViewerError};
use crate::parser::structure;

/// Default number of decoded parts to keep in the LRU cache.
const DEFAULT_CACHE_SIZE: usize = 16;

/// Serves part contents out of a raw RFC 5322 message held in memory.
///
/// Every fetch runs on its own background thread and decodes the requested
/// part with `mail-parser`. Decoded parts are kept in an LRU cache keyed by
/// index path so toggling headers (which rebuilds every pipeline) does not
/// decode everything again.
pub struct MessageStore {
    uid: u32,
    raw: Arc<Vec<u8>>,
    cache: Arc<Mutex<LruCache<Vec<u32>, Arc<Vec<u8>>>>>,
}

impl MessageStore {
    pub fn new(uid: u32, raw: Vec<u8>) -> Self {
        let cache_size =
            NonZeroUsize::new(DEFAULT_CACHE_SIZE).expect("DEFAULT_CACHE_SIZE is non-zero");
        Self {
            uid,
            raw: Arc::new(raw),
            cache: Arc::new(Mutex::new(LruCache::new(cache_size))),
        }
    }

    /// Decoded content of one part, synchronously. Used by the fetch thread
    /// and by the non-interactive CLI.
    pub fn part_bytes(&self, index: &[u32]) -> Result<Arc<Vec<u8>>> {
        lookup(&self.raw, &self.cache, index)
    }
}

fn lookup(
    raw: &[u8],
    cache: &Mutex<LruCache<Vec<u32>, Arc<Vec<u8>>>>,
    index: &[u32],
) -> Result<Arc<Vec<u8>>> {
    if let Some(hit) = cache.lock().ok().and_then(|mut c| c.get(index).cloned()) {
        return Ok(hit);
    }
    debug!(index = ?index, "Decoding part");
    let bytes = Arc::new(structure::part_contents(raw, index)?);
    if let Ok(mut c) = cache.lock() {
        c.put(index.to_vec(), Arc::clone(&bytes));
    }
    Ok(bytes)
}

/// Reader over a shared, already-decoded part.
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FetchService for MessageStore {
    fn fetch_body_part(&self, uid: u32, index: &[u32], on_ready: FetchCallback) {
        if uid != self.uid {
            on_ready(Err(ViewerError::fetch(index, format!("unknown message uid {uid}"))));
            return;
        }
        let raw = Arc::clone(&self.raw);
        let cache = Arc::clone(&self.cache);
        let index = index.to_vec();
        std::thread::spawn(move || {
            let result = lookup(&raw, &cache, &index)
                .map(|bytes| Box::new(Cursor::new(SharedBytes(bytes))) as PartSource);
            on_ready(result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::mpsc;
    use std::time::Duration;

    const RAW: &[u8] = b"Subject: hi\nContent-Type: multipart/mixed; boundary=b\n\n\
--b\nContent-Type: text/plain\n\nfirst part\n\
--b\nContent-Type: text/plain\n\nsecond part\n\
--b--\n";

    fn fetch(store: &MessageStore, uid: u32, index: &[u32]) -> Result<String> {
        let (tx, rx) = mpsc::channel();
        store.fetch_body_part(
            uid,
            index,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        let mut source = rx.recv_timeout(Duration::from_secs(5)).unwrap()?;
        let mut out = String::new();
        source.read_to_string(&mut out).unwrap();
        Ok(out)
    }

    #[test]
    fn test_fetch_delivers_part() {
        let store = MessageStore::new(3, RAW.to_vec());
        assert!(fetch(&store, 3, &[2]).unwrap().starts_with("second part"));
    }

    #[test]
    fn test_fetch_unknown_part_reports_error() {
        let store = MessageStore::new(3, RAW.to_vec());
        let err = fetch(&store, 3, &[9]).unwrap_err();
        assert!(matches!(err, ViewerError::Fetch { .. }));
    }

    #[test]
    fn test_fetch_wrong_uid() {
        let store = MessageStore::new(3, RAW.to_vec());
        assert!(fetch(&store, 4, &[1]).is_err());
    }

    #[test]
    fn test_part_bytes_are_cached() {
        let store = MessageStore::new(3, RAW.to_vec());
        let a = store.part_bytes(&[1]).unwrap();
        let b = store.part_bytes(&[1]).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
