//! Loading standalone `.eml` files (RFC 5322 messages, optionally with a
//! leading MBOX `From ` line).

use std::path::Path;

use crate::error::{Result, ViewerError};
use crate::model::message::MessageInfo;
use crate::parser::structure;

/// Read an `.eml` file and parse it.
///
/// Returns the raw bytes (what the message store serves parts from)
/// together with the parsed [`MessageInfo`].
pub fn load_eml(path: impl AsRef<Path>, uid: u32) -> Result<(Vec<u8>, MessageInfo)> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| ViewerError::io(path, e))?;
    let raw = strip_envelope_line(&data).to_vec();
    let info = structure::parse_message(&raw, uid)?;
    tracing::debug!(
        path = %path.display(),
        bytes = raw.len(),
        leaves = info.body_structure.leaf_count(),
        "Loaded message"
    );
    Ok((raw, info))
}

/// Drop a UTF-8 BOM and an MBOX `From ` separator line, if present.
fn strip_envelope_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_envelope_line() {
        let data = b"From alice@example.com Thu Jan 01 00:00:00 2024\nSubject: Test\n\nBody\n";
        assert!(strip_envelope_line(data).starts_with(b"Subject:"));
    }

    #[test]
    fn test_plain_message_untouched() {
        let data = b"Subject: Test\n\nBody\n";
        assert_eq!(strip_envelope_line(data), data);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_eml("/nonexistent/message.eml", 1).unwrap_err();
        assert!(matches!(err, ViewerError::Io { .. }));
    }
}
