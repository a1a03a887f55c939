//! Centralized error types for mimeview.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mimeview library.
///
/// `Config` is fatal to viewer construction. `Fetch`, `Filter` and `Copy`
/// are scoped to a single part and only ever fail that part's pipeline.
#[derive(Error, Debug)]
pub enum ViewerError {
    /// The viewer configuration is unusable (e.g. a malformed pager command).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The part bytes could not be retrieved.
    #[error("Failed to fetch part {index}: {reason}")]
    Fetch { index: String, reason: String },

    /// The filter process could not be started or failed while running.
    #[error("Filter '{command}' failed: {source}")]
    Filter {
        command: String,
        source: std::io::Error,
    },

    /// Copying bytes between the source, filter and pager failed.
    #[error("Copy error ({stage}): {source}")]
    Copy {
        stage: &'static str,
        source: std::io::Error,
    },

    /// The message could not be parsed into a structure tree.
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, ViewerError>`.
pub type Result<T> = std::result::Result<T, ViewerError>;

impl ViewerError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Copy` variant tagged with the stage that failed.
    pub fn copy(stage: &'static str, source: std::io::Error) -> Self {
        Self::Copy { stage, source }
    }

    /// Create a `Fetch` variant for the part at `index`.
    pub fn fetch(index: &[u32], reason: impl Into<String>) -> Self {
        Self::Fetch {
            index: crate::model::part::format_index(index),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_names_index_path() {
        let err = ViewerError::fetch(&[2, 1], "gone");
        assert_eq!(err.to_string(), "Failed to fetch part 2.1: gone");
    }

    #[test]
    fn test_copy_error_names_stage() {
        let err = ViewerError::copy(
            "filter stdout",
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"),
        );
        assert!(err.to_string().contains("filter stdout"));
        assert!(err.to_string().contains("pipe closed"));
    }
}
