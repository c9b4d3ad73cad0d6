//! Error types for the setl engine.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SetlError>;

/// Everything that can abort a run. None of these are retried: a failure in
/// any participant ends the whole batch.
#[derive(Debug, Error)]
pub enum SetlError {
    /// A grid or pattern file could not be opened or read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A grid or pattern file was readable but malformed.
    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// A cell buffer could not be reserved.
    #[error("allocation of {cells} cells failed while {context}")]
    Allocation { cells: usize, context: &'static str },

    /// Run parameters that can never produce a valid run.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A coordinate or size that the packed match encoding cannot represent.
    #[error("{what} = {value} exceeds the match encoding limit of {limit}")]
    EncodingOverflow {
        what: &'static str,
        value: usize,
        limit: usize,
    },

    /// A peer sent something unexpected, or disappeared.
    #[error("protocol violation on rank {rank}: {detail}")]
    ProtocolViolation { rank: usize, detail: String },

    /// A worker task panicked or was cancelled before finishing.
    #[error("worker {rank} failed: {reason}")]
    WorkerFailed { rank: usize, reason: String },

    /// The grid snapshot could not be written.
    #[error("snapshot export failed: {0}")]
    Snapshot(#[from] image::ImageError),
}

impl SetlError {
    pub(crate) fn protocol(rank: usize, detail: impl Into<String>) -> Self {
        SetlError::ProtocolViolation {
            rank,
            detail: detail.into(),
        }
    }

    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> Self {
        SetlError::Parse {
            line,
            reason: reason.into(),
        }
    }
}
