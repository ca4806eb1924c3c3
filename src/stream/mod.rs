//! Stream sessions
//!
//! A session pulls chunks from a [`ByteSource`], decodes and frames them,
//! and hands each content fragment to a consumer callback in arrival order.
//! The source is released exactly once, whatever ends the session.

mod cancel;
mod session;
mod source;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parser::FramerError;

pub use cancel::CancelToken;
pub use session::{run, StreamSession};
pub use source::{ByteSource, ChunkSource, ReaderSource, DEFAULT_CHUNK_SIZE};

/// Error type for byte sources
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection dropped: {0}")]
    Disconnected(String),

    #[error("Source already released")]
    Released,
}

/// Reason a session ended in [`Outcome::Failed`]
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Transport error: {0}")]
    Transport(#[from] SourceError),

    #[error("Line buffer overflow: {0}")]
    BufferOverflow(#[from] FramerError),
}

/// How a session ended
#[derive(Debug)]
pub enum Outcome {
    /// Sentinel received or the source reached end of stream
    Completed,
    /// Transport failure or buffer overflow
    Failed(StreamError),
    /// The consumer asked to stop
    Cancelled,
}

impl Outcome {
    /// Check if the session completed normally
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    /// Check if the session failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// Check if the session was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// The failure reason, if any
    pub fn error(&self) -> Option<&StreamError> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => write!(f, "completed"),
            Outcome::Failed(err) => write!(f, "failed: {}", err),
            Outcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Per-session counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    pub bytes_read: u64,
    pub chunks_read: u64,
    pub lines_framed: u64,
    pub fragments_dispatched: u64,
    /// Unrecognized or malformed lines
    pub frames_skipped: u64,
    /// UTF-8 sequences dropped by the decoder
    pub invalid_sequences: u64,
    pub sentinel_seen: bool,
}

/// Final result of a session, produced after the source is released
#[derive(Debug)]
pub struct StreamReport {
    pub outcome: Outcome,
    pub stats: StreamStats,
}
