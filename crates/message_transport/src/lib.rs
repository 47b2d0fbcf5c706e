//! Minimal contract between the artifact core and its streaming collaborators.
//!
//! This crate intentionally defines only the event shapes delivered by a
//! message transport and the host-mediated content-fetch contract. It excludes
//! transport implementations, token delivery, persistence, and rendering
//! concerns.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for one in-flight (or completed) assistant message.
pub type MessageId = u64;

/// One event delivered by the transport for an assistant message.
///
/// `Delta` carries the full cumulative buffer snapshot, not incremental text;
/// the transport owns the buffer and the core only ever reads snapshots.
/// Exactly one terminal event (`Finalized` or `Failed`) follows per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportEvent {
    Delta {
        message_id: MessageId,
        snapshot: String,
    },
    Finalized {
        message_id: MessageId,
    },
    Failed {
        message_id: MessageId,
        error: String,
    },
}

impl TransportEvent {
    /// Returns the message this event belongs to.
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        match self {
            Self::Delta { message_id, .. }
            | Self::Finalized { message_id }
            | Self::Failed { message_id, .. } => *message_id,
        }
    }

    /// Returns true when no further events follow for this message.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized { .. } | Self::Failed { .. })
    }
}

/// Host surface the core calls back into when a UI-visible frame changed.
pub trait RenderHost {
    fn request_render(&mut self);
}

/// Error returned by the external file-content collaborator.
///
/// Fetch failures are display-level conditions; they never block panel state
/// transitions and are never treated as parser faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    message: String,
}

impl FetchError {
    /// Creates a new fetch error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FetchError {}

impl From<String> for FetchError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for FetchError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Request envelope for one artifact content fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub artifact_id: String,
}

/// Completion callback for one asynchronous fetch.
pub type FetchCallback = Box<dyn FnOnce(Result<Vec<u8>, FetchError>) + Send>;

/// Asynchronous content fetch for non-text artifact kinds.
///
/// Implementations must not block: `fetch` returns immediately and `done`
/// fires later on the host's event path.
pub trait ContentFetcher {
    fn fetch(&mut self, request: FetchRequest, done: FetchCallback);
}
