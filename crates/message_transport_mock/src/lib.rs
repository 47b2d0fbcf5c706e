//! Deterministic scripted transport for tests.
//!
//! Replays a fixed chunk script as cumulative buffer snapshots, optionally
//! re-split at token grain the way a live model stream arrives. No timers, no
//! threads; callers iterate the event list and drive the core themselves.

use message_transport::{MessageId, TransportEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedTransport {
    message_id: MessageId,
    chunks: Vec<String>,
    token_grain: bool,
}

impl ScriptedTransport {
    pub fn new(message_id: MessageId, chunks: Vec<String>) -> Self {
        Self {
            message_id,
            chunks,
            token_grain: false,
        }
    }

    /// Re-splits the script at whitespace boundaries so each delta carries
    /// roughly one token, matching live stream granularity.
    #[must_use]
    pub fn token_grain(mut self) -> Self {
        self.token_grain = true;
        self
    }

    /// Returns every delta followed by a `Finalized` terminal event.
    pub fn events(&self) -> Vec<TransportEvent> {
        let mut events = self.delta_events();
        events.push(TransportEvent::Finalized {
            message_id: self.message_id,
        });
        events
    }

    /// Returns every delta followed by a `Failed` terminal event, simulating
    /// a stream that aborts mid-message.
    pub fn events_failing(&self, error: impl Into<String>) -> Vec<TransportEvent> {
        let mut events = self.delta_events();
        events.push(TransportEvent::Failed {
            message_id: self.message_id,
            error: error.into(),
        });
        events
    }

    fn delta_events(&self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        let mut snapshot = String::new();

        for piece in self.pieces() {
            snapshot.push_str(&piece);
            events.push(TransportEvent::Delta {
                message_id: self.message_id,
                snapshot: snapshot.clone(),
            });
        }

        events
    }

    fn pieces(&self) -> Vec<String> {
        if !self.token_grain {
            return self.chunks.clone();
        }

        let mut pieces = Vec::new();
        for chunk in &self.chunks {
            let mut pending_token = String::new();
            for ch in chunk.chars() {
                pending_token.push(ch);
                if matches!(ch, ' ' | '\n') {
                    pieces.push(std::mem::take(&mut pending_token));
                }
            }
            if !pending_token.is_empty() {
                pieces.push(pending_token);
            }
        }

        pieces
    }
}
