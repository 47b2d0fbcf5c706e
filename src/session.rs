//! Per-message orchestration.
//!
//! `StreamController` owns at most one live `MessageSession`; a delta for a
//! new message id discards the old session wholesale, so user-closed state
//! and manual tab selection never leak across turns. Sessions react to
//! transport and UI events and call back into the host only when a
//! UI-visible frame changed. No threads, no blocking; the host drives the
//! throttle with `flush_due`/`next_timeout_ms` from its own event loop.

use std::time::{Duration, Instant};

use message_transport::{MessageId, RenderHost, TransportEvent};

use crate::classify::Classification;
use crate::config::EnvConfig;
use crate::extract::{extract_from_outcome, split_from_outcome, ArtifactRecord, SplitText};
use crate::grammar::TagGrammar;
use crate::panel::{Panel, PanelState, DEFAULT_REFRESH_INTERVAL_MS};
use crate::scanner::{BufferTail, ScanCursor, ScanOutcome};

/// One assistant message's buffer, scan state, and panel.
#[derive(Debug)]
pub struct MessageSession {
    message_id: MessageId,
    grammar: TagGrammar,
    buffer: String,
    cursor: ScanCursor,
    outcome: ScanOutcome,
    classification: Classification,
    panel: Panel,
    finalized: bool,
}

impl MessageSession {
    fn new(message_id: MessageId, grammar: TagGrammar, interval: Duration) -> Self {
        Self {
            message_id,
            grammar,
            buffer: String::new(),
            cursor: ScanCursor::new(),
            outcome: ScanOutcome {
                matches: Vec::new(),
                tail: BufferTail::Clean,
            },
            classification: Classification::default(),
            panel: Panel::new(interval),
            finalized: false,
        }
    }

    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    #[must_use]
    pub fn panel_state(&self) -> &PanelState {
        self.panel.state()
    }

    #[must_use]
    pub fn classification(&self) -> Classification {
        self.classification
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Current un-throttled extraction view of the buffer.
    #[must_use]
    pub fn extracted(&self) -> Vec<ArtifactRecord> {
        extract_from_outcome(&self.grammar, &self.outcome, &self.buffer)
    }

    /// Ordinary text flanking the artifact region, for the chat renderer.
    #[must_use]
    pub fn split_text(&self) -> SplitText {
        split_from_outcome(&self.outcome, &self.buffer)
    }

    fn on_buffer_delta(&mut self, snapshot: &str, now: Instant, host: &mut dyn RenderHost) {
        if self.finalized {
            return;
        }

        // The transport owns an append-only buffer; a shrinking snapshot is
        // an out-of-order delivery and is dropped.
        if snapshot.len() < self.buffer.len() {
            return;
        }

        self.buffer.clear();
        self.buffer.push_str(snapshot);
        self.outcome = self.cursor.scan(&self.grammar, &self.buffer);
        self.classification = Classification::from_outcome(&self.outcome);

        if !self.outcome.matches.is_empty() {
            let records = extract_from_outcome(&self.grammar, &self.outcome, &self.buffer);
            self.panel.on_artifacts_update(now, records);
        }

        // The transcript text itself changed, so a render is due even when
        // the panel frame was deferred by the throttle.
        host.request_render();
    }

    fn on_message_finalized(&mut self, now: Instant, host: &mut dyn RenderHost) {
        if self.finalized {
            return;
        }

        self.finalized = true;
        if self.panel.on_message_finalized(now) {
            host.request_render();
        }
    }

    fn on_message_failed(&mut self, error: &str, now: Instant, host: &mut dyn RenderHost) {
        if self.finalized {
            return;
        }

        self.finalized = true;
        if self.panel.on_stream_failed(now, error) {
            host.request_render();
        }
    }

    fn on_user_close(&mut self, host: &mut dyn RenderHost) {
        if self.panel.on_user_close() {
            host.request_render();
        }
    }

    fn on_user_select(&mut self, index: usize, host: &mut dyn RenderHost) {
        if self.panel.on_select(index) {
            host.request_render();
        }
    }

    fn on_fetch_failed(&mut self, artifact_id: &str, error: &str, host: &mut dyn RenderHost) {
        if self.panel.on_fetch_failed(artifact_id, error) {
            host.request_render();
        }
    }

    fn flush_due(&mut self, now: Instant, host: &mut dyn RenderHost) -> bool {
        let applied = self.panel.flush_due(now);
        if applied {
            host.request_render();
        }
        applied
    }

    fn next_timeout_ms(&self, now: Instant, default_ms: i32) -> i32 {
        self.panel.next_timeout_ms(now, default_ms)
    }
}

/// Binds transport and UI events to the per-message session lifecycle.
#[derive(Debug)]
pub struct StreamController {
    grammar: TagGrammar,
    interval: Duration,
    active: Option<MessageSession>,
}

impl Default for StreamController {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamController {
    #[must_use]
    pub fn new() -> Self {
        Self::with_grammar(
            TagGrammar::production().clone(),
            Duration::from_millis(DEFAULT_REFRESH_INTERVAL_MS),
        )
    }

    #[must_use]
    pub fn with_config(config: &EnvConfig) -> Self {
        Self::with_grammar(TagGrammar::production().clone(), config.refresh_interval())
    }

    #[must_use]
    pub fn with_grammar(grammar: TagGrammar, interval: Duration) -> Self {
        Self {
            grammar,
            interval,
            active: None,
        }
    }

    /// Routes one transport event.
    pub fn apply_event(&mut self, event: &TransportEvent, now: Instant, host: &mut dyn RenderHost) {
        match event {
            TransportEvent::Delta {
                message_id,
                snapshot,
            } => self.on_buffer_delta(*message_id, snapshot, now, host),
            TransportEvent::Finalized { message_id } => {
                self.on_message_finalized(*message_id, now, host);
            }
            TransportEvent::Failed { message_id, error } => {
                self.on_message_failed(*message_id, error, now, host);
            }
        }
    }

    /// Cumulative snapshot for a message. The first delta of a new message id
    /// starts a fresh session; a fresh panel always starts from `Closed`.
    pub fn on_buffer_delta(
        &mut self,
        message_id: MessageId,
        snapshot: &str,
        now: Instant,
        host: &mut dyn RenderHost,
    ) {
        let stale = self
            .active
            .as_ref()
            .map(|session| session.message_id != message_id)
            .unwrap_or(true);
        if stale {
            self.active = Some(MessageSession::new(
                message_id,
                self.grammar.clone(),
                self.interval,
            ));
        }

        if let Some(session) = self.active.as_mut() {
            session.on_buffer_delta(snapshot, now, host);
        }
    }

    /// Exactly-once settle for the active message; events for other message
    /// ids are stale and ignored.
    pub fn on_message_finalized(
        &mut self,
        message_id: MessageId,
        now: Instant,
        host: &mut dyn RenderHost,
    ) {
        if let Some(session) = self.active_for(message_id) {
            session.on_message_finalized(now, host);
        }
    }

    pub fn on_message_failed(
        &mut self,
        message_id: MessageId,
        error: &str,
        now: Instant,
        host: &mut dyn RenderHost,
    ) {
        if let Some(session) = self.active_for(message_id) {
            session.on_message_failed(error, now, host);
        }
    }

    pub fn on_user_close(&mut self, host: &mut dyn RenderHost) {
        if let Some(session) = self.active.as_mut() {
            session.on_user_close(host);
        }
    }

    pub fn on_user_select(&mut self, index: usize, host: &mut dyn RenderHost) {
        if let Some(session) = self.active.as_mut() {
            session.on_user_select(index, host);
        }
    }

    pub fn on_fetch_failed(&mut self, artifact_id: &str, error: &str, host: &mut dyn RenderHost) {
        if let Some(session) = self.active.as_mut() {
            session.on_fetch_failed(artifact_id, error, host);
        }
    }

    /// Applies a deferred panel refresh whose deadline has passed.
    pub fn flush_due(&mut self, now: Instant, host: &mut dyn RenderHost) -> bool {
        self.active
            .as_mut()
            .map(|session| session.flush_due(now, host))
            .unwrap_or(false)
    }

    /// Poll timeout for the hosting event loop.
    #[must_use]
    pub fn next_timeout_ms(&self, now: Instant, default_ms: i32) -> i32 {
        self.active
            .as_ref()
            .map(|session| session.next_timeout_ms(now, default_ms))
            .unwrap_or(default_ms)
    }

    #[must_use]
    pub fn session(&self) -> Option<&MessageSession> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn panel_state(&self) -> Option<&PanelState> {
        self.active.as_ref().map(MessageSession::panel_state)
    }

    fn active_for(&mut self, message_id: MessageId) -> Option<&mut MessageSession> {
        self.active
            .as_mut()
            .filter(|session| session.message_id == message_id)
    }
}
