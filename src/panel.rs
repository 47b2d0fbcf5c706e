//! Panel state machine and refresh throttle.
//!
//! One `Panel` per assistant message. All "did this already happen" checks
//! live in the phase guards here; callers hold no flags of their own. The
//! throttle is a single-slot deadline in the clock-injected style: callers
//! pass `now`, poll `flush_due`, and size their wait with `next_timeout_ms`,
//! so tests never sleep and a cancelled slot can never fire late.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::extract::{last_relevant, ArtifactRecord};

/// Reference refresh interval while an artifact is streaming.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanelPhase {
    Closed,
    Streaming,
    Settled,
    UserClosed,
}

/// Snapshot of everything a renderer needs to paint the panel and its tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelState {
    pub phase: PanelPhase,
    pub active_artifact_id: Option<String>,
    pub known_artifacts: Vec<ArtifactRecord>,
    pub manual_override: bool,
    pub last_applied_at: Option<Instant>,
    /// Display-level error (content fetch failure, stream abort). Never
    /// affects the phase.
    pub display_error: Option<String>,
}

impl PanelState {
    fn new() -> Self {
        Self {
            phase: PanelPhase::Closed,
            active_artifact_id: None,
            known_artifacts: Vec::new(),
            manual_override: false,
            last_applied_at: None,
            display_error: None,
        }
    }

    /// The record currently displayed, when one is.
    #[must_use]
    pub fn active_artifact(&self) -> Option<&ArtifactRecord> {
        let id = self.active_artifact_id.as_deref()?;
        self.known_artifacts.iter().find(|record| record.id == id)
    }
}

/// Message-scoped panel controller.
#[derive(Debug)]
pub struct Panel {
    state: PanelState,
    interval: Duration,
    pending: Option<Vec<ArtifactRecord>>,
    deadline: Option<Instant>,
    message_finalized: bool,
}

impl Panel {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            state: PanelState::new(),
            interval,
            pending: None,
            deadline: None,
            message_finalized: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> &PanelState {
        &self.state
    }

    /// Feeds freshly extracted records. Returns true when a UI-visible frame
    /// was applied right now (callers then request a render); a deferred
    /// frame surfaces later through [`Panel::flush_due`].
    pub fn on_artifacts_update(&mut self, now: Instant, records: Vec<ArtifactRecord>) -> bool {
        match self.state.phase {
            // Sticky for this message: detection never reopens the panel,
            // records are still tracked so a tile click has data to open.
            PanelPhase::UserClosed => {
                self.state.known_artifacts = records;
                false
            }
            PanelPhase::Closed => {
                if records.is_empty() {
                    return false;
                }
                self.state.phase = PanelPhase::Streaming;
                self.offer(now, records)
            }
            PanelPhase::Streaming => self.offer(now, records),
            // Deltas after settle are stale; keep the final frame.
            PanelPhase::Settled => false,
        }
    }

    /// Message finished streaming. Cancels any pending refresh and applies
    /// the final payload synchronously — the last frame is never dropped.
    pub fn on_message_finalized(&mut self, now: Instant) -> bool {
        self.message_finalized = true;
        self.deadline = None;
        let pending = self.pending.take();

        if self.state.phase != PanelPhase::Streaming {
            return false;
        }

        if let Some(records) = pending {
            self.apply(now, records);
        }
        self.state.phase = PanelPhase::Settled;
        true
    }

    /// Stream aborted. Settles like a finalize and surfaces the error at
    /// display level when the panel is visible.
    pub fn on_stream_failed(&mut self, now: Instant, error: &str) -> bool {
        let settled = self.on_message_finalized(now);
        if self.is_visible() {
            self.state.display_error = Some(error.to_string());
            return true;
        }
        settled
    }

    /// User closed the panel. Closing an already-closed panel is a no-op.
    pub fn on_user_close(&mut self) -> bool {
        if self.state.phase == PanelPhase::UserClosed {
            return false;
        }

        self.state.phase = PanelPhase::UserClosed;
        self.pending = None;
        self.deadline = None;
        self.state.display_error = None;
        true
    }

    /// User picked a tile/tab. Pure state update; out-of-range is a no-op.
    pub fn on_select(&mut self, index: usize) -> bool {
        let Some(record) = self.state.known_artifacts.get(index) else {
            return false;
        };

        let pinned = !self.state.manual_override;
        self.state.manual_override = true;

        let changed_artifact = self.state.active_artifact_id.as_deref() != Some(record.id.as_str());
        if changed_artifact {
            self.state.active_artifact_id = Some(record.id.clone());
            self.state.display_error = None;
        }

        let target = if self.message_finalized {
            PanelPhase::Settled
        } else {
            PanelPhase::Streaming
        };
        let changed_phase = self.state.phase != target;
        self.state.phase = target;

        changed_artifact || changed_phase || pinned
    }

    /// Content fetch failed for an artifact. Only surfaces when that artifact
    /// is the one on screen; never a parser fault, never a phase change.
    pub fn on_fetch_failed(&mut self, artifact_id: &str, error: &str) -> bool {
        if !self.is_visible() || self.state.active_artifact_id.as_deref() != Some(artifact_id) {
            return false;
        }

        self.state.display_error = Some(error.to_string());
        true
    }

    /// Applies a deferred refresh whose deadline has passed. Returns true
    /// when a frame was applied.
    pub fn flush_due(&mut self, now: Instant) -> bool {
        let Some(deadline) = self.deadline else {
            return false;
        };
        if now < deadline {
            return false;
        }

        self.deadline = None;
        match self.pending.take() {
            Some(records) if self.state.phase == PanelPhase::Streaming => {
                self.apply(now, records);
                true
            }
            _ => false,
        }
    }

    /// Poll timeout for hosts driving the throttle from an event loop.
    #[must_use]
    pub fn next_timeout_ms(&self, now: Instant, default_ms: i32) -> i32 {
        if let Some(deadline) = self.deadline {
            let remaining = deadline.saturating_duration_since(now);
            let ms = remaining.as_millis().min(i32::MAX as u128) as i32;
            return ms.min(default_ms).max(0);
        }
        default_ms
    }

    fn is_visible(&self) -> bool {
        matches!(
            self.state.phase,
            PanelPhase::Streaming | PanelPhase::Settled
        )
    }

    fn offer(&mut self, now: Instant, records: Vec<ArtifactRecord>) -> bool {
        if let Some(last) = self.state.last_applied_at {
            if now.saturating_duration_since(last) < self.interval {
                // Coalesce: the new payload replaces any pending one; a
                // single deadline slot exists per panel.
                self.pending = Some(records);
                if self.deadline.is_none() {
                    self.deadline = Some(last + self.interval);
                }
                return false;
            }
        }

        self.apply(now, records);
        true
    }

    fn apply(&mut self, now: Instant, records: Vec<ArtifactRecord>) {
        self.state.known_artifacts = records;

        if !self.state.manual_override {
            if let Some(last) = last_relevant(&self.state.known_artifacts) {
                if self.state.active_artifact_id.as_deref() != Some(last.id.as_str()) {
                    self.state.active_artifact_id = Some(last.id.clone());
                    self.state.display_error = None;
                }
            }
        }

        self.state.last_applied_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ArtifactKind;

    fn record(id: &str, content: &str, complete: bool) -> ArtifactRecord {
        ArtifactRecord {
            id: id.to_string(),
            kind: ArtifactKind::Html,
            title: format!("Artifact {id}"),
            language: Some("html".to_string()),
            content: content.to_string(),
            complete,
        }
    }

    fn panel() -> Panel {
        Panel::new(Duration::from_millis(100))
    }

    #[test]
    fn first_detection_opens_and_applies_immediately() {
        let mut panel = panel();
        let now = Instant::now();

        let applied = panel.on_artifacts_update(now, vec![record("a", "<h1>", false)]);

        assert!(applied);
        assert_eq!(panel.state().phase, PanelPhase::Streaming);
        assert_eq!(panel.state().active_artifact_id.as_deref(), Some("a"));
        assert_eq!(panel.state().last_applied_at, Some(now));
    }

    #[test]
    fn empty_update_does_not_open_the_panel() {
        let mut panel = panel();
        assert!(!panel.on_artifacts_update(Instant::now(), Vec::new()));
        assert_eq!(panel.state().phase, PanelPhase::Closed);
    }

    #[test]
    fn rapid_updates_coalesce_into_one_deferred_frame() {
        let mut panel = panel();
        let start = Instant::now();

        assert!(panel.on_artifacts_update(start, vec![record("a", "v1", false)]));
        for (offset, content) in [(10u64, "v2"), (20, "v3"), (30, "v4")] {
            let applied = panel.on_artifacts_update(
                start + Duration::from_millis(offset),
                vec![record("a", content, false)],
            );
            assert!(!applied, "update inside the interval must defer");
        }

        // Still showing the first frame.
        assert_eq!(panel.state().known_artifacts[0].content, "v1");

        // Nothing before the deadline, exactly the last payload after it.
        assert!(!panel.flush_due(start + Duration::from_millis(99)));
        assert!(panel.flush_due(start + Duration::from_millis(100)));
        assert_eq!(panel.state().known_artifacts[0].content, "v4");

        // The slot is empty; flushing again is idempotent.
        assert!(!panel.flush_due(start + Duration::from_millis(200)));
    }

    #[test]
    fn next_timeout_reflects_pending_deadline() {
        let mut panel = panel();
        let start = Instant::now();

        panel.on_artifacts_update(start, vec![record("a", "v1", false)]);
        panel.on_artifacts_update(start + Duration::from_millis(40), vec![record("a", "v2", false)]);

        let timeout = panel.next_timeout_ms(start + Duration::from_millis(40), 1000);
        assert!(timeout <= 60, "timeout should reflect the remaining delay");
        assert_eq!(panel.next_timeout_ms(start, 1000).max(0), 100);
    }

    #[test]
    fn finalize_applies_pending_frame_synchronously() {
        let mut panel = panel();
        let start = Instant::now();

        panel.on_artifacts_update(start, vec![record("a", "v1", false)]);
        panel.on_artifacts_update(
            start + Duration::from_millis(10),
            vec![record("a", "final", true)],
        );

        let applied = panel.on_message_finalized(start + Duration::from_millis(20));

        assert!(applied);
        assert_eq!(panel.state().phase, PanelPhase::Settled);
        assert_eq!(panel.state().known_artifacts[0].content, "final");
        assert!(!panel.flush_due(start + Duration::from_millis(500)), "timer must be cancelled");
    }

    #[test]
    fn truncated_record_still_settles() {
        let mut panel = panel();
        let now = Instant::now();

        panel.on_artifacts_update(now, vec![record("a", "partial", false)]);
        panel.on_message_finalized(now + Duration::from_millis(200));

        assert_eq!(panel.state().phase, PanelPhase::Settled);
        assert!(!panel.state().known_artifacts[0].complete);
    }

    #[test]
    fn user_close_is_sticky_against_further_detection() {
        let mut panel = panel();
        let start = Instant::now();

        panel.on_artifacts_update(start, vec![record("a", "v1", false)]);
        assert!(panel.on_user_close());
        assert!(!panel.on_user_close(), "closing twice is a no-op");

        let reopened = panel.on_artifacts_update(
            start + Duration::from_millis(500),
            vec![record("a", "v2", false)],
        );
        assert!(!reopened);
        assert_eq!(panel.state().phase, PanelPhase::UserClosed);
        // Records are still tracked for tile clicks.
        assert_eq!(panel.state().known_artifacts[0].content, "v2");
    }

    #[test]
    fn user_close_cancels_pending_refresh() {
        let mut panel = panel();
        let start = Instant::now();

        panel.on_artifacts_update(start, vec![record("a", "v1", false)]);
        panel.on_artifacts_update(start + Duration::from_millis(10), vec![record("a", "v2", false)]);
        panel.on_user_close();

        assert!(!panel.flush_due(start + Duration::from_millis(500)));
        assert_eq!(panel.state().phase, PanelPhase::UserClosed);
    }

    #[test]
    fn manual_override_pins_active_artifact_but_appends_new_tabs() {
        let mut panel = panel();
        let start = Instant::now();

        panel.on_artifacts_update(start, vec![record("a", "first", true)]);
        assert!(panel.on_select(0));
        assert!(panel.state().manual_override);

        let later = start + Duration::from_millis(200);
        panel.on_artifacts_update(
            later,
            vec![record("a", "first", true), record("b", "second", false)],
        );

        assert_eq!(panel.state().known_artifacts.len(), 2);
        assert_eq!(
            panel.state().active_artifact_id.as_deref(),
            Some("a"),
            "a mid-stream arrival must not yank the view"
        );
    }

    #[test]
    fn auto_follow_tracks_last_artifact_without_override() {
        let mut panel = panel();
        let start = Instant::now();

        panel.on_artifacts_update(start, vec![record("a", "first", true)]);
        panel.on_artifacts_update(
            start + Duration::from_millis(200),
            vec![record("a", "first", true), record("b", "second", false)],
        );

        assert_eq!(panel.state().active_artifact_id.as_deref(), Some("b"));
    }

    #[test]
    fn select_out_of_range_is_a_noop() {
        let mut panel = panel();
        panel.on_artifacts_update(Instant::now(), vec![record("a", "x", true)]);

        let before = panel.state().clone();
        assert!(!panel.on_select(5));
        assert_eq!(panel.state(), &before);
    }

    #[test]
    fn select_reopens_a_user_closed_panel_with_matching_phase() {
        let mut panel = panel();
        let now = Instant::now();

        panel.on_artifacts_update(now, vec![record("a", "x", true)]);
        panel.on_user_close();

        assert!(panel.on_select(0));
        assert_eq!(panel.state().phase, PanelPhase::Streaming);

        panel.on_message_finalized(now + Duration::from_millis(200));
        panel.on_user_close();
        assert!(panel.on_select(0));
        assert_eq!(panel.state().phase, PanelPhase::Settled);
    }

    #[test]
    fn fetch_failure_surfaces_only_for_the_active_artifact() {
        let mut panel = panel();
        panel.on_artifacts_update(Instant::now(), vec![record("a", "x", true)]);

        assert!(!panel.on_fetch_failed("other", "timeout"));
        assert_eq!(panel.state().display_error, None);

        assert!(panel.on_fetch_failed("a", "timeout"));
        assert_eq!(panel.state().display_error.as_deref(), Some("timeout"));
        assert_eq!(panel.state().phase, PanelPhase::Streaming);
    }

    #[test]
    fn stream_failure_settles_and_surfaces_error() {
        let mut panel = panel();
        let now = Instant::now();

        panel.on_artifacts_update(now, vec![record("a", "x", false)]);
        assert!(panel.on_stream_failed(now + Duration::from_millis(150), "connection reset"));

        assert_eq!(panel.state().phase, PanelPhase::Settled);
        assert_eq!(
            panel.state().display_error.as_deref(),
            Some("connection reset")
        );
    }

    #[test]
    fn switching_artifacts_clears_display_error() {
        let mut panel = panel();
        let now = Instant::now();

        panel.on_artifacts_update(now, vec![record("a", "x", true), record("b", "y", true)]);
        panel.on_fetch_failed("b", "timeout");
        assert!(panel.state().display_error.is_some());

        panel.on_select(0);
        assert_eq!(panel.state().display_error, None);
    }
}
