//! Streaming artifact extraction core.
//!
//! Watches a model response grow token by token and pulls self-contained
//! renderable blocks ("artifacts") out of the in-flight text:
//!
//! - [`scanner`] finds delimiter pairs, partial trailing tags, and attributes
//!   in a cumulative buffer snapshot, with an incremental cursor form.
//! - [`classify`] answers the three per-delta questions: complete artifact
//!   present, artifact still open, buffer ending mid-tag.
//! - [`extract`] builds [`extract::ArtifactRecord`]s and splits the ordinary
//!   text flanking the artifact region.
//! - [`panel`] decides, update by update, whether to open, refresh, freeze,
//!   or ignore the preview surface, with single-slot refresh throttling.
//! - [`session`] binds everything to one assistant message at a time and
//!   routes transport/UI events.
//!
//! Contract notes:
//! - Extraction is a pure function of `(snapshot, grammar)`; synthesized ids
//!   never involve wall-clock time.
//! - Nothing on the streaming path panics or returns an error; malformed
//!   input degrades to defaults, truncation degrades to `complete = false`.
//! - Exactly one tag grammar is active ([`grammar::TagGrammar::production`]);
//!   there is no fallback-format path in the scanner.
//! - All timing is caller-injected `Instant`s; the core owns no threads and
//!   no timers.

pub mod classify;
pub mod config;
pub mod extract;
pub mod grammar;
pub mod panel;
pub mod scanner;
pub mod session;

pub use classify::{classify, Classification};
pub use config::EnvConfig;
pub use extract::{
    extract, last_relevant, split_around_artifacts, ArtifactKind, ArtifactRecord, SplitText,
};
pub use grammar::{GrammarError, TagGrammar};
pub use panel::{Panel, PanelPhase, PanelState, DEFAULT_REFRESH_INTERVAL_MS};
pub use scanner::{scan, BufferTail, ScanCursor, ScanOutcome, TagMatch};
pub use session::{MessageSession, StreamController};
