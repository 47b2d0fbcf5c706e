//! Per-delta streaming classification.
//!
//! Three yes/no answers, recomputed on every buffer delta, cheap enough to
//! run per token. The no-artifact common case allocates nothing beyond the
//! scan's empty match list.

use serde::{Deserialize, Serialize};

use crate::grammar::TagGrammar;
use crate::scanner::{scan, ScanOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// An opening boundary followed by a matching close exists.
    pub has_complete: bool,
    /// An open body or a pending tag tail exists; suppress plain-text
    /// rendering of that region and show the live artifact view instead.
    pub is_streaming: bool,
    /// The buffer ends mid-delimiter (`<art`) or mid-head (`<artifact ti`).
    pub ends_with_partial_tag: bool,
}

impl Classification {
    /// Derives the three predicates from an existing scan.
    #[must_use]
    pub fn from_outcome(outcome: &ScanOutcome) -> Self {
        let ends_with_partial_tag = outcome.tail.is_partial_open();
        Self {
            has_complete: outcome.has_complete(),
            is_streaming: outcome.has_open_body() || ends_with_partial_tag,
            ends_with_partial_tag,
        }
    }

    /// True when the buffer holds anything artifact-relevant at all.
    #[must_use]
    pub fn is_relevant(self) -> bool {
        self.has_complete || self.is_streaming
    }
}

/// One-shot classification of a snapshot.
pub fn classify(grammar: &TagGrammar, buffer: &str) -> Classification {
    Classification::from_outcome(&scan(grammar, buffer))
}
