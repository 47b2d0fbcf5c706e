//! Artifact records built from scanner output.
//!
//! Extraction is a pure function of `(snapshot, grammar)`: same input, same
//! records, same ids. Synthesized ids derive from the match ordinal and byte
//! offset only — never wall-clock time — so two extractions of an identical
//! buffer always agree and a later extraction supersedes an earlier one by id.

use serde::{Deserialize, Serialize};

use crate::grammar::TagGrammar;
use crate::scanner::{scan, ScanOutcome, TagMatch};

/// Closed set of renderable artifact kinds. An absent or unrecognized `type`
/// attribute degrades to `Html`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Html,
    Code,
    Svg,
    Markdown,
    Diagram,
}

impl ArtifactKind {
    /// Stable slug for serialization and snapshot tests.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Code => "code",
            Self::Svg => "svg",
            Self::Markdown => "markdown",
            Self::Diagram => "diagram",
        }
    }

    /// Parse from slug.
    #[must_use]
    pub fn from_slug(s: &str) -> Option<Self> {
        match s {
            "html" => Some(Self::Html),
            "code" => Some(Self::Code),
            "svg" => Some(Self::Svg),
            "markdown" => Some(Self::Markdown),
            "diagram" => Some(Self::Diagram),
            _ => None,
        }
    }

    /// Fixed display language for kinds whose bodies have one; `Code` defers
    /// to the content sniffer.
    #[must_use]
    pub fn default_language(self) -> Option<&'static str> {
        match self {
            Self::Html => Some("html"),
            Self::Svg => Some("xml"),
            Self::Markdown => Some("markdown"),
            Self::Diagram => Some("mermaid"),
            Self::Code => None,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// The extractor's output — the core-external contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: String,
    pub kind: ArtifactKind,
    pub title: String,
    pub language: Option<String>,
    pub content: String,
    pub complete: bool,
}

/// Ordinary text flanking the artifact region, for the chat renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitText {
    pub before: String,
    pub after: String,
}

/// Extracts every artifact in document order from one snapshot.
pub fn extract(grammar: &TagGrammar, buffer: &str) -> Vec<ArtifactRecord> {
    extract_from_outcome(grammar, &scan(grammar, buffer), buffer)
}

/// Extraction over an already-computed scan, for callers that share the scan
/// with classification.
pub fn extract_from_outcome(
    grammar: &TagGrammar,
    outcome: &ScanOutcome,
    buffer: &str,
) -> Vec<ArtifactRecord> {
    outcome
        .matches
        .iter()
        .enumerate()
        .map(|(index, tag_match)| build_record(grammar, buffer, index, tag_match))
        .collect()
}

/// The record auto-open follows when several artifacts share one message:
/// the last one in document order.
#[must_use]
pub fn last_relevant(records: &[ArtifactRecord]) -> Option<&ArtifactRecord> {
    records.last()
}

/// Splits the snapshot into the trimmed text before the first tag boundary
/// and after the last complete close. A dangling partial tail never leaks
/// into `before`; `after` stays empty while an artifact is still open.
pub fn split_around_artifacts(grammar: &TagGrammar, buffer: &str) -> SplitText {
    split_from_outcome(&scan(grammar, buffer), buffer)
}

/// Split over an already-computed scan.
pub fn split_from_outcome(outcome: &ScanOutcome, buffer: &str) -> SplitText {
    let before_end = outcome
        .matches
        .first()
        .map(|m| m.open_start)
        .or_else(|| outcome.tail.start())
        .unwrap_or(buffer.len());

    let after = match outcome.matches.last() {
        None => String::new(),
        Some(last) if !last.complete => String::new(),
        Some(last) => {
            let from = last.match_end.unwrap_or(buffer.len());
            let until = outcome.tail.start().unwrap_or(buffer.len());
            buffer[from..until].trim().to_string()
        }
    };

    SplitText {
        before: buffer[..before_end].trim().to_string(),
        after,
    }
}

fn build_record(
    grammar: &TagGrammar,
    buffer: &str,
    index: usize,
    tag_match: &TagMatch,
) -> ArtifactRecord {
    let ordinal = index + 1;

    let id = tag_match
        .attribute("id")
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| format!("artifact-{ordinal}-{}", tag_match.open_start));

    let kind = tag_match
        .attribute("type")
        .and_then(ArtifactKind::from_slug)
        .unwrap_or(ArtifactKind::Html);

    let title = tag_match
        .attribute("title")
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| format!("Artifact {ordinal}"));

    let content = body_content(grammar, buffer, tag_match);

    let language = tag_match
        .attribute("language")
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .or_else(|| kind.default_language().map(ToString::to_string))
        .or_else(|| sniff_code_language(&content).map(ToString::to_string));

    ArtifactRecord {
        id,
        kind,
        title,
        language,
        content,
        complete: tag_match.complete,
    }
}

fn body_content(grammar: &TagGrammar, buffer: &str, tag_match: &TagMatch) -> String {
    let body = match tag_match.body_end {
        Some(end) => &buffer[tag_match.body_start..end],
        None => {
            // Partial body: suppress a trailing fragment of the closing
            // literal the same way partial open tags are suppressed.
            let body = &buffer[tag_match.body_start..];
            let keep = body.len() - trailing_close_prefix_len(grammar.close_literal(), body);
            &body[..keep]
        }
    };

    body.trim().to_string()
}

/// Length of the longest strict prefix of `close` that `body` ends with.
fn trailing_close_prefix_len(close: &str, body: &str) -> usize {
    let longest = close.len().saturating_sub(1).min(body.len());
    for len in (1..=longest).rev() {
        if body.ends_with(&close[..len]) {
            return len;
        }
    }

    0
}

/// Best-effort language sniff for `Code` bodies without a `language`
/// attribute. May return `None`; never fatal.
fn sniff_code_language(content: &str) -> Option<&'static str> {
    let head = content.trim_start();

    if let Some(shebang) = head.lines().next().and_then(|line| line.strip_prefix("#!")) {
        return if shebang.contains("python") {
            Some("python")
        } else {
            Some("shell")
        };
    }

    if head.starts_with("fn ") || head.starts_with("use ") || content.contains("fn main(") {
        return Some("rust");
    }

    if head.starts_with("def ") || head.starts_with("import ") || head.starts_with("from ") {
        return Some("python");
    }

    if head.starts_with("function ") || head.starts_with("const ") || head.starts_with("let ") {
        return Some("javascript");
    }

    if head.starts_with("#include") {
        return Some("c");
    }

    None
}
