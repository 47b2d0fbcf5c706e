//! Tag scanning over a growing buffer snapshot.
//!
//! `scan` classifies one snapshot in a single forward pass: complete delimiter
//! pairs, one still-open pair at most (everything after an unclosed head is
//! body), and a tail tri-state for text that may still become a tag. All
//! matchers are fixed-literal `find`/prefix checks; no regex on this path.
//!
//! `ScanCursor` is the streaming form: committed matches are immutable under
//! append, so each call re-examines only the tail plus any still-open match.

use crate::grammar::TagGrammar;

/// One occurrence of the delimiter pair found in a buffer scan.
///
/// Offsets are byte positions into the scanned snapshot. `body_end` and
/// `match_end` are present only when the closing delimiter has arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    pub open_start: usize,
    pub body_start: usize,
    pub body_end: Option<usize>,
    pub match_end: Option<usize>,
    pub attributes: Vec<(String, String)>,
    pub complete: bool,
}

impl TagMatch {
    /// Returns the first value recorded for `key`. Duplicate attributes keep
    /// their first occurrence.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Classification of the buffer's unscanned tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTail {
    /// Plain text; nothing pending.
    Clean,
    /// The tail is a non-empty prefix of the opening literal (`<`, `<a`, ...,
    /// `<artifact`). Renderers suppress it so raw angle brackets never flash.
    PartialOpenLiteral { start: usize },
    /// The opening literal arrived but its attribute head has no terminating
    /// `>` yet (`<artifact `, `<artifact title="De`).
    UnterminatedHead { start: usize },
}

impl BufferTail {
    /// True for either pending form.
    #[must_use]
    pub fn is_partial_open(self) -> bool {
        !matches!(self, Self::Clean)
    }

    /// Byte offset where the pending region begins, when there is one.
    #[must_use]
    pub fn start(self) -> Option<usize> {
        match self {
            Self::Clean => None,
            Self::PartialOpenLiteral { start } | Self::UnterminatedHead { start } => Some(start),
        }
    }
}

/// Result of scanning one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub matches: Vec<TagMatch>,
    pub tail: BufferTail,
}

impl ScanOutcome {
    /// True when at least one delimiter pair closed.
    #[must_use]
    pub fn has_complete(&self) -> bool {
        self.matches.iter().any(|m| m.complete)
    }

    /// True when an opening boundary has no matching close yet.
    #[must_use]
    pub fn has_open_body(&self) -> bool {
        self.matches.iter().any(|m| !m.complete)
    }
}

/// Stateless one-shot scan of a full snapshot.
pub fn scan(grammar: &TagGrammar, buffer: &str) -> ScanOutcome {
    scan_from(grammar, buffer, 0)
}

fn scan_from(grammar: &TagGrammar, buffer: &str, start: usize) -> ScanOutcome {
    let open = grammar.open_literal();
    let close = grammar.close_literal();
    let mut matches = Vec::new();
    let mut pos = start;

    loop {
        let Some(found) = buffer[pos..].find(open) else {
            return ScanOutcome {
                matches,
                tail: trailing_prefix_tail(open, buffer, pos),
            };
        };

        let open_start = pos + found;
        let literal_end = open_start + open.len();

        match buffer[literal_end..].chars().next() {
            // Snapshot ends exactly on the literal; the next delta decides.
            None => {
                return ScanOutcome {
                    matches,
                    tail: BufferTail::PartialOpenLiteral { start: open_start },
                };
            }
            Some(ch) if ch == '>' || ch.is_whitespace() => {}
            // Longer tag word (`<artifacts`): plain text, keep searching.
            Some(_) => {
                pos = literal_end;
                continue;
            }
        }

        let Some(head_end) = find_unquoted(buffer, literal_end, '>') else {
            return ScanOutcome {
                matches,
                tail: BufferTail::UnterminatedHead { start: open_start },
            };
        };

        let attributes = parse_attributes(&buffer[literal_end..head_end]);
        let body_start = head_end + 1;

        match buffer[body_start..].find(close) {
            Some(rel) => {
                let body_end = body_start + rel;
                let match_end = body_end + close.len();
                matches.push(TagMatch {
                    open_start,
                    body_start,
                    body_end: Some(body_end),
                    match_end: Some(match_end),
                    attributes,
                    complete: true,
                });
                pos = match_end;
            }
            None => {
                // Open body swallows the rest of the snapshot, including any
                // `<` that may yet grow into the closing literal.
                matches.push(TagMatch {
                    open_start,
                    body_start,
                    body_end: None,
                    match_end: None,
                    attributes,
                    complete: false,
                });
                return ScanOutcome {
                    matches,
                    tail: BufferTail::Clean,
                };
            }
        }
    }
}

/// Longest strict prefix of `open` the buffer ends with, if any.
fn trailing_prefix_tail(open: &str, buffer: &str, from: usize) -> BufferTail {
    let tail = &buffer[from..];
    let longest = open.len().saturating_sub(1).min(tail.len());
    for len in (1..=longest).rev() {
        if tail.ends_with(&open[..len]) {
            return BufferTail::PartialOpenLiteral {
                start: buffer.len() - len,
            };
        }
    }

    BufferTail::Clean
}

/// Finds `needle` at or after `from`, skipping quoted attribute values so a
/// `>` inside `title="a > b"` does not terminate the head early.
fn find_unquoted(buffer: &str, from: usize, needle: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, ch) in buffer[from..].char_indices() {
        match quote {
            Some(active) => {
                if ch == active {
                    quote = None;
                }
            }
            None => {
                if ch == needle {
                    return Some(from + idx);
                }
                if ch == '"' || ch == '\'' {
                    quote = Some(ch);
                }
            }
        }
    }

    None
}

/// Tolerant attribute parsing: any order, both quote styles, bare values,
/// valueless keys, unterminated quotes. Never fails; garbage becomes entries
/// the extractor ignores.
fn parse_attributes(head: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut rest = head;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let key_len = rest
            .find(|ch: char| ch == '=' || ch.is_whitespace())
            .unwrap_or(rest.len());
        let key = &rest[..key_len];
        rest = rest[key_len..].trim_start();

        let mut value = String::new();
        if let Some(stripped) = rest.strip_prefix('=') {
            rest = stripped.trim_start();
            match rest.chars().next() {
                Some(quote) if quote == '"' || quote == '\'' => {
                    let inner = &rest[1..];
                    match inner.find(quote) {
                        Some(end) => {
                            value = inner[..end].to_string();
                            rest = &inner[end + 1..];
                        }
                        None => {
                            // Unterminated quote inside a terminated head:
                            // take the remainder verbatim.
                            value = inner.to_string();
                            rest = "";
                        }
                    }
                }
                _ => {
                    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                    value = rest[..end].to_string();
                    rest = &rest[end..];
                }
            }
        }

        if !key.is_empty() {
            attributes.push((key.to_string(), value));
        }
    }

    attributes
}

/// Incremental scanner that never re-derives conclusions invalidated only by
/// new bytes: complete matches are committed and the next scan resumes after
/// the last committed close.
#[derive(Debug, Default, Clone)]
pub struct ScanCursor {
    committed: Vec<TagMatch>,
    resume_at: usize,
}

impl ScanCursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `buffer`, which must be a prefix-extension of every buffer this
    /// cursor has seen before. Returns the full outcome (committed + fresh).
    pub fn scan(&mut self, grammar: &TagGrammar, buffer: &str) -> ScanOutcome {
        let fresh = scan_from(grammar, buffer, self.resume_at);

        let mut matches = self.committed.clone();
        for tag_match in fresh.matches {
            if tag_match.complete {
                if let Some(end) = tag_match.match_end {
                    self.resume_at = end;
                }
                self.committed.push(tag_match.clone());
            }
            matches.push(tag_match);
        }

        ScanOutcome {
            matches,
            tail: fresh.tail,
        }
    }

    /// Offset below which everything is classified and immutable.
    #[must_use]
    pub fn committed_offset(&self) -> usize {
        self.resume_at
    }

    pub fn reset(&mut self) {
        self.committed.clear();
        self.resume_at = 0;
    }
}
