//! Versioned artifact tag grammar.
//!
//! Exactly one production grammar is active at a time. The scanner takes the
//! grammar by reference, so tests can run alternate grammars without touching
//! global state, and there is no secondary "fallback format" path anywhere in
//! the scan loop.

use once_cell::sync::Lazy;
use thiserror::Error;

/// Attribute keys the extractor understands. Anything else is ignored.
pub const RECOGNIZED_ATTRIBUTES: [&str; 4] = ["id", "type", "title", "language"];

static PRODUCTION: Lazy<TagGrammar> = Lazy::new(|| {
    TagGrammar::for_tag("artifact").expect("production tag word is valid")
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("tag word must not be empty")]
    EmptyTagWord,

    #[error("tag word '{found}' must be ASCII alphanumeric")]
    InvalidTagWord { found: String },

    #[error("opening delimiter '{found}' must be '<' followed by a tag word")]
    OpenDelimiterShape { found: String },

    #[error("closing delimiter '{found}' must be '</' + tag word + '>'")]
    CloseDelimiterShape { found: String },

    #[error("closing delimiter word '{close}' does not match opening word '{open}'")]
    DelimiterWordMismatch { open: String, close: String },
}

/// One delimiter pair plus the attribute schema the scanner recognizes.
///
/// The tag word is plain ASCII alphanumeric and an opening occurrence only
/// counts when followed by whitespace or `>`, so a longer word sharing the
/// literal as a prefix (`<artifacts`) is never mistaken for this grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGrammar {
    open: String,
    close: String,
}

impl TagGrammar {
    /// Builds the grammar for one tag word, e.g. `artifact` ->
    /// `<artifact` / `</artifact>`.
    pub fn for_tag(word: &str) -> Result<Self, GrammarError> {
        validate_tag_word(word)?;
        Ok(Self {
            open: format!("<{word}"),
            close: format!("</{word}>"),
        })
    }

    /// Validates an explicit delimiter pair. Both literals must be built from
    /// the same tag word.
    pub fn new(open: &str, close: &str) -> Result<Self, GrammarError> {
        let open_word = open
            .strip_prefix('<')
            .ok_or_else(|| GrammarError::OpenDelimiterShape {
                found: open.to_string(),
            })?;
        validate_tag_word(open_word).map_err(|_| GrammarError::OpenDelimiterShape {
            found: open.to_string(),
        })?;

        let close_word = close
            .strip_prefix("</")
            .and_then(|rest| rest.strip_suffix('>'))
            .ok_or_else(|| GrammarError::CloseDelimiterShape {
                found: close.to_string(),
            })?;
        validate_tag_word(close_word).map_err(|_| GrammarError::CloseDelimiterShape {
            found: close.to_string(),
        })?;

        if open_word != close_word {
            return Err(GrammarError::DelimiterWordMismatch {
                open: open_word.to_string(),
                close: close_word.to_string(),
            });
        }

        Ok(Self {
            open: open.to_string(),
            close: close.to_string(),
        })
    }

    /// The active production grammar.
    #[must_use]
    pub fn production() -> &'static TagGrammar {
        &PRODUCTION
    }

    #[must_use]
    pub fn open_literal(&self) -> &str {
        &self.open
    }

    #[must_use]
    pub fn close_literal(&self) -> &str {
        &self.close
    }

    #[must_use]
    pub fn tag_word(&self) -> &str {
        &self.open[1..]
    }
}

fn validate_tag_word(word: &str) -> Result<(), GrammarError> {
    if word.is_empty() {
        return Err(GrammarError::EmptyTagWord);
    }

    if !word.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(GrammarError::InvalidTagWord {
            found: word.to_string(),
        });
    }

    Ok(())
}
