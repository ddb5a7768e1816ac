//! Fill-In-the-Middle prompt wire format.
//!
//! The inference backend is prompted with prefix/suffix context around the
//! cursor and asked to generate the missing middle span:
//!
//! ```text
//! <fim_prefix>{prefix}<fim_suffix>{suffix}<fim_middle>
//! ```
//!
//! `<fim_middle>` is always the final marker and serves as the unique splice
//! point when an accepted completion is folded back into the prompt.

use serde::Deserialize;
use serde::Serialize;

pub const FIM_PREFIX: &str = "<fim_prefix>";
pub const FIM_SUFFIX: &str = "<fim_suffix>";
pub const FIM_MIDDLE: &str = "<fim_middle>";

/// A framed FIM prompt, ready to send to the completions endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FimPrompt(String);

impl FimPrompt {
    /// Frame a prompt from the full editor text and a byte offset.
    ///
    /// Out-of-range or mid-character offsets are clamped to the nearest char
    /// boundary at or below `min(cursor_offset, full_text.len())`; framing
    /// never fails.
    pub fn frame(full_text: &str, cursor_offset: usize) -> Self {
        let offset = clamp_offset(full_text, cursor_offset);
        let prefix = &full_text[..offset];
        let suffix = &full_text[offset..];
        Self(format!("{FIM_PREFIX}{prefix}{FIM_SUFFIX}{suffix}{FIM_MIDDLE}"))
    }

    /// Wrap an already-framed prompt string (e.g. one recorded in a trace).
    pub fn from_raw(prompt: impl Into<String>) -> Self {
        Self(prompt.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the final FIM text by filling the middle span with the accepted
    /// completion: the first `<fim_middle>` becomes `<fim_middle>{accepted}`.
    pub fn splice(&self, accepted_text: &str) -> String {
        splice(&self.0, accepted_text)
    }
}

/// Splice `accepted_text` after the first `<fim_middle>` marker of `prompt`.
///
/// Exactly one replacement is made; all other content is left untouched.
pub fn splice(prompt: &str, accepted_text: &str) -> String {
    prompt.replacen(FIM_MIDDLE, &format!("{FIM_MIDDLE}{accepted_text}"), 1)
}

/// Editor context captured synchronously at trigger time.
///
/// Invariant: `cursor_offset` is a char boundary within `full_text`, enforced
/// by clamping in the constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    full_text: String,
    cursor_offset: usize,
}

impl CompletionRequest {
    pub fn new(full_text: String, cursor_offset: usize) -> Self {
        let cursor_offset = clamp_offset(&full_text, cursor_offset);
        Self {
            full_text,
            cursor_offset,
        }
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn cursor_offset(&self) -> usize {
        self.cursor_offset
    }

    pub fn frame(&self) -> FimPrompt {
        FimPrompt::frame(&self.full_text, self.cursor_offset)
    }
}

fn clamp_offset(full_text: &str, cursor_offset: usize) -> usize {
    let mut offset = cursor_offset.min(full_text.len());
    while offset > 0 && !full_text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
