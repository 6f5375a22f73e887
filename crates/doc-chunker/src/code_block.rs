use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::offsets::TextIndex;

/// Language reported when a fence carries no tag
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Fence marker delimiting code blocks
pub const FENCE: &str = "```";

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```.*?```").expect("fenced block regex"));

static FENCE_LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```([A-Za-z0-9_+#.\-]+)").expect("fence language regex"));

/// A fenced code region located in a text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// The matched region, fences included
    pub content: String,

    /// Char offset of the opening fence
    pub start: usize,

    /// Char offset just past the closing fence (exclusive)
    pub end: usize,

    /// Language tag from the opening fence, or `"unknown"`
    pub language: String,
}

impl CodeBlock {
    /// Length in chars
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Check if a char offset lies strictly inside the block
    #[must_use]
    pub const fn contains_strictly(&self, pos: usize) -> bool {
        pos > self.start && pos < self.end
    }
}

/// Locate fenced code blocks, left to right, never overlapping.
///
/// An opening fence without a matching close is left to normal text splitting.
#[must_use]
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    if !text.contains(FENCE) {
        return Vec::new();
    }
    let index = TextIndex::new(text);
    extract_with_index(&index)
}

pub(crate) fn extract_with_index(index: &TextIndex<'_>) -> Vec<CodeBlock> {
    FENCED_BLOCK
        .find_iter(index.text())
        .map(|m| CodeBlock {
            content: m.as_str().to_string(),
            start: index.char_of(m.start()),
            end: index.char_of(m.end()),
            language: detect_code_language(m.as_str()),
        })
        .collect()
}

/// Read the language tag directly after the opening fence on the first line.
#[must_use]
pub fn detect_code_language(block: &str) -> String {
    let first_line = block.lines().next().unwrap_or_default().trim_start();
    FENCE_LANGUAGE
        .captures(first_line)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| UNKNOWN_LANGUAGE.to_string(), |m| m.as_str().to_string())
}
