use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::code_block;
use crate::offsets::TextIndex;

/// Titles longer than this are truncated
const MAX_TITLE_CHARS: usize = 120;

static MARKDOWN_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+([^\n]+?)[ \t]*$").expect("header regex")
});

static COLON_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([A-Z][^\n]*):[ \t]*\n").expect("colon title regex"));

static STEP_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:step|phase)\s+\d+(?:\s*[:.)\-–])?[ \t]*[^\n.!?]{0,80}")
        .expect("step marker regex")
});

/// A title or step located in the scanned text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub text: String,
    /// Char offset of the match
    pub index: usize,
}

/// A code block span located in the scanned text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlockMarker {
    pub text: String,
    pub index: usize,
    pub end: usize,
    pub language: String,
}

impl CodeBlockMarker {
    /// Check if the block overlaps `[start, end)`
    #[must_use]
    pub const fn overlaps(&self, start: usize, end: usize) -> bool {
        self.index < end && self.end > start
    }
}

/// Structural landmarks of one document, used to enrich chunk metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInfo {
    pub titles: Vec<Marker>,
    pub steps: Vec<Marker>,
    pub code_blocks: Vec<CodeBlockMarker>,
}

impl ContextInfo {
    /// Nearest title starting at or before `pos`
    #[must_use]
    pub fn title_before(&self, pos: usize) -> Option<&Marker> {
        self.titles.iter().filter(|t| t.index <= pos).max_by_key(|t| t.index)
    }

    /// Steps whose index falls inside `[start, end)`
    pub fn steps_within(&self, start: usize, end: usize) -> impl Iterator<Item = &Marker> {
        self.steps
            .iter()
            .filter(move |s| s.index >= start && s.index < end)
    }

    /// Whether any code block overlaps `[start, end)`
    #[must_use]
    pub fn has_code_block_in(&self, start: usize, end: usize) -> bool {
        self.code_blocks.iter().any(|b| b.overlaps(start, end))
    }

    /// Overlapping code block whose edges both lie within `tolerance` chars of
    /// `[start, end)`; the closest one when several qualify.
    #[must_use]
    pub fn code_block_matching(
        &self,
        start: usize,
        end: usize,
        tolerance: usize,
    ) -> Option<&CodeBlockMarker> {
        self.code_blocks
            .iter()
            .filter(|b| b.overlaps(start, end))
            .filter(|b| b.index.abs_diff(start) <= tolerance && b.end.abs_diff(end) <= tolerance)
            .min_by_key(|b| b.index.abs_diff(start) + b.end.abs_diff(end))
    }
}

/// Scan sanitized text for titles, step markers and code blocks.
#[must_use]
pub fn extract_contextual_info(text: &str) -> ContextInfo {
    if text.trim().is_empty() {
        return ContextInfo::default();
    }

    let index = TextIndex::new(text);

    let mut titles: Vec<Marker> = MARKDOWN_HEADER
        .captures_iter(text)
        .chain(COLON_TITLE.captures_iter(text))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let title = caps.get(1)?.as_str().trim();
            (!title.is_empty()).then(|| Marker {
                text: truncate_chars(title, MAX_TITLE_CHARS),
                index: index.char_of(whole.start()),
            })
        })
        .collect();
    titles.sort_by_key(|t| t.index);
    titles.dedup_by_key(|t| t.index);

    let steps = STEP_MARKER
        .find_iter(text)
        .map(|m| Marker {
            text: m.as_str().trim().to_string(),
            index: index.char_of(m.start()),
        })
        .collect();

    let code_blocks = code_block::extract_with_index(&index)
        .into_iter()
        .map(|block| CodeBlockMarker {
            text: block.content,
            index: block.start,
            end: block.end,
            language: block.language,
        })
        .collect();

    ContextInfo {
        titles,
        steps,
        code_blocks,
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte, _)) => text[..byte].trim_end().to_string(),
        None => text.to_string(),
    }
}
