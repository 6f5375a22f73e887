use serde::{Deserialize, Serialize};

use crate::error::{ChunkerError, Result};

/// Default target chunk size in chars
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Default overlap between consecutive chunks in chars
pub const DEFAULT_CHUNK_OVERLAP: usize = 300;

/// Default upper bound on sanitized document size in chars
pub const DEFAULT_MAX_INPUT_CHARS: usize = 2_000_000;

/// Configuration for document chunking behavior.
///
/// Sizes are measured in Unicode scalar values (Rust `char`s), not model tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkOptions {
    /// Target chunk size in chars (soft limit, see the splitter for exceptions)
    #[serde(alias = "chunk_size")]
    pub chunk_size: usize,

    /// Number of trailing chars of a chunk repeated at the start of the next one
    #[serde(alias = "chunk_overlap")]
    pub chunk_overlap: usize,

    /// Keep fenced code blocks atomic
    #[serde(alias = "preserve_code_blocks")]
    pub preserve_code_blocks: bool,

    /// Prefer whole logical sections over uniform sizes
    #[serde(alias = "preserve_sections")]
    pub preserve_sections: bool,

    /// Whitespace normalization applied by the sanitizer
    pub whitespace: WhitespaceMode,

    /// Reject sanitized documents longer than this many chars
    #[serde(alias = "max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            preserve_code_blocks: true,
            preserve_sections: true,
            whitespace: WhitespaceMode::Collapse,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

impl ChunkOptions {
    /// Create options with a specific size and overlap, everything else default
    #[must_use]
    pub fn with_size(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Default::default()
        }
    }

    /// Create options tuned for embedding models (smaller, focused chunks)
    #[must_use]
    pub fn for_embeddings() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
            ..Default::default()
        }
    }

    /// Create options tuned for LLM context windows (larger chunks)
    #[must_use]
    pub fn for_llm_context() -> Self {
        Self {
            chunk_size: 4000,
            chunk_overlap: 400,
            whitespace: WhitespaceMode::PreserveLines,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::invalid_config("chunkSize must be > 0"));
        }

        if self.max_input_chars == 0 {
            return Err(ChunkerError::invalid_config("maxInputChars must be > 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            log::warn!(
                "chunkOverlap ({}) >= chunkSize ({}); chunks will advance one char at a time in the worst case",
                self.chunk_overlap,
                self.chunk_size
            );
        }

        Ok(())
    }

    /// Upper bound for a group of whole sections
    pub(crate) fn section_group_limit(&self) -> usize {
        self.chunk_size.saturating_mul(3) / 2
    }

    /// Smallest acceptable section group
    pub(crate) fn section_group_floor(&self) -> usize {
        self.chunk_size.saturating_mul(3) / 10
    }
}

/// How the sanitizer treats whitespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhitespaceMode {
    /// Collapse every whitespace run, newlines included, to a single space
    #[default]
    Collapse,

    /// Keep line structure: normalize line endings, strip trailing blanks,
    /// squeeze blank-line runs to a single blank line
    PreserveLines,
}
