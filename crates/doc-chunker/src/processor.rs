use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::code_block::FENCE;
use crate::config::ChunkOptions;
use crate::context::{self, ContextInfo};
use crate::error::{ChunkerError, Result};
use crate::sanitizer;
use crate::splitter::ChunkSplitter;
use crate::types::{Chunk, ChunkMetadata, ContentType, RawDocument};

/// Max distance (chars) between a chunk edge and a code block edge for the
/// chunk to count as that block
const CODE_BLOCK_TOLERANCE: usize = 10;

const INSTALL_MARKERS: &[&str] = &[
    "npm install",
    "npm i ",
    "yarn add",
    "pnpm add",
    "pip install",
    "pip3 install",
    "cargo install",
    "cargo add",
    "go get",
    "gem install",
    "brew install",
    "apt install",
    "apt-get install",
    "composer require",
];

static IMPORT_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?m)(?:^|[\s;])",
        r"(?:import\s+[\w{*]|from\s+[\w.@/'-]+\s+import\b|use\s+\w+::|require\()",
    ))
    .expect("import regex")
});

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:def|function|class)\s+[A-Za-z_$][\w$]*").expect("declaration regex")
});

static BULLET_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*+•]|\d+[.)])\s").expect("bullet regex"));

/// Turns raw documents into enriched chunks.
///
/// The processor is immutable after construction and can be shared across
/// threads.
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    splitter: ChunkSplitter,
}

impl DocumentProcessor {
    /// Create a processor with validated options
    pub fn new(options: ChunkOptions) -> Result<Self> {
        Ok(Self {
            splitter: ChunkSplitter::new(options)?,
        })
    }

    /// Get options
    #[must_use]
    pub const fn options(&self) -> &ChunkOptions {
        self.splitter.options()
    }

    /// Sanitize, split and annotate a document.
    ///
    /// Blank text yields no chunks. The only failure is a sanitized document
    /// above `maxInputChars`.
    pub fn process_document(&self, document: &RawDocument) -> Result<Vec<Chunk>> {
        let options = self.options();
        let sanitized = sanitizer::sanitize_text_with(&document.text, options.whitespace);

        let char_len = sanitized.chars().count();
        if char_len > options.max_input_chars {
            return Err(ChunkerError::InputTooLarge {
                chars: char_len,
                limit: options.max_input_chars,
            });
        }

        let context = context::extract_contextual_info(&sanitized);
        let spans = self.splitter.split(&sanitized);
        let total_chunks = spans.len();

        let mut document_metadata = document.metadata.clone();
        for key in ChunkMetadata::COMPUTED_KEYS {
            document_metadata.remove(*key);
        }

        let chunks: Vec<Chunk> = spans
            .into_iter()
            .enumerate()
            .map(|(chunk_index, span)| {
                let text = sanitizer::sanitize_text_with(&span.text, options.whitespace);
                let (start, end) = if text == span.text {
                    (span.start, span.end)
                } else {
                    let start = locate_chunk(&sanitized, &text, span.start).unwrap_or(span.start);
                    (start, start + text.chars().count())
                };

                let metadata = build_metadata(
                    &context,
                    &text,
                    &document_metadata,
                    Position {
                        chunk_index,
                        total_chunks,
                        start,
                        end,
                    },
                );
                Chunk { text, metadata }
            })
            .collect();

        log::debug!(
            "Processed document of {char_len} chars into {} chunks ({} titles, {} steps, {} code blocks)",
            chunks.len(),
            context.titles.len(),
            context.steps.len(),
            context.code_blocks.len()
        );

        Ok(chunks)
    }

    /// Process a JSON payload (a string or a `{text, metadata}` object)
    pub fn process_value(&self, value: serde_json::Value) -> Result<Vec<Chunk>> {
        self.process_document(&RawDocument::from_value(value))
    }

    /// Get statistics about chunking
    #[must_use]
    pub fn stats(chunks: &[Chunk]) -> ChunkingStats {
        let sizes = || chunks.iter().map(Chunk::char_count);

        ChunkingStats {
            total_chunks: chunks.len(),
            total_chars: sizes().sum(),
            avg_chars_per_chunk: if chunks.is_empty() {
                0
            } else {
                sizes().sum::<usize>() / chunks.len()
            },
            min_chars: sizes().min().unwrap_or(0),
            max_chars: sizes().max().unwrap_or(0),
            code_block_chunks: chunks.iter().filter(|c| c.metadata.is_code_block).count(),
            complete_chunks: chunks.iter().filter(|c| c.metadata.is_complete).count(),
        }
    }
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self {
            splitter: ChunkSplitter::new(ChunkOptions::default())
                .expect("default chunk options are valid"),
        }
    }
}

/// Process a document with the given options.
pub fn process_document(document: &RawDocument, options: &ChunkOptions) -> Result<Vec<Chunk>> {
    DocumentProcessor::new(options.clone())?.process_document(document)
}

struct Position {
    chunk_index: usize,
    total_chunks: usize,
    start: usize,
    end: usize,
}

fn build_metadata(
    context: &ContextInfo,
    text: &str,
    document: &serde_json::Map<String, serde_json::Value>,
    position: Position,
) -> ChunkMetadata {
    let Position {
        chunk_index,
        total_chunks,
        start,
        end,
    } = position;

    let step_count = context.steps_within(start, end).count();
    let code_block = context.code_block_matching(start, end, CODE_BLOCK_TOLERANCE);
    let char_count = text.chars().count();

    ChunkMetadata {
        document: document.clone(),
        chunk_index,
        total_chunks,
        context_title: context.title_before(start).map(|t| t.text.clone()),
        has_steps: step_count > 0,
        step_count,
        has_code_blocks: context.has_code_block_in(start, end),
        content_type: detect_content_type(text),
        is_code_block: code_block.is_some(),
        code_language: code_block.map(|b| b.language.clone()),
        is_complete: is_complete_section(text),
        preserves_context: true,
        start_offset: start,
        end_offset: end,
        char_count,
        word_count: text.unicode_words().count(),
        estimated_tokens: ChunkMetadata::estimate_tokens(char_count),
    }
}

/// Char offset of the first occurrence of `chunk` in `haystack` at or after the
/// char offset `from`, falling back to a search from the start.
///
/// Ambiguous when the chunk text recurs verbatim; prefer offsets returned by
/// [`ChunkSplitter::split`].
#[must_use]
pub fn locate_chunk(haystack: &str, chunk: &str, from: usize) -> Option<usize> {
    if chunk.is_empty() {
        return None;
    }

    let from_byte = haystack
        .char_indices()
        .nth(from)
        .map_or(haystack.len(), |(byte, _)| byte);

    haystack[from_byte..]
        .find(chunk)
        .map(|byte| from_byte + byte)
        .or_else(|| haystack.find(chunk))
        .map(|byte| haystack[..byte].chars().count())
}

/// Classify a chunk; the first matching rule wins.
#[must_use]
pub fn detect_content_type(text: &str) -> ContentType {
    if text.contains(FENCE) {
        ContentType::CodeExample
    } else if text.contains("Step ") || text.contains("Phase ") {
        ContentType::Instructions
    } else if INSTALL_MARKERS.iter().any(|marker| text.contains(marker)) {
        ContentType::Installation
    } else if IMPORT_STATEMENT.is_match(text) {
        ContentType::CodeSetup
    } else if DECLARATION.is_match(text) {
        ContentType::CodeDefinition
    } else if text.contains("Example") || text.contains("example:") {
        ContentType::Example
    } else if text.contains("Error") || text.contains("error") {
        ContentType::Troubleshooting
    } else {
        ContentType::Documentation
    }
}

/// Whether a chunk ends on a clean boundary: terminal punctuation, balanced
/// fences and no dangling list item.
#[must_use]
pub fn is_complete_section(text: &str) -> bool {
    let trimmed = text.trim();
    if !trimmed.ends_with(['.', '!', '?']) {
        return false;
    }

    if trimmed.matches(FENCE).count() % 2 != 0 {
        return false;
    }

    if BULLET_START.is_match(trimmed) {
        let last_line = trimmed.lines().last().unwrap_or_default().trim();
        return BULLET_START.is_match(last_line) && last_line.ends_with(['.', '!', '?']);
    }

    true
}

/// Statistics about chunking results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_chars: usize,
    pub avg_chars_per_chunk: usize,
    pub min_chars: usize,
    pub max_chars: usize,
    pub code_block_chunks: usize,
    pub complete_chunks: usize,
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Chars: {} | Avg: {} | Range: {}-{} | Code blocks: {} | Complete: {}",
            self.total_chunks,
            self.total_chars,
            self.avg_chars_per_chunk,
            self.min_chars,
            self.max_chars,
            self.code_block_chunks,
            self.complete_chunks
        )
    }
}
