//! # Context Doc Chunker
//!
//! Context-preserving chunking of documentation text for vector stores and
//! retrieval-augmented generation.
//!
//! ## Philosophy
//!
//! Documentation is not uniform prose. The chunker keeps the structures a reader
//! relies on intact:
//! - Fenced code blocks are never cut in half
//! - Sections and numbered steps stay together when they fit
//! - Cuts prefer headers, paragraphs and sentences over arbitrary spaces
//! - Every chunk carries the title it belongs to and what kind of content it holds
//!
//! ## Architecture
//!
//! ```text
//! RawDocument { text, metadata }
//!     │
//!     ├──> Sanitizer (allow-listed chars, mojibake emoji → tags, whitespace)
//!     │
//!     ├──> Context extraction (titles, steps, code blocks)
//!     │
//!     ├──> Splitter
//!     │    ├─> Code blocks verbatim, text between them by paragraph/sentence
//!     │    ├─> Whole sections when they fit
//!     │    └─> Priority boundary walk with overlap
//!     │
//!     └──> Enrichment
//!          ├─> Content type and completeness
//!          └─> Emit Chunk[] with merged metadata
//! ```
//!
//! ## Example
//!
//! ```rust
//! use context_doc_chunker::{ChunkOptions, DocumentProcessor, RawDocument};
//!
//! let processor = DocumentProcessor::new(ChunkOptions::for_embeddings()).unwrap();
//!
//! let document = RawDocument::new("# Install\n\nStep 1: Run the installer.")
//!     .with_metadata("source", "install.md");
//!
//! let chunks = processor.process_document(&document).unwrap();
//! for chunk in &chunks {
//!     println!(
//!         "[{}/{}] {}: {}",
//!         chunk.metadata.chunk_index + 1,
//!         chunk.metadata.total_chunks,
//!         chunk.metadata.content_type,
//!         chunk.text
//!     );
//! }
//! ```

mod code_block;
mod config;
mod context;
mod error;
mod offsets;
mod processor;
mod sanitizer;
mod separators;
mod splitter;
mod types;

pub use code_block::{detect_code_language, extract_code_blocks, CodeBlock, UNKNOWN_LANGUAGE};
pub use config::{
    ChunkOptions, WhitespaceMode, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
    DEFAULT_MAX_INPUT_CHARS,
};
pub use context::{extract_contextual_info, CodeBlockMarker, ContextInfo, Marker};
pub use error::{ChunkerError, Result};
pub use processor::{
    detect_content_type, is_complete_section, locate_chunk, process_document, ChunkingStats,
    DocumentProcessor,
};
pub use sanitizer::{sanitize_bytes, sanitize_text, sanitize_text_with, sanitize_value};
pub use separators::Separator;
pub use splitter::{split_into_chunks, ChunkSpan, ChunkSplitter};
pub use types::{Chunk, ChunkMetadata, ContentType, RawDocument};
