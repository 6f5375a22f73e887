use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input document as supplied by the producer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Free-form documentation text
    pub text: String,

    /// Caller metadata, copied into every chunk
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RawDocument {
    /// Create a document without metadata
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Map::new(),
        }
    }

    /// Builder: add a metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Interpret an arbitrary JSON value as a document.
    ///
    /// A bare string becomes the text. For an object, a non-string `text` becomes
    /// empty and a missing or non-object `metadata` becomes an empty map. Any
    /// other value yields an empty document.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Self::new(text),
            Value::Object(mut fields) => {
                let text = match fields.remove("text") {
                    Some(Value::String(text)) => text,
                    Some(_) | None => String::new(),
                };
                let metadata = match fields.remove("metadata") {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                Self { text, metadata }
            }
            other => {
                log::debug!("Treating {} payload as an empty document", json_kind(&other));
                Self::default()
            }
        }
    }
}

/// A chunk ready for the vector store indexer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Length in chars
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.metadata.char_count
    }
}

/// Document metadata merged with the fields computed for one chunk.
///
/// Serializes flat: document keys sit next to the computed camelCase fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Original document metadata, minus keys shadowed by computed fields
    #[serde(flatten)]
    pub document: Map<String, Value>,

    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Nearest title at or before the chunk start
    pub context_title: Option<String>,
    pub has_steps: bool,
    pub step_count: usize,
    /// Any code block overlaps the chunk
    pub has_code_blocks: bool,
    pub content_type: ContentType,
    /// The chunk is exactly one code block
    pub is_code_block: bool,
    pub code_language: Option<String>,
    pub is_complete: bool,
    pub preserves_context: bool,

    /// Char offset of the chunk in the sanitized text
    pub start_offset: usize,
    /// Char offset past the chunk end in the sanitized text
    pub end_offset: usize,
    pub char_count: usize,
    pub word_count: usize,
    /// Rough token estimate (4 chars per token)
    pub estimated_tokens: usize,
}

impl ChunkMetadata {
    /// Keys owned by the computed fields; document entries with these names are dropped
    pub const COMPUTED_KEYS: &'static [&'static str] = &[
        "chunkIndex",
        "totalChunks",
        "contextTitle",
        "hasSteps",
        "stepCount",
        "hasCodeBlocks",
        "contentType",
        "isCodeBlock",
        "codeLanguage",
        "isComplete",
        "preservesContext",
        "startOffset",
        "endOffset",
        "charCount",
        "wordCount",
        "estimatedTokens",
    ];

    /// Estimate tokens from content (rough heuristic: 4 chars per token)
    #[must_use]
    pub const fn estimate_tokens(char_count: usize) -> usize {
        let tokens = char_count / 4;
        if tokens == 0 {
            1
        } else {
            tokens
        }
    }
}

/// Content classification of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    CodeExample,
    Instructions,
    Installation,
    CodeSetup,
    CodeDefinition,
    Example,
    Troubleshooting,
    Documentation,
}

impl ContentType {
    /// Get the serialized name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodeExample => "code_example",
            Self::Instructions => "instructions",
            Self::Installation => "installation",
            Self::CodeSetup => "code_setup",
            Self::CodeDefinition => "code_definition",
            Self::Example => "example",
            Self::Troubleshooting => "troubleshooting",
            Self::Documentation => "documentation",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
