//! Data types for chunks and search hits.

use serde::{Deserialize, Serialize};

/// A self-contained sentence, the unit of retrieval.
///
/// Only `text` is embedded. The optional fields travel with the chunk into the
/// metadata file and are omitted there when unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// The natural-language sentence.
    pub text: String,
    /// Short label for the record the sentence came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Name of the dataset the sentence came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Stable identifier, if the producer assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Chunk {
    /// Create a chunk carrying only text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), title: None, source: None, id: None }
    }

    /// Attach a title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attach a source dataset name.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach an identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Chunk::new(text)
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Chunk::new(text)
    }
}

/// A stored chunk's text paired with its cosine similarity to a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Cosine similarity in `[-1, 1]` (higher is more relevant).
    pub score: f32,
    /// The chunk text.
    pub text: String,
}
