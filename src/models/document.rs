use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A passage returned by an upstream retriever.
///
/// Documents arrive already ranked by relevance; the pipeline only reads them
/// and keeps their order when building the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Raw passage content, possibly spanning several lines.
    pub text: String,
    /// Relevance score assigned by the retriever.
    #[serde(default)]
    pub score: f64,
    /// Retriever-specific metadata (source id, page, ...). Opaque to the pipeline.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RetrievedDocument {
    /// Creates a document with the given text, a zero score and no metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: 0.0,
            metadata: Map::new(),
        }
    }

    /// Sets the relevance score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
