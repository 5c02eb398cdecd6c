use serde::{Deserialize, Serialize};

use super::Citation;

/// Metadata attached to a generated answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerMetadata {
    /// Citation for the answer, `None` when citations were not requested.
    pub citation: Option<Citation>,
}

/// The result of answering one question.
///
/// Built once per call and handed to the caller; it exposes read-only accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    text: String,
    metadata: AnswerMetadata,
}

impl Answer {
    /// Creates a new answer.
    pub fn new(text: String, citation: Option<Citation>) -> Self {
        Self {
            text,
            metadata: AnswerMetadata { citation },
        }
    }

    /// Returns the model's generated text, unmodified.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the answer metadata.
    pub fn metadata(&self) -> &AnswerMetadata {
        &self.metadata
    }

    /// Returns the citation, if one was requested.
    pub fn citation(&self) -> Option<&Citation> {
        self.metadata.citation.as_ref()
    }
}
