//! Citation extraction for generated answers.
//!
//! A citation sub-pipeline looks at the same context and question the answer
//! was generated from and returns the passages that support it.

mod pipeline;

pub use pipeline::CitationPipeline;

use crate::llm::LlmError;
use crate::models::Citation;

/// Derives a citation from a context and a question.
///
/// Implementations make their own model calls and surface the model's errors
/// unchanged.
pub trait CitationExtractor: Send + Sync {
    fn cite(&self, context: &str, question: &str) -> Result<Citation, LlmError>;
}
