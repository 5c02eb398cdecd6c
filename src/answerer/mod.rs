//! Question answering over retrieved documents.
//!
//! This module provides `CitationQaPipeline`, which formats retrieved documents
//! into a context block, prompts a language model with it, and optionally asks
//! a citation sub-pipeline which parts of the context support the answer.

mod context;
mod qa_pipeline;

pub use context::{format_doc_text, format_retrieved_context};
pub use qa_pipeline::{CitationQaPipeline, CitationQaPipelineBuilder, QaError};
