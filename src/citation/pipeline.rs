//! LLM-backed citation extraction.

use std::sync::Arc;

use tracing::debug;

use super::CitationExtractor;
use crate::llm::{ChatMessage, LanguageModel, LlmError};
use crate::models::Citation;

const SYSTEM_PROMPT: &str =
    "You are a world class algorithm to answer questions with correct and exact citations.";

const CONTEXT_INTRO: &str = "Answer question using the following context";

const TIPS: &str = "Tips: Make sure to cite your sources, and use the exact words from the context.";

const OUTPUT_FORMAT: &str = r#"Return ONLY a JSON object listing at most 5 evidences that support the answer. Each evidence must be a direct quote from the context, a substring of the original content, of at most 15 words:
{"evidences": ["quote one", "quote two"]}

JSON OUTPUT:"#;

/// Asks a language model which parts of the context support the answer.
///
/// The pipeline holds a shared handle to the model, so it can be created
/// cheaply from an existing client for each question.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use citeqa::citation::{CitationExtractor, CitationPipeline};
/// use citeqa::llm::AzureChatClientBuilder;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AzureChatClientBuilder::new().build()?;
/// let pipeline = CitationPipeline::new(Arc::new(client));
/// let citation = pipeline.cite("Paris is the capital of France.", "What is the capital of France?")?;
/// println!("{:?}", citation.evidences);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CitationPipeline {
    llm: Arc<dyn LanguageModel>,
}

impl CitationPipeline {
    /// Creates a pipeline that shares the given model client.
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Builds the chat conversation sent to the model.
    pub fn messages(context: &str, question: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(CONTEXT_INTRO),
            ChatMessage::user(context),
            ChatMessage::user(format!("Question: {question}")),
            ChatMessage::user(TIPS),
            ChatMessage::user(OUTPUT_FORMAT),
        ]
    }
}

impl CitationExtractor for CitationPipeline {
    fn cite(&self, context: &str, question: &str) -> Result<Citation, LlmError> {
        let messages = Self::messages(context, question);
        let completion = self.llm.chat(&messages)?;
        let citation = parse_citation(&completion.text)?;
        debug!(evidences = citation.evidences.len(), "Citation extracted");
        Ok(citation)
    }
}

/// Extracts the outermost JSON object from a model response.
fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;

    if start <= end {
        Some(&trimmed[start..=end])
    } else {
        None
    }
}

fn parse_citation(response: &str) -> Result<Citation, LlmError> {
    let json = extract_json(response).ok_or_else(|| LlmError::Api {
        message: "Failed to extract JSON from citation response".to_string(),
    })?;
    serde_json::from_str(json).map_err(LlmError::Serialization)
}
