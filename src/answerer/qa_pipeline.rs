//! Answering pipeline implementation.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::context::format_retrieved_context;
use crate::citation::{CitationExtractor, CitationPipeline};
use crate::config::{DEFAULT_QA_TEMPLATE, PipelineConfig};
use crate::llm::{AzureChatClient, LanguageModel, LlmError};
use crate::models::{Answer, Citation, RetrievedDocument};
use crate::progress::{ProgressReporter, TracingReporter};
use crate::prompt::{PromptError, PromptTemplate};

/// Fields the answering prompt can reference.
const TEMPLATE_FIELDS: [&str; 2] = ["question", "context"];

/// Errors returned by `CitationQaPipeline`.
#[derive(Debug, Error)]
pub enum QaError {
    /// Failure reported by the language model or the citation sub-pipeline,
    /// passed through unchanged.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The prompt template is malformed or references an unknown field.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// The builder was not given a language model.
    #[error("Language model client must be set via llm()")]
    MissingClient,
}

/// Builder for constructing `CitationQaPipeline` instances.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use citeqa::answerer::CitationQaPipelineBuilder;
/// use citeqa::llm::AzureChatClientBuilder;
/// use citeqa::models::RetrievedDocument;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = AzureChatClientBuilder::new()
///     .endpoint("https://my-resource.openai.azure.com/")
///     .deployment("gpt-35-turbo-16k")
///     .build()?;
///
/// let pipeline = CitationQaPipelineBuilder::new()
///     .llm(Arc::new(client))
///     .build()?;
///
/// let docs = vec![RetrievedDocument::new("Paris is the capital of France.")];
/// let answer = pipeline.answer("What is the capital of France?", &docs, true)?;
/// println!("{}", answer.text());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct CitationQaPipelineBuilder {
    llm: Option<Arc<dyn LanguageModel>>,
    prompt_template: Option<PromptTemplate>,
    reporter: Option<Arc<dyn ProgressReporter>>,
    citation: Option<Arc<dyn CitationExtractor>>,
}

impl CitationQaPipelineBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the language model used for answers and, by default, citations.
    pub fn llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Replaces the default answering prompt.
    pub fn prompt_template(mut self, template: PromptTemplate) -> Self {
        self.prompt_template = Some(template);
        self
    }

    /// Sets the receiver of `.context` and `.prompt` progress events.
    pub fn reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Uses the given citation extractor instead of an LLM-backed
    /// `CitationPipeline` sharing the pipeline's model.
    pub fn citation_extractor(mut self, extractor: Arc<dyn CitationExtractor>) -> Self {
        self.citation = Some(extractor);
        self
    }

    /// Builds the `CitationQaPipeline`.
    ///
    /// # Errors
    ///
    /// - `QaError::MissingClient` if `llm()` was not called
    /// - `QaError::Prompt` if the template uses a field other than
    ///   `question` or `context`
    pub fn build(self) -> Result<CitationQaPipeline, QaError> {
        let llm = self.llm.ok_or(QaError::MissingClient)?;
        let prompt_template = match self.prompt_template {
            Some(template) => template,
            None => PromptTemplate::new(DEFAULT_QA_TEMPLATE)?,
        };

        if let Some(unknown) = prompt_template
            .placeholders()
            .into_iter()
            .find(|name| !TEMPLATE_FIELDS.contains(name))
        {
            return Err(PromptError::UnknownField(unknown.to_string()).into());
        }

        Ok(CitationQaPipeline {
            llm,
            prompt_template,
            reporter: self.reporter.unwrap_or_else(|| Arc::new(TracingReporter)),
            citation: self.citation,
        })
    }
}

/// Answers questions from a set of retrieved documents, with optional citation.
///
/// The pipeline keeps only fixed configuration; every call builds its own
/// context and prompt, so one instance can serve concurrent callers as long as
/// the model client allows it.
pub struct CitationQaPipeline {
    llm: Arc<dyn LanguageModel>,
    prompt_template: PromptTemplate,
    reporter: Arc<dyn ProgressReporter>,
    citation: Option<Arc<dyn CitationExtractor>>,
}

impl CitationQaPipeline {
    /// Creates a pipeline with the default prompt and reporter.
    pub fn new(llm: Arc<dyn LanguageModel>) -> Result<Self, QaError> {
        CitationQaPipelineBuilder::new().llm(llm).build()
    }

    /// Returns a builder.
    pub fn builder() -> CitationQaPipelineBuilder {
        CitationQaPipelineBuilder::new()
    }

    /// Builds a pipeline backed by an Azure OpenAI client.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, QaError> {
        let client = AzureChatClient::from_config(&config.llm)?;
        let template = PromptTemplate::new(config.prompt_template.as_str())?;

        CitationQaPipelineBuilder::new()
            .llm(Arc::new(client))
            .prompt_template(template)
            .build()
    }

    /// Returns the answering prompt template.
    pub fn prompt_template(&self) -> &PromptTemplate {
        &self.prompt_template
    }

    /// Substitutes the question and context into the prompt template.
    pub fn build_prompt(&self, question: &str, context: &str) -> Result<String, PromptError> {
        self.prompt_template
            .populate(&[("context", context), ("question", question)])
    }

    /// Answers `question` using `documents` as context.
    ///
    /// Documents are used in the order given. When `use_citation` is set, the
    /// citation sub-pipeline runs once with the same context and question
    /// after the answer has been generated.
    ///
    /// # Errors
    ///
    /// Any model or citation failure is returned as `QaError::Llm` holding the
    /// original error; nothing is retried and no partial answer is produced.
    pub fn answer(
        &self,
        question: &str,
        documents: &[RetrievedDocument],
        use_citation: bool,
    ) -> Result<Answer, QaError> {
        debug!(documents = documents.len(), use_citation, "Answering question");

        let context = format_retrieved_context(documents);
        self.reporter.emit(".context", &[("context", context.as_str())]);

        let prompt = self.build_prompt(question, &context)?;
        self.reporter.emit(".prompt", &[("prompt", prompt.as_str())]);

        let answer_text = self.llm.invoke(&prompt)?.text;

        let citation = if use_citation {
            Some(self.cite(&context, question)?)
        } else {
            None
        };

        Ok(Answer::new(answer_text, citation))
    }

    fn cite(&self, context: &str, question: &str) -> Result<Citation, LlmError> {
        match &self.citation {
            Some(extractor) => extractor.cite(context, question),
            None => CitationPipeline::new(Arc::clone(&self.llm)).cite(context, question),
        }
    }
}
