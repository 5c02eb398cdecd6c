pub mod answerer;
pub mod citation;
pub mod config;
pub mod llm;
pub mod models;
pub mod progress;
pub mod prompt;

pub use answerer::{CitationQaPipeline, CitationQaPipelineBuilder, QaError};
pub use citation::{CitationExtractor, CitationPipeline};
pub use config::{ConfigError, LlmConfig, PipelineConfig};
pub use llm::{AzureChatClient, AzureChatClientBuilder, LanguageModel, LlmError};
pub use models::{Answer, AnswerMetadata, Citation, RetrievedDocument};
pub use progress::{NoopReporter, ProgressReporter, TracingReporter};
pub use prompt::{PromptError, PromptTemplate};
