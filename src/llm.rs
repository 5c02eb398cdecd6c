/// Language model clients.
///
/// This module defines the `LanguageModel` trait the pipeline talks to, the
/// error type shared by every model call, and a synchronous Azure OpenAI chat
/// client.
mod azure;
mod client;

pub use azure::{AzureChatClient, AzureChatClientBuilder};
pub use client::{ChatMessage, Completion, LanguageModel, LlmError, Role};
