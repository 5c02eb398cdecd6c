/// Azure OpenAI chat completion client.
///
/// This module provides `AzureChatClient`, a synchronous client for the Azure
/// OpenAI chat completions endpoint, and a builder that resolves its settings
/// from explicit values, then environment variables, then defaults.
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::client::{ChatMessage, Completion, LanguageModel, LlmError};
use crate::config::{
    self, API_KEY_VAR, API_VERSION_VAR, DEFAULT_API_VERSION, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_TEMPERATURE, DEPLOYMENT_VAR, ENDPOINT_VAR, LlmConfig, REQUEST_TIMEOUT_VAR,
    TEMPERATURE_VAR,
};

const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Builder for constructing `AzureChatClient` instances.
///
/// # Examples
///
/// ```
/// use citeqa::llm::AzureChatClientBuilder;
///
/// let client = AzureChatClientBuilder::new()
///     .endpoint("https://example.openai.azure.com/")
///     .deployment("gpt-35-turbo-16k")
///     .api_key("not-a-real-key")
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.deployment(), "gpt-35-turbo-16k");
/// ```
#[derive(Debug, Default)]
pub struct AzureChatClientBuilder {
    endpoint: Option<String>,
    api_key: Option<String>,
    api_version: Option<String>,
    deployment: Option<String>,
    temperature: Option<f32>,
    request_timeout: Option<Duration>,
}

impl AzureChatClientBuilder {
    /// Creates a new builder with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder with every setting taken from `config`.
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            endpoint: Some(config.endpoint.clone()),
            api_key: config.api_key.clone(),
            api_version: Some(config.api_version.clone()),
            deployment: Some(config.deployment.clone()),
            temperature: Some(config.temperature),
            request_timeout: Some(Duration::from_secs(config.request_timeout_secs)),
        }
    }

    /// Sets the resource endpoint (e.g., "https://my-resource.openai.azure.com/").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the REST API version (e.g., "2023-07-01-preview").
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Sets the deployment name.
    pub fn deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = Some(deployment.into());
        self
    }

    /// Sets the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the maximum duration of one request.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds the `AzureChatClient`.
    ///
    /// # Environment Variables
    ///
    /// Unset values are read from `AZURE_OPENAI_ENDPOINT`, `OPENAI_API_KEY`,
    /// `OPENAI_API_VERSION`, `AZURE_OPENAI_DEPLOYMENT`, `CITEQA_TEMPERATURE`
    /// and `CITEQA_REQUEST_TIMEOUT`. Endpoint and deployment have no default.
    ///
    /// # Errors
    ///
    /// - `LlmError::Config` if endpoint or deployment is missing or a numeric
    ///   variable cannot be parsed
    /// - `LlmError::InvalidUrl` if the endpoint is not an http(s) URL
    /// - `LlmError::Network` if the HTTP client cannot be created
    pub fn build(self) -> Result<AzureChatClient, LlmError> {
        let endpoint = self
            .endpoint
            .or_else(|| config::env_string(ENDPOINT_VAR))
            .ok_or_else(|| LlmError::Config(format!("endpoint not set ({ENDPOINT_VAR})")))?;
        let deployment = self
            .deployment
            .or_else(|| config::env_string(DEPLOYMENT_VAR))
            .ok_or_else(|| LlmError::Config(format!("deployment not set ({DEPLOYMENT_VAR})")))?;
        let api_key = self
            .api_key
            .or_else(|| config::env_string(API_KEY_VAR))
            .unwrap_or_default();
        let api_version = self
            .api_version
            .or_else(|| config::env_string(API_VERSION_VAR))
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let temperature = match self.temperature {
            Some(t) => t,
            None => config::env_parse(TEMPERATURE_VAR)
                .map_err(|e| LlmError::Config(e.to_string()))?
                .unwrap_or(DEFAULT_TEMPERATURE),
        };
        let request_timeout = match self.request_timeout {
            Some(t) => t,
            None => Duration::from_secs(
                config::env_parse(REQUEST_TIMEOUT_VAR)
                    .map_err(|e| LlmError::Config(e.to_string()))?
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
        };

        let parsed = reqwest::Url::parse(&endpoint)
            .map_err(|e| LlmError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LlmError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                endpoint
            )));
        }

        let url = chat_url(&endpoint, &deployment, &api_version);

        let client = reqwest::blocking::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(LlmError::Network)?;

        info!(
            endpoint = %endpoint,
            deployment = %deployment,
            api_version = %api_version,
            temperature,
            timeout_secs = request_timeout.as_secs(),
            "AzureChatClient initialized"
        );

        Ok(AzureChatClient {
            client,
            url,
            endpoint,
            api_key,
            api_version,
            deployment,
            temperature,
        })
    }
}

/// Synchronous client for Azure OpenAI chat completions.
///
/// Each call is a single blocking request bounded by the configured timeout.
/// Failures are returned to the caller as-is; the client never retries.
pub struct AzureChatClient {
    client: reqwest::blocking::Client,
    url: String,
    endpoint: String,
    api_key: String,
    api_version: String,
    deployment: String,
    temperature: f32,
}

impl fmt::Debug for AzureChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureChatClient")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("api_key", &"<redacted>")
            .field("temperature", &self.temperature)
            .field("url", &self.url)
            .finish()
    }
}

impl AzureChatClient {
    /// Builds a client from an explicit configuration.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        AzureChatClientBuilder::from_config(config).build()
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the deployment name.
    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    /// Returns the REST API version.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Returns the sampling temperature.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Returns the full chat completions URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn chat_internal(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        let body = ChatRequest {
            messages,
            temperature: self.temperature,
        };
        debug!(deployment = %self.deployment, messages = messages.len(), "Sending chat request");

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(LlmError::from_send)?;

        let status = response.status();
        let text = response.text().map_err(LlmError::from_send)?;

        if !status.is_success() {
            return Err(LlmError::Http {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        parse_chat_response(&text)
    }
}

impl LanguageModel for AzureChatClient {
    fn chat(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        self.chat_internal(messages)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn chat_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint.trim_end_matches('/'),
        deployment,
        api_version
    )
}

/// Extracts the first choice's message content.
fn parse_chat_response(body: &str) -> Result<Completion, LlmError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(LlmError::Serialization)?;
    let choice = parsed.choices.into_iter().next().ok_or_else(|| LlmError::Api {
        message: "Response contained no choices".to_string(),
    })?;
    let content = choice.message.content.ok_or_else(|| LlmError::Api {
        message: "Missing 'content' in first choice".to_string(),
    })?;
    Ok(Completion::new(content))
}

/// Pulls `error.message` out of an Azure error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        unsafe {
            for var in [
                ENDPOINT_VAR,
                API_KEY_VAR,
                API_VERSION_VAR,
                DEPLOYMENT_VAR,
                TEMPERATURE_VAR,
                REQUEST_TIMEOUT_VAR,
            ] {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn chat_url_joins_endpoint_deployment_and_version() {
        assert_eq!(
            chat_url("https://res.openai.azure.com/", "gpt", "2023-07-01-preview"),
            "https://res.openai.azure.com/openai/deployments/gpt/chat/completions?api-version=2023-07-01-preview"
        );
        assert_eq!(
            chat_url("https://res.openai.azure.com", "gpt", "v"),
            "https://res.openai.azure.com/openai/deployments/gpt/chat/completions?api-version=v"
        );
    }

    #[test]
    fn request_body_has_messages_and_temperature() {
        let messages = [ChatMessage::system("sys"), ChatMessage::user("hi")];
        let body = serde_json::to_value(ChatRequest {
            messages: &messages,
            temperature: 0.0,
        })
        .unwrap();

        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[test]
    fn parses_first_choice_content() {
        let body = r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": "Paris"}}, {"index": 1, "message": {"role": "assistant", "content": "Lyon"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap().text, "Paris");
    }

    #[test]
    fn content_is_returned_unmodified() {
        let body = r#"{"choices": [{"message": {"content": "  Paris.\n\n"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap().text, "  Paris.\n\n");
    }

    #[test]
    fn empty_choices_is_api_error() {
        let err = parse_chat_response(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, LlmError::Api { .. }));
    }

    #[test]
    fn null_content_is_api_error() {
        let err = parse_chat_response(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap_err();
        assert!(matches!(err, LlmError::Api { .. }));
    }

    #[test]
    fn malformed_body_is_serialization_error() {
        let err = parse_chat_response("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, LlmError::Serialization(_)));
    }

    #[test]
    fn error_message_prefers_azure_error_field() {
        let body = r#"{"error": {"code": "429", "message": "Rate limit is exceeded."}}"#;
        assert_eq!(error_message(body), "Rate limit is exceeded.");
        assert_eq!(error_message("  upstream down \n"), "upstream down");
    }

    #[test]
    #[serial]
    fn build_requires_endpoint() {
        clear_env();
        let err = AzureChatClientBuilder::new().deployment("gpt").build().unwrap_err();
        assert!(matches!(err, LlmError::Config(_)));
    }

    #[test]
    #[serial]
    fn build_requires_deployment() {
        clear_env();
        let err = AzureChatClientBuilder::new()
            .endpoint("https://res.openai.azure.com/")
            .build()
            .unwrap_err();
        assert!(matches!(err, LlmError::Config(_)));
    }

    #[test]
    #[serial]
    fn build_rejects_invalid_url() {
        let result = AzureChatClientBuilder::new()
            .endpoint("not-a-valid-url")
            .deployment("gpt")
            .build();
        assert!(matches!(result, Err(LlmError::InvalidUrl(_))));

        let result = AzureChatClientBuilder::new()
            .endpoint("ftp://res.openai.azure.com/")
            .deployment("gpt")
            .build();
        assert!(matches!(result, Err(LlmError::InvalidUrl(_))));
    }

    #[test]
    #[serial]
    fn build_applies_defaults() {
        clear_env();
        let client = AzureChatClientBuilder::new()
            .endpoint("https://res.openai.azure.com/")
            .deployment("gpt")
            .build()
            .unwrap();
        assert_eq!(client.api_version(), DEFAULT_API_VERSION);
        assert_eq!(client.temperature(), 0.0);
    }

    #[test]
    #[serial]
    fn build_reads_environment_variables() {
        clear_env();
        unsafe {
            std::env::set_var(ENDPOINT_VAR, "https://env.openai.azure.com/");
            std::env::set_var(DEPLOYMENT_VAR, "env-deployment");
            std::env::set_var(API_VERSION_VAR, "2024-02-01");
        }

        let client = AzureChatClientBuilder::new().build().unwrap();
        assert_eq!(client.endpoint(), "https://env.openai.azure.com/");
        assert_eq!(client.deployment(), "env-deployment");
        assert_eq!(client.api_version(), "2024-02-01");

        clear_env();
    }

    #[test]
    #[serial]
    fn builder_values_take_precedence_over_environment() {
        clear_env();
        unsafe {
            std::env::set_var(ENDPOINT_VAR, "https://env.openai.azure.com/");
            std::env::set_var(DEPLOYMENT_VAR, "env-deployment");
        }

        let client = AzureChatClientBuilder::new()
            .endpoint("https://builder.openai.azure.com/")
            .deployment("builder-deployment")
            .build()
            .unwrap();
        assert_eq!(client.endpoint(), "https://builder.openai.azure.com/");
        assert_eq!(client.deployment(), "builder-deployment");

        clear_env();
    }

    #[test]
    #[serial]
    fn build_rejects_unparsable_temperature_from_environment() {
        clear_env();
        unsafe {
            std::env::set_var(TEMPERATURE_VAR, "warm");
        }

        let err = AzureChatClientBuilder::new()
            .endpoint("https://res.openai.azure.com/")
            .deployment("gpt")
            .build()
            .unwrap_err();
        assert!(matches!(err, LlmError::Config(_)));

        clear_env();
    }

    #[test]
    fn from_config_uses_every_field() {
        let cfg = LlmConfig {
            endpoint: "https://cfg.openai.azure.com/".to_string(),
            api_key: Some("key".to_string()),
            api_version: "2024-02-01".to_string(),
            deployment: "cfg-deployment".to_string(),
            temperature: 0.5,
            request_timeout_secs: 10,
        };
        let client = AzureChatClient::from_config(&cfg).unwrap();
        assert_eq!(
            client.url(),
            "https://cfg.openai.azure.com/openai/deployments/cfg-deployment/chat/completions?api-version=2024-02-01"
        );
        assert_eq!(client.temperature(), 0.5);
    }

    #[test]
    #[serial]
    fn toml_config_without_api_key_uses_environment_key() {
        clear_env();
        unsafe {
            std::env::set_var(API_KEY_VAR, "env-secret");
        }

        let cfg = crate::config::PipelineConfig::from_toml_str(
            r#"
            [llm]
            endpoint = "https://res.openai.azure.com/"
            deployment = "gpt"
            "#,
        )
        .unwrap();
        let client = AzureChatClient::from_config(&cfg.llm).unwrap();
        assert_eq!(client.api_key, "env-secret");

        clear_env();
    }

    #[test]
    #[serial]
    fn config_api_key_takes_precedence_over_environment() {
        clear_env();
        unsafe {
            std::env::set_var(API_KEY_VAR, "env-secret");
        }

        let cfg = LlmConfig::new("https://res.openai.azure.com/", "gpt").with_api_key("cfg-secret");
        let client = AzureChatClient::from_config(&cfg).unwrap();
        assert_eq!(client.api_key, "cfg-secret");

        clear_env();
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let cfg = LlmConfig::new("https://res.openai.azure.com/", "gpt").with_api_key("sk-secret");
        let client = AzureChatClient::from_config(&cfg).unwrap();
        let printed = format!("{client:?}");
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("https://res.openai.azure.com/openai/deployments/gpt"));
    }

    #[test]
    #[serial]
    fn client_is_usable_as_trait_object() {
        let client = AzureChatClient::from_config(&LlmConfig::new(
            "https://res.openai.azure.com/",
            "gpt",
        ))
        .unwrap();
        let _model: &dyn LanguageModel = &client;
    }
}
