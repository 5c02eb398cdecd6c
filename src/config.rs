//! Configuration for the answering pipeline and its model client.
//!
//! Configuration is an explicit value handed to the pipeline by the host. It
//! can be assembled in code, read from the process environment, or loaded
//! from a TOML file such as:
//!
//! ```toml
//! prompt_template = "Question: {question}\nContext: {context}\nAnswer: "
//!
//! [llm]
//! endpoint = "https://example.openai.azure.com/"
//! api_key = "..."
//! deployment = "gpt-35-turbo-16k"
//! temperature = 0.0
//! request_timeout_secs = 60
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Azure OpenAI resource endpoint.
pub const ENDPOINT_VAR: &str = "AZURE_OPENAI_ENDPOINT";
/// API key sent in the `api-key` header.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
/// Azure OpenAI REST API version.
pub const API_VERSION_VAR: &str = "OPENAI_API_VERSION";
/// Deployment (model) name.
pub const DEPLOYMENT_VAR: &str = "AZURE_OPENAI_DEPLOYMENT";
/// Sampling temperature.
pub const TEMPERATURE_VAR: &str = "CITEQA_TEMPERATURE";
/// Request timeout in seconds.
pub const REQUEST_TIMEOUT_VAR: &str = "CITEQA_REQUEST_TIMEOUT";

pub const DEFAULT_API_VERSION: &str = "2023-07-01-preview";
pub const DEFAULT_TEMPERATURE: f32 = 0.0;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default question-answering prompt.
pub const DEFAULT_QA_TEMPLATE: &str =
    "Answer the following question: \"{question}\". The context is: \n{context}\nAnswer: ";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Connection and generation parameters for the language model.
#[derive(Clone, PartialEq, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the Azure OpenAI resource.
    pub endpoint: String,
    /// API key; when unset the client falls back to `OPENAI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Deployment name identifying the model.
    pub deployment: String,
    /// Sampling temperature; 0 asks for greedy decoding.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on a single model call, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl LlmConfig {
    /// Creates a config for the given endpoint and deployment with default
    /// API version, temperature and timeout and no API key.
    pub fn new(endpoint: impl Into<String>, deployment: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            api_version: default_api_version(),
            deployment: deployment.into(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Reads the configuration from environment variables.
    ///
    /// `AZURE_OPENAI_ENDPOINT` and `AZURE_OPENAI_DEPLOYMENT` are required; the
    /// other variables fall back to their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = env_string(ENDPOINT_VAR).ok_or(ConfigError::MissingVar(ENDPOINT_VAR))?;
        let deployment =
            env_string(DEPLOYMENT_VAR).ok_or(ConfigError::MissingVar(DEPLOYMENT_VAR))?;

        Ok(Self {
            endpoint,
            api_key: env_string(API_KEY_VAR),
            api_version: env_string(API_VERSION_VAR).unwrap_or_else(default_api_version),
            deployment,
            temperature: env_parse(TEMPERATURE_VAR)?.unwrap_or(DEFAULT_TEMPERATURE),
            request_timeout_secs: env_parse(REQUEST_TIMEOUT_VAR)?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_version", &self.api_version)
            .field("deployment", &self.deployment)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Everything needed to build an answering pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    /// Template with `{question}` and `{context}` placeholders.
    #[serde(default = "default_qa_template")]
    pub prompt_template: String,
    pub llm: LlmConfig,
}

impl PipelineConfig {
    /// Creates a config using the default prompt template.
    pub fn new(llm: LlmConfig) -> Self {
        Self {
            prompt_template: default_qa_template(),
            llm,
        }
    }

    /// Builds the config from the environment with the default prompt template.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(LlmConfig::from_env()?))
    }

    /// Parses a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads and parses a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// Returns the variable's value, treating unset and empty the same.
pub(crate) fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses an optional environment variable.
pub(crate) fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env_string(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_qa_template() -> String {
    DEFAULT_QA_TEMPLATE.to_string()
}
