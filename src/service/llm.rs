//! Shared LLM client
//!
//! One OpenAI client is created at startup and handed to every service that
//! prompts a model.

use rig::providers::openai;

/// Environment variable holding the OpenAI API key
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("{ENV_OPENAI_API_KEY} environment variable not set")]
    MissingApiKey,

    #[error("Failed to create OpenAI client: {0}")]
    Client(String),
}

/// Shared LLM client wrapper
#[derive(Clone)]
pub struct LlmClient {
    client: openai::Client,
    api_key: String,
}

impl LlmClient {
    /// Create a new LLM client with the provided API key
    pub fn new(api_key: &str) -> Result<Self, LlmError> {
        let client = openai::Client::new(api_key).map_err(|e| LlmError::Client(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }

    /// Create a client from `OPENAI_API_KEY`
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var(ENV_OPENAI_API_KEY)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        Self::new(&api_key)
    }

    /// Underlying OpenAI client, used to build agents
    pub fn openai_client(&self) -> &openai::Client {
        &self.client
    }

    /// Raw key for OpenAI-compatible endpoints called without rig (vision)
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}
