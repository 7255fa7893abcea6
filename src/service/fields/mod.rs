//! Field extraction from recognized document text
//!
//! The language model answers in free text. The reply is kept verbatim for
//! the report and parsed with [`recover_json`]; a reply that cannot be parsed
//! yields empty fields and sets the parse-error flag instead of failing the run.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;

use crate::model::{ExtractedFields, ExtractionConfig, TextContent};
use crate::service::llm::LlmClient;

pub mod json_recovery;
pub mod normalize;
pub mod prompts;

pub use json_recovery::recover_json;
pub use normalize::{names_match, normalize_fields};

use prompts::{build_extraction_prompt, field_extraction_preamble};

/// Environment variable overriding the configured extraction model
const ENV_FIELD_EXTRACTION_MODEL: &str = "FIELD_EXTRACTION_MODEL";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FieldExtractionError {
    #[error("Language model call failed: {0}")]
    ModelCallFailed(String),
}

/// Language model that turns document text into a (hopefully JSON) reply
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn complete(&self, text: &str) -> Result<String, FieldExtractionError>;
}

/// Outcome of one field extraction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldExtraction {
    pub fields: ExtractedFields,
    pub parse_error: bool,
    pub raw_output: String,
}

/// OpenAI-backed extractor (rig agent, temperature 0)
pub struct LlmFieldExtractor {
    llm_client: LlmClient,
    model: String,
    preamble: String,
}

impl LlmFieldExtractor {
    /// `FIELD_EXTRACTION_MODEL` wins over the configured model
    pub fn new(llm_client: LlmClient, config: &ExtractionConfig) -> Self {
        let model = std::env::var(ENV_FIELD_EXTRACTION_MODEL)
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                if config.model.is_empty() {
                    openai::GPT_4O.to_string()
                } else {
                    config.model.clone()
                }
            });
        tracing::info!(model = %model, "Field extraction service initialized");

        Self {
            llm_client,
            model,
            preamble: field_extraction_preamble(),
        }
    }
}

#[async_trait]
impl FieldExtractor for LlmFieldExtractor {
    async fn complete(&self, text: &str) -> Result<String, FieldExtractionError> {
        let prompt = build_extraction_prompt(text);
        let prompt_length = prompt.len();

        tracing::debug!(
            model = %self.model,
            prompt_length = prompt_length,
            "Initiating OpenAI API call for field extraction"
        );

        let start_time = std::time::Instant::now();

        let agent = self
            .llm_client
            .openai_client()
            .agent(&self.model)
            .preamble(&self.preamble)
            .temperature(0.0)
            .build();

        match agent.prompt(prompt.as_str()).await {
            Ok(reply) => {
                tracing::info!(
                    model = %self.model,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    prompt_length = prompt_length,
                    reply_length = reply.len(),
                    "OpenAI API call completed successfully"
                );
                Ok(reply)
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    error = %e,
                    "OpenAI API call failed"
                );
                Err(FieldExtractionError::ModelCallFailed(e.to_string()))
            }
        }
    }
}

/// Prompt the model with (truncated) document text and parse its reply
pub async fn extract_fields(
    extractor: &dyn FieldExtractor,
    text: &TextContent,
    max_text_chars: usize,
) -> Result<FieldExtraction, FieldExtractionError> {
    let joined = text.joined();
    let truncated = truncate_chars(&joined, max_text_chars);
    if truncated.len() < joined.len() {
        tracing::debug!(
            original_chars = joined.chars().count(),
            max_text_chars = max_text_chars,
            "Truncated document text before field extraction"
        );
    }

    let raw_output = extractor.complete(truncated).await?;
    let (fields, parse_error) = parse_model_output(&raw_output);

    Ok(FieldExtraction {
        fields,
        parse_error,
        raw_output,
    })
}

/// Relaxed parse of a model reply; `(empty fields, true)` when no object is found
pub fn parse_model_output(raw: &str) -> (ExtractedFields, bool) {
    let Some(value) = recover_json(raw) else {
        tracing::warn!(reply_length = raw.len(), "No JSON object in model output");
        return (ExtractedFields::default(), true);
    };

    match serde_json::from_value::<ExtractedFields>(value) {
        Ok(fields) => (fields, false),
        Err(e) => {
            tracing::warn!(error = %e, "Model output does not match the field schema");
            (ExtractedFields::default(), true)
        }
    }
}

/// Character-boundary-safe prefix of at most `max_chars` characters
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
pub mod fake {
    //! Canned model replies

    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct FakeExtractor {
        pub reply: Mutex<Option<Result<String, String>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl FakeExtractor {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Mutex::new(Some(Ok(reply.to_string()))),
                ..Self::default()
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Mutex::new(Some(Err(message.to_string()))),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl FieldExtractor for FakeExtractor {
        async fn complete(&self, text: &str) -> Result<String, FieldExtractionError> {
            self.prompts.lock().unwrap().push(text.to_string());
            match self.reply.lock().unwrap().clone() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(msg)) => Err(FieldExtractionError::ModelCallFailed(msg)),
                None => Ok(String::new()),
            }
        }
    }
}
