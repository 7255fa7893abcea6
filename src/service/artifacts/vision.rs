//! Stamp and QR presence via an OpenAI-compatible vision model

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{DetectorError, PageImage, StampQrDetector, StampQrReading};
use crate::model::VisionConfig;
use crate::service::fields::recover_json;

const STAMP_QR_SYSTEM_PROMPT: &str = r#"You inspect scanned pages of official documents. Report whether the pages carry an official stamp/seal and whether they carry a QR code.

Answer with a single JSON object and nothing else:
{"stampPresent": true|false, "stampConfidence": 0-100, "qrPresent": true|false, "qrConfidence": 0-100}

Confidence is your certainty in percent. Logos printed in the letterhead are not stamps."#;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Vision detector speaking the chat-completions protocol
pub struct VisionStampQrDetector {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl VisionStampQrDetector {
    pub fn new(config: &VisionConfig, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.to_string(),
        }
    }

    fn request_body(&self, pages: &[PageImage]) -> Value {
        let mut content = vec![json!({
            "type": "text",
            "text": format!("{} page image(s) follow.", pages.len()),
        })];
        content.extend(pages.iter().map(|page| {
            json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:{};base64,{}", page.content_type, BASE64.encode(&page.bytes)),
                },
            })
        }));

        json!({
            "model": self.model,
            "temperature": 0.0,
            "messages": [
                { "role": "system", "content": STAMP_QR_SYSTEM_PROMPT },
                { "role": "user", "content": content },
            ],
        })
    }
}

#[async_trait]
impl StampQrDetector for VisionStampQrDetector {
    async fn detect(&self, pages: &[PageImage]) -> Result<StampQrReading, DetectorError> {
        let url = format!("{}/chat/completions", self.base_url);
        let start_time = std::time::Instant::now();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(pages))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectorError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let reply = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        tracing::debug!(
            model = %self.model,
            pages = pages.len(),
            elapsed_ms = start_time.elapsed().as_millis(),
            "Vision model replied"
        );

        parse_reading(&reply)
    }
}

fn parse_reading(reply: &str) -> Result<StampQrReading, DetectorError> {
    let value = recover_json(reply)
        .ok_or_else(|| DetectorError::ParseError(format!("no JSON object in reply: {:.200}", reply)))?;
    serde_json::from_value(value).map_err(|e| DetectorError::ParseError(e.to_string()))
}
