//! HTTP client for a Textract-compatible OCR gateway

use std::env;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{OcrError, OcrService};
use crate::model::DocumentRef;
use crate::model::ocr::{AnalyzeResponse, Block, OcrFeature, PollResponse, SubmitResponse};

const ENV_OCR_API_KEY: &str = "OCR_API_KEY";

/// Page size requested per result fetch
const MAX_RESULTS: u32 = 1000;

/// Error codes that mean "slow down" rather than "this request is wrong"
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "ProvisionedThroughputExceededException",
    "LimitExceededException",
];

/// Error body shape used by the gateway (`__type` or `Code`)
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", alias = "Code", alias = "code")]
    code: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Client for the OCR gateway
pub struct HttpOcrClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpOcrClient {
    /// Create a new OCR client
    ///
    /// A bearer token is sent when `OCR_API_KEY` is set.
    pub fn new(base_url: &Url) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            api_key: env::var(ENV_OCR_API_KEY).ok().filter(|k| !k.is_empty()),
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, OcrError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| OcrError::ParseError(format!("Failed to deserialize OCR response: {}", e)))
    }
}

#[async_trait]
impl OcrService for HttpOcrClient {
    async fn submit(&self, document: &DocumentRef, features: &[OcrFeature]) -> Result<String, OcrError> {
        let url = format!("{}/jobs", self.base_url);

        tracing::debug!(key = %document.key, features = ?features, "Submitting OCR job");

        let body = json!({
            "DocumentLocation": { "Key": document.key },
            "FeatureTypes": features,
        });
        let response = self.authorized(self.client.post(&url).json(&body)).send().await?;
        let submitted: SubmitResponse = Self::read_json(response).await?;

        Ok(submitted.job_id)
    }

    async fn poll(&self, job_id: &str, next_token: Option<&str>) -> Result<PollResponse, OcrError> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);

        let mut query = vec![("MaxResults", MAX_RESULTS.to_string())];
        if let Some(token) = next_token {
            query.push(("NextToken", token.to_string()));
        }

        let response = self
            .authorized(self.client.get(&url).query(&query))
            .send()
            .await?;
        let page: PollResponse = Self::read_json(response).await?;

        tracing::debug!(
            job_id = %job_id,
            status = ?page.job_status,
            blocks = page.blocks.len(),
            has_next = page.next_token.is_some(),
            "Polled OCR job"
        );

        Ok(page)
    }

    async fn analyze_image(&self, image: &[u8], features: &[OcrFeature]) -> Result<Vec<Block>, OcrError> {
        let url = format!("{}/analyze", self.base_url);

        let body = json!({
            "Document": { "Bytes": BASE64.encode(image) },
            "FeatureTypes": features,
        });
        let response = self.authorized(self.client.post(&url).json(&body)).send().await?;
        let analyzed: AnalyzeResponse = Self::read_json(response).await?;

        Ok(analyzed.blocks)
    }
}

/// Map a non-success response to an [`OcrError`]
fn classify_error(status: StatusCode, body: &str) -> OcrError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return OcrError::RateLimited;
    }

    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.code.as_deref().unwrap_or_default();
    // "com.amazonaws.textract#ThrottlingException" style prefixes
    let short_code = code.rsplit('#').next().unwrap_or(code);

    if THROTTLING_CODES.contains(&short_code) {
        return OcrError::RateLimited;
    }

    if status.is_client_error() {
        let message = parsed.message.unwrap_or_else(|| body.to_string());
        return OcrError::Rejected(format!("{} ({})", message, short_code));
    }

    OcrError::UnexpectedStatus {
        status: status.as_u16(),
        body: body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_429_is_rate_limited() {
        let err = classify_error(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(err, OcrError::RateLimited));
    }

    #[test]
    fn test_throttling_code_is_rate_limited() {
        let body = r#"{"__type": "com.amazonaws.textract#ThrottlingException", "message": "slow down"}"#;
        let err = classify_error(StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, OcrError::RateLimited));

        let body = r#"{"Code": "ProvisionedThroughputExceededException"}"#;
        let err = classify_error(StatusCode::SERVICE_UNAVAILABLE, body);
        assert!(matches!(err, OcrError::RateLimited));
    }

    #[test]
    fn test_invalid_document_is_rejected() {
        let body = r#"{"__type": "UnsupportedDocumentException", "Message": "bad format"}"#;
        match classify_error(StatusCode::BAD_REQUEST, body) {
            OcrError::Rejected(msg) => {
                assert!(msg.contains("bad format"));
                assert!(msg.contains("UnsupportedDocumentException"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_server_error_is_unexpected_status() {
        let err = classify_error(StatusCode::INTERNAL_SERVER_ERROR, "oops");
        assert!(matches!(err, OcrError::UnexpectedStatus { status: 500, .. }));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpOcrClient::new(&Url::parse("http://ocr.local:9090/api/").unwrap());
        assert_eq!(client.base_url, "http://ocr.local:9090/api");
    }
}
