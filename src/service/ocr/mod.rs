//! Asynchronous OCR service contract and job orchestration

pub mod http;
pub mod orchestrator;

use async_trait::async_trait;

use crate::model::DocumentRef;
use crate::model::ocr::{Block, OcrFeature, PollResponse};
use crate::service::backoff::Throttled;

pub use http::HttpOcrClient;
pub use orchestrator::{ExtractionError, JobOrchestrator};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OcrError {
    #[error("Rate limited")]
    RateLimited,

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl Throttled for OcrError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, OcrError::RateLimited)
    }
}

/// Remote OCR engine. `poll` doubles as the result-page fetch: once a job has
/// succeeded, passing the previous page's continuation token returns the next page.
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Start an asynchronous analysis job over a stored document
    async fn submit(&self, document: &DocumentRef, features: &[OcrFeature]) -> Result<String, OcrError>;

    /// Job status and, once finished, one page of results
    async fn poll(&self, job_id: &str, next_token: Option<&str>) -> Result<PollResponse, OcrError>;

    /// Synchronous analysis of a single image
    async fn analyze_image(&self, image: &[u8], features: &[OcrFeature]) -> Result<Vec<Block>, OcrError>;
}

#[cfg(test)]
pub mod fake {
    //! Scripted OCR service for orchestrator and detector tests

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    pub enum Scripted {
        Page(PollResponse),
        RateLimited,
        Error(String),
    }

    #[derive(Default)]
    pub struct FakeOcr {
        pub submit_error: Mutex<Option<String>>,
        pub polls: Mutex<VecDeque<Scripted>>,
        pub analyze: Mutex<Option<Result<Vec<Block>, String>>>,
        /// (job id, continuation token) of every poll, in call order
        pub poll_log: Mutex<Vec<(String, Option<String>)>>,
        pub submitted: Mutex<Vec<(String, Vec<OcrFeature>)>>,
    }

    impl FakeOcr {
        pub fn with_polls(polls: Vec<Scripted>) -> Self {
            Self {
                polls: Mutex::new(polls.into()),
                ..Self::default()
            }
        }

        pub fn poll_count(&self) -> usize {
            self.poll_log.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OcrService for FakeOcr {
        async fn submit(&self, document: &DocumentRef, features: &[OcrFeature]) -> Result<String, OcrError> {
            if let Some(msg) = self.submit_error.lock().unwrap().clone() {
                return Err(OcrError::Rejected(msg));
            }
            self.submitted
                .lock()
                .unwrap()
                .push((document.key.clone(), features.to_vec()));
            Ok("job-1".to_string())
        }

        async fn poll(&self, job_id: &str, next_token: Option<&str>) -> Result<PollResponse, OcrError> {
            self.poll_log
                .lock()
                .unwrap()
                .push((job_id.to_string(), next_token.map(str::to_string)));
            match self.polls.lock().unwrap().pop_front() {
                Some(Scripted::Page(page)) => Ok(page),
                Some(Scripted::RateLimited) => Err(OcrError::RateLimited),
                Some(Scripted::Error(msg)) => Err(OcrError::ParseError(msg)),
                None => Err(OcrError::ParseError("script exhausted".to_string())),
            }
        }

        async fn analyze_image(&self, _image: &[u8], _features: &[OcrFeature]) -> Result<Vec<Block>, OcrError> {
            match self.analyze.lock().unwrap().clone() {
                Some(Ok(blocks)) => Ok(blocks),
                Some(Err(msg)) => Err(OcrError::Rejected(msg)),
                None => Ok(vec![]),
            }
        }
    }
}
