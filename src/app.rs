//! Application state and service initialization
//!
//! This module centralizes service construction from [`Config`], so handlers
//! only ever see a ready [`VerificationPipeline`].

use std::sync::Arc;
use std::time::Duration;

use crate::model::Config;
use crate::service::llm::LlmError;
use crate::service::{
    ArtifactAggregator, BackoffPoller, HttpOcrClient, JobOrchestrator, LlmClient, LlmFieldExtractor,
    OcrSignatureDetector, VerificationPipeline, VisionStampQrDetector,
};
use crate::storage::{LocalObjectStore, ObjectStore};

/// Application state shared by all workers
pub struct AppState {
    pub pipeline: Arc<VerificationPipeline>,
    /// Outer deadline for one verification run
    pub run_timeout: Duration,
}

impl AppState {
    /// Build the service graph
    ///
    /// 1. Filesystem object store
    /// 2. OCR gateway client and job orchestrator (shared by text extraction and signature detection)
    /// 3. LLM client (requires OPENAI_API_KEY) for field extraction and stamp/QR vision
    pub fn new(config: &Config) -> Result<Self, AppError> {
        std::fs::create_dir_all(&config.storage.root)
            .map_err(|e| AppError::StorageInit(format!("{}: {}", config.storage.root.display(), e)))?;
        let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(&config.storage.root));

        let llm_client = LlmClient::from_env().map_err(|e| match e {
            LlmError::MissingApiKey => AppError::MissingConfig(crate::service::llm::ENV_OPENAI_API_KEY),
            LlmError::Client(_) => AppError::InvalidConfig("Invalid OPENAI_API_KEY"),
        })?;

        let orchestrator = Arc::new(JobOrchestrator::new(
            Arc::new(HttpOcrClient::new(&config.ocr.base_url)),
            BackoffPoller::new(config.ocr.max_retries),
            config.ocr.poll_interval(),
        ));

        let artifacts = ArtifactAggregator::new(
            Arc::new(OcrSignatureDetector::new(Arc::clone(&orchestrator))),
            Arc::new(VisionStampQrDetector::new(&config.vision, llm_client.api_key())),
            config.vision.max_pages,
        );

        let extractor = Arc::new(LlmFieldExtractor::new(llm_client, &config.extraction));

        let pipeline = VerificationPipeline::new(
            store,
            orchestrator,
            extractor,
            artifacts,
            config.storage.normalized_prefix(),
            config.extraction.max_text_chars,
        );

        tracing::info!(
            storage_root = %config.storage.root.display(),
            ocr_url = %config.ocr.base_url,
            vision_model = %config.vision.model,
            run_timeout_secs = config.pipeline.run_timeout_secs,
            "Verification pipeline initialized"
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
            run_timeout: config.pipeline.run_timeout(),
        })
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Object store could not be prepared
    #[error("Storage initialization failed: {0}")]
    StorageInit(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
