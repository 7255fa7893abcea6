//! Drives one OCR job from submission to fully collected results
//!
//! Two waits are kept apart here: the job-completion wait (fixed interval
//! while the job reports `IN_PROGRESS`) and the rate-limit backoff, which
//! lives entirely inside [`BackoffPoller`] and wraps every individual call.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{OcrError, OcrService};
use crate::model::ocr::{BlockType, OcrFeature, PollResponse, RemoteJobStatus};
use crate::model::{DocumentRef, ExtractionJob, JobStatus, TextContent};
use crate::service::backoff::{BackoffError, BackoffPoller};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExtractionError {
    #[error("OCR job submission rejected: {0}")]
    SubmissionRejected(OcrError),

    #[error("OCR job {job_id} failed: {message}")]
    ExtractionFailed { job_id: String, message: String },

    #[error("OCR job {job_id}: retries exhausted after {attempts} rate-limited attempts")]
    RetriesExhausted { job_id: String, attempts: u32 },

    #[error("OCR job {job_id}: poll failed: {source}")]
    PollFailed { job_id: String, source: OcrError },

    #[error("OCR job cancelled")]
    Cancelled,
}

impl ExtractionError {
    fn from_backoff(job_id: &str, err: BackoffError<OcrError>) -> Self {
        match err {
            BackoffError::RetriesExhausted { attempts } => ExtractionError::RetriesExhausted {
                job_id: job_id.to_string(),
                attempts,
            },
            BackoffError::Cancelled => ExtractionError::Cancelled,
            BackoffError::Failed(source) => ExtractionError::PollFailed {
                job_id: job_id.to_string(),
                source,
            },
        }
    }
}

pub struct JobOrchestrator {
    ocr: Arc<dyn OcrService>,
    poller: BackoffPoller,
    poll_interval: Duration,
}

impl JobOrchestrator {
    pub fn new(ocr: Arc<dyn OcrService>, poller: BackoffPoller, poll_interval: Duration) -> Self {
        Self {
            ocr,
            poller,
            poll_interval,
        }
    }

    pub fn ocr(&self) -> &Arc<dyn OcrService> {
        &self.ocr
    }

    /// Recognize all text lines of a stored document
    pub async fn run_extraction(
        &self,
        document: &DocumentRef,
        cancel: &CancellationToken,
    ) -> Result<TextContent, ExtractionError> {
        let start_time = std::time::Instant::now();
        let pages = self.run_job(document, &[OcrFeature::Text], cancel).await?;
        let text = lines_from_pages(&pages);

        tracing::info!(
            key = %document.key,
            result_pages = pages.len(),
            lines = text.lines.len(),
            elapsed_ms = start_time.elapsed().as_millis(),
            "OCR text extraction complete"
        );

        Ok(text)
    }

    /// Submit a job, wait for it to finish and collect every result page in order
    pub async fn run_job(
        &self,
        document: &DocumentRef,
        features: &[OcrFeature],
        cancel: &CancellationToken,
    ) -> Result<Vec<PollResponse>, ExtractionError> {
        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        let job_id = self
            .ocr
            .submit(document, features)
            .await
            .map_err(ExtractionError::SubmissionRejected)?;

        tracing::debug!(job_id = %job_id, key = %document.key, "OCR job submitted");

        let mut job = ExtractionJob::submitted(job_id);
        self.wait_for_completion(&mut job, cancel).await?;
        self.collect_continuations(&mut job, cancel).await?;

        Ok(job.into_pages())
    }

    async fn wait_for_completion(
        &self,
        job: &mut ExtractionJob,
        cancel: &CancellationToken,
    ) -> Result<(), ExtractionError> {
        let ocr = &self.ocr;
        let job_id = job.id.clone();
        let id = job_id.as_str();

        loop {
            advance(job, JobStatus::Polling);

            let page = self
                .poller
                .run(cancel, move || ocr.poll(id, None))
                .await
                .map_err(|e| ExtractionError::from_backoff(id, e))?;

            match page.job_status {
                RemoteJobStatus::InProgress => {
                    let wait = self.poll_interval + Duration::from_secs_f64(rand::random::<f64>());
                    tracing::debug!(job_id = %id, wait_ms = wait.as_millis() as u64, "OCR job in progress");
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ExtractionError::Cancelled),
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                RemoteJobStatus::Failed => {
                    advance(job, JobStatus::Failed);
                    let message = page
                        .status_message
                        .unwrap_or_else(|| "job reported FAILED".to_string());
                    tracing::error!(job_id = %id, message = %message, "OCR job failed");
                    return Err(ExtractionError::ExtractionFailed {
                        job_id: job_id.clone(),
                        message,
                    });
                }
                RemoteJobStatus::Succeeded | RemoteJobStatus::PartialSuccess => {
                    if page.job_status == RemoteJobStatus::PartialSuccess {
                        tracing::warn!(job_id = %id, "OCR job partially succeeded");
                    }
                    job.push_page(page);
                    advance(job, JobStatus::Succeeded);
                    return Ok(());
                }
            }
        }
    }

    async fn collect_continuations(
        &self,
        job: &mut ExtractionJob,
        cancel: &CancellationToken,
    ) -> Result<(), ExtractionError> {
        let ocr = &self.ocr;
        let job_id = job.id.clone();
        let id = job_id.as_str();

        while let Some(token) = job.continuation_token().map(str::to_string) {
            let token = token.as_str();
            let page = self
                .poller
                .run(cancel, move || ocr.poll(id, Some(token)))
                .await
                .map_err(|e| ExtractionError::from_backoff(id, e))?;
            job.push_page(page);
        }

        tracing::debug!(job_id = %id, pages = job.pages().len(), "Collected OCR result pages");
        Ok(())
    }
}

/// Transitions here are always legal; a failure would be a logic error in this module
fn advance(job: &mut ExtractionJob, to: JobStatus) {
    if let Err(e) = job.advance(to) {
        tracing::error!(job_id = %job.id, error = %e, "Unexpected OCR job transition");
    }
}

/// Non-empty `LINE` blocks across all pages in page then line order
pub fn lines_from_pages(pages: &[PollResponse]) -> TextContent {
    let lines = pages
        .iter()
        .flat_map(|page| page.blocks.iter())
        .filter(|block| block.block_type == BlockType::Line)
        .filter_map(|block| block.text.as_deref())
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
        .collect();

    TextContent { lines }
}
