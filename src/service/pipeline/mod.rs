//! One verification run, from raw upload to persisted report
//!
//! Text extraction (OCR job, then the language model) and artifact detection
//! run concurrently; both results meet at reconciliation. Every run owns its
//! own [`RunContext`], so concurrent runs share nothing but the collaborators.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tokio_util::sync::CancellationToken;

use crate::model::{ApplicantClaim, DocumentRef, Report, UploadedDocument};
use crate::service::artifacts::{ArtifactAggregator, load_page_images};
use crate::service::fields::{
    FieldExtraction, FieldExtractionError, FieldExtractor, extract_fields, normalize_fields,
};
use crate::service::ocr::{ExtractionError, JobOrchestrator};
use crate::service::reconciliation::{self, ReconciliationInput};
use crate::service::report::{self, ReportParts};
use crate::storage::{ObjectStore, StorageError};

pub mod upload;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PipelineError {
    #[error("Unsupported media for {file_name} ({content_type}): expected a PDF or an image")]
    UnsupportedMedia {
        file_name: String,
        content_type: String,
    },

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("Text extraction failed: {0}")]
    Extraction(ExtractionError),

    #[error("Field extraction failed: {0}")]
    FieldExtraction(#[from] FieldExtractionError),

    #[error("Verification run cancelled")]
    Cancelled,
}

impl From<ExtractionError> for PipelineError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Extraction(other),
        }
    }
}

/// One submitted document and what the applicant claims about it
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub claim: ApplicantClaim,
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub report_key: String,
    pub report: Report,
}

/// State owned by a single run
struct RunContext {
    claim: ApplicantClaim,
    document: UploadedDocument,
    location: DocumentRef,
    cancel: CancellationToken,
    started_at: DateTime<Local>,
}

pub struct VerificationPipeline {
    store: Arc<dyn ObjectStore>,
    orchestrator: Arc<JobOrchestrator>,
    extractor: Arc<dyn FieldExtractor>,
    artifacts: ArtifactAggregator,
    key_prefix: String,
    max_text_chars: usize,
}

impl VerificationPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        orchestrator: Arc<JobOrchestrator>,
        extractor: Arc<dyn FieldExtractor>,
        artifacts: ArtifactAggregator,
        key_prefix: String,
        max_text_chars: usize,
    ) -> Self {
        Self {
            store,
            orchestrator,
            extractor,
            artifacts,
            key_prefix,
            max_text_chars,
        }
    }

    pub async fn run(
        &self,
        request: VerificationRequest,
        cancel: &CancellationToken,
    ) -> Result<VerificationOutcome, PipelineError> {
        self.run_at(request, cancel, Local::now()).await
    }

    /// Run with an explicit clock; `now` fixes "today" for the validity window
    pub async fn run_at(
        &self,
        request: VerificationRequest,
        cancel: &CancellationToken,
        now: DateTime<Local>,
    ) -> Result<VerificationOutcome, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let VerificationRequest {
            claim,
            file_name,
            content_type,
            content,
        } = request;

        let document = UploadedDocument::from_upload(&file_name, &content_type, content).ok_or_else(|| {
            PipelineError::UnsupportedMedia {
                file_name: file_name.clone(),
                content_type: content_type.clone(),
            }
        })?;

        let location = upload::store_upload(self.store.as_ref(), &self.key_prefix, &document).await?;

        let ctx = RunContext {
            claim,
            document,
            location,
            cancel: cancel.child_token(),
            started_at: now,
        };

        tracing::info!(
            key = %ctx.location.key,
            document_type = %ctx.claim.document_type,
            media_kind = ?ctx.document.media_kind,
            "Verification run started"
        );

        self.verify(ctx, cancel).await
    }

    async fn verify(&self, ctx: RunContext, cancel: &CancellationToken) -> Result<VerificationOutcome, PipelineError> {
        let start_time = std::time::Instant::now();

        let text_branch = async {
            let result = self.extract(&ctx).await;
            if result.is_err() {
                // stop signature polling, nothing will use its result
                ctx.cancel.cancel();
            }
            result
        };
        let artifact_branch = async {
            let pages = load_page_images(
                self.store.as_ref(),
                &ctx.document,
                &ctx.location,
                self.artifacts.max_pages(),
            )
            .await;
            self.artifacts
                .collect(&ctx.document, &ctx.location, &pages, &ctx.cancel)
                .await
        };

        let (extraction, evidence) = tokio::join!(text_branch, artifact_branch);
        let extraction = extraction?;

        if cancel.is_cancelled() {
            tracing::warn!(key = %ctx.location.key, "Verification run cancelled before reconciliation");
            return Err(PipelineError::Cancelled);
        }

        let normalized = normalize_fields(&extraction.fields);
        let verdict = reconciliation::evaluate(
            ReconciliationInput {
                claim: &ctx.claim,
                fields: &normalized,
                evidence: &evidence,
                media_kind: ctx.document.media_kind,
                page_count: ctx.document.page_count,
            },
            ctx.started_at.date_naive(),
        );

        let report = report::assemble(
            ReportParts {
                claim: &ctx.claim,
                document: &ctx.document,
                location: &ctx.location,
                extraction,
                normalized,
                evidence,
                verdict,
            },
            Utc::now(),
        );

        let report_key = report::persist(self.store.as_ref(), &ctx.location, &report, Local::now()).await?;

        tracing::info!(
            key = %ctx.location.key,
            report_key = %report_key,
            verdict = ?report.verdict,
            errors = report.errors.len(),
            parse_error = report.parse_error,
            elapsed_ms = start_time.elapsed().as_millis(),
            "Verification run complete"
        );

        Ok(VerificationOutcome { report_key, report })
    }

    /// OCR text, then fields; the language model needs the finished text
    async fn extract(&self, ctx: &RunContext) -> Result<FieldExtraction, PipelineError> {
        let text = self.orchestrator.run_extraction(&ctx.location, &ctx.cancel).await?;

        if ctx.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        if text.is_empty() {
            tracing::warn!(key = %ctx.location.key, "OCR produced no text");
        }

        Ok(extract_fields(self.extractor.as_ref(), &text, self.max_text_chars).await?)
    }
}
