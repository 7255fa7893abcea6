//! Signature, stamp and QR evidence
//!
//! Two independent detectors feed [`ArtifactAggregator`]. A failing detector
//! never fails the run: its share of the evidence becomes `Unknown` and the
//! error text is kept for the report.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::model::{ArtifactEvidence, ArtifactSignal, DocumentRef, SignatureHit, Tristate, UploadedDocument};
use crate::service::ocr::{ExtractionError, OcrError};
use crate::storage::{ObjectStore, StorageError};

pub mod signatures;
pub mod vision;

pub use signatures::OcrSignatureDetector;
pub use vision::VisionStampQrDetector;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DetectorError {
    #[error("OCR signature job failed: {0}")]
    Job(#[from] ExtractionError),

    #[error("OCR image analysis failed: {0}")]
    Analysis(#[from] OcrError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Unparseable detector reply: {0}")]
    ParseError(String),
}

/// A rendered page handed to the vision detector
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    /// 1-based
    pub page: u32,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Reply of the stamp/QR detector; absent flags mean "could not tell"
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StampQrReading {
    pub stamp_present: Option<bool>,
    pub stamp_confidence: Option<f64>,
    pub qr_present: Option<bool>,
    pub qr_confidence: Option<f64>,
}

#[async_trait]
pub trait SignatureDetector: Send + Sync {
    async fn detect(
        &self,
        document: &UploadedDocument,
        location: &DocumentRef,
        cancel: &CancellationToken,
    ) -> Result<Vec<SignatureHit>, DetectorError>;
}

#[async_trait]
pub trait StampQrDetector: Send + Sync {
    async fn detect(&self, pages: &[PageImage]) -> Result<StampQrReading, DetectorError>;
}

pub struct ArtifactAggregator {
    signatures: Arc<dyn SignatureDetector>,
    stamps: Arc<dyn StampQrDetector>,
    max_pages: usize,
}

impl ArtifactAggregator {
    pub fn new(
        signatures: Arc<dyn SignatureDetector>,
        stamps: Arc<dyn StampQrDetector>,
        max_pages: usize,
    ) -> Self {
        Self {
            signatures,
            stamps,
            max_pages,
        }
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Run both detectors concurrently and merge their output
    pub async fn collect(
        &self,
        document: &UploadedDocument,
        location: &DocumentRef,
        pages: &[PageImage],
        cancel: &CancellationToken,
    ) -> ArtifactEvidence {
        let pages = &pages[..pages.len().min(self.max_pages)];

        let (signatures, stamps) = tokio::join!(
            self.signatures.detect(document, location, cancel),
            self.detect_stamps(pages),
        );

        let mut evidence = ArtifactEvidence {
            pages_examined: pages.len(),
            ..ArtifactEvidence::default()
        };

        match signatures {
            Ok(hits) => {
                evidence.signatures = hits
                    .into_iter()
                    .map(|hit| SignatureHit {
                        confidence: clamp_confidence(hit.confidence),
                        ..hit
                    })
                    .collect();
            }
            Err(e) => {
                tracing::warn!(key = %location.key, error = %e, "Signature detector failed, evidence degraded");
                evidence.signature_error = Some(e.to_string());
            }
        }

        match stamps {
            Ok(reading) => {
                evidence.stamp = signal(reading.stamp_present, reading.stamp_confidence);
                evidence.qr_code = signal(reading.qr_present, reading.qr_confidence);
            }
            Err(message) => {
                tracing::warn!(key = %location.key, error = %message, "Stamp/QR detector failed, evidence degraded");
                evidence.stamp_error = Some(message);
            }
        }

        tracing::info!(
            key = %location.key,
            signatures = evidence.signatures.len(),
            stamp = ?evidence.stamp.present,
            qr_code = ?evidence.qr_code.present,
            pages_examined = evidence.pages_examined,
            "Artifact evidence collected"
        );

        evidence
    }

    async fn detect_stamps(&self, pages: &[PageImage]) -> Result<StampQrReading, String> {
        if pages.is_empty() {
            return Err("no page images available".to_string());
        }
        self.stamps.detect(pages).await.map_err(|e| e.to_string())
    }
}

fn signal(present: Option<bool>, confidence: Option<f64>) -> ArtifactSignal {
    let present = Tristate::from(present);
    ArtifactSignal {
        present,
        confidence: match present {
            Tristate::Unknown => None,
            _ => confidence.map(clamp_confidence),
        },
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 100.0) }
}

/// Page images for the vision detector: the upload itself for images, stored
/// `pages/page-N.jpg` previews for PDFs (stops at the first missing page)
pub async fn load_page_images(
    store: &dyn ObjectStore,
    document: &UploadedDocument,
    location: &DocumentRef,
    max_pages: usize,
) -> Vec<PageImage> {
    if !document.is_pdf() {
        return vec![PageImage {
            page: 1,
            content_type: document.content_type.clone(),
            bytes: document.content.clone(),
        }];
    }

    let folder = location.folder();
    let mut pages = Vec::new();
    for page in 1..=max_pages as u32 {
        let key = format!("{}pages/page-{}.jpg", folder, page);
        match store.get(&key).await {
            Ok(bytes) => pages.push(PageImage {
                page,
                content_type: "image/jpeg".to_string(),
                bytes,
            }),
            Err(StorageError::NotFound(_)) => break,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to load page preview");
                break;
            }
        }
    }

    tracing::debug!(key = %location.key, previews = pages.len(), "Loaded PDF page previews");
    pages
}
