//! Signature detection on top of the OCR service
//!
//! Images go through one synchronous analysis call. PDFs need the same
//! submit/poll/paginate protocol as text extraction, so they reuse the
//! [`JobOrchestrator`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{DetectorError, SignatureDetector};
use crate::model::ocr::{Block, BlockType, OcrFeature};
use crate::model::{DocumentRef, SignatureHit, UploadedDocument};
use crate::service::ocr::JobOrchestrator;

pub struct OcrSignatureDetector {
    orchestrator: Arc<JobOrchestrator>,
}

impl OcrSignatureDetector {
    pub fn new(orchestrator: Arc<JobOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl SignatureDetector for OcrSignatureDetector {
    async fn detect(
        &self,
        document: &UploadedDocument,
        location: &DocumentRef,
        cancel: &CancellationToken,
    ) -> Result<Vec<SignatureHit>, DetectorError> {
        let features = [OcrFeature::Signatures];

        let blocks: Vec<Block> = if document.is_pdf() {
            self.orchestrator
                .run_job(location, &features, cancel)
                .await?
                .into_iter()
                .flat_map(|page| page.blocks)
                .collect()
        } else {
            self.orchestrator
                .ocr()
                .analyze_image(&document.content, &features)
                .await?
        };

        let hits = signature_hits(&blocks);
        tracing::debug!(key = %location.key, hits = hits.len(), "Signature detection complete");
        Ok(hits)
    }
}

/// `SIGNATURE` blocks as hits; images without page numbers are page 1
fn signature_hits(blocks: &[Block]) -> Vec<SignatureHit> {
    blocks
        .iter()
        .filter(|block| block.block_type == BlockType::Signature)
        .map(|block| SignatureHit {
            confidence: block.confidence.unwrap_or(0.0),
            location: block.geometry.as_ref().and_then(|g| g.bounding_box.clone()),
            page: Some(block.page.unwrap_or(1)),
        })
        .collect()
}
