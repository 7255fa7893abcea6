//! Report assembly and write-once persistence

use chrono::{DateTime, Local, Utc};

use crate::model::report::{DocumentSummary, SignatureSection, StampSection};
use crate::model::{
    ApplicantClaim, ArtifactEvidence, DocumentRef, NormalizedFields, Report, UploadedDocument, Verdict,
};
use crate::service::fields::FieldExtraction;
use crate::storage::{ObjectStore, StorageError};

pub const REPORT_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Everything produced by one run
pub struct ReportParts<'a> {
    pub claim: &'a ApplicantClaim,
    pub document: &'a UploadedDocument,
    pub location: &'a DocumentRef,
    pub extraction: FieldExtraction,
    pub normalized: NormalizedFields,
    pub evidence: ArtifactEvidence,
    pub verdict: Verdict,
}

pub fn assemble(parts: ReportParts<'_>, generated_at: DateTime<Utc>) -> Report {
    let ReportParts {
        claim,
        document,
        location,
        extraction,
        normalized,
        evidence,
        verdict,
    } = parts;

    let max_confidence = evidence.max_signature_confidence();

    Report {
        claim: claim.clone(),
        document: DocumentSummary {
            file_name: document.file_name.clone(),
            storage_key: location.key.clone(),
            media_kind: document.media_kind,
            page_count: document.page_count,
            content_sha256: document.content_hash(),
        },
        fields: extraction.fields,
        normalized,
        signatures: SignatureSection {
            count: evidence.signatures.len(),
            max_confidence,
            signatures: evidence.signatures,
            error: evidence.signature_error,
        },
        stamps: StampSection {
            stamp: evidence.stamp,
            qr_code: evidence.qr_code,
            pages_examined: evidence.pages_examined,
            error: evidence.stamp_error,
        },
        checks: verdict.checks,
        errors: verdict.errors,
        verdict: verdict.overall,
        parse_error: extraction.parse_error,
        raw_model_output: extraction.raw_output,
        generated_at,
    }
}

/// `{folder}extraction-{YYYYMMDD-HHMMSS}.json`
pub fn report_key(folder: &str, now: DateTime<Local>) -> String {
    format!("{}extraction-{}.json", folder, now.format("%Y%m%d-%H%M%S"))
}

/// Store the report next to its upload and return the key
pub async fn persist(
    store: &dyn ObjectStore,
    location: &DocumentRef,
    report: &Report,
    now: DateTime<Local>,
) -> Result<String, StorageError> {
    let key = report_key(location.folder(), now);
    let bytes = serde_json::to_vec_pretty(report).map_err(std::io::Error::from)?;

    store.put(&key, &bytes, REPORT_CONTENT_TYPE).await?;

    tracing::info!(key = %key, bytes = bytes.len(), verdict = ?report.verdict, "Report persisted");
    Ok(key)
}
