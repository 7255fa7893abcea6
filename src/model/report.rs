//! Persisted verification report
//!
//! Underscore-prefixed keys hold pipeline diagnostics next to the extracted
//! fields, so the stored JSON can be read without this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::claim::ApplicantClaim;
use crate::model::document::MediaKind;
use crate::model::evidence::{ArtifactSignal, SignatureHit};
use crate::model::extraction::{ExtractedFields, NormalizedFields};
use crate::model::verdict::{CheckResult, ReconciliationCheck, VerdictError};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentSummary {
    pub file_name: String,
    pub storage_key: String,
    pub media_kind: MediaKind,
    pub page_count: Option<usize>,
    pub content_sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignatureSection {
    pub signatures: Vec<SignatureHit>,
    pub count: usize,
    pub max_confidence: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StampSection {
    pub stamp: ArtifactSignal,
    pub qr_code: ArtifactSignal,
    pub pages_examined: usize,
    pub error: Option<String>,
}

/// Write-once record of a single verification run
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Report {
    pub claim: ApplicantClaim,
    pub document: DocumentSummary,
    pub fields: ExtractedFields,
    pub normalized: NormalizedFields,
    #[serde(rename = "_signatures")]
    pub signatures: SignatureSection,
    #[serde(rename = "_stamps")]
    pub stamps: StampSection,
    #[serde(rename = "_checks")]
    pub checks: Vec<ReconciliationCheck>,
    #[serde(rename = "_errors")]
    pub errors: Vec<VerdictError>,
    #[serde(rename = "_verdict")]
    pub verdict: CheckResult,
    #[serde(rename = "_parse_error")]
    pub parse_error: bool,
    #[serde(rename = "_raw_model_output")]
    pub raw_model_output: String,
    pub generated_at: DateTime<Utc>,
}
