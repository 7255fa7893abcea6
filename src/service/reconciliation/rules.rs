//! The five verification rules
//!
//! Each rule is a pure function of its inputs and returns exactly one
//! [`CheckResult`]. Missing inputs give `Unknown`, never `Fail`.

use chrono::{Days, NaiveDate};

use crate::model::{ApplicantClaim, ArtifactEvidence, CheckResult, DocumentType, MediaKind, Tristate};
use crate::service::fields::names_match;

pub fn name_match(claim: &ApplicantClaim, extracted_name: Option<&str>) -> CheckResult {
    names_match(Some(&claim.full_name), extracted_name).into()
}

pub fn document_type_match(claim: &ApplicantClaim, extracted: Option<DocumentType>) -> CheckResult {
    extracted.map(|ty| ty == claim.document_type).into()
}

/// Last day (inclusive) on which a document of this type issued on `issued` is current
pub fn valid_until(document_type: DocumentType, issued: NaiveDate) -> Option<NaiveDate> {
    let days = u64::try_from(document_type.validity_days()).ok()?;
    issued.checked_add_days(Days::new(days))
}

pub fn validity_window(
    document_type: Option<DocumentType>,
    issue_date: Option<NaiveDate>,
    today: NaiveDate,
) -> CheckResult {
    let (Some(document_type), Some(issue_date)) = (document_type, issue_date) else {
        return CheckResult::Unknown;
    };
    valid_until(document_type, issue_date)
        .map(|last_day| today <= last_day)
        .into()
}

/// Either a stamp or a QR code confirms the document
pub fn artifact_presence(evidence: &ArtifactEvidence) -> CheckResult {
    match (evidence.stamp.present, evidence.qr_code.present) {
        (Tristate::True, _) | (_, Tristate::True) => CheckResult::Pass,
        (Tristate::False, Tristate::False) => CheckResult::Fail,
        _ => CheckResult::Unknown,
    }
}

/// Only PDFs with a known page count can be judged
pub fn single_page_document(media_kind: MediaKind, page_count: Option<usize>) -> CheckResult {
    match (media_kind, page_count) {
        (MediaKind::Pdf, Some(1)) => CheckResult::Pass,
        (MediaKind::Pdf, Some(n)) if n > 1 => CheckResult::Fail,
        _ => CheckResult::Unknown,
    }
}
