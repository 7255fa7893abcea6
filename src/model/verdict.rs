//! Reconciliation checks, error codes and the aggregate verdict

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result of a single rule or of the whole verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckResult {
    Pass,
    Fail,
    Unknown,
}

/// `None` is "could not be determined"
impl From<Option<bool>> for CheckResult {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => CheckResult::Pass,
            Some(false) => CheckResult::Fail,
            None => CheckResult::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleName {
    NameMatch,
    DocumentTypeMatch,
    ValidityWindow,
    ArtifactPresence,
    SinglePageDocument,
}

impl RuleName {
    /// Error reported when this rule fails
    pub fn error_code(self) -> ErrorCode {
        match self {
            RuleName::DocumentTypeMatch => ErrorCode::InvalidFormat,
            RuleName::ValidityWindow => ErrorCode::Outdated,
            RuleName::SinglePageDocument => ErrorCode::MultipleDocuments,
            RuleName::NameMatch => ErrorCode::ForeignApplicant,
            RuleName::ArtifactPresence => ErrorCode::MissingConfirmation,
        }
    }
}

/// Fixed error taxonomy shown to applicants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ErrorCode {
    #[serde(rename = "01")]
    InvalidFormat,
    #[serde(rename = "03")]
    Outdated,
    #[serde(rename = "04")]
    MultipleDocuments,
    #[serde(rename = "05")]
    ForeignApplicant,
    #[serde(rename = "06")]
    MissingConfirmation,
}

impl ErrorCode {
    pub fn code(self) -> &'static str {
        match self {
            ErrorCode::InvalidFormat => "01",
            ErrorCode::Outdated => "03",
            ErrorCode::MultipleDocuments => "04",
            ErrorCode::ForeignApplicant => "05",
            ErrorCode::MissingConfirmation => "06",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::InvalidFormat => "invalid document format — verify the selected data",
            ErrorCode::Outdated => "document outdated — re-upload a current document",
            ErrorCode::MultipleDocuments => "attach exactly one document per file",
            ErrorCode::ForeignApplicant => "document does not belong to the applicant",
            ErrorCode::MissingConfirmation => "document lacks a stamp/QR confirmation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReconciliationCheck {
    pub rule: RuleName,
    pub result: CheckResult,
    pub error_code: Option<ErrorCode>,
}

impl ReconciliationCheck {
    /// Only `Fail` carries an error code
    pub fn new(rule: RuleName, result: CheckResult) -> Self {
        let error_code = (result == CheckResult::Fail).then(|| rule.error_code());
        Self {
            rule,
            result,
            error_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerdictError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<ErrorCode> for VerdictError {
    fn from(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Verdict {
    pub overall: CheckResult,
    pub checks: Vec<ReconciliationCheck>,
    pub errors: Vec<VerdictError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_table() {
        assert_eq!(RuleName::DocumentTypeMatch.error_code().code(), "01");
        assert_eq!(RuleName::ValidityWindow.error_code().code(), "03");
        assert_eq!(RuleName::SinglePageDocument.error_code().code(), "04");
        assert_eq!(RuleName::NameMatch.error_code().code(), "05");
        assert_eq!(RuleName::ArtifactPresence.error_code().code(), "06");
    }

    #[test]
    fn test_error_code_serializes_as_code() {
        let err = VerdictError::from(ErrorCode::Outdated);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "03");
        assert_eq!(json["message"], "document outdated — re-upload a current document");
    }

    #[test]
    fn test_only_fail_has_error_code() {
        assert_eq!(
            ReconciliationCheck::new(RuleName::NameMatch, CheckResult::Fail).error_code,
            Some(ErrorCode::ForeignApplicant)
        );
        assert_eq!(
            ReconciliationCheck::new(RuleName::NameMatch, CheckResult::Unknown).error_code,
            None
        );
        assert_eq!(
            ReconciliationCheck::new(RuleName::NameMatch, CheckResult::Pass).error_code,
            None
        );
    }
}
