//! Applicant-declared identity and document type

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Canonical supporting-document types accepted for a deferment request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    SickLeave,
    Order,
    Certificate,
}

impl DocumentType {
    /// Calendar days after issuance during which the document is considered current
    pub fn validity_days(self) -> i64 {
        match self {
            DocumentType::SickLeave => 180,
            DocumentType::Order => 30,
            DocumentType::Certificate => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::SickLeave => "SickLeave",
            DocumentType::Order => "Order",
            DocumentType::Certificate => "Certificate",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the applicant says about themselves and the document they uploaded
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicantClaim {
    pub full_name: String,
    pub document_type: DocumentType,
}
