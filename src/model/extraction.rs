//! OCR job state, recognized text and language-model extracted fields

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::model::claim::DocumentType;
use crate::model::ocr::PollResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Polling,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid job transition {from:?} -> {to:?}")]
pub struct JobTransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// One asynchronous OCR analysis job, owned by a single orchestrator run
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub id: String,
    status: JobStatus,
    pages: Vec<PollResponse>,
    continuation_token: Option<String>,
}

impl ExtractionJob {
    pub fn submitted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Submitted,
            pages: Vec::new(),
            continuation_token: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn pages(&self) -> &[PollResponse] {
        &self.pages
    }

    pub fn continuation_token(&self) -> Option<&str> {
        self.continuation_token.as_deref()
    }

    /// Move to a new status. Terminal states accept nothing further.
    pub fn advance(&mut self, to: JobStatus) -> Result<(), JobTransitionError> {
        let allowed = matches!(
            (self.status, to),
            (JobStatus::Submitted, JobStatus::Polling)
                | (JobStatus::Polling, JobStatus::Polling)
                | (JobStatus::Polling, JobStatus::Succeeded)
                | (JobStatus::Polling, JobStatus::Failed)
        );
        if !allowed {
            return Err(JobTransitionError { from: self.status, to });
        }
        self.status = to;
        Ok(())
    }

    /// Append a result page in request order and remember its continuation token
    pub fn push_page(&mut self, page: PollResponse) {
        self.continuation_token = page.next_token.clone().filter(|t| !t.is_empty());
        self.pages.push(page);
    }

    pub fn into_pages(self) -> Vec<PollResponse> {
        self.pages
    }
}

/// Recognized lines in reading order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextContent {
    pub lines: Vec<String>,
}

impl TextContent {
    /// Canonical newline-joined text handed to field extraction
    pub fn joined(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Fields the language model is asked to return. Every field is optional and
/// tolerates numbers or other scalars where a string was expected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    /// Full name of the person the document was issued to
    #[serde(default, deserialize_with = "lenient_string", alias = "applicant_name")]
    #[schemars(with = "Option<String>")]
    pub applicant_name: Option<String>,
    /// Kind of document: sick leave sheet, order, or certificate
    #[serde(default, rename = "documentType", deserialize_with = "lenient_string", alias = "document_type")]
    #[schemars(with = "Option<String>")]
    pub document_type_label: Option<String>,
    /// Title as printed on the document
    #[serde(default, deserialize_with = "lenient_string", alias = "document_title")]
    #[schemars(with = "Option<String>")]
    pub document_title: Option<String>,
    /// Issue date, DD.MM.YYYY preferred
    #[serde(default, deserialize_with = "lenient_string", alias = "issue_date")]
    #[schemars(with = "Option<String>")]
    pub issue_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schemars(with = "Option<String>")]
    pub leave_start_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schemars(with = "Option<String>")]
    pub leave_end_date: Option<String>,
}

/// Strings pass through (blank becomes `None`), numbers and booleans are
/// stringified, everything else is dropped.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Comparable forms of [`ExtractedFields`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NormalizedFields {
    pub applicant_name: Option<String>,
    pub document_type: Option<DocumentType>,
    pub issue_date: Option<NaiveDate>,
    pub leave_start_date: Option<NaiveDate>,
    pub leave_end_date: Option<NaiveDate>,
}
