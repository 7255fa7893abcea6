pub mod claim;
pub mod config;
pub mod document;
pub mod evidence;
pub mod extraction;
pub mod ocr;
pub mod report;
pub mod verdict;

pub use claim::{ApplicantClaim, DocumentType};
pub use config::{Config, ExtractionConfig, VisionConfig};
pub use document::{DocumentRef, MediaKind, UploadedDocument};
pub use evidence::{ArtifactEvidence, ArtifactSignal, BoundingBox, SignatureHit, Tristate};
pub use extraction::{ExtractedFields, ExtractionJob, JobStatus, NormalizedFields, TextContent};
pub use report::Report;
pub use verdict::{CheckResult, ErrorCode, ReconciliationCheck, RuleName, Verdict, VerdictError};
