pub mod artifacts;
pub mod backoff;
pub mod fields;
pub mod llm;
pub mod ocr;
pub mod pipeline;
pub mod reconciliation;
pub mod report;

pub use artifacts::{ArtifactAggregator, OcrSignatureDetector, VisionStampQrDetector};
pub use backoff::BackoffPoller;
pub use fields::LlmFieldExtractor;
pub use llm::LlmClient;
pub use ocr::{HttpOcrClient, JobOrchestrator};
pub use pipeline::{PipelineError, VerificationPipeline, VerificationRequest};
