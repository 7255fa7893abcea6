//! Visual evidence gathered from signature and stamp/QR detectors

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Three-valued presence. `Unknown` means the detector produced no determination,
/// which is not the same thing as `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tristate {
    True,
    False,
    #[default]
    Unknown,
}

impl From<Option<bool>> for Tristate {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Tristate::True,
            Some(false) => Tristate::False,
            None => Tristate::Unknown,
        }
    }
}

/// Axis-aligned box in page-relative coordinates (0..1)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

/// One signature found by the geometry detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SignatureHit {
    /// 0-100
    pub confidence: f64,
    pub location: Option<BoundingBox>,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct ArtifactSignal {
    pub present: Tristate,
    /// 0-100; absent when the detector gave no determination
    pub confidence: Option<f64>,
}

/// Merged output of both detectors
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ArtifactEvidence {
    pub signatures: Vec<SignatureHit>,
    /// Set when the signature detector failed; `signatures` is then empty
    pub signature_error: Option<String>,
    pub stamp: ArtifactSignal,
    pub qr_code: ArtifactSignal,
    pub pages_examined: usize,
    /// Set when the stamp/QR detector failed or could not run
    pub stamp_error: Option<String>,
}

impl ArtifactEvidence {
    pub fn max_signature_confidence(&self) -> Option<f64> {
        self.signatures
            .iter()
            .map(|s| s.confidence)
            .fold(None, |acc, c| Some(acc.map_or(c, |m: f64| m.max(c))))
    }
}
