//! Wire models for the asynchronous OCR gateway (Textract-style block results)

use serde::{Deserialize, Serialize};

use crate::model::evidence::BoundingBox;

/// Analysis features requested from the OCR service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OcrFeature {
    Text,
    Signatures,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteJobStatus {
    InProgress,
    Succeeded,
    PartialSuccess,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Page,
    Line,
    Word,
    Signature,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geometry {
    pub bounding_box: Option<BoundingBox>,
}

/// One recognized element on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    pub block_type: BlockType,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub page: Option<u32>,
}

impl Block {
    pub fn line(text: &str) -> Self {
        Self {
            block_type: BlockType::Line,
            text: Some(text.to_string()),
            confidence: None,
            geometry: None,
            page: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubmitResponse {
    pub job_id: String,
}

/// One page of job results as returned by a status poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PollResponse {
    pub job_status: RemoteJobStatus,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub next_token: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_textract_style_page() {
        let json = r#"{
            "JobStatus": "SUCCEEDED",
            "NextToken": "abc",
            "Blocks": [
                {"BlockType": "PAGE", "Page": 1},
                {"BlockType": "LINE", "Text": "СПРАВКА", "Confidence": 99.1, "Page": 1},
                {"BlockType": "SIGNATURE", "Confidence": 88.0, "Page": 1,
                 "Geometry": {"BoundingBox": {"Width": 0.1, "Height": 0.05, "Left": 0.6, "Top": 0.8}}},
                {"BlockType": "KEY_VALUE_SET"}
            ]
        }"#;
        let page: PollResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.job_status, RemoteJobStatus::Succeeded);
        assert_eq!(page.next_token.as_deref(), Some("abc"));
        assert_eq!(page.blocks.len(), 4);
        assert_eq!(page.blocks[1].text.as_deref(), Some("СПРАВКА"));
        assert_eq!(page.blocks[3].block_type, BlockType::Other);
        let bbox = page.blocks[2].geometry.as_ref().unwrap().bounding_box.as_ref().unwrap();
        assert_eq!(bbox.left, 0.6);
    }
}
