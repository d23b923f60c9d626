use serde::{Deserialize, Serialize};

use crate::session::{ArchiveMode, ReviewedComment};

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationRequest {
    pub comment: String,
    pub category: String,
}

/// Model reply plus the booleans derived from it.
///
/// `is_bad` and `related_to_category` are substring heuristics over
/// `raw_text` and can misread replies that stray from the prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub raw_text: String,
    pub is_bad: bool,
    pub related_to_category: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Classification {
    Classified(ClassificationResult),
    /// No completion client is configured; nothing was sent.
    NoClient,
    Failed { reason: String },
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Classified(_) => "classified",
            Classification::NoClient => "no_client",
            Classification::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: Option<String>,
    pub category: String,
    #[serde(flatten)]
    pub classification: Classification,
}

#[derive(Debug, Deserialize)]
pub struct PostCommentRequest {
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentsResponse {
    pub comments: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub archive_mode: String,
    pub category: String,
    pub data: Vec<ReviewedComment>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub archive_mode: ArchiveMode,
    pub custom_category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub archive_mode: ArchiveMode,
    pub label: String,
    pub custom_category: String,
    pub category_options: Vec<String>,
}
