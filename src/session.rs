use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::classifier::classify;
use crate::engine::CompletionEngine;
use crate::types::Classification;

pub const CATEGORY_OPTIONS: [&str; 5] = ["body", "makeup", "personality", "fashion", "performance"];

const SEED_COMMENTS: [&str; 4] = [
    "Great post!",
    "Your makeup looks terrible.",
    "Amazing style!",
    "Not your best look.",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveMode {
    #[default]
    ArchiveAllBad,
    KeepAll,
    Customize,
}

impl fmt::Display for ArchiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArchiveMode::ArchiveAllBad => "Archive ALL bad comments",
            ArchiveMode::KeepAll => "Keep ALL Comments",
            ArchiveMode::Customize => "Customize",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("comment is empty")]
    EmptyComment,

    #[error("unknown category `{0}`")]
    UnknownCategory(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewedComment {
    pub comment: String,
    #[serde(flatten)]
    pub verdict: ReviewVerdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReviewVerdict {
    Archived,
    Kept,
    /// No completion client, so the comment was not classified.
    Unavailable,
    Failed { reason: String },
}

/// How the comment feed is reviewed.
#[derive(Debug, Clone)]
pub struct ReviewPolicy {
    /// Category every comment is classified against.
    pub review_category: String,
    /// When false, the archive mode and custom category are displayed but
    /// not applied: every bad comment is archived.
    pub honor_settings: bool,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            review_category: "general".to_string(),
            honor_settings: false,
        }
    }
}

/// Comment feed and settings for a single user session.
#[derive(Debug, Clone)]
pub struct SessionState {
    comments: Vec<String>,
    archive_mode: ArchiveMode,
    custom_category: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            comments: SEED_COMMENTS.iter().map(|c| c.to_string()).collect(),
            archive_mode: ArchiveMode::default(),
            custom_category: "body".to_string(),
        }
    }
}

impl SessionState {
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn archive_mode(&self) -> ArchiveMode {
        self.archive_mode
    }

    pub fn custom_category(&self) -> &str {
        &self.custom_category
    }

    pub fn post_comment(&mut self, text: &str) -> Result<(), SessionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SessionError::EmptyComment);
        }
        self.comments.push(trimmed.to_string());
        Ok(())
    }

    /// Sets the archive mode. The category is only taken in `Customize` mode.
    pub fn update_settings(
        &mut self,
        mode: ArchiveMode,
        category: Option<&str>,
    ) -> Result<(), SessionError> {
        if mode == ArchiveMode::Customize {
            if let Some(category) = category {
                let category = category.trim().to_lowercase();
                if !CATEGORY_OPTIONS.contains(&category.as_str()) {
                    return Err(SessionError::UnknownCategory(category));
                }
                self.custom_category = category;
            }
        }
        self.archive_mode = mode;
        Ok(())
    }

    /// Category the feed is classified against under `policy`.
    pub fn review_category<'a>(&'a self, policy: &'a ReviewPolicy) -> &'a str {
        if policy.honor_settings && self.archive_mode == ArchiveMode::Customize {
            &self.custom_category
        } else {
            &policy.review_category
        }
    }

    /// Classifies every comment in order, one call at a time.
    #[tracing::instrument(skip(self, engine, policy), fields(comments = self.comments.len(), mode = ?self.archive_mode))]
    pub async fn review(
        &self,
        engine: Option<&dyn CompletionEngine>,
        policy: &ReviewPolicy,
    ) -> Vec<ReviewedComment> {
        if policy.honor_settings && self.archive_mode == ArchiveMode::KeepAll {
            return self
                .comments
                .iter()
                .map(|comment| ReviewedComment {
                    comment: comment.clone(),
                    verdict: ReviewVerdict::Kept,
                })
                .collect();
        }

        let category = self.review_category(policy);
        let require_related = policy.honor_settings && self.archive_mode == ArchiveMode::Customize;

        let mut reviewed = Vec::with_capacity(self.comments.len());
        for comment in &self.comments {
            let verdict = match classify(comment, category, engine).await {
                Classification::Classified(result) => {
                    if result.is_bad && (!require_related || result.related_to_category) {
                        ReviewVerdict::Archived
                    } else {
                        ReviewVerdict::Kept
                    }
                }
                Classification::NoClient => ReviewVerdict::Unavailable,
                Classification::Failed { reason } => ReviewVerdict::Failed { reason },
            };
            reviewed.push(ReviewedComment {
                comment: comment.clone(),
                verdict,
            });
        }

        tracing::info!(
            archived = reviewed
                .iter()
                .filter(|r| r.verdict == ReviewVerdict::Archived)
                .count(),
            "Review completed"
        );
        reviewed
    }
}
