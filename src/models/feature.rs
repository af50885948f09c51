use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-submitted feature request tracked through a triage lifecycle.
///
/// A feature embeds its like and comment collections; the row is read and
/// written as one aggregate. Soft-deleted features disappear from listings
/// and search but stay fetchable by id until the owner hard-deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: FeatureStatus,
    /// Owner; immutable after creation.
    pub created_by: Uuid,
    pub likes: Likes,
    pub comments: Comments,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Triage status of a feature request.
///
/// A flat set, not a sequence: an admin may move a feature to any status at
/// any time, there is no enforced transition graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureStatus {
    Pending,
    UnderReview,
    Planned,
    InProgress,
    Complete,
}

impl FeatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under-review",
            Self::Planned => "planned",
            Self::InProgress => "in-progress",
            Self::Complete => "complete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "under-review" => Some(Self::UnderReview),
            "planned" => Some(Self::Planned),
            "in-progress" => Some(Self::InProgress),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

/// Like tally embedded in a feature.
///
/// `count` always equals `users.len()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Likes {
    pub count: i64,
    pub users: Vec<Uuid>,
}

/// Comment collection embedded in a feature.
///
/// `count` always equals `data.len()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comments {
    pub count: i64,
    pub data: Vec<Comment>,
}

/// A comment owned by its parent feature.
///
/// Editing replaces the entry: same id and author, new text and timestamp,
/// appended at the end of the sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    /// Author; only the author may delete the comment.
    pub comments_by: Uuid,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Input for submitting a new feature request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeatureInput {
    pub title: String,
    pub description: String,
}

/// Input for editing a feature's text. Omitted fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFeatureInput {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Input for an admin status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusInput {
    pub status: FeatureStatus,
}

/// Input for adding a comment or replacing a comment's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentInput {
    pub comment: String,
}
