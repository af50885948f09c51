use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FeatureStatus;

/// Denormalized user fields embedded in responses in place of a bare id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// Like tally with user references expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikesView {
    pub count: i64,
    pub users: Vec<UserRef>,
}

/// A comment with its author reference expanded.
///
/// `comments_by` is `None` when the author record no longer resolves
/// (author soft-deleted); the comment itself is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub comments_by: Option<UserRef>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Comment collection with author references expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentsView {
    pub count: i64,
    pub data: Vec<CommentView>,
}

/// Full feature projection: detail and mutation responses, comment bodies
/// included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: FeatureStatus,
    pub created_by: UserRef,
    pub likes: LikesView,
    pub comments: CommentsView,
    pub created_at: DateTime<Utc>,
}

/// Trimmed listing projection: comment bodies are dropped, only the count
/// survives, to bound payload size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureListItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: FeatureStatus,
    pub created_by: UserRef,
    pub created_at: DateTime<Utc>,
    pub likes: LikesView,
    pub total_comments: i64,
}

/// Pagination envelope. `total` counts rows matching the database-level
/// predicate; a page may still carry fewer items when owner references
/// fail to resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_more_next: bool,
    pub has_more_prev: bool,
}

impl PageInfo {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(limit.max(1));
        Self {
            page,
            limit,
            total,
            total_pages,
            has_more_next: page < total_pages,
            has_more_prev: page > 1,
        }
    }
}

/// One page of listing results with the status breakdown alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturePage {
    pub items: Vec<FeatureListItem>,
    pub page_info: PageInfo,
    /// Status value → count over the same predicate as the listing.
    pub status_counts: BTreeMap<String, u64>,
}

/// One page of search results, full projections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub items: Vec<FeatureView>,
    pub page_info: PageInfo,
}
