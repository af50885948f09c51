use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::Identity;
use crate::db::{Database, SortKey, SortOrder};
use crate::error::ApiError;
use crate::models::*;

const DEFAULT_PAGE_SIZE: u64 = 10;

// ============================================================
// Response envelopes
// ============================================================

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FeatureResponse {
    pub message: &'static str,
    pub feature: FeatureView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureListResponse {
    pub message: &'static str,
    pub features: Vec<FeatureListItem>,
    pub page_info: PageInfo,
    pub status_counts: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub message: &'static str,
    pub features: Vec<FeatureView>,
    pub page_info: PageInfo,
}

// ============================================================
// Health and fallback
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "Feature board API is running" }))
}

pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

// ============================================================
// Feature lifecycle
// ============================================================

pub async fn create_feature(
    State(db): State<Database>,
    identity: Identity,
    Json(input): Json<CreateFeatureInput>,
) -> Result<(StatusCode, Json<FeatureResponse>), ApiError> {
    let feature = db.create_feature(identity.user_id, input)?;
    Ok((
        StatusCode::CREATED,
        Json(FeatureResponse {
            message: "Feature created successfully",
            feature,
        }),
    ))
}

pub async fn update_feature(
    State(db): State<Database>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateFeatureInput>,
) -> Result<Json<FeatureResponse>, ApiError> {
    let feature = db.update_feature(id, identity.user_id, input)?;
    Ok(Json(FeatureResponse {
        message: "Feature updated successfully",
        feature,
    }))
}

pub async fn update_status(
    State(db): State<Database>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateStatusInput>,
) -> Result<Json<FeatureResponse>, ApiError> {
    identity.require_admin()?;
    let feature = db.update_status(id, input.status)?;
    Ok(Json(FeatureResponse {
        message: "Feature status updated successfully",
        feature,
    }))
}

pub async fn soft_delete_feature(
    State(db): State<Database>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<FeatureResponse>, ApiError> {
    identity.require_admin()?;
    let feature = db.soft_delete_feature(id)?;
    Ok(Json(FeatureResponse {
        message: "Feature deleted successfully",
        feature,
    }))
}

pub async fn hard_delete_feature(
    State(db): State<Database>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    db.hard_delete_feature(id, identity.user_id)?;
    Ok(Json(MessageResponse {
        message: "Feature deleted permanently",
    }))
}

// ============================================================
// Engagement
// ============================================================

pub async fn like_feature(
    State(db): State<Database>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<FeatureResponse>, ApiError> {
    let feature = db.like_feature(id, identity.user_id)?;
    Ok(Json(FeatureResponse {
        message: "Feature liked successfully",
        feature,
    }))
}

pub async fn unlike_feature(
    State(db): State<Database>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<FeatureResponse>, ApiError> {
    let feature = db.unlike_feature(id, identity.user_id)?;
    Ok(Json(FeatureResponse {
        message: "Feature unliked successfully",
        feature,
    }))
}

pub async fn add_comment(
    State(db): State<Database>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(input): Json<CommentInput>,
) -> Result<Json<FeatureResponse>, ApiError> {
    let feature = db.add_comment(id, identity.user_id, input.comment)?;
    Ok(Json(FeatureResponse {
        message: "Comment added successfully",
        feature,
    }))
}

pub async fn edit_comment(
    State(db): State<Database>,
    _identity: Identity,
    Path((feature_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<CommentInput>,
) -> Result<Json<FeatureResponse>, ApiError> {
    let feature = db.edit_comment(feature_id, comment_id, input.comment)?;
    Ok(Json(FeatureResponse {
        message: "Comment updated successfully",
        feature,
    }))
}

pub async fn delete_comment(
    State(db): State<Database>,
    identity: Identity,
    Path((feature_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<FeatureResponse>, ApiError> {
    let feature = db.delete_comment(feature_id, comment_id, identity.user_id)?;
    Ok(Json(FeatureResponse {
        message: "Comment deleted successfully",
        feature,
    }))
}

// ============================================================
// Queries
// ============================================================

/// Query parameters for the listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ListFeaturesQuery {
    pub page: Option<u64>,
    #[serde(alias = "pageSize")]
    pub limit: Option<u64>,
    pub status: Option<FeatureStatus>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
}

pub async fn list_features(
    State(db): State<Database>,
    Query(query): Query<ListFeaturesQuery>,
) -> Result<Json<FeatureListResponse>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let sort = query.sort_by.as_deref().and_then(SortKey::from_param);
    let order = query
        .sort_order
        .as_deref()
        .map(SortOrder::from_param)
        .unwrap_or_default();

    let result = db.list_features(page, limit, query.status, sort, order)?;
    Ok(Json(FeatureListResponse {
        message: "All features retrieved successfully",
        features: result.items,
        page_info: result.page_info,
        status_counts: result.status_counts,
    }))
}

pub async fn get_feature(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeatureResponse>, ApiError> {
    let feature = db.get_feature_view(id)?;
    Ok(Json(FeatureResponse {
        message: "Feature fetched successfully",
        feature,
    }))
}

/// Query parameters for the search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchFeaturesQuery {
    pub page: Option<u64>,
    #[serde(alias = "pageSize")]
    pub limit: Option<u64>,
}

pub async fn search_features(
    State(db): State<Database>,
    Path(term): Path<String>,
    Query(query): Query<SearchFeaturesQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

    let result = db.search_features(&term, page, limit)?;
    Ok(Json(SearchResponse {
        message: "Search results retrieved successfully",
        features: result.items,
        page_info: result.page_info,
    }))
}
