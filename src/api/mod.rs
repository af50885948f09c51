mod handlers;
mod identity;

pub use identity::{Identity, USER_ID_HEADER, USER_ROLE_HEADER};

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;

pub fn create_router(db: Database) -> Router {
    let api = Router::new()
        // Create and list feature requests
        .route("/features", post(handlers::create_feature))
        .route("/features", get(handlers::list_features))
        // Search feature requests (static segment wins over the id capture)
        .route("/features/search/{term}", get(handlers::search_features))
        // Single feature request
        .route("/features/{id}", get(handlers::get_feature))
        .route("/features/{id}/update", patch(handlers::update_feature))
        .route("/features/{id}/status", patch(handlers::update_status))
        // Soft delete (admin) and hard delete (owner) are distinct
        // operations with distinct authorization rules
        .route("/features/{id}", patch(handlers::soft_delete_feature))
        .route("/features/{id}", delete(handlers::hard_delete_feature))
        // Likes
        .route("/features/{id}/like", patch(handlers::like_feature))
        .route("/features/{id}/unlike", patch(handlers::unlike_feature))
        // Comments
        .route("/features/{id}/comments", patch(handlers::add_comment))
        .route(
            "/features/{id}/comments/{comment_id}",
            patch(handlers::edit_comment),
        )
        .route(
            "/features/{id}/comments/{comment_id}",
            delete(handlers::delete_comment),
        )
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .fallback(handlers::route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(db)
}
