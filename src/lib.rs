//! Feature request board backend.
//!
//! Users submit feature requests, like and comment on them, and
//! administrators triage status. The crate is organized as:
//!
//! - [`models`]: the Feature aggregate, its embedded like/comment
//!   collections, and the projections returned to callers.
//! - [`db`]: the SQLite-backed store. Each feature row is one aggregate;
//!   lifecycle, engagement, and listing operations live here.
//! - [`api`]: axum router, caller identity extraction, and request handlers.
//! - [`error`]: the error taxonomy shared by the store and the HTTP boundary.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
