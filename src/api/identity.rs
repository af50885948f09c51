//! Caller identity resolution.
//!
//! Authentication happens upstream: a gateway validates the caller's
//! credential and injects the resolved identity as trusted headers. The
//! board only reads `X-User-Id` and `X-User-Role` and passes them
//! explicitly into every store operation. Handlers that require a
//! signed-in caller take [`Identity`] as an extractor; requests without a
//! valid `X-User-Id` are rejected with 401.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Role;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller: `{userId, role}` as resolved upstream.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admin gate used by status and soft-delete handlers. The store does
    /// not re-check the role.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or(ApiError::Unauthorized)?;

        // An unknown or absent role header downgrades to a regular user.
        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(Role::from_str)
            .unwrap_or(Role::User);

        Ok(Identity { user_id, role })
    }
}
