//! Authentication extractor
//!
//! Validates the bearer token issued by the identity service and exposes the
//! verified identity of the caller.

use admit_common::AppError;
use admit_core::Snowflake;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::response::ApiError;
use crate::state::AppState;

/// Authenticated caller extracted from a JWT
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Snowflake,
    /// Email verified upstream
    pub email: String,
    /// Event staff
    pub admin: bool,
}

impl AuthUser {
    /// Reject callers without staff rights
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.admin {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.user_id, "Staff-only operation refused");
            Err(ApiError::App(AppError::InsufficientPermissions))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::MissingAuth)?;

        let app_state = AppState::from_ref(state);

        let claims = app_state.jwt_service().decode_token(bearer.token()).map_err(|e| {
            tracing::warn!(error = %e, "Invalid access token");
            ApiError::App(e)
        })?;

        let user_id = claims.user_id().map_err(|e| {
            tracing::warn!(error = %e, "Invalid user ID in token");
            ApiError::App(e)
        })?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            admin: claims.admin,
        })
    }
}
