//! Bearer-token admin authentication.
//!
//! Admin routes take an `AdminUser` extractor argument; it checks the
//! `Authorization: Bearer <token>` header against the configured admin
//! token and yields the authenticated principal. When no token is
//! configured, admin routes are disabled rather than open.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use mealpass_core::Principal;

use crate::error::ApiError;
use crate::state::AppState;

pub struct AdminUser(pub Principal);

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let expected = state
            .config
            .require_admin_token()
            .map_err(|_| ApiError::AdminDisabled)?;

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;
        if token != expected {
            return Err(ApiError::Forbidden);
        }

        Ok(Self(Principal { subject: "admin".into(), is_admin: true }))
    }
}
