use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{claims::Claims, jwt::JwtKeys};
use crate::{db::User, error::ApiError, state::AppState};

/// A bearer token that passed signature, issuer and audience checks.
pub struct VerifiedToken(pub Claims);

/// The verified caller together with their user row.
pub struct AuthUser(pub User);

fn bearer(parts: &Parts) -> Result<&str, ApiError> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for VerifiedToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer(parts)?;
        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;
        Ok(VerifiedToken(claims))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let VerifiedToken(claims) = VerifiedToken::from_request_parts(parts, state).await?;
        let user = state
            .db
            .find_user_by_uid(&claims.sub)
            .await
            .map_err(ApiError::store("load user"))?
            .ok_or_else(|| {
                warn!(uid = %claims.sub, "token for unknown user");
                ApiError::Unauthorized("User not found".into())
            })?;
        Ok(AuthUser(user))
    }
}
