use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{MessageResponse, PublicUser, UpsertUserRequest, UserResponse},
    extractors::{AuthUser, VerifiedToken},
    is_valid_email,
};
use crate::{error::ApiError, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(upsert_user))
        .route("/users/me", delete(delete_me))
        .route("/me", get(get_me))
}

/// Find-or-create the row for the token's uid.
#[instrument(skip(state, token, payload))]
pub async fn upsert_user(
    State(state): State<AppState>,
    VerifiedToken(token): VerifiedToken,
    Json(payload): Json<UpsertUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let email = payload
        .email
        .or(token.email)
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_default();
    if !is_valid_email(&email) {
        warn!(uid = %token.sub, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    let username = payload
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    if let Some(mut user) = state
        .db
        .find_user_by_uid(&token.sub)
        .await
        .map_err(ApiError::store("load user"))?
    {
        if let Some(name) = username.filter(|n| *n != user.username) {
            state
                .db
                .update_username(user.id, &name)
                .await
                .map_err(ApiError::store("update username"))?;
            info!(user_id = %user.id, "username updated");
            user.username = name;
        }
        return Ok((
            StatusCode::OK,
            Json(UserResponse {
                success: true,
                user: user.into(),
            }),
        ));
    }

    let username = username.unwrap_or_else(|| default_username(&email));
    let user = state
        .db
        .create_user(&token.sub, &email, &username)
        .await
        .map_err(ApiError::store("create user"))?;
    info!(user_id = %user.id, "user created");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(user))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip(state, user))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .db
        .delete_user_cascade(user.id)
        .await
        .map_err(ApiError::store("delete user"))?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".into()));
    }
    info!(user_id = %user.id, "user and owned data deleted");
    Ok(Json(MessageResponse {
        success: true,
        message: "Account deleted".into(),
    }))
}

fn default_username(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::test_support::Harness;
    use axum::http::Method;
    use serde_json::json;

    #[test]
    fn username_defaults_to_email_local_part() {
        assert_eq!(default_username("chef.anna@example.com"), "chef.anna");
    }

    #[tokio::test]
    async fn first_post_creates_then_returns_existing() {
        let h = Harness::new();
        let token = h.token("uid-1", Some("Cook@Example.com"));

        let (status, body) = h
            .send(Method::POST, "/api/users", Some(&token), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "cook@example.com");
        assert_eq!(body["user"]["username"], "cook");

        let (status, body) = h
            .send(
                Method::POST,
                "/api/users",
                Some(&token),
                Some(json!({ "username": "Chef" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "Chef");
    }

    #[tokio::test]
    async fn rejects_missing_or_bad_token() {
        let h = Harness::new();
        let (status, body) = h.send(Method::GET, "/api/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = h.send(Method::GET, "/api/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_requires_user_row() {
        let h = Harness::new();
        let token = h.token("ghost", None);
        let (status, body) = h.send(Method::GET, "/api/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "User not found");

        let (user, token) = h.signed_in("real").await;
        let (status, body) = h.send(Method::GET, "/api/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], user.id.to_string());
    }

    #[tokio::test]
    async fn delete_me_removes_account() {
        let h = Harness::new();
        let (_, token) = h.signed_in("leaving").await;
        let (status, _) = h
            .send(Method::DELETE, "/api/users/me", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(h.db.find_user_by_uid("leaving").await.unwrap().is_none());
    }
}
