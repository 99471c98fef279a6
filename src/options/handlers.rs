use axum::{extract::State, routing::get, Json, Router};
use tracing::{info, instrument};

use super::{
    dto::{OptionsRequest, OptionsView, SaveOptionsResponse},
    services::merge_options,
};
use crate::{auth::AuthUser, db::UserOptions, error::ApiError, state::AppState};

pub fn options_routes() -> Router<AppState> {
    Router::new().route("/options", get(get_options).post(save_options))
}

async fn current_options(state: &AppState, user_id: uuid::Uuid) -> Result<UserOptions, ApiError> {
    Ok(state
        .db
        .get_options(user_id)
        .await
        .map_err(ApiError::store("Failed to load options"))?
        .unwrap_or_else(|| UserOptions::defaults(user_id)))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_options(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<OptionsView>, ApiError> {
    Ok(Json(current_options(&state, user.id).await?.into()))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn save_options(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<OptionsRequest>,
) -> Result<Json<SaveOptionsResponse>, ApiError> {
    let current = current_options(&state, user.id).await?;
    let options = merge_options(current, body);
    state
        .db
        .upsert_options(&options)
        .await
        .map_err(ApiError::store("Failed to save options"))?;
    info!(
        portions = options.portions,
        adventurousness = options.adventurousness,
        "options saved"
    );
    Ok(Json(SaveOptionsResponse {
        success: true,
        message: "Options saved".into(),
        options: options.into(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn defaults_before_first_save() {
        let h = Harness::new();
        let (_, token) = h.signed_in("picky").await;
        let (status, body) = h.send(Method::GET, "/api/options", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "portions": 4,
                "adventurousness": 1,
                "allergies": [],
                "dietary": { "vegetarian": false, "low_fodmap": false }
            })
        );
    }

    #[tokio::test]
    async fn save_normalizes_and_persists() {
        let h = Harness::new();
        let (_, token) = h.signed_in("picky").await;
        let (status, body) = h
            .send(
                Method::POST,
                "/api/options",
                Some(&token),
                Some(json!({
                    "portions": 2,
                    "adventurousness": 9,
                    "allergies": ["shellfish", "lowfodmap"]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["options"]["adventurousness"], 6);

        let (_, body) = h.send(Method::GET, "/api/options", Some(&token), None).await;
        assert_eq!(body["portions"], 2);
        assert_eq!(body["allergies"], json!(["shellfish"]));
        assert_eq!(body["dietary"]["low_fodmap"], true);
    }
}
