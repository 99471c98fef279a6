use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{AddFavoriteRequest, AddFavoriteResponse, FavoritesResponse, RemovedResponse};
use crate::{auth::AuthUser, error::ApiError, error::StoreError, state::AppState};

pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/favorites", post(add_favorite).get(list_favorites))
        .route("/favorites/recipe/:recipe_id", delete(remove_favorite))
        .route("/favorites/clear", delete(clear_favorites))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<AddFavoriteRequest>,
) -> Result<(StatusCode, Json<AddFavoriteResponse>), ApiError> {
    if state
        .db
        .find_favorite(user.id, body.recipe_id)
        .await
        .map_err(ApiError::store("Failed to check favorites"))?
        .is_some()
    {
        return Err(ApiError::Conflict("Recipe already in favorites".into()));
    }
    if state
        .db
        .get_recipe(body.recipe_id)
        .await
        .map_err(ApiError::store("Failed to load recipe"))?
        .is_none()
    {
        return Err(ApiError::BadRequest("Recipe does not exist".into()));
    }

    let favorite_id = match state.db.insert_favorite(user.id, body.recipe_id).await {
        Ok(id) => id,
        Err(StoreError::Conflict) => {
            return Err(ApiError::Conflict("Recipe already in favorites".into()))
        }
        Err(e) => return Err(ApiError::store("Failed to add favorite")(e)),
    };
    info!(recipe_id = %body.recipe_id, "favorite added");

    Ok((
        StatusCode::CREATED,
        Json(AddFavoriteResponse {
            success: true,
            message: "Recipe added to favorites".into(),
            favorite_id,
        }),
    ))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<FavoritesResponse>, ApiError> {
    let favorites = state
        .db
        .list_favorites(user.id)
        .await
        .map_err(ApiError::store("Failed to load favorites"))?;
    Ok(Json(FavoritesResponse {
        success: true,
        favorites,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(recipe_id): Path<Uuid>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let affected_rows = state
        .db
        .delete_favorite(user.id, recipe_id)
        .await
        .map_err(ApiError::store("Failed to remove favorite"))?;
    if affected_rows == 0 {
        return Err(ApiError::NotFound("Favorite not found".into()));
    }
    Ok(Json(RemovedResponse {
        success: true,
        message: "Recipe removed from favorites".into(),
        affected_rows,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear_favorites(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<RemovedResponse>, ApiError> {
    let affected_rows = state
        .db
        .clear_favorites(user.id)
        .await
        .map_err(ApiError::store("Failed to clear favorites"))?;
    info!(affected_rows, "favorites cleared");
    Ok(Json(RemovedResponse {
        success: true,
        message: "All favorites cleared".into(),
        affected_rows,
    }))
}
