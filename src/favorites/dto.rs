use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::FavoriteItem;

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub recipe_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct AddFavoriteResponse {
    pub success: bool,
    pub message: String,
    pub favorite_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub success: bool,
    pub favorites: Vec<FavoriteItem>,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub success: bool,
    pub message: String,
    pub affected_rows: u64,
}
