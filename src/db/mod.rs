//! Persistence interface and its two implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;
use crate::parsing::{DietaryFlags, IngredientLine};

pub mod memory;
pub mod postgres;

pub use memory::MemoryDatabase;
pub use postgres::PgDatabase;

pub const DEFAULT_ADVENTUROUSNESS: u8 = 1;
pub const RANDOM_RECIPE_PREVIEW_CHARS: usize = 120;
pub const FAVORITE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub external_uid: String,
    pub email: String,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A persisted recipe. `description` always holds the full generated text; the
/// structured fields are derived from it and may be missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub adventurousness: u8,
    pub portions: u8,
    pub is_vegan: bool,
    pub is_healthy: bool,
    pub allergies: Option<Vec<String>>,
    pub ingredients: Option<Vec<IngredientLine>>,
    pub instructions: Option<String>,
    pub steps: Option<Vec<String>>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Recipe {
    pub fn has_structured_data(&self) -> bool {
        self.ingredients.as_ref().is_some_and(|v| !v.is_empty())
            || self.steps.as_ref().is_some_and(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub adventurousness: u8,
    pub portions: u8,
    pub is_vegan: bool,
    pub is_healthy: bool,
    pub allergies: Option<Vec<String>>,
    pub ingredients: Option<Vec<IngredientLine>>,
    pub instructions: Option<String>,
    pub steps: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

/// The three raw idea blocks of one response, stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub input_prompt: String,
    pub suggestion_1: Option<String>,
    pub suggestion_2: Option<String>,
    pub suggestion_3: Option<String>,
    pub mode: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SuggestionRecord {
    pub fn suggestions(&self) -> impl Iterator<Item = &str> {
        [&self.suggestion_1, &self.suggestion_2, &self.suggestion_3]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NewSuggestions {
    pub user_id: Uuid,
    pub input_prompt: String,
    pub suggestions: [Option<String>; 3],
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOptions {
    pub user_id: Uuid,
    pub portions: u8,
    pub adventurousness: u8,
    pub allergies: Vec<String>,
    pub dietary: DietaryFlags,
}

impl UserOptions {
    pub fn defaults(user_id: Uuid) -> Self {
        Self {
            user_id,
            portions: crate::parsing::sections::DEFAULT_PORTIONS,
            adventurousness: DEFAULT_ADVENTUROUSNESS,
            allergies: Vec::new(),
            dietary: DietaryFlags::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteItem {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait Database: Send + Sync {
    async fn find_user_by_uid(&self, external_uid: &str) -> Result<Option<User>, StoreError>;
    async fn create_user(
        &self,
        external_uid: &str,
        email: &str,
        username: &str,
    ) -> Result<User, StoreError>;
    async fn update_username(&self, user_id: Uuid, username: &str) -> Result<(), StoreError>;
    /// Removes the user and everything they own in one transaction. Returns false
    /// when no such user existed.
    async fn delete_user_cascade(&self, user_id: Uuid) -> Result<bool, StoreError>;

    async fn find_recipe_id(&self, title: &str, user_id: Uuid) -> Result<Option<Uuid>, StoreError>;
    /// Inserts unless `(title, user_id)` already exists; either way returns the row id.
    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Uuid, StoreError>;
    async fn get_recipe(&self, recipe_id: Uuid) -> Result<Option<Recipe>, StoreError>;
    async fn random_recipes(&self, count: usize) -> Result<Vec<RecipeSummary>, StoreError>;

    async fn insert_suggestions(&self, record: NewSuggestions) -> Result<Uuid, StoreError>;
    async fn random_suggestion_rows(&self, limit: usize)
        -> Result<Vec<SuggestionRecord>, StoreError>;

    async fn get_options(&self, user_id: Uuid) -> Result<Option<UserOptions>, StoreError>;
    async fn upsert_options(&self, options: &UserOptions) -> Result<(), StoreError>;

    async fn find_favorite(&self, user_id: Uuid, recipe_id: Uuid)
        -> Result<Option<Uuid>, StoreError>;
    async fn insert_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> Result<Uuid, StoreError>;
    /// Newest first, descriptions shortened for list display.
    async fn list_favorites(&self, user_id: Uuid) -> Result<Vec<FavoriteItem>, StoreError>;
    async fn delete_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> Result<u64, StoreError>;
    async fn clear_favorites(&self, user_id: Uuid) -> Result<u64, StoreError>;
}

/// First `max` characters of `text`.
pub fn head_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// First `max` characters of `text`, with "..." appended when anything was cut.
pub fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", head_chars(text, max))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_only_marks_cut_text() {
        assert_eq!(preview("short", 200), "short");
        let long = "é".repeat(250);
        let p = preview(&long, FAVORITE_PREVIEW_CHARS);
        assert_eq!(p.chars().count(), 203);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn suggestions_skip_blank_slots() {
        let record = SuggestionRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            input_prompt: "tofu".into(),
            suggestion_1: Some("🌶️ **Chili Tofu** — hot".into()),
            suggestion_2: Some("   ".into()),
            suggestion_3: None,
            mode: "spice-it-up".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let all: Vec<&str> = record.suggestions().collect();
        assert_eq!(all, vec!["🌶️ **Chili Tofu** — hot"]);
    }
}
