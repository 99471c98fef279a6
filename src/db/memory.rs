use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    head_chars, preview, Database, FavoriteItem, NewRecipe, NewSuggestions, Recipe,
    RecipeSummary, SuggestionRecord, User, UserOptions, FAVORITE_PREVIEW_CHARS,
    RANDOM_RECIPE_PREVIEW_CHARS,
};
use crate::error::StoreError;

struct Favorite {
    id: Uuid,
    user_id: Uuid,
    recipe_id: Uuid,
    created_at: OffsetDateTime,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    recipes: Vec<Recipe>,
    suggestions: Vec<SuggestionRecord>,
    options: HashMap<Uuid, UserOptions>,
    favorites: Vec<Favorite>,
}

/// In-process `Database` for tests and local runs without Postgres.
///
/// Every operation takes the single table lock, so multi-step mutations are atomic.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write fail with a decode error until switched back off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn recipe_count(&self) -> usize {
        self.lock().map(|t| t.recipes.len()).unwrap_or(0)
    }

    pub fn suggestion_count(&self) -> usize {
        self.lock().map(|t| t.suggestions.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory tables poisoned".into()))
    }

    fn lock_for_write(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        self.lock()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn find_user_by_uid(&self, external_uid: &str) -> Result<Option<User>, StoreError> {
        let t = self.lock()?;
        Ok(t.users.iter().find(|u| u.external_uid == external_uid).cloned())
    }

    async fn create_user(
        &self,
        external_uid: &str,
        email: &str,
        username: &str,
    ) -> Result<User, StoreError> {
        let mut t = self.lock_for_write()?;
        if t.users.iter().any(|u| u.external_uid == external_uid) {
            return Err(StoreError::Conflict);
        }
        let user = User {
            id: Uuid::new_v4(),
            external_uid: external_uid.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn update_username(&self, user_id: Uuid, username: &str) -> Result<(), StoreError> {
        let mut t = self.lock_for_write()?;
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotFound)?;
        user.username = username.to_string();
        Ok(())
    }

    async fn delete_user_cascade(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.lock_for_write()?;
        if !t.users.iter().any(|u| u.id == user_id) {
            return Ok(false);
        }
        let owned: Vec<Uuid> = t
            .recipes
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.id)
            .collect();
        t.favorites
            .retain(|f| f.user_id != user_id && !owned.contains(&f.recipe_id));
        t.options.remove(&user_id);
        t.suggestions.retain(|s| s.user_id != user_id);
        t.recipes.retain(|r| r.user_id != user_id);
        t.users.retain(|u| u.id != user_id);
        Ok(true)
    }

    async fn find_recipe_id(&self, title: &str, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let t = self.lock()?;
        Ok(t.recipes
            .iter()
            .find(|r| r.title == title && r.user_id == user_id)
            .map(|r| r.id))
    }

    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Uuid, StoreError> {
        let mut t = self.lock_for_write()?;
        if let Some(existing) = t
            .recipes
            .iter()
            .find(|r| r.title == recipe.title && r.user_id == recipe.user_id)
        {
            return Ok(existing.id);
        }
        let id = Uuid::new_v4();
        t.recipes.push(Recipe {
            id,
            user_id: recipe.user_id,
            title: recipe.title,
            description: recipe.description,
            adventurousness: recipe.adventurousness,
            portions: recipe.portions,
            is_vegan: recipe.is_vegan,
            is_healthy: recipe.is_healthy,
            allergies: recipe.allergies,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
            steps: recipe.steps,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn get_recipe(&self, recipe_id: Uuid) -> Result<Option<Recipe>, StoreError> {
        let t = self.lock()?;
        Ok(t.recipes.iter().find(|r| r.id == recipe_id).cloned())
    }

    async fn random_recipes(&self, count: usize) -> Result<Vec<RecipeSummary>, StoreError> {
        let t = self.lock()?;
        let mut rng = rand::thread_rng();
        Ok(t.recipes
            .choose_multiple(&mut rng, count)
            .map(|r| RecipeSummary {
                id: r.id,
                title: r.title.clone(),
                description: head_chars(&r.description, RANDOM_RECIPE_PREVIEW_CHARS),
            })
            .collect())
    }

    async fn insert_suggestions(&self, record: NewSuggestions) -> Result<Uuid, StoreError> {
        let mut t = self.lock_for_write()?;
        let id = Uuid::new_v4();
        let [suggestion_1, suggestion_2, suggestion_3] = record.suggestions;
        t.suggestions.push(SuggestionRecord {
            id,
            user_id: record.user_id,
            input_prompt: record.input_prompt,
            suggestion_1,
            suggestion_2,
            suggestion_3,
            mode: record.mode,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn random_suggestion_rows(
        &self,
        limit: usize,
    ) -> Result<Vec<SuggestionRecord>, StoreError> {
        let t = self.lock()?;
        let mut rng = rand::thread_rng();
        Ok(t.suggestions
            .choose_multiple(&mut rng, limit)
            .cloned()
            .collect())
    }

    async fn get_options(&self, user_id: Uuid) -> Result<Option<UserOptions>, StoreError> {
        let t = self.lock()?;
        Ok(t.options.get(&user_id).cloned())
    }

    async fn upsert_options(&self, options: &UserOptions) -> Result<(), StoreError> {
        let mut t = self.lock_for_write()?;
        t.options.insert(options.user_id, options.clone());
        Ok(())
    }

    async fn find_favorite(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<Option<Uuid>, StoreError> {
        let t = self.lock()?;
        Ok(t.favorites
            .iter()
            .find(|f| f.user_id == user_id && f.recipe_id == recipe_id)
            .map(|f| f.id))
    }

    async fn insert_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> Result<Uuid, StoreError> {
        let mut t = self.lock_for_write()?;
        if t
            .favorites
            .iter()
            .any(|f| f.user_id == user_id && f.recipe_id == recipe_id)
        {
            return Err(StoreError::Conflict);
        }
        if !t.recipes.iter().any(|r| r.id == recipe_id) {
            return Err(StoreError::NotFound);
        }
        let id = Uuid::new_v4();
        t.favorites.push(Favorite {
            id,
            user_id,
            recipe_id,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn list_favorites(&self, user_id: Uuid) -> Result<Vec<FavoriteItem>, StoreError> {
        let t = self.lock()?;
        let mut items: Vec<FavoriteItem> = t
            .favorites
            .iter()
            .rev()
            .filter(|f| f.user_id == user_id)
            .filter_map(|f| {
                let recipe = t.recipes.iter().find(|r| r.id == f.recipe_id)?;
                Some(FavoriteItem {
                    id: f.id,
                    recipe_id: f.recipe_id,
                    title: recipe.title.clone(),
                    description: preview(&recipe.description, FAVORITE_PREVIEW_CHARS),
                    created_at: f.created_at,
                })
            })
            .collect();
        // insertion order breaks ties between equal timestamps
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn delete_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> Result<u64, StoreError> {
        let mut t = self.lock_for_write()?;
        let before = t.favorites.len();
        t.favorites
            .retain(|f| !(f.user_id == user_id && f.recipe_id == recipe_id));
        Ok((before - t.favorites.len()) as u64)
    }

    async fn clear_favorites(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut t = self.lock_for_write()?;
        let before = t.favorites.len();
        t.favorites.retain(|f| f.user_id != user_id);
        Ok((before - t.favorites.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_recipe(user_id: Uuid, title: &str, description: &str) -> NewRecipe {
        NewRecipe {
            user_id,
            title: title.into(),
            description: description.into(),
            adventurousness: 1,
            portions: 4,
            is_vegan: false,
            is_healthy: false,
            allergies: None,
            ingredients: None,
            instructions: None,
            steps: None,
        }
    }

    #[tokio::test]
    async fn insert_recipe_returns_existing_id_for_same_title() {
        let db = MemoryDatabase::new();
        let user = db.create_user("uid-1", "a@b.c", "a").await.unwrap();
        let first = db.insert_recipe(new_recipe(user.id, "Spicy Tofu", "one")).await.unwrap();
        let second = db.insert_recipe(new_recipe(user.id, "Spicy Tofu", "two")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(db.recipe_count(), 1);
        let stored = db.get_recipe(first).await.unwrap().unwrap();
        assert_eq!(stored.description, "one");
    }

    #[tokio::test]
    async fn cascade_delete_removes_owned_rows_only() {
        let db = MemoryDatabase::new();
        let alice = db.create_user("uid-a", "a@x.io", "alice").await.unwrap();
        let bob = db.create_user("uid-b", "b@x.io", "bob").await.unwrap();

        let alice_recipe = db.insert_recipe(new_recipe(alice.id, "Soup", "hot")).await.unwrap();
        let bob_recipe = db.insert_recipe(new_recipe(bob.id, "Salad", "cold")).await.unwrap();
        db.insert_favorite(bob.id, alice_recipe).await.unwrap();
        db.insert_favorite(bob.id, bob_recipe).await.unwrap();
        db.upsert_options(&UserOptions::defaults(alice.id)).await.unwrap();
        db.insert_suggestions(NewSuggestions {
            user_id: alice.id,
            input_prompt: "soup".into(),
            suggestions: [Some("a".into()), None, None],
            mode: "spice-it-up".into(),
        })
        .await
        .unwrap();

        assert!(db.delete_user_cascade(alice.id).await.unwrap());
        assert!(!db.delete_user_cascade(alice.id).await.unwrap());

        assert!(db.find_user_by_uid("uid-a").await.unwrap().is_none());
        assert!(db.get_recipe(alice_recipe).await.unwrap().is_none());
        assert!(db.get_options(alice.id).await.unwrap().is_none());
        assert_eq!(db.suggestion_count(), 0);
        let favs = db.list_favorites(bob.id).await.unwrap();
        assert_eq!(favs.len(), 1);
        assert_eq!(favs[0].recipe_id, bob_recipe);
    }

    #[tokio::test]
    async fn failed_writes_leave_tables_untouched() {
        let db = MemoryDatabase::new();
        let user = db.create_user("uid-1", "a@b.c", "a").await.unwrap();
        db.set_fail_writes(true);
        let err = db.insert_recipe(new_recipe(user.id, "Soup", "x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(db.delete_user_cascade(user.id).await.is_err());
        db.set_fail_writes(false);
        assert_eq!(db.recipe_count(), 0);
        assert!(db.find_user_by_uid("uid-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn favorites_are_listed_newest_first_with_preview() {
        let db = MemoryDatabase::new();
        let user = db.create_user("uid-1", "a@b.c", "a").await.unwrap();
        let long = "x".repeat(300);
        let r1 = db.insert_recipe(new_recipe(user.id, "First", &long)).await.unwrap();
        let r2 = db.insert_recipe(new_recipe(user.id, "Second", "short")).await.unwrap();
        db.insert_favorite(user.id, r1).await.unwrap();
        db.insert_favorite(user.id, r2).await.unwrap();

        assert!(matches!(
            db.insert_favorite(user.id, r1).await,
            Err(StoreError::Conflict)
        ));

        let favs = db.list_favorites(user.id).await.unwrap();
        assert_eq!(favs[0].title, "Second");
        assert_eq!(favs[1].description.chars().count(), FAVORITE_PREVIEW_CHARS + 3);

        assert_eq!(db.delete_favorite(user.id, r1).await.unwrap(), 1);
        assert_eq!(db.delete_favorite(user.id, r1).await.unwrap(), 0);
        assert_eq!(db.clear_favorites(user.id).await.unwrap(), 1);
    }
}
