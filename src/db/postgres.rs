use async_trait::async_trait;
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    head_chars, preview, Database, FavoriteItem, NewRecipe, NewSuggestions, Recipe,
    RecipeSummary, SuggestionRecord, User, UserOptions, FAVORITE_PREVIEW_CHARS,
    RANDOM_RECIPE_PREVIEW_CHARS,
};
use crate::error::StoreError;
use crate::parsing::{DietaryFlags, IngredientLine};

#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    external_uid: String,
    email: String,
    username: String,
    created_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            external_uid: r.external_uid,
            email: r.email,
            username: r.username,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct RecipeRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: String,
    adventurousness: i16,
    portions: i16,
    is_vegan: bool,
    is_healthy: bool,
    allergies: Option<Json<Vec<String>>>,
    ingredients: Option<Json<Vec<IngredientLine>>>,
    instructions: Option<String>,
    steps: Option<Json<Vec<String>>>,
    created_at: OffsetDateTime,
}

impl From<RecipeRow> for Recipe {
    fn from(r: RecipeRow) -> Self {
        Recipe {
            id: r.id,
            user_id: r.user_id,
            title: r.title,
            description: r.description,
            adventurousness: small_to_u8(r.adventurousness),
            portions: small_to_u8(r.portions),
            is_vegan: r.is_vegan,
            is_healthy: r.is_healthy,
            allergies: r.allergies.map(|j| j.0),
            ingredients: r.ingredients.map(|j| j.0),
            instructions: r.instructions,
            steps: r.steps.map(|j| j.0),
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct SuggestionRow {
    id: Uuid,
    user_id: Uuid,
    input_prompt: String,
    suggestion_1: Option<String>,
    suggestion_2: Option<String>,
    suggestion_3: Option<String>,
    mode: String,
    created_at: OffsetDateTime,
}

#[derive(FromRow)]
struct OptionsRow {
    user_id: Uuid,
    portions: i16,
    adventurousness: i16,
    allergies: Json<Vec<String>>,
    vegetarian: bool,
    low_fodmap: bool,
}

#[derive(FromRow)]
struct FavoriteRow {
    id: Uuid,
    recipe_id: Uuid,
    title: String,
    description: String,
    created_at: OffsetDateTime,
}

fn small_to_u8(v: i16) -> u8 {
    v.clamp(0, u8::MAX as i16) as u8
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl Database for PgDatabase {
    async fn find_user_by_uid(&self, external_uid: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, external_uid, email, username, created_at
            FROM users
            WHERE external_uid = $1
            "#,
        )
        .bind(external_uid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn create_user(
        &self,
        external_uid: &str,
        email: &str,
        username: &str,
    ) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, external_uid, email, username)
            VALUES ($1, $2, $3, $4)
            RETURNING id, external_uid, email, username, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(external_uid)
        .bind(email)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(row.into())
    }

    async fn update_username(&self, user_id: Uuid, username: &str) -> Result<(), StoreError> {
        let res = sqlx::query(r#"UPDATE users SET username = $1 WHERE id = $2"#)
            .bind(username)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_user_cascade(&self, user_id: Uuid) -> Result<bool, StoreError> {
        // Dropping `tx` on an early return rolls back and releases the connection.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM favorites
            WHERE user_id = $1
               OR recipe_id IN (SELECT id FROM recipes WHERE user_id = $1)
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(r#"DELETE FROM options WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(r#"DELETE FROM recipe_suggestions WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(r#"DELETE FROM recipes WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let users = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if users.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn find_recipe_id(&self, title: &str, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT id FROM recipes WHERE title = $1 AND user_id = $2"#,
        )
        .bind(title)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Uuid, StoreError> {
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO recipes (id, user_id, title, description, adventurousness, portions,
                                 is_vegan, is_healthy, allergies, ingredients, instructions, steps)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (user_id, title) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(recipe.user_id)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(recipe.adventurousness as i16)
        .bind(recipe.portions as i16)
        .bind(recipe.is_vegan)
        .bind(recipe.is_healthy)
        .bind(recipe.allergies.map(Json))
        .bind(recipe.ingredients.map(Json))
        .bind(recipe.instructions)
        .bind(recipe.steps.map(Json))
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(id) => Ok(id),
            // lost a race with a concurrent save of the same title
            None => self
                .find_recipe_id(&recipe.title, recipe.user_id)
                .await?
                .ok_or(StoreError::NotFound),
        }
    }

    async fn get_recipe(&self, recipe_id: Uuid) -> Result<Option<Recipe>, StoreError> {
        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, user_id, title, description, adventurousness, portions, is_vegan,
                   is_healthy, allergies, ingredients, instructions, steps, created_at
            FROM recipes
            WHERE id = $1
            "#,
        )
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Recipe::from))
    }

    async fn random_recipes(&self, count: usize) -> Result<Vec<RecipeSummary>, StoreError> {
        let rows = sqlx::query_as::<_, (Uuid, String, String)>(
            r#"SELECT id, title, description FROM recipes ORDER BY random() LIMIT $1"#,
        )
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, title, description)| RecipeSummary {
                id,
                title,
                description: head_chars(&description, RANDOM_RECIPE_PREVIEW_CHARS),
            })
            .collect())
    }

    async fn insert_suggestions(&self, record: NewSuggestions) -> Result<Uuid, StoreError> {
        let [s1, s2, s3] = record.suggestions;
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO recipe_suggestions (id, user_id, input_prompt, suggestion_1,
                                            suggestion_2, suggestion_3, mode)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.user_id)
        .bind(record.input_prompt)
        .bind(s1)
        .bind(s2)
        .bind(s3)
        .bind(record.mode)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn random_suggestion_rows(
        &self,
        limit: usize,
    ) -> Result<Vec<SuggestionRecord>, StoreError> {
        let rows = sqlx::query_as::<_, SuggestionRow>(
            r#"
            SELECT id, user_id, input_prompt, suggestion_1, suggestion_2, suggestion_3,
                   mode, created_at
            FROM recipe_suggestions
            ORDER BY random()
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| SuggestionRecord {
                id: r.id,
                user_id: r.user_id,
                input_prompt: r.input_prompt,
                suggestion_1: r.suggestion_1,
                suggestion_2: r.suggestion_2,
                suggestion_3: r.suggestion_3,
                mode: r.mode,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn get_options(&self, user_id: Uuid) -> Result<Option<UserOptions>, StoreError> {
        let row = sqlx::query_as::<_, OptionsRow>(
            r#"
            SELECT user_id, portions, adventurousness, allergies, vegetarian, low_fodmap
            FROM options
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| UserOptions {
            user_id: r.user_id,
            portions: small_to_u8(r.portions),
            adventurousness: small_to_u8(r.adventurousness),
            allergies: r.allergies.0,
            dietary: DietaryFlags {
                vegetarian: r.vegetarian,
                low_fodmap: r.low_fodmap,
            },
        }))
    }

    async fn upsert_options(&self, options: &UserOptions) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO options (user_id, portions, adventurousness, allergies, vegetarian, low_fodmap)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE
            SET portions = EXCLUDED.portions,
                adventurousness = EXCLUDED.adventurousness,
                allergies = EXCLUDED.allergies,
                vegetarian = EXCLUDED.vegetarian,
                low_fodmap = EXCLUDED.low_fodmap,
                updated_at = now()
            "#,
        )
        .bind(options.user_id)
        .bind(options.portions as i16)
        .bind(options.adventurousness as i16)
        .bind(Json(&options.allergies))
        .bind(options.dietary.vegetarian)
        .bind(options.dietary.low_fodmap)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_favorite(
        &self,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<Option<Uuid>, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT id FROM favorites WHERE user_id = $1 AND recipe_id = $2"#,
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> Result<Uuid, StoreError> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO favorites (id, user_id, recipe_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn list_favorites(&self, user_id: Uuid) -> Result<Vec<FavoriteItem>, StoreError> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            r#"
            SELECT f.id, f.recipe_id, r.title, r.description, f.created_at
            FROM favorites f
            JOIN recipes r ON r.id = f.recipe_id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| FavoriteItem {
                id: r.id,
                recipe_id: r.recipe_id,
                title: r.title,
                description: preview(&r.description, FAVORITE_PREVIEW_CHARS),
                created_at: r.created_at,
            })
            .collect())
    }

    async fn delete_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> Result<u64, StoreError> {
        let res = sqlx::query(r#"DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2"#)
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn clear_favorites(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let res = sqlx::query(r#"DELETE FROM favorites WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallint_conversion_saturates() {
        assert_eq!(small_to_u8(-3), 0);
        assert_eq!(small_to_u8(6), 6);
        assert_eq!(small_to_u8(900), 255);
    }

    #[test]
    fn recipe_row_unwraps_json_columns() {
        let row = RecipeRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Rice".into(),
            description: "Ingredients:\n- 2 cups rice".into(),
            adventurousness: 2,
            portions: 4,
            is_vegan: true,
            is_healthy: false,
            allergies: None,
            ingredients: Some(Json(vec![IngredientLine::item(Some("2"), Some("cups"), "rice")])),
            instructions: None,
            steps: Some(Json(vec!["Cook rice".into()])),
            created_at: OffsetDateTime::now_utc(),
        };
        let recipe = Recipe::from(row);
        assert_eq!(recipe.portions, 4);
        assert_eq!(recipe.steps.as_deref(), Some(&["Cook rice".to_string()][..]));
        assert!(recipe.has_structured_data());
    }
}
