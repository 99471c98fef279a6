use axum::{
    extract::{Path, Query, State},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use rand::{seq::SliceRandom, Rng};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        CountQuery, GenerateRequest, GenerateResponse, Inspiration, InspirationResponse,
        RandomRecipesResponse, RecipeResponse, SaveSuggestionRequest, SaveSuggestionResponse,
    },
    services::{raw_idea_blocks, store_recipe, store_suggestions, RecipeDraft},
};
use crate::{
    ai::generate_distinct,
    auth::AuthUser,
    db::{Database, UserOptions},
    error::ApiError,
    parsing::{
        build_full_prompt, build_system_message, parse_idea_response, strip_leaked_guidance,
        PromptInputs,
    },
    render::{render_idea_cards, render_recipe_html},
    state::AppState,
};

const DEFAULT_COUNT: usize = 3;
const MAX_COUNT: usize = 20;
const INSPIRATION_SAMPLE_ROWS: usize = 10;
const SEED_RANGE: std::ops::Range<u32> = 0..100_000;

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/save-suggestion", post(save_suggestion))
        .route("/recipes/random", get(random_recipes))
        .route("/recipes/inspiration", get(inspiration))
        .route("/recipes/:id", get(get_recipe))
        .route("/recipes/:id/html", get(get_recipe_html))
}

/// Stored options, falling back to defaults when none exist or the lookup fails.
async fn options_or_default(db: &dyn Database, user_id: Uuid) -> (UserOptions, bool) {
    match db.get_options(user_id).await {
        Ok(Some(o)) => (o, true),
        Ok(None) => (UserOptions::defaults(user_id), false),
        Err(e) => {
            warn!(error = %e, user_id = %user_id, "load options failed; using defaults");
            (UserOptions::defaults(user_id), false)
        }
    }
}

fn clamp_portions(p: i64) -> u8 {
    p.clamp(1, 8) as u8
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn generate(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let prompt = body.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::BadRequest("Prompt is required".into()));
    }

    let (options, _) = options_or_default(state.db.as_ref(), user.id).await;
    let inputs = PromptInputs {
        mode: body.mode,
        portions: body.portions.map_or(options.portions, clamp_portions),
        detailed: body.is_detailed_recipe,
        adventurousness: options.adventurousness,
        allergies: &options.allergies,
        dietary: options.dietary,
        recipe_idea: body.recipe_idea.as_ref(),
    };
    let system = build_system_message(&inputs);
    let seed = rand::thread_rng().gen_range(SEED_RANGE);
    let full_prompt = build_full_prompt(&system, prompt, seed);

    let text = generate_distinct(
        state.generator.as_ref(),
        &state.responses,
        prompt,
        &full_prompt,
        state.config.ai.max_retries,
    )
    .await?;

    let model = state.generator.model_name().to_string();
    if body.is_detailed_recipe {
        return Ok(Json(GenerateResponse {
            message: text,
            model,
            ideas: None,
            html: None,
        }));
    }

    let ideas = parse_idea_response(&text);
    // a lost suggestion row must not hide the ideas from the user
    if let Err(e) = store_suggestions(
        state.db.as_ref(),
        prompt,
        raw_idea_blocks(&text),
        body.mode,
        user.id,
    )
    .await
    {
        warn!(error = %e, "store suggestions failed");
    }

    Ok(Json(GenerateResponse {
        message: strip_leaked_guidance(&text),
        model,
        html: Some(render_idea_cards(&ideas)),
        ideas: Some(ideas),
    }))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn save_suggestion(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<SaveSuggestionRequest>,
) -> Result<Json<SaveSuggestionResponse>, ApiError> {
    let title = body.title.as_deref().map(str::trim).unwrap_or_default();
    let description = body.description.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() || description.is_empty() {
        return Err(ApiError::BadRequest(
            "Title and description are required".into(),
        ));
    }

    let (options, stored) = options_or_default(state.db.as_ref(), user.id).await;
    let portions = body
        .portions
        .map(clamp_portions)
        .or(stored.then_some(options.portions));

    let draft = RecipeDraft {
        user_id: user.id,
        title: title.to_string(),
        full_text: description.to_string(),
        adventurousness: options.adventurousness,
        portions,
        is_vegan: body.mode.is_vegan(),
        is_healthy: body.mode.is_healthy(),
        ingredients: body.ingredients.and_then(|i| i.into_value()),
        instructions: body.instructions,
        steps: body.steps.and_then(|s| s.into_value()),
    };
    let recipe_id = store_recipe(state.db.as_ref(), draft)
        .await
        .map_err(ApiError::store("Failed to save recipe"))?;

    info!(recipe_id = %recipe_id, "recipe saved");
    Ok(Json(SaveSuggestionResponse {
        success: true,
        message: "Recipe saved successfully".into(),
        recipe_id,
    }))
}

#[instrument(skip(state))]
pub async fn random_recipes(
    State(state): State<AppState>,
    Query(q): Query<CountQuery>,
) -> Result<Json<RandomRecipesResponse>, ApiError> {
    let count = q.count.unwrap_or(DEFAULT_COUNT).clamp(1, MAX_COUNT);
    let recipes = state
        .db
        .random_recipes(count)
        .await
        .map_err(ApiError::store("Failed to load recipes"))?;
    Ok(Json(RandomRecipesResponse {
        success: true,
        recipes,
    }))
}

/// Raw suggestion blocks from random past responses, shuffled.
#[instrument(skip(state))]
pub async fn inspiration(
    State(state): State<AppState>,
    Query(q): Query<CountQuery>,
) -> Result<Json<InspirationResponse>, ApiError> {
    let count = q.count.unwrap_or(DEFAULT_COUNT).clamp(1, MAX_COUNT);
    let rows = state
        .db
        .random_suggestion_rows(INSPIRATION_SAMPLE_ROWS)
        .await
        .map_err(ApiError::store("Failed to load inspiration"))?;

    let mut pool: Vec<String> = rows
        .iter()
        .flat_map(|r| r.suggestions())
        .map(str::to_string)
        .collect();
    pool.shuffle(&mut rand::thread_rng());

    let inspirations = pool
        .into_iter()
        .take(count)
        .map(|title| Inspiration {
            title,
            description: String::new(),
        })
        .collect();
    Ok(Json(InspirationResponse {
        success: true,
        inspirations,
    }))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let recipe = state
        .db
        .get_recipe(id)
        .await
        .map_err(ApiError::store("Failed to load recipe"))?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;
    Ok(Json(RecipeResponse {
        success: true,
        recipe: recipe.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_recipe_html(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, ApiError> {
    let recipe = state
        .db
        .get_recipe(id)
        .await
        .map_err(ApiError::store("Failed to load recipe"))?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;
    Ok(Html(render_recipe_html(&recipe)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn generate_returns_three_ideas_and_stores_blocks() {
        let h = Harness::new();
        let (_, token) = h.signed_in("cook").await;
        let (status, body) = h
            .send(
                Method::POST,
                "/api/generate",
                Some(&token),
                Some(json!({ "prompt": "tofu", "mode": "general" })),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model"], "scripted");
        let ideas = body["ideas"].as_array().unwrap();
        assert_eq!(ideas.len(), 3);
        assert_eq!(ideas[0]["title"], "Chili Tofu");
        assert_eq!(ideas[0]["emoji"], "🌶️");
        assert_eq!(h.db.suggestion_count(), 1);

        let html = body["html"].as_str().unwrap();
        assert_eq!(html.matches("class=\"recipe-card\"").count(), 3);
        assert!(html.contains("<h3 class=\"recipe-title\">Chili Tofu</h3>"));

        let prompts = h.generator.prompts();
        assert!(prompts[0].contains("User request: tofu"));
        assert!(prompts[0].contains("(session variation: "));
    }

    #[tokio::test]
    async fn generate_pads_short_responses() {
        let h = Harness::new();
        h.generator.push_reply("🌱 **Only One** — A lonely idea");
        let (_, token) = h.signed_in("cook").await;
        let (_, body) = h
            .send(
                Method::POST,
                "/api/generate",
                Some(&token),
                Some(json!({ "prompt": "beans" })),
            )
            .await;
        let ideas = body["ideas"].as_array().unwrap();
        assert_eq!(ideas.len(), 3);
        assert_eq!(ideas[2]["title"], "Recipe Idea 3");
        assert_eq!(ideas[2]["description"], "Creative recipe variation");
    }

    #[tokio::test]
    async fn generate_uses_stored_allergies() {
        let h = Harness::new();
        let (user, token) = h.signed_in("cook").await;
        let mut opts = UserOptions::defaults(user.id);
        opts.allergies = vec!["peanuts".into()];
        h.db.upsert_options(&opts).await.unwrap();

        h.send(
            Method::POST,
            "/api/generate",
            Some(&token),
            Some(json!({ "prompt": "noodles" })),
        )
        .await;
        assert!(h.generator.prompts()[0].contains("peanuts"));
    }

    #[tokio::test]
    async fn generate_rejects_blank_prompt() {
        let h = Harness::new();
        let (_, token) = h.signed_in("cook").await;
        let (status, body) = h
            .send(
                Method::POST,
                "/api/generate",
                Some(&token),
                Some(json!({ "prompt": "   " })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(h.generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn generate_survives_storage_failure() {
        let h = Harness::new();
        let (_, token) = h.signed_in("cook").await;
        h.db.set_fail_writes(true);
        let (status, body) = h
            .send(
                Method::POST,
                "/api/generate",
                Some(&token),
                Some(json!({ "prompt": "tofu" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ideas"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn generate_reports_exhausted_upstream() {
        let h = Harness::new();
        h.generator.push_error("a").push_error("b").push_error("c");
        let (_, token) = h.signed_in("cook").await;
        let (status, body) = h
            .send(
                Method::POST,
                "/api/generate",
                Some(&token),
                Some(json!({ "prompt": "tofu" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["message"].as_str().unwrap().contains("try again"));
    }

    #[tokio::test]
    async fn detailed_generation_skips_idea_parsing() {
        let h = Harness::new();
        h.generator.push_reply("Serves: 2\nIngredients:\n- 1 block tofu");
        let (_, token) = h.signed_in("cook").await;
        let (_, body) = h
            .send(
                Method::POST,
                "/api/generate",
                Some(&token),
                Some(json!({
                    "prompt": "tofu",
                    "isDetailedRecipe": true,
                    "recipeIdea": { "emoji": "🌶️", "title": "Chili Tofu", "description": "Hot" }
                })),
            )
            .await;
        assert!(body.get("ideas").is_none());
        assert!(body.get("html").is_none());
        assert!(body["message"].as_str().unwrap().starts_with("Serves: 2"));
        assert!(h.generator.prompts()[0].contains("Chili Tofu"));
        assert_eq!(h.db.suggestion_count(), 0);
    }

    #[tokio::test]
    async fn save_is_idempotent_per_title() {
        let h = Harness::new();
        let (_, token) = h.signed_in("cook").await;
        let save = |text: &'static str| {
            json!({
                "title": "Spicy Tofu",
                "description": text,
                "mode": "vegan"
            })
        };
        let (status, first) = h
            .send(Method::POST, "/api/save-suggestion", Some(&token), Some(save("one")))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = h
            .send(Method::POST, "/api/save-suggestion", Some(&token), Some(save("two")))
            .await;
        assert_eq!(first["recipe_id"], second["recipe_id"]);

        let id = first["recipe_id"].as_str().unwrap();
        let (status, body) = h
            .send(Method::GET, &format!("/api/recipes/{id}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recipe"]["is_vegan"], true);
        assert_eq!(body["recipe"]["content"], "one");
    }

    #[tokio::test]
    async fn save_requires_title_and_description() {
        let h = Harness::new();
        let (_, token) = h.signed_in("cook").await;
        let (status, _) = h
            .send(
                Method::POST,
                "/api/save-suggestion",
                Some(&token),
                Some(json!({ "title": "No body" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn structured_recipe_renders_as_html() {
        let h = Harness::new();
        let (_, token) = h.signed_in("cook").await;
        let (_, saved) = h
            .send(
                Method::POST,
                "/api/save-suggestion",
                Some(&token),
                Some(json!({
                    "title": "Rice",
                    "description": "Ingredients:\n- 2 cups rice\nInstructions:\n1. Cook rice",
                    "steps": "[\"Cook rice\"]"
                })),
            )
            .await;
        let id = saved["recipe_id"].as_str().unwrap();

        let (_, body) = h
            .send(Method::GET, &format!("/api/recipes/{id}"), None, None)
            .await;
        assert!(body["recipe"].get("content").is_none());
        assert_eq!(body["recipe"]["ingredients"][0]["unit"], "cups");

        let (status, html) = h
            .send(Method::GET, &format!("/api/recipes/{id}/html"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.as_str().unwrap().contains("<li>2 cups rice</li>"));
    }

    #[tokio::test]
    async fn missing_recipe_is_404() {
        let h = Harness::new();
        let (status, body) = h
            .send(
                Method::GET,
                &format!("/api/recipes/{}", Uuid::new_v4()),
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Recipe not found");
    }

    #[tokio::test]
    async fn inspiration_flattens_stored_blocks() {
        let h = Harness::new();
        let (_, token) = h.signed_in("cook").await;
        h.send(
            Method::POST,
            "/api/generate",
            Some(&token),
            Some(json!({ "prompt": "tofu" })),
        )
        .await;

        let (status, body) = h
            .send(Method::GET, "/api/recipes/inspiration?count=5", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let items = body["inspirations"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i["description"] == ""));
    }

    #[tokio::test]
    async fn random_recipes_defaults_to_three() {
        let h = Harness::new();
        let (_, token) = h.signed_in("cook").await;
        for title in ["A", "B", "C", "D"] {
            h.send(
                Method::POST,
                "/api/save-suggestion",
                Some(&token),
                Some(json!({ "title": title, "description": "x".repeat(300) })),
            )
            .await;
        }
        let (_, body) = h.send(Method::GET, "/api/recipes/random", None, None).await;
        let recipes = body["recipes"].as_array().unwrap();
        assert_eq!(recipes.len(), 3);
        assert_eq!(recipes[0]["description"].as_str().unwrap().len(), 120);
    }
}
