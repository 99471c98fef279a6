use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Recipe, RecipeSummary};
use crate::parsing::{IngredientLine, Mode, RecipeIdea};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub portions: Option<i64>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub is_detailed_recipe: bool,
    #[serde(default)]
    pub recipe_idea: Option<RecipeIdea>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub message: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideas: Option<Vec<RecipeIdea>>,
    /// Escaped idea cards, ready to insert into the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// A structured field that clients send either as JSON or as a JSON-encoded string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Structured<T> {
    Parsed(T),
    Encoded(String),
    Other(serde_json::Value),
}

impl<T: DeserializeOwned> Structured<T> {
    /// Anything unreadable is treated as absent so extraction can fill it in.
    pub fn into_value(self) -> Option<T> {
        match self {
            Structured::Parsed(v) => Some(v),
            Structured::Encoded(s) => serde_json::from_str(&s).ok(),
            Structured::Other(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveSuggestionRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Option<Structured<Vec<IngredientLine>>>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub steps: Option<Structured<Vec<String>>>,
    #[serde(default)]
    pub portions: Option<i64>,
    #[serde(default)]
    pub mode: Mode,
}

#[derive(Debug, Serialize)]
pub struct SaveSuggestionResponse {
    pub success: bool,
    pub message: String,
    pub recipe_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CountQuery {
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RandomRecipesResponse {
    pub success: bool,
    pub recipes: Vec<RecipeSummary>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Inspiration {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct InspirationResponse {
    pub success: bool,
    pub inspirations: Vec<Inspiration>,
}

/// A stored recipe, plus `content` carrying the full text when nothing structured exists.
#[derive(Debug, Serialize)]
pub struct RecipeView {
    #[serde(flatten)]
    pub recipe: Recipe,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl From<Recipe> for RecipeView {
    fn from(recipe: Recipe) -> Self {
        let content = (!recipe.has_structured_data()).then(|| recipe.description.clone());
        RecipeView { recipe, content }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub success: bool,
    pub recipe: RecipeView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generate_request_reads_camel_case() {
        let req: GenerateRequest = serde_json::from_value(json!({
            "prompt": "tofu",
            "mode": "vegan",
            "isDetailedRecipe": true,
            "recipeIdea": { "emoji": "🌱", "title": "Tofu Bowl", "desc": "Simple" }
        }))
        .unwrap();
        assert_eq!(req.mode, Mode::Vegan);
        assert!(req.is_detailed_recipe);
        assert_eq!(req.recipe_idea.unwrap().description, "Simple");
    }

    #[test]
    fn unknown_mode_is_general() {
        let req: GenerateRequest =
            serde_json::from_value(json!({ "prompt": "x", "mode": "keto" })).unwrap();
        assert_eq!(req.mode, Mode::General);
    }

    #[test]
    fn steps_accept_array_or_encoded_string() {
        let req: SaveSuggestionRequest = serde_json::from_value(json!({
            "title": "t",
            "description": "d",
            "steps": "[\"Boil\",\"Serve\"]"
        }))
        .unwrap();
        assert_eq!(req.steps.unwrap().into_value().unwrap(), vec!["Boil", "Serve"]);

        let req: SaveSuggestionRequest = serde_json::from_value(json!({
            "title": "t",
            "description": "d",
            "steps": ["Boil"],
            "ingredients": [{ "oops": true }]
        }))
        .unwrap();
        assert_eq!(req.steps.unwrap().into_value().unwrap(), vec!["Boil"]);
        assert!(req.ingredients.unwrap().into_value().is_none());
    }

    #[test]
    fn plain_ingredient_objects_are_kept() {
        let req: SaveSuggestionRequest = serde_json::from_value(json!({
            "title": "t",
            "description": "d",
            "ingredients": [
                { "quantity": "2", "unit": "cups", "name": "rice" },
                { "type": "header", "text": "For the sauce:" },
                { "quantity": null, "unit": null, "name": "soy sauce" }
            ]
        }))
        .unwrap();
        let lines = req.ingredients.unwrap().into_value().unwrap();
        assert_eq!(
            lines,
            vec![
                IngredientLine::item(Some("2"), Some("cups"), "rice"),
                IngredientLine::Header {
                    text: "For the sauce:".into()
                },
                IngredientLine::item(None, None, "soy sauce"),
            ]
        );
    }
}
