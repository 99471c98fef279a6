use tracing::debug;
use uuid::Uuid;

use crate::db::{Database, NewRecipe, NewSuggestions};
use crate::error::StoreError;
use crate::parsing::ideas::split_idea_blocks;
use crate::parsing::sections::{detect_allergens, resolve_portions};
use crate::parsing::{extract_sections, strip_leaked_guidance, IngredientLine, Mode};

/// Everything needed to persist one detailed recipe.
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub user_id: Uuid,
    pub title: String,
    pub full_text: String,
    pub adventurousness: u8,
    pub portions: Option<u8>,
    pub is_vegan: bool,
    pub is_healthy: bool,
    pub ingredients: Option<Vec<IngredientLine>>,
    pub instructions: Option<String>,
    pub steps: Option<Vec<String>>,
}

/// Find-or-create by `(title, user_id)`. An existing row is returned untouched.
///
/// Structured fields the caller did not supply are extracted from the full text;
/// the text itself is always stored as the description.
pub async fn store_recipe(db: &dyn Database, draft: RecipeDraft) -> Result<Uuid, StoreError> {
    if let Some(id) = db.find_recipe_id(&draft.title, draft.user_id).await? {
        debug!(recipe_id = %id, "recipe already stored");
        return Ok(id);
    }

    let ingredients = draft.ingredients.filter(|v| !v.is_empty());
    let instructions = draft.instructions.filter(|s| !s.trim().is_empty());
    let steps = draft.steps.filter(|v| !v.is_empty());

    let (ingredients, instructions, steps) =
        if ingredients.is_some() && instructions.is_some() && steps.is_some() {
            (ingredients, instructions, steps)
        } else {
            let extracted = extract_sections(&draft.full_text);
            (
                ingredients.or(extracted.ingredients),
                instructions.or(extracted.instructions),
                steps.or(extracted.steps),
            )
        };

    let allergens = detect_allergens(&draft.full_text);
    let recipe = NewRecipe {
        user_id: draft.user_id,
        portions: resolve_portions(draft.portions, &draft.full_text),
        allergies: (!allergens.is_empty()).then_some(allergens),
        title: draft.title,
        description: draft.full_text,
        adventurousness: draft.adventurousness,
        is_vegan: draft.is_vegan,
        is_healthy: draft.is_healthy,
        ingredients,
        instructions,
        steps,
    };
    db.insert_recipe(recipe).await
}

/// Plain insert of three raw idea blocks; repeated prompts get their own rows.
pub async fn store_suggestions(
    db: &dyn Database,
    prompt: &str,
    suggestions: [Option<String>; 3],
    mode: Mode,
    user_id: Uuid,
) -> Result<Uuid, StoreError> {
    db.insert_suggestions(NewSuggestions {
        user_id,
        input_prompt: prompt.to_string(),
        suggestions,
        mode: mode.storage_label().to_string(),
    })
    .await
}

/// First three raw idea blocks of a response, for storage.
///
/// Responses without blank-line separation fall back to their bolded lines.
pub fn raw_idea_blocks(response: &str) -> [Option<String>; 3] {
    let cleaned = strip_leaked_guidance(response);
    let mut blocks: Vec<&str> = split_idea_blocks(&cleaned);
    if blocks.len() < 2 {
        let bold_lines: Vec<&str> = cleaned
            .lines()
            .map(str::trim)
            .filter(|l| l.contains("**"))
            .collect();
        if bold_lines.len() > blocks.len() {
            blocks = bold_lines;
        }
    }
    let mut out: [Option<String>; 3] = Default::default();
    for (slot, block) in out.iter_mut().zip(blocks) {
        *slot = Some(block.to_string());
    }
    out
}
