//! Text handling shared by the API handlers and the HTML renderer: prompt
//! construction, idea splitting and detailed-recipe section extraction.
//!
//! Everything here is pure and synchronous.

pub mod ideas;
pub mod prompt;
pub mod sections;

pub use ideas::{parse_idea_block, parse_idea_response, strip_leaked_guidance, RecipeIdea};
pub use prompt::{build_full_prompt, build_system_message, DietaryFlags, Mode, PromptInputs};
pub use sections::{extract_sections, IngredientLine, RecipeSections};
