use serde::{Deserialize, Serialize};

use super::ideas::RecipeIdea;

/// Which kind of twist the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Mode {
    #[default]
    General,
    Vegan,
    Healthy,
}

impl Mode {
    /// Unknown values fall back to `General`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "vegan" | "veganize" => Mode::Vegan,
            "healthy" | "healthify" => Mode::Healthy,
            _ => Mode::General,
        }
    }

    /// Label written to the `recipe_suggestions.mode` column.
    pub fn storage_label(self) -> &'static str {
        match self {
            Mode::General => "spice-it-up",
            Mode::Vegan => "veganize",
            Mode::Healthy => "healthify",
        }
    }

    pub fn is_vegan(self) -> bool {
        matches!(self, Mode::Vegan)
    }

    pub fn is_healthy(self) -> bool {
        matches!(self, Mode::Healthy)
    }
}

impl From<String> for Mode {
    fn from(raw: String) -> Self {
        Mode::parse(&raw)
    }
}

/// Non-allergy dietary preferences kept apart from the allergy list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DietaryFlags {
    #[serde(default)]
    pub vegetarian: bool,
    #[serde(default)]
    pub low_fodmap: bool,
}

impl DietaryFlags {
    pub fn is_empty(&self) -> bool {
        !self.vegetarian && !self.low_fodmap
    }
}

/// Everything the system message depends on.
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub mode: Mode,
    pub portions: u8,
    pub detailed: bool,
    pub adventurousness: u8,
    pub allergies: &'a [String],
    pub dietary: DietaryFlags,
    pub recipe_idea: Option<&'a RecipeIdea>,
}

impl Default for PromptInputs<'_> {
    fn default() -> Self {
        Self {
            mode: Mode::General,
            portions: 4,
            detailed: false,
            adventurousness: 3,
            allergies: &[],
            dietary: DietaryFlags::default(),
            recipe_idea: None,
        }
    }
}

pub const GUIDANCE_START: &str = "INTERNAL GUIDANCE - DO NOT INCLUDE IN YOUR RESPONSE:";
pub const GUIDANCE_END: &str = "RESPOND ONLY WITH THE 3 RECIPE IDEAS - NO ADVENTUROUSNESS TEXT:";

/// Builds the system message sent ahead of the user's request.
///
/// Idea requests get the three-ideas format contract followed by the steering block
/// (allergies, diet, adventurousness). Detailed requests get the fixed
/// `Serves / Ingredients / Instructions / Notes` template, locked onto `recipe_idea`
/// when one is given.
pub fn build_system_message(inputs: &PromptInputs<'_>) -> String {
    let portions = inputs.portions.clamp(1, 8);

    if inputs.detailed {
        let mut message = match inputs.recipe_idea {
            Some(idea) => detailed_from_idea_message(idea, portions),
            None => detailed_recipe_message(portions),
        };
        if let Some(clause) = mode_requirement(inputs.mode) {
            message.push_str("\n\n");
            message.push_str(clause);
        }
        if let Some(list) = allergy_list(inputs.allergies) {
            message.push_str(&format!(
                "\n\nIMPORTANT: The user is allergic to {list}. Avoid these ingredients completely."
            ));
        }
        if let Some(diet) = diet_clause(inputs.dietary) {
            message.push_str("\n\nIMPORTANT: ");
            message.push_str(&diet);
        }
        message.push_str("\n\n");
        message.push_str(detailed_adventurousness(inputs.adventurousness));
        return message;
    }

    let base = match inputs.mode {
        Mode::General => general_ideas_message(),
        Mode::Vegan => vegan_ideas_message(),
        Mode::Healthy => healthy_ideas_message(),
    };

    let mut preferences = Vec::new();
    if let Some(list) = allergy_list(inputs.allergies) {
        preferences.push(format!("ALLERGIES: Avoid {list}"));
    }
    if let Some(diet) = diet_clause(inputs.dietary) {
        preferences.push(format!("DIET: {diet}"));
    }
    preferences.push(adventurousness_guidance(inputs.adventurousness));

    format!("{}\n\n{}", base.trim_end(), preferences.join("\n"))
}

/// Wraps the system message and the user's text into the prompt sent to the model.
///
/// `seed` only varies the prompt so the model does not replay a cached answer.
pub fn build_full_prompt(system_message: &str, user_prompt: &str, seed: u32) -> String {
    format!("{system_message}\n\nUser request: {user_prompt}\n(session variation: {seed})")
}

/// Steering block for idea requests. The model is told not to echo it and the idea
/// parser strips it again if it does.
pub fn adventurousness_guidance(level: u8) -> String {
    let level = level.clamp(1, 6);
    let detail = match level {
        1 => "Stick to basic pantry ingredients. Offer very mild, familiar tweaks only.",
        2 => "Use familiar ingredients with light, safe creative twists. Nothing too bold.",
        3 | 4 => "Mix everyday ingredients with bolder spices or global flavor touches.",
        5 => "Be experimental: encourage unique flavors and some gourmet ingredients.",
        _ => "Be very creative with wild, imaginative twists and rare ingredients.",
    };
    format!(
        "{GUIDANCE_START}\nUser adventurousness level: {level}/6 (1 = very safe, 6 = bold and creative)\n\
         Adjust your suggestions accordingly: {detail}\n\n{GUIDANCE_END}"
    )
}

fn detailed_adventurousness(level: u8) -> &'static str {
    match level.clamp(1, 6) {
        1 | 2 => "IMPORTANT: Use only common ingredients that most people have at home. Keep techniques simple.",
        3 | 4 => "IMPORTANT: Use mostly common ingredients with some specialty items available at regular grocery stores.",
        _ => "IMPORTANT: Feel free to use creative, gourmet ingredients and advanced cooking techniques.",
    }
}

fn allergy_list(allergies: &[String]) -> Option<String> {
    let cleaned: Vec<&str> = allergies
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join(", "))
    }
}

fn diet_clause(flags: DietaryFlags) -> Option<String> {
    let mut parts = Vec::new();
    if flags.vegetarian {
        parts.push("Keep every suggestion vegetarian (no meat or fish).");
    }
    if flags.low_fodmap {
        parts.push("Keep every suggestion low-FODMAP (no onion, garlic, wheat or other high-FODMAP ingredients).");
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn mode_requirement(mode: Mode) -> Option<&'static str> {
    match mode {
        Mode::General => None,
        Mode::Vegan => Some(
            "IMPORTANT: This recipe must be 100% vegan. Use only plant-based ingredients: \
             no meat, dairy, eggs, honey or any other animal products.",
        ),
        Mode::Healthy => Some(
            "IMPORTANT: Focus on healthy, nutritious ingredients and cooking methods. Use whole \
             foods, lean proteins and healthy fats, and minimize processed ingredients.",
        ),
    }
}

fn recipe_template(portions: u8) -> String {
    format!(
        "Serves: {portions} people\n\n\
         Ingredients:\n\
         - quantity unit ingredient\n\
         - quantity unit ingredient\n\
         (list all ingredients for {portions} people)\n\n\
         Instructions:\n\
         1. First step\n\
         2. Second step\n\
         (number all steps)\n\n\
         Notes:\n\
         - Any relevant tips\n\
         (optional section)"
    )
}

fn detailed_recipe_message(portions: u8) -> String {
    format!(
        "You are a professional chef writing a complete, detailed recipe. Based on the user's \
         request, write the full recipe using EXACTLY this format:\n\n{}",
        recipe_template(portions)
    )
}

fn detailed_from_idea_message(idea: &RecipeIdea, portions: u8) -> String {
    format!(
        "I previously suggested this recipe idea: \"{} **{}** — {}\"\n\n\
         Please provide the COMPLETE and DETAILED recipe for ONLY this specific idea and ignore \
         any other suggestions made earlier. Include:\n\
         1. A complete list of ingredients with measurements for {portions} people\n\
         2. Step-by-step cooking instructions\n\
         3. Any tips or variations that are relevant to this specific idea\n\n\
         Focus ONLY on EXACTLY the idea described above.\n\n\
         Use EXACTLY this format:\n\n{}",
        idea.emoji,
        idea.title,
        idea.description,
        recipe_template(portions)
    )
}

const IDEA_FORMAT: &str = "Each idea must:\n\
- Start with a different emoji\n\
- Follow with a short, catchy title in **bold**, then a dash (—)\n\
- End with one short sentence describing the change\n\
Separate the three ideas with one blank line.";

fn general_ideas_message() -> String {
    format!(
        "You are a warm and imaginative kitchen companion. When the user shares a dish or a list \
         of ingredients, answer with exactly three inspiring twists that change the flavor or \
         technique in delightful ways.\n\n\
         TITLE GUIDELINES:\n\
         - If the user names a dish (\"egg sandwich\", \"chicken curry\"), use that dish name in the titles\n\
         - If the user lists ingredients, base the titles on the cooking style or flavor profile\n\
         - Keep titles specific and appetizing\n\n\
         {IDEA_FORMAT}\n\n\
         EXAMPLE for \"egg sandwich\":\n\
         🥪 **Loaded Egg Sandwich** — Add crispy bacon and avocado for extra richness\n\n\
         🌶️ **Spicy Egg Sandwich** — Spread sriracha mayo and melt pepper jack on top\n\n\
         No intros, no summaries."
    )
}

fn vegan_ideas_message() -> String {
    format!(
        "You are a practical vegan chef. When the user describes a dish, answer with exactly \
         three plant-based versions of it, each naming a specific swap (replace X with Y, add Z).\n\n\
         TITLE GUIDELINES:\n\
         - If the user names a dish (\"beef tacos\", \"chicken carbonara\"), use that dish name in the titles\n\
         - Make the vegan transformation obvious from the title\n\n\
         {IDEA_FORMAT}\n\n\
         EXAMPLE for \"chicken carbonara\":\n\
         🌱 **Vegan Carbonara** — Use cashew cream and mushroom bacon for richness\n\n\
         🥥 **Coconut Carbonara** — Replace cream with coconut milk and add nutritional yeast\n\n\
         Skip intros and conclusions."
    )
}

fn healthy_ideas_message() -> String {
    format!(
        "You are a practical nutritionist. When the user describes a dish, answer with exactly \
         three healthier versions of it, each naming a specific swap or cooking method change.\n\n\
         TITLE GUIDELINES:\n\
         - If the user names a dish (\"mac and cheese\", \"fried rice\"), use that dish name in the titles\n\
         - Let the title show the health benefit\n\n\
         {IDEA_FORMAT}\n\n\
         EXAMPLE for \"fried rice\":\n\
         🌾 **Quinoa Fried Rice** — Swap white rice for quinoa and double the vegetables\n\n\
         🥦 **Cauliflower Fried Rice** — Use riced cauliflower for a lighter, lower-carb bowl\n\n\
         No extra text around the ideas."
    )
}
