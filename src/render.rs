//! Server-side HTML for idea cards and saved recipes.
//!
//! Parser output is plain text; escaping happens here and only here.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::Recipe;
use crate::parsing::{IngredientLine, RecipeIdea};

lazy_static! {
    static ref FRACTION: Regex = Regex::new(r"\b(1/2|1/3|2/3|1/4|3/4|1/8|3/8|5/8|7/8)\b").unwrap();
    static ref MAIN_INGREDIENTS_HEADER: Regex = Regex::new(r"(?i)^\s*ingredients\s*:?\s*$").unwrap();
}

/// Escapes `& < > " ' /` for safe insertion into markup.
pub fn escape_html(text: &str) -> String {
    html_escape::encode_safe(text).into_owned()
}

pub fn render_idea_cards(ideas: &[RecipeIdea]) -> String {
    ideas
        .iter()
        .map(|idea| {
            format!(
                "<div class=\"recipe-card\"><div class=\"recipe-emoji\">{}</div>\
                 <h3 class=\"recipe-title\">{}</h3>\
                 <p class=\"recipe-description\">{}</p></div>",
                escape_html(&idea.emoji),
                escape_html(&idea.title),
                escape_html(&idea.description)
            )
        })
        .collect()
}

/// Display form of a quantity, e.g. "1 1/2" becomes "1 ½".
pub fn pretty_quantity(quantity: &str) -> String {
    FRACTION
        .replace_all(quantity.trim(), |caps: &regex::Captures| {
            match &caps[1] {
                "1/2" => "½",
                "1/3" => "⅓",
                "2/3" => "⅔",
                "1/4" => "¼",
                "3/4" => "¾",
                "1/8" => "⅛",
                "3/8" => "⅜",
                "5/8" => "⅝",
                "7/8" => "⅞",
                other => other,
            }
            .to_string()
        })
        .into_owned()
}

/// Single-word unit without a leading "frozen".
pub fn clean_unit(unit: &str) -> String {
    let trimmed = unit.trim();
    let without_frozen = match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("frozen ") => &trimmed[7..],
        _ => trimmed,
    };
    without_frozen
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

fn with_line_breaks(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

fn render_ingredients(lines: &[IngredientLine]) -> String {
    let mut html = String::from("<h3>Ingredients</h3><ul class=\"ingredients\">");
    for line in lines {
        match line {
            IngredientLine::Header { text } => {
                if MAIN_INGREDIENTS_HEADER.is_match(text) {
                    continue;
                }
                html.push_str(&format!(
                    "</ul><p><strong>{}</strong></p><ul class=\"ingredients\">",
                    escape_html(text)
                ));
            }
            IngredientLine::Ingredient {
                quantity,
                unit,
                name,
            } => {
                let mut parts = Vec::with_capacity(3);
                if let Some(q) = quantity.as_deref().filter(|q| !q.trim().is_empty()) {
                    parts.push(escape_html(&pretty_quantity(q)));
                }
                if let Some(u) = unit.as_deref().map(clean_unit).filter(|u| !u.is_empty()) {
                    parts.push(escape_html(&u));
                }
                parts.push(escape_html(name));
                html.push_str(&format!("<li>{}</li>", parts.join(" ")));
            }
        }
    }
    html.push_str("</ul>");
    html
}

fn render_steps(steps: &[String]) -> String {
    let items: String = steps
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && !s.starts_with('*') && !s.starts_with("Tips"))
        .map(|s| format!("<li>{}</li>", escape_html(s)))
        .collect();
    format!("<ol class=\"steps\">{items}</ol>")
}

/// Recipe body: structured lists when available, otherwise the full text.
pub fn render_recipe_html(recipe: &Recipe) -> String {
    if !recipe.has_structured_data() {
        return format!(
            "<div class=\"recipe-text\">{}</div>",
            with_line_breaks(&recipe.description)
        );
    }

    let mut html = String::new();
    if let Some(lines) = recipe.ingredients.as_deref().filter(|l| !l.is_empty()) {
        html.push_str(&render_ingredients(lines));
    }
    match (recipe.instructions.as_deref(), recipe.steps.as_deref()) {
        (Some(raw), _) if !raw.trim().is_empty() => {
            html.push_str("<h3>Instructions</h3><div class=\"instructions\">");
            html.push_str(&with_line_breaks(raw.trim()));
            html.push_str("</div>");
        }
        (_, Some(steps)) if !steps.is_empty() => {
            html.push_str("<h3>Instructions</h3>");
            html.push_str(&render_steps(steps));
        }
        _ => {}
    }
    html
}
