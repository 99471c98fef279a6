use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PORTIONS: u8 = 4;
pub const ALLERGEN_KEYWORDS: [&str; 7] = [
    "nuts", "peanuts", "gluten", "dairy", "shellfish", "soy", "eggs",
];

/// One line of an ingredients block.
///
/// Written with a `type` tag. Read back leniently: an object without `type` is an
/// ingredient when it has a `name`, and only `type: "header"` marks a header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IngredientLine {
    Ingredient {
        quantity: Option<String>,
        unit: Option<String>,
        name: String,
    },
    /// Labels a sub-group, e.g. "For the sauce:".
    Header { text: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum HeaderTag {
    Header,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IngredientLineWire {
    Header {
        #[serde(rename = "type")]
        _tag: HeaderTag,
        text: String,
    },
    Ingredient {
        #[serde(default)]
        quantity: Option<String>,
        #[serde(default)]
        unit: Option<String>,
        name: String,
    },
}

impl<'de> Deserialize<'de> for IngredientLine {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match IngredientLineWire::deserialize(deserializer)? {
            IngredientLineWire::Header { text, .. } => IngredientLine::Header { text },
            IngredientLineWire::Ingredient {
                quantity,
                unit,
                name,
            } => IngredientLine::Ingredient {
                quantity,
                unit,
                name,
            },
        })
    }
}

impl IngredientLine {
    pub fn item(quantity: Option<&str>, unit: Option<&str>, name: &str) -> Self {
        IngredientLine::Ingredient {
            quantity: quantity.map(str::to_string),
            unit: unit.map(str::to_string),
            name: name.to_string(),
        }
    }
}

/// Structured view of a detailed recipe. Every field is a best-effort cache of the
/// full text, `None` when nothing could be recovered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSections {
    pub ingredients: Option<Vec<IngredientLine>>,
    pub instructions: Option<String>,
    pub steps: Option<Vec<String>>,
}

lazy_static! {
    static ref INGREDIENTS_HEADER: Regex =
        Regex::new(r"(?im)(?:^[ \t#*_]*ingredients\b|ingredients:)").unwrap();
    static ref METHOD_HEADER: Regex = Regex::new(
        r"(?im)(?:^[ \t#*_]*(?:instructions|directions|method|steps|preparation)\b|(?:instructions|directions|method|steps|preparation):)"
    )
    .unwrap();
    static ref TRAILER_HEADER: Regex =
        Regex::new(r"(?im)(?:^[ \t#*_]*(?:tips|notes|variations)\b[ \t*_]*:|(?:tips|notes|variations):)").unwrap();
    static ref BULLET: Regex = Regex::new(r"^(?:[-•]\s*|\*\s+)").unwrap();
    static ref BOLD_SUBHEADER: Regex = Regex::new(r"^\*\*([^*]+?)\*\*\s*:?$").unwrap();
    static ref PLAIN_SUBHEADER: Regex = Regex::new(r"^[^\d:][^:]*:$").unwrap();
    static ref LINE_ITEM: Regex = Regex::new(
        r"^(?P<qty>\d+\s+\d+/\d+|\d+/\d+|\d+(?:\.\d+)?)\s*(?:(?P<unit>[A-Za-z]+)\s+)?(?P<name>\S.*)$"
    )
    .unwrap();
    static ref STEP_ENUMERATOR: Regex = Regex::new(r"^[\d#*•.\-]+\s*").unwrap();
    static ref SERVES: Regex = Regex::new(r"(?i)serves:?\s+(\d+)").unwrap();
    static ref FOR_PEOPLE: Regex = Regex::new(r"(?i)for\s+(\d+)\s+people").unwrap();
}

/// Extracts ingredients, raw instructions and steps from a detailed recipe.
///
/// Never fails: anything that cannot be located comes back as `None`, and the caller
/// keeps `full_text` as the source of truth.
pub fn extract_sections(full_text: &str) -> RecipeSections {
    let ingredients = ingredients_span(full_text)
        .map(parse_ingredient_lines)
        .filter(|lines| !lines.is_empty());

    let method = method_span(full_text);
    let instructions = method
        .map(|span| span.trim().to_string())
        .filter(|span| !span.is_empty());
    let steps = method
        .map(parse_steps)
        .filter(|steps| !steps.is_empty());

    RecipeSections {
        ingredients,
        instructions,
        steps,
    }
}

fn ingredients_span(text: &str) -> Option<&str> {
    let header = INGREDIENTS_HEADER.find(text)?;
    let rest = &text[header.end()..];
    let end = METHOD_HEADER.find(rest).map_or(rest.len(), |m| m.start());
    Some(strip_header_tail(&rest[..end]))
}

fn method_span(text: &str) -> Option<&str> {
    let header = METHOD_HEADER.find(text)?;
    let rest = &text[header.end()..];
    let end = TRAILER_HEADER.find(rest).map_or(rest.len(), |m| m.start());
    Some(strip_header_tail(&rest[..end]))
}

/// Drops the `:**` left over from a header such as `**Ingredients:**`.
fn strip_header_tail(span: &str) -> &str {
    span.trim_start_matches([':', '*', '_', ' ', '\t'])
}

/// Parses the lines of an ingredients block.
pub fn parse_ingredient_lines(span: &str) -> Vec<IngredientLine> {
    span.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_ingredient_line)
        .collect()
}

/// Parses one ingredient line. `None` for lines with nothing left after the bullet and
/// for a repeated "Ingredients:" sub-header.
pub fn parse_ingredient_line(line: &str) -> Option<IngredientLine> {
    let line = BULLET.replace(line.trim(), "");
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(text) = subheader_text(line) {
        if text.to_lowercase().contains("ingredients:") {
            return None;
        }
        return Some(IngredientLine::Header { text });
    }

    match LINE_ITEM.captures(line) {
        Some(caps) => Some(IngredientLine::Ingredient {
            quantity: caps.name("qty").map(|m| m.as_str().to_string()),
            unit: caps.name("unit").map(|m| m.as_str().to_string()),
            name: caps
                .name("name")
                .map_or(line, |m| m.as_str())
                .trim()
                .to_string(),
        }),
        None => Some(IngredientLine::Ingredient {
            quantity: None,
            unit: None,
            name: line.to_string(),
        }),
    }
}

fn subheader_text(line: &str) -> Option<String> {
    if let Some(caps) = BOLD_SUBHEADER.captures(line) {
        let inner = caps.get(1)?.as_str().trim();
        if inner.ends_with(':') || line.ends_with(':') {
            return Some(inner.trim_end_matches(':').trim().to_string() + ":");
        }
        return None;
    }
    if PLAIN_SUBHEADER.is_match(line) {
        return Some(line.to_string());
    }
    None
}

/// Splits an instructions block into steps with their enumerators removed.
pub fn parse_steps(span: &str) -> Vec<String> {
    span.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| STEP_ENUMERATOR.replace(line, "").trim().to_string())
        .filter(|step| !step.is_empty())
        .collect()
}

/// Servings mentioned in the text ("Serves: 4", "for 6 people"), clamped to 1..=8.
pub fn detect_portions(full_text: &str) -> Option<u8> {
    let caps = SERVES
        .captures(full_text)
        .or_else(|| FOR_PEOPLE.captures(full_text))?;
    let n: u64 = caps.get(1)?.as_str().parse().unwrap_or(u64::MAX);
    Some(n.clamp(1, 8) as u8)
}

/// Caller-supplied portions win, then the text, then the default.
pub fn resolve_portions(supplied: Option<u8>, full_text: &str) -> u8 {
    match supplied {
        Some(p) if p > 0 => p.clamp(1, 8),
        _ => detect_portions(full_text).unwrap_or(DEFAULT_PORTIONS),
    }
}

/// Advisory allergen guess by keyword substring. "Peanut-free" text still matches
/// "nuts", so this is never authoritative.
pub fn detect_allergens(full_text: &str) -> Vec<String> {
    let lower = full_text.to_lowercase();
    ALLERGEN_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .map(|keyword| keyword.to_string())
        .collect()
}
