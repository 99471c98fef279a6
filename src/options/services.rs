use crate::db::UserOptions;
use crate::parsing::DietaryFlags;

use super::dto::OptionsRequest;

pub const MAX_PORTIONS: i64 = 8;
pub const MAX_ADVENTUROUSNESS: i64 = 6;

/// Splits legacy dietary sentinels out of an allergy list and tidies the rest.
pub fn normalize_allergies(raw: Vec<String>, mut dietary: DietaryFlags) -> (Vec<String>, DietaryFlags) {
    let mut allergies: Vec<String> = Vec::with_capacity(raw.len());
    for entry in raw {
        let trimmed = entry.trim();
        let key: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "" => {}
            "vegetarian" => dietary.vegetarian = true,
            "lowfodmap" => dietary.low_fodmap = true,
            _ => {
                if !allergies.iter().any(|a| a.eq_ignore_ascii_case(trimmed)) {
                    allergies.push(trimmed.to_string());
                }
            }
        }
    }
    (allergies, dietary)
}

/// Applies a request on top of the current options, clamping numeric ranges.
pub fn merge_options(current: UserOptions, req: OptionsRequest) -> UserOptions {
    let portions = req
        .portions
        .map_or(current.portions, |p| p.clamp(1, MAX_PORTIONS) as u8);
    let adventurousness = req
        .adventurousness
        .map_or(current.adventurousness, |a| a.clamp(1, MAX_ADVENTUROUSNESS) as u8);
    let dietary = req.dietary.unwrap_or(current.dietary);
    let (allergies, dietary) = match req.allergies {
        Some(list) => normalize_allergies(list, dietary),
        None => (current.allergies, dietary),
    };
    UserOptions {
        user_id: current.user_id,
        portions,
        adventurousness,
        allergies,
        dietary,
    }
}
