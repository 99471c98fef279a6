use serde::{Deserialize, Serialize};

use crate::db::UserOptions;
use crate::parsing::DietaryFlags;

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct OptionsRequest {
    #[serde(default)]
    pub portions: Option<i64>,
    #[serde(default)]
    pub adventurousness: Option<i64>,
    #[serde(default)]
    pub allergies: Option<Vec<String>>,
    #[serde(default)]
    pub dietary: Option<DietaryFlags>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptionsView {
    pub portions: u8,
    pub adventurousness: u8,
    pub allergies: Vec<String>,
    pub dietary: DietaryFlags,
}

impl From<UserOptions> for OptionsView {
    fn from(o: UserOptions) -> Self {
        OptionsView {
            portions: o.portions,
            adventurousness: o.adventurousness,
            allergies: o.allergies,
            dietary: o.dietary,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveOptionsResponse {
    pub success: bool,
    pub message: String,
    pub options: OptionsView,
}
