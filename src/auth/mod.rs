use axum::Router;
use lazy_static::lazy_static;
use regex::Regex;

use crate::state::AppState;

mod claims;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;

pub use claims::Claims;
pub use extractors::{AuthUser, VerifiedToken};

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}
