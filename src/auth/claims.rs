use serde::{Deserialize, Serialize};

/// JWT payload. `sub` is the identity provider's user id, not our row id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // external uid
    pub iat: usize,         // issued at (unix timestamp)
    pub exp: usize,         // expires at (unix timestamp)
    pub iss: String,        // issuer
    pub aud: String,        // audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
