use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_retries: u32,
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub auth: AuthConfig,
    pub ai: AiConfig,
}

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let auth = AuthConfig {
            jwt_secret: std::env::var("AUTH_JWT_SECRET").context("AUTH_JWT_SECRET is not set")?,
            issuer: std::env::var("AUTH_JWT_ISSUER").unwrap_or_else(|_| "spiceup".into()),
            audience: std::env::var("AUTH_JWT_AUDIENCE")
                .unwrap_or_else(|_| "spiceup-users".into()),
        };
        let ai = AiConfig {
            api_key: std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?,
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.into()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.into()),
            max_retries: env_parse("AI_MAX_RETRIES", 2),
            cache_capacity: env_parse("AI_CACHE_CAPACITY", 256),
        };
        Ok(Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
            auth,
            ai,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
