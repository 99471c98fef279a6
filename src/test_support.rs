use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    extract::FromRef,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::ai::ScriptedGenerator;
use crate::auth::jwt::JwtKeys;
use crate::db::{Database, MemoryDatabase, User};
use crate::state::AppState;

pub struct Harness {
    pub state: AppState,
    pub db: Arc<MemoryDatabase>,
    pub generator: Arc<ScriptedGenerator>,
}

impl Harness {
    pub fn new() -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let generator = Arc::new(ScriptedGenerator::new(
            "🌶️ **Chili Tofu** — Crispy tofu in chili oil\n\n\
             🍋 **Lemon Tofu** — Bright and zesty\n\n\
             🥥 **Coconut Tofu** — Creamy and mild",
        ));
        let state = AppState::fake(db.clone(), generator.clone());
        Self {
            state,
            db,
            generator,
        }
    }

    pub fn app(&self) -> Router {
        crate::app::build_app(self.state.clone())
    }

    pub fn token(&self, uid: &str, email: Option<&str>) -> String {
        JwtKeys::from_ref(&self.state)
            .sign(uid, email, Duration::from_secs(600))
            .unwrap()
    }

    /// Creates a user row and returns it with a valid token.
    pub async fn signed_in(&self, uid: &str) -> (User, String) {
        let email = format!("{uid}@example.com");
        let user = self.db.create_user(uid, &email, uid).await.unwrap();
        (user, self.token(uid, Some(&email)))
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let response = self.app().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }
}
