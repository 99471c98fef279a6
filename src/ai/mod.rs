use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GenerationError;

pub mod cache;
pub mod gemini;
pub mod services;

pub use cache::ResponseCache;
pub use gemini::GeminiClient;
pub use services::generate_distinct;

/// One prompt in, one free-form text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Replays queued replies in order, then repeats `fallback`. Records every prompt.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, String>>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, text: impl Into<String>) -> &Self {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Ok(text.into()));
        }
        self
    }

    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(message.into()));
        }
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        let next = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GenerationError::Upstream(message)),
            None => Ok(self.fallback.clone()),
        }
    }
}
