use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure talking to the text-generation service.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("generation failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Upstream(e.to_string())
    }
}

/// Failure reading or writing persisted data.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Conflict,
}

/// HTTP-facing error; the body is `{ "success": false, "message": ... }`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Recipe generation failed, please try again")]
    Generation(#[from] GenerationError),

    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |source| ApiError::Store { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Generation(_) => StatusCode::BAD_GATEWAY,
            ApiError::Store {
                source: StoreError::NotFound,
                ..
            } => StatusCode::NOT_FOUND,
            ApiError::Store {
                source: StoreError::Conflict,
                ..
            } => StatusCode::CONFLICT,
            ApiError::Store {
                source: StoreError::Unavailable(_),
                ..
            } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Generation(e) => tracing::error!(error = %e, "generation failed"),
            ApiError::Store { context, source } => {
                tracing::error!(error = %source, context, "store failed")
            }
            _ => {}
        }
        (
            status,
            Json(json!({ "success": false, "message": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(GenerationError::EmptyResponse).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::store("load recipe")(StoreError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::store("save recipe")(StoreError::Unavailable("down".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::store("save recipe")(StoreError::Database(sqlx::Error::RowNotFound)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn generation_message_prompts_retry() {
        let err = ApiError::from(GenerationError::Exhausted {
            attempts: 3,
            last: "timeout".into(),
        });
        assert!(err.to_string().contains("try again"));
    }
}
