use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

use crate::vertex::VertexError;

#[derive(Debug, Error)]
pub enum DesignError {
    #[error("{0}")]
    Validation(String),

    #[error("text generation failed: {0}")]
    Generation(String),

    #[error("image generation failed for '{section}': {reason}")]
    ImageGeneration { section: String, reason: String },

    #[error("no sections found in generated text")]
    Parse { raw: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DesignError {
    pub fn kind(&self) -> &'static str {
        match self {
            DesignError::Validation(_) => "validation",
            DesignError::Generation(_) => "generation",
            DesignError::ImageGeneration { .. } => "image_generation",
            DesignError::Parse { .. } => "parse",
            DesignError::Io(_) => "io",
            DesignError::Archive(_) => "archive",
            DesignError::Json(_) => "json",
            DesignError::NotFound(_) => "not_found",
            DesignError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            DesignError::Validation(_) => StatusCode::BAD_REQUEST,
            DesignError::NotFound(_) => StatusCode::NOT_FOUND,
            DesignError::Parse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<VertexError> for DesignError {
    fn from(e: VertexError) -> Self {
        DesignError::Generation(e.to_string())
    }
}

impl IntoResponse for DesignError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("❌ {}", self);
        } else {
            tracing::warn!("⚠️ {}", self);
        }
        let mut body = json!({ "error": self.to_string(), "kind": self.kind() });
        // The raw document is shown to the user in place of the report.
        if let DesignError::Parse { raw } = &self {
            body["raw"] = json!(raw);
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(DesignError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(DesignError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(DesignError::Parse { raw: String::new() }.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(DesignError::Generation("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn vertex_errors_become_generation_failures() {
        let err: DesignError = VertexError::Empty("no text".into()).into();
        assert_eq!(err.kind(), "generation");
    }
}
