use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Model {0} not available")]
    UnknownModel(String),
    #[error("Failed to load model {model}: {cause:#}")]
    Load { model: String, cause: anyhow::Error },
    #[error("Model {0} not loaded")]
    NotLoaded(String),
    #[error("Generation failed: {0:#}")]
    Generation(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownModel(_) | ApiError::NotLoaded(_) => StatusCode::BAD_REQUEST,
            ApiError::Load { .. } | ApiError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::UnknownModel("m".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotLoaded("m".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Generation(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn load_message_includes_cause_chain() {
        let cause = anyhow!("file missing").context("load GGUF model");
        let err = ApiError::Load { model: "a/b".into(), cause };
        assert_eq!(err.to_string(), "Failed to load model a/b: load GGUF model: file missing");
    }
}
