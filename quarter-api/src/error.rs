use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quarter_core::{CoreError, ErrorKind};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Core(CoreError::NotAProvider { .. }) => StatusCode::FORBIDDEN,
            AppError::Core(err) => match err.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Policy => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Collaborator => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Core(err) => json!({
                "error": err.to_string(),
                "code": err.code(),
                "kind": err.kind(),
                "retryable": err.is_retryable(),
                "details": err.details(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
