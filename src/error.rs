use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("missing user identity")]
    Unauthorized,

    #[error("not authorized")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("seats already booked: {}", seats.join(", "))]
    SeatConflict { seats: Vec<String> },

    /// Каталог ответил, но такого фильма у него нет.
    #[error("upstream has no movie {0}")]
    UpstreamNotFound(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::UpstreamNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SeatConflict { .. } => StatusCode::CONFLICT,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Повторять имеет смысл только временные сбои апстрима.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::UpstreamUnavailable(_))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Детали БД наружу не отдаём
            AppError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                "Internal Server Error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::UpstreamUnavailable(msg) => {
                tracing::error!("upstream unavailable: {}", msg);
                "Failed to fetch movies from the catalog".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_lists_every_seat() {
        let err = AppError::SeatConflict {
            seats: vec!["A1".into(), "B2".into()],
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "seats already booked: A1, B2");
    }

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(AppError::UpstreamUnavailable("timeout".into()).is_retryable());
        assert!(!AppError::UpstreamNotFound("tt0".into()).is_retryable());
        assert!(!AppError::Validation("bad".into()).is_retryable());
    }
}
