use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Rate limited by upstream after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    #[error("Network unavailable after {attempts} attempts: {message}")]
    NetworkUnavailable { attempts: u32, message: String },

    #[error("Upstream rejected request ({status}): {message}")]
    BadRequest { status: u16, message: String },

    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("{}", no_candidates_message(.provider))]
    NoCandidatesFound { provider: Option<String> },

    #[error("Request superseded by a newer discovery request")]
    Superseded,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

fn no_candidates_message(provider: &Option<String>) -> String {
    match provider {
        Some(name) => format!("No movies found on {} matching your filters", name),
        None => "No movies found matching your filters".to_string(),
    }
}

impl AppError {
    /// True for the outcome of exhausted relaxation, which callers may recover from
    pub fn is_no_candidates(&self) -> bool {
        matches!(self, AppError::NoCandidatesFound { .. })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::NoCandidatesFound { .. } => StatusCode::NOT_FOUND,
            AppError::Superseded => StatusCode::CONFLICT,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NetworkUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadRequest { .. }
            | AppError::Upstream { .. }
            | AppError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            AppError::NoCandidatesFound { provider } => Json(json!({
                "error": self.to_string(),
                "provider": provider,
            })),
            _ => Json(json!({
                "error": self.to_string()
            })),
        };

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
