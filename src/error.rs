use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Service-wide error taxonomy.
///
/// Errors raised before a redirect URI has been validated are rendered as
/// local HTML pages; once the redirect target is trusted, flow errors travel
/// back to the relying application as `error`/`error_description` query
/// parameters instead (see `services::flow`).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown client: {0}")]
    UnknownClient(String),

    #[error("redirect_uri is pre-registered and the supplied value must match")]
    RedirectMismatch,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Sign-in session is missing or corrupted")]
    SessionCorrupted,

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Invalid activation code")]
    InvalidCode,

    #[error("Activation code has expired")]
    ExpiredCode,

    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Too many requests")]
    TooManyRequests(Option<u64>),

    #[error("Storage error: {0}")]
    PersistenceFailure(anyhow::Error),

    #[error("Email error: {0}")]
    EmailError(String),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::PersistenceFailure(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl AppError {
    /// Text shown to the end user. Store and internal failures are collapsed
    /// to a generic message; details stay in the server-side logs only.
    fn user_message(&self) -> String {
        match self {
            AppError::PersistenceFailure(_) | AppError::Internal(_) | AppError::EmailError(_) => {
                "Something went wrong on our side. Please try again later.".to_string()
            }
            AppError::SessionCorrupted => {
                "Your sign-in session is missing or corrupted. Please restart the sign-in \
                 from the application you came from."
                    .to_string()
            }
            AppError::ConfigError(_) => "Service is misconfigured.".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidRequest(_)
            | AppError::UnknownClient(_)
            | AppError::RedirectMismatch
            | AppError::DuplicateUsername
            | AppError::InvalidCode
            | AppError::ExpiredCode => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::SessionCorrupted => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::PersistenceFailure(_)
            | AppError::EmailError(_)
            | AppError::ConfigError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let body = crate::handlers::pages::error_page(&self.user_message());
        let mut res = (status, [(header::CONTENT_TYPE, "text/html; charset=utf-8")], body)
            .into_response();

        if let AppError::TooManyRequests(Some(retry)) = self {
            if let Ok(value) = header::HeaderValue::from_str(&retry.to_string()) {
                res.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        res
    }
}
