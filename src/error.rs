use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
///
/// The first group of variants is the envelope/access taxonomy every core
/// operation reports; the second group wraps infrastructure failures, which
/// are always fatal for the operation that hit them.
#[derive(Error, Debug)]
pub enum AppError {
    /// The resource is absent, or belongs to somebody else.
    #[error("Resource not found")]
    NotFound,

    /// A shared link past its expiry.
    #[error("Link expired")]
    Expired,

    /// Missing, unknown, expired or revoked session token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Wrong username or password.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// AEAD tag verification failed on decrypt.
    #[error("Ciphertext failed authentication")]
    AuthenticationFailure,

    /// The detached signature over a stored ciphertext did not verify.
    #[error("Signature verification failed")]
    SignatureInvalid,

    /// A primitive rejected well-formed input. Treated as a bug, never retried.
    #[error("Cryptographic fault: {0}")]
    CryptoFault(String),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Database pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Malformed or incomplete JSON bodies are the caller's fault.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The stable machine-readable kind reported in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Expired => "expired",
            AppError::Unauthorized => "unauthorized",
            AppError::Authentication(_) => "invalid_credentials",
            AppError::AuthenticationFailure => "authentication_failure",
            AppError::SignatureInvalid => "signature_invalid",
            AppError::CryptoFault(_) => "crypto_fault",
            AppError::Validation(_) => "validation_error",
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Redis(_)
            | AppError::Io(_)
            | AppError::Internal(_) => "internal_error",
        }
    }

    /// The HTTP status this error maps to at the boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Expired => StatusCode::GONE,
            AppError::Unauthorized | AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthenticationFailure => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SignatureInvalid | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::CryptoFault(_)
            | AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Redis(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }

            AppError::Pool(ref e) => {
                tracing::error!("Database pool error: {}", e);
                "Database error".to_string()
            }

            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                "Session store error".to_string()
            }

            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                "File system error".to_string()
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }

            AppError::CryptoFault(ref msg) => {
                tracing::error!("Cryptographic fault: {}", msg);
                "Encryption error".to_string()
            }

            AppError::AuthenticationFailure => {
                tracing::warn!("Stored ciphertext failed AEAD authentication");
                self.to_string()
            }

            AppError::SignatureInvalid => {
                tracing::warn!("Stored ciphertext failed signature verification");
                self.to_string()
            }

            AppError::Authentication(ref msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                msg.clone()
            }

            AppError::Unauthorized => {
                tracing::debug!("Request without a valid session");
                self.to_string()
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                msg.clone()
            }

            AppError::NotFound | AppError::Expired => {
                tracing::debug!("{}", self);
                self.to_string()
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message,
            "code": self.code(),
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error","code":"internal_error"}"#.to_string());

        (
            self.status(),
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
