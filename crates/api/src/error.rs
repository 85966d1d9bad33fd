use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use retro_core::error::CoreError;
use retro_db::DbError;
use serde_json::json;

/// Application-level error type for HTTP handlers and the WebSocket gateway.
///
/// Wraps [`CoreError`] for domain errors and sqlx errors for everything the
/// database reports directly.
/// Implements [`IntoResponse`] to produce consistent JSON error responses; the
/// gateway reuses [`AppError::code`] and [`AppError::public_message`] for its
/// `intentFailed` acknowledgments.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `retro_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => AppError::Core(core),
            DbError::Database(db) => AppError::Database(db),
        }
    }
}

impl AppError {
    /// Machine-readable error code (`NOT_FOUND`, `VALIDATION_ERROR`, ...).
    pub fn code(&self) -> &'static str {
        self.classify().1
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        self.classify().0
    }

    /// Message safe to show a client. Internal details are replaced with a
    /// generic message.
    pub fn public_message(&self) -> String {
        self.classify().2
    }

    /// Whether this error indicates a server-side fault rather than a bad
    /// request from the client.
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Transport(msg) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "TRANSPORT_ERROR",
                    msg.clone(),
                ),
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.classify();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Serialization failures and deadlocks (`40001`, `40P01`) map to 409 so
///   clients can retry.
/// - Foreign key violations (`23503`) map to 404: the referenced parent row is gone.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("40001") | Some("40P01") => (
                StatusCode::CONFLICT,
                "CONFLICT",
                "Concurrent update, please retry".to_string(),
            ),
            Some("23503") => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Referenced resource no longer exists".to_string(),
            ),
            _ => internal(),
        },
        _ => internal(),
    }
}
