use actix_web::HttpResponse;
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    JWT(#[from] jsonwebtoken::errors::Error),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    // === APPLICATION ERRORS ===
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Conversion errors carry an `error` detail, which
    /// [`crate::http::hide_internal_details`] strips in production.
    pub fn to_http_response(&self) -> HttpResponse {
        let to_internal_json = |err_msg: &str| {
            serde_json::json!({ "message": "Internal server error", "error": err_msg })
        };

        match self {
            // === CONVERSION ERRORS ===
            AppError::Database(error) => {
                log::error!("Database error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::JWT(error) => {
                log::error!("JWT error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::Io(error) => {
                log::error!("Filesystem error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }

            // === APPLICATION ERRORS ===
            AppError::Unauthorized(_) => HttpResponse::Unauthorized()
                .json(serde_json::json!({ "message": self.to_string() })),
            AppError::Forbidden(_) => {
                HttpResponse::Forbidden().json(serde_json::json!({ "message": self.to_string() }))
            }
            AppError::NotFound(_) => {
                HttpResponse::NotFound().json(serde_json::json!({ "message": self.to_string() }))
            }
            AppError::BadRequest(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "message": self.to_string() }))
            }

            // internal messages are chosen by us and safe to show
            AppError::Internal(error) => {
                log::error!("Internal error: {}", error);
                HttpResponse::InternalServerError().json(serde_json::json!({ "message": error }))
            }
        }
    }

    /// Whether retrying the failed operation may succeed.
    ///
    /// Covers Postgres deadlocks (`40P01`), serialization failures (`40001`),
    /// pool exhaustion and dropped connections.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db_err)) => {
                matches!(db_err.code().as_deref(), Some("40P01") | Some("40001"))
            }
            AppError::Database(sqlx::Error::PoolTimedOut) => true,
            AppError::Database(sqlx::Error::Io(_)) => true,
            _ => false,
        }
    }
}

/// The first failing field's message, as a 400.
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_iter()
            .min_by(|a, b| a.0.cmp(&b.0))
            .and_then(|(_, errs)| errs.first())
            .and_then(|err| err.message.as_ref())
            .map(|message| message.to_string())
            .unwrap_or_else(|| "Invalid request".to_string());
        AppError::BadRequest(message)
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{ResponseError, body, http::StatusCode};

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.error_response();
        let status = res.status();
        let bytes = body::to_bytes(res.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn application_errors_keep_their_message() {
        let (status, json) = body_json(AppError::NotFound("Listing not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Listing not found");

        let (status, _) = body_json(AppError::BadRequest("bad".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = body_json(AppError::Unauthorized("no".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = body_json(AppError::Forbidden("no".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn conversion_errors_are_generic_with_detail() {
        let (status, json) = body_json(AppError::Database(sqlx::Error::RowNotFound)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Internal server error");
        assert!(json["error"].is_string());
    }

    #[test]
    fn pool_timeouts_are_transient() {
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!AppError::Database(sqlx::Error::RowNotFound).is_transient());
        assert!(!AppError::NotFound("x".into()).is_transient());
    }
}
