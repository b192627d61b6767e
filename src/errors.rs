use axum::extract::multipart::MultipartRejection;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::{
    models::Pagination,
    repository::{APPLICATION_EMAIL_KEY, CATEGORY_NAME_KEY, USER_EMAIL_KEY},
    storage::StorageError,
    validation::ValidationErrors,
};

/// Application-level error type.
/// Implements `IntoResponse` so handlers can return `Result<T, ApiError>` and every failure
/// leaves the service as a `{"success": false, ...}` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(ValidationErrors),

    #[error("{message}")]
    BadRequest {
        message: String,
        details: Map<String, Value>,
    },

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Conflict {
        message: String,
        details: Map<String, Value>,
    },

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    /// A request the extractors could not decode: bad JSON, path or query values.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
            details: Map::new(),
        }
    }

    /// Attaches an extra top-level key to a 400/409 envelope. No-op for other variants.
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let ApiError::BadRequest { details, .. } | ApiError::Conflict { details, .. } = &mut self
        {
            details.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Database(_)
            | ApiError::Storage(_)
            | ApiError::Upstream(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        // 23505: unique_violation. Reached when a concurrent request wins the race past the
        // handler's own duplicate check.
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some("23505") {
                return match db.constraint() {
                    Some(USER_EMAIL_KEY) => ApiError::conflict("User already exists"),
                    Some(APPLICATION_EMAIL_KEY) => {
                        ApiError::conflict("You have already applied for this job")
                    }
                    Some(CATEGORY_NAME_KEY) => {
                        ValidationErrors::single("name", "The name has already been taken.")
                            .into()
                    }
                    _ => ApiError::conflict("Resource already exists"),
                };
            }
        }
        ApiError::Database(err)
    }
}

// --- Extractor rejections ---

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(false));

        match self {
            ApiError::Validation(errors) => {
                body.insert("message".into(), "Validation failed".into());
                body.insert("errors".into(), json!(errors));
            }
            ApiError::BadRequest { message, details } | ApiError::Conflict { message, details } => {
                body.insert("message".into(), message.into());
                body.extend(details);
            }
            ApiError::Unauthorized => {
                body.insert("message".into(), "Unauthorized".into());
            }
            ApiError::InvalidCredentials => {
                body.insert("message".into(), "Invalid credentials".into());
            }
            ApiError::Forbidden => {
                body.insert("message".into(), "Forbidden: Insufficient permissions".into());
            }
            ApiError::NotFound(message)
            | ApiError::PayloadTooLarge(message)
            | ApiError::UnsupportedMediaType(message)
            | ApiError::Rejected { message, .. } => {
                body.insert("message".into(), message.into());
            }
            ApiError::Database(e) => {
                tracing::error!(error = %e, "database error");
                body.insert("message".into(), "A database error occurred".into());
            }
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "storage error");
                body.insert("message".into(), "A storage error occurred".into());
            }
            ApiError::Upstream(e) => {
                tracing::error!(error = %e, "upstream error");
                body.insert("message".into(), "An upstream service error occurred".into());
            }
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                body.insert("message".into(), "An internal server error occurred".into());
            }
        }

        (status, Json(Value::Object(body))).into_response()
    }
}

/// ApiResponse
///
/// Success envelope shared by every JSON endpoint: `{"success": true, "message", "data"}`
/// with optional `count`, `pagination` and free-form extra keys.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            count: None,
            pagination: None,
            extra: Map::new(),
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn bad_request_carries_details() {
        let err = ApiError::bad_request("Cannot delete job that has applications")
            .with_detail("applications_count", 3);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["applications_count"], 3);
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = ApiError::Internal("secret stack".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "An internal server error occurred");
    }

    #[test]
    fn success_envelope_skips_empty_optionals() {
        let value = serde_json::to_value(ApiResponse::ok("done", 1)).unwrap();
        assert_eq!(value, json!({"success": true, "message": "done", "data": 1}));
    }

    #[test]
    fn with_detail_ignored_for_not_found() {
        let err = ApiError::NotFound("Job not found".into()).with_detail("x", 1);
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn unique_violations_name_the_duplicate() {
        use crate::repository::UniqueViolation;

        let err = ApiError::from(UniqueViolation::error(USER_EMAIL_KEY));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "User already exists");

        let err = ApiError::from(UniqueViolation::error(APPLICATION_EMAIL_KEY));
        assert_eq!(err.to_string(), "You have already applied for this job");

        let err = ApiError::from(UniqueViolation::error(CATEGORY_NAME_KEY));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::from(UniqueViolation::error("some_other_key"));
        assert_eq!(err.to_string(), "Resource already exists");
    }

    #[tokio::test]
    async fn rejections_keep_status_inside_envelope() {
        let response = ApiError::Rejected {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            message: "Expected request with `Content-Type: application/json`".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "Expected request with `Content-Type: application/json`"
        );
    }
}
