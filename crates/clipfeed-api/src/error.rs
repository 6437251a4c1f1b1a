//! `ApiError` maps every library error to the HTTP taxonomy of spec §7:
//! client validation → 400, auth → 401, scope/ownership mismatch → 404
//! ("do not leak existence"), conflict → 409, not found → 404, external
//! dependency → 500 (no user-visible partial state to surface inline
//! here), internal → 500 with a generic body, rate limit → 429 with
//! `Retry-After: 60`.
//!
//! Grounded on the teacher's `agent::api::error::ApiError` (status code +
//! wrapped `anyhow::Error`, manual `IntoResponse`), with the
//! `schemars`/`aide` OpenAPI-schema annotations dropped — this workspace
//! has no OpenAPI generation requirement — and extended with a `#[from]`
//! conversion per library crate's `Error` enum.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

pub trait ApiErrorExt {
    fn with_status(self, status: StatusCode) -> ApiError;
}

impl<E: Into<ApiError>> ApiErrorExt for E {
    fn with_status(self, status: StatusCode) -> ApiError {
        let mut err = self.into();
        err.status = status;
        err
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: anyhow::Error,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<anyhow::Error>) -> Self {
        Self { status, error: error.into(), retry_after: None }
    }

    pub fn not_found(message: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, anyhow::anyhow!("{message}"))
    }

    pub fn unauthorized(message: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, anyhow::anyhow!("{message}"))
    }

    pub fn bad_request(message: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::BAD_REQUEST, anyhow::anyhow!("{message}"))
    }

    pub fn conflict(message: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::CONFLICT, anyhow::anyhow!("{message}"))
    }

    /// §7: scope/ownership mismatches answer as if the resource did not
    /// exist, rather than a 403 that would confirm it does.
    pub fn forbidden_as_not_found(message: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, anyhow::anyhow!("{message}"))
    }

    pub fn rate_limited() -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            error: anyhow::anyhow!("rate limit exceeded"),
            retry_after: Some(60),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<crate::extract::Rejection> for ApiError {
    fn from(rejection: crate::extract::Rejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, anyhow::anyhow!("{rejection}"))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        tracing::error!(error = %error, "database error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("database error, please retry the request"))
    }
}

impl From<clipfeed_dialect::Error> for ApiError {
    fn from(error: clipfeed_dialect::Error) -> Self {
        tracing::error!(error = %error, "dialect layer error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("database error, please retry the request"))
    }
}

impl From<clipfeed_queue::Error> for ApiError {
    fn from(error: clipfeed_queue::Error) -> Self {
        use clipfeed_queue::Error::*;
        match error {
            NotFound => ApiError::not_found("job not found"),
            Forbidden => ApiError::forbidden_as_not_found("job not found"),
            InvalidTransition { .. } => ApiError::conflict(error.to_string()),
            MalformedRow(_) | Json(_) | Sqlx(_) => {
                tracing::error!(error = %error, "job queue error");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("internal error"))
            }
        }
    }
}

impl From<clipfeed_ingest::Error> for ApiError {
    fn from(error: clipfeed_ingest::Error) -> Self {
        use clipfeed_ingest::Error::*;
        match error {
            InvalidUrl(_) => ApiError::bad_request(error.to_string()),
            NotFound => ApiError::not_found("not found"),
            Forbidden => ApiError::forbidden_as_not_found("not found"),
            NotPending => ApiError::conflict("candidate is not pending"),
            MalformedRow(_) | Json(_) | Sqlx(_) => {
                tracing::error!(error = %error, "ingest error");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("internal error"))
            }
        }
    }
}

impl From<clipfeed_ranking::Error> for ApiError {
    fn from(error: clipfeed_ranking::Error) -> Self {
        use clipfeed_ranking::Error::*;
        match error {
            NoEmbedding => ApiError::not_found("clip has no embedding to compare against"),
            Topics(_) | MalformedRow(_) | Sqlx(_) => {
                tracing::error!(error = %error, "ranking error");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("internal error"))
            }
        }
    }
}

impl From<clipfeed_topics::Error> for ApiError {
    fn from(error: clipfeed_topics::Error) -> Self {
        tracing::error!(error = %error, "topic graph error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("internal error"))
    }
}

impl From<clipfeed_lifecycle::Error> for ApiError {
    fn from(error: clipfeed_lifecycle::Error) -> Self {
        tracing::error!(error = %error, "lifecycle sweep error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("internal error"))
    }
}

impl From<clipfeed_security::CookieRepoError> for ApiError {
    fn from(error: clipfeed_security::CookieRepoError) -> Self {
        tracing::error!(error = %error, "cookie repository error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("internal error"))
    }
}

impl From<crate::auth::Error> for ApiError {
    fn from(error: crate::auth::Error) -> Self {
        ApiError::unauthorized(error)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        tracing::error!(error = %error, "malformed json column");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("internal error"))
    }
}

impl From<uuid::Error> for ApiError {
    fn from(error: uuid::Error) -> Self {
        ApiError::bad_request(format!("invalid id: {error}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": format!("{:#}", self.error) });
        let mut response = (self.status, Json(body)).into_response();
        if let Some(seconds) = self.retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}
