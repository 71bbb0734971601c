//! API error taxonomy and the terminal response formatter.
//!
//! Handlers and repos return `ApiError`; every failure kind funnels through
//! one boundary (`error_envelope`) that renders the uniform JSON envelope
//! with status, RFC3339 timestamp, request path/method, message and tag.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::error::ErrorKind;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(e) => match e {
                sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
                // Any constraint the database reports back (unique, foreign
                // key, not-null, check) is a bad request, not a server fault.
                sqlx::Error::Database(db) => match db.kind() {
                    ErrorKind::Other => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_REQUEST,
                },
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "Bad Request",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::NotFound(_) => "Not Found",
            ApiError::Database(e) => match e {
                sqlx::Error::RowNotFound => "Record not found",
                sqlx::Error::Database(db) => match db.kind() {
                    ErrorKind::UniqueViolation => "Unique constraint violation",
                    ErrorKind::ForeignKeyViolation => "Foreign key constraint violation",
                    ErrorKind::NotNullViolation => "Not-null constraint violation",
                    ErrorKind::CheckViolation => "Check constraint violation",
                    _ => "Internal Server Error",
                },
                _ => "Internal Server Error",
            },
            ApiError::Internal(_) => "Internal Server Error",
        }
    }

    /// Client-facing message. Internal details never leak.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Database(sqlx::Error::RowNotFound) => {
                "The requested record does not exist".into()
            }
            ApiError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                "Unique constraint failed on field(s)".into()
            }
            ApiError::Database(sqlx::Error::Database(db))
                if !matches!(db.kind(), ErrorKind::Other) =>
            {
                match db.constraint() {
                    Some(name) => format!("Constraint failed: {name}"),
                    None => "Constraint violation".into(),
                }
            }
            ApiError::Database(_) | ApiError::Internal(_) => "Internal server error".into(),
            other => other.to_string(),
        }
    }
}

/// Parts of a failed response, stashed in response extensions so the
/// envelope middleware can add path/method before anything leaves the app.
#[derive(Debug, Clone)]
pub struct ErrorParts {
    pub status: StatusCode,
    pub tag: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    status_code: u16,
    timestamp: String,
    path: String,
    method: String,
    message: String,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let parts = ErrorParts {
            status: self.status(),
            tag: self.tag(),
            message: self.public_message(),
        };
        if parts.status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
        }
        let mut res = parts.status.into_response();
        res.extensions_mut().insert(parts);
        res
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

// Rejection bodies are short; anything larger is not one of ours.
const REJECTION_BODY_LIMIT: usize = 16 * 1024;

/// Terminal formatting boundary. Wraps the whole app; any response carrying
/// `ErrorParts` is rewritten into the uniform JSON envelope and logged with
/// its method and path. Error responses produced outside `ApiError` (axum
/// extractor rejections, unmatched routes) carry no parts and get wrapped
/// from their status and plain-text body instead.
pub async fn error_envelope(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let res = next.run(req).await;

    let status = res.status();
    let parts = if let Some(parts) = res.extensions().get::<ErrorParts>().cloned() {
        parts
    } else if status.is_client_error() || status.is_server_error() {
        let tag = status.canonical_reason().unwrap_or("Error");
        let bytes = axum::body::to_bytes(res.into_body(), REJECTION_BODY_LIMIT)
            .await
            .unwrap_or_default();
        let message = match std::str::from_utf8(&bytes) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => tag.to_string(),
        };
        ErrorParts {
            status,
            tag,
            message,
        }
    } else {
        return res;
    };

    warn!(%method, %path, status = %parts.status, message = %parts.message, "error response");
    let body = ErrorEnvelope {
        status_code: parts.status.as_u16(),
        timestamp: now_rfc3339(),
        path,
        method: method.to_string(),
        message: parts.message,
        error: parts.tag.to_string(),
    };
    (parts.status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("dup".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Unauthorized("no".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("no".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("gone".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err = ApiError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.tag(), "Record not found");
        assert_eq!(err.public_message(), "The requested record does not exist");
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = ApiError::Internal(anyhow::anyhow!("secret connection string"));
        assert_eq!(err.public_message(), "Internal server error");
        assert_eq!(err.tag(), "Internal Server Error");
    }

    #[test]
    fn into_response_carries_error_parts() {
        let res = ApiError::Forbidden("Your gender does not have access".into()).into_response();
        let parts = res.extensions().get::<ErrorParts>().expect("parts");
        assert_eq!(parts.status, StatusCode::FORBIDDEN);
        assert_eq!(parts.tag, "Forbidden");
    }

    #[derive(Debug)]
    struct StubConstraint(ErrorKind, Option<&'static str>);

    impl std::fmt::Display for StubConstraint {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "stub constraint error")
        }
    }

    impl std::error::Error for StubConstraint {}

    impl sqlx::error::DatabaseError for StubConstraint {
        fn message(&self) -> &str {
            "stub constraint error"
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                ErrorKind::NotNullViolation => ErrorKind::NotNullViolation,
                ErrorKind::CheckViolation => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }

        fn constraint(&self) -> Option<&str> {
            self.1
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn db_error(kind: ErrorKind, constraint: Option<&'static str>) -> ApiError {
        ApiError::from(sqlx::Error::Database(Box::new(StubConstraint(
            kind, constraint,
        ))))
    }

    #[test]
    fn foreign_key_violation_maps_to_400_with_constraint_name() {
        let err = db_error(
            ErrorKind::ForeignKeyViolation,
            Some("matches_venue_id_fkey"),
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.tag(), "Foreign key constraint violation");
        assert_eq!(err.public_message(), "Constraint failed: matches_venue_id_fkey");
    }

    #[test]
    fn check_and_not_null_violations_map_to_400() {
        assert_eq!(
            db_error(ErrorKind::CheckViolation, None).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            db_error(ErrorKind::NotNullViolation, None).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(db_error(ErrorKind::CheckViolation, None).public_message(), "Constraint violation");
    }

    #[test]
    fn unclassified_database_errors_stay_500() {
        let err = db_error(ErrorKind::Other, None);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[tokio::test]
    async fn extractor_rejections_are_wrapped_in_the_envelope() {
        use axum::{body::Body, http::Request as HttpRequest, middleware, routing::post, Router};
        use tower::ServiceExt;

        let app = Router::new()
            .route(
                "/echo",
                post(|Json(v): Json<serde_json::Value>| async move { Json(v) }),
            )
            .layer(middleware::from_fn(error_envelope));
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/echo")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = http_body_util::BodyExt::collect(res.into_body())
            .await
            .unwrap()
            .to_bytes();
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["statusCode"], 400);
        assert_eq!(envelope["path"], "/echo");
        assert_eq!(envelope["method"], "POST");
        assert_eq!(envelope["error"], "Bad Request");
        assert!(envelope["message"].as_str().is_some());
    }

    #[tokio::test]
    async fn unmatched_routes_get_an_enveloped_404() {
        use axum::{body::Body, http::Request as HttpRequest, middleware, Router};
        use tower::ServiceExt;

        let app = Router::new().layer(middleware::from_fn(error_envelope));
        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body = http_body_util::BodyExt::collect(res.into_body())
            .await
            .unwrap()
            .to_bytes();
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["statusCode"], 404);
        assert_eq!(envelope["error"], "Not Found");
        assert_eq!(envelope["message"], "Not Found");
    }
}
