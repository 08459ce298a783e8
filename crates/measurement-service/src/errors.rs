//! Measurement service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Messages
//! returned to clients are generic; the underlying cause is logged
//! server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Measurement service error type.
///
/// Maps to HTTP status codes:
/// - Unauthorized: 401 (no credential, or it failed verification)
/// - Forbidden: 403 (caller known, access denied for the target)
/// - NotFound: 404
/// - BadRequest: 400
/// - OperationFailed, Database: 500
#[derive(Debug, Error)]
pub enum MsError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl MsError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            MsError::Unauthorized => 401,
            MsError::Forbidden => 403,
            MsError::NotFound(_) => 404,
            MsError::BadRequest(_) => 400,
            MsError::OperationFailed(_) | MsError::Database(_) => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for MsError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            MsError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            MsError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access to this resource is not permitted".to_string(),
            ),
            MsError::OperationFailed(detail) => {
                tracing::error!(target: "ms.errors", error = %detail, "Operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            MsError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
            MsError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            MsError::Database(err) => {
                tracing::error!(target: "ms.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) =
                "Bearer realm=\"measurement-service\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

/// Convert sqlx errors to MsError
impl From<sqlx::Error> for MsError {
    fn from(err: sqlx::Error) -> Self {
        MsError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(MsError::Unauthorized.status_code(), 401);
        assert_eq!(MsError::Forbidden.status_code(), 403);
        assert_eq!(MsError::NotFound("m".to_string()).status_code(), 404);
        assert_eq!(MsError::BadRequest("b".to_string()).status_code(), 400);
        assert_eq!(
            MsError::OperationFailed("upstream".to_string()).status_code(),
            500
        );
        assert_eq!(MsError::Database("db".to_string()).status_code(), 500);
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(MsError::Unauthorized.to_string(), "Unauthorized");
        assert_eq!(MsError::Forbidden.to_string(), "Forbidden");
        assert_eq!(
            MsError::OperationFailed("family service down".to_string()).to_string(),
            "Operation failed: family service down"
        );
    }

    #[tokio::test]
    async fn test_unauthorized_response_has_www_authenticate_and_no_detail() {
        let response = MsError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let header = response
            .headers()
            .get("WWW-Authenticate")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(header.contains("realm=\"measurement-service\""));
        assert!(header.contains("invalid_token"));

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["message"], "Authentication required");
    }

    #[tokio::test]
    async fn test_forbidden_response() {
        let response = MsError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_operation_failed_hides_detail() {
        let response =
            MsError::OperationFailed("status 502: bad gateway from family".to_string())
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "An internal error occurred");
        assert!(!body.to_string().contains("bad gateway"));
    }

    #[tokio::test]
    async fn test_database_error_hides_detail() {
        let response =
            MsError::Database("relation measurements does not exist".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "DATABASE_ERROR");
        assert!(!body.to_string().contains("relation"));
    }

    #[tokio::test]
    async fn test_not_found_and_bad_request_carry_message() {
        let response = MsError::NotFound("Measurement not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["message"], "Measurement not found");

        let response = MsError::BadRequest("Unknown measurement type".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }
}
