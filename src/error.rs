use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Machine-readable reason attached to 401 responses so clients can
/// distinguish a stale token from a bad one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthCode {
    MissingToken,
    InvalidToken,
    TokenExpired,
    UserNotFound,
    InvalidCredentials,
}

/// Application error taxonomy, mapped centrally to HTTP responses.
/// Every response body is `{"success": false, "message": ...}` plus a
/// `code` for auth failures and the underlying `error` text for 500s.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    Unauthenticated { code: AuthCode, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Upstream { message: String, detail: String },
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthenticated(code: AuthCode, msg: impl Into<String>) -> Self {
        Self::Unauthenticated {
            code,
            message: msg.into(),
        }
    }

    /// Generic login failure; identical for unknown email and wrong
    /// password so the response never reveals which one it was.
    pub fn invalid_credentials() -> Self {
        Self::unauthenticated(AuthCode::InvalidCredentials, "Invalid credentials")
    }

    pub fn upstream(msg: impl Into<String>, detail: impl ToString) -> Self {
        Self::Upstream {
            message: msg.into(),
            detail: detail.to_string(),
        }
    }

    /// Replace the generic unique-violation message with one specific to
    /// the calling operation; any other error passes through untouched.
    pub fn conflict_message(self, msg: &str) -> Self {
        match self {
            Self::Conflict(_) => Self::Conflict(msg.into()),
            other => other,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, detail) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, None, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, None, msg, None),
            ApiError::Unauthenticated { code, message } => {
                (StatusCode::UNAUTHORIZED, Some(code), message, None)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, None, msg, None),
            ApiError::Upstream { message, detail } => {
                tracing::error!(error = %detail, "upstream failure: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    message,
                    Some(detail),
                )
            }
        };

        let mut body = json!({
            "success": false,
            "message": message,
        });
        if let Some(code) = code {
            body["code"] = json!(code);
        }
        if let Some(detail) = detail {
            body["error"] = json!(detail);
        }

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        // Unique-violation backstop for the check-then-insert race on
        // users.email, the only unique constraint besides primary keys.
        if let sqlx::Error::Database(ref db) = err {
            if db.code().as_deref() == Some("23505") {
                return ApiError::Conflict("Email already registered".into());
            }
        }
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            other => ApiError::upstream("Database error", other),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::upstream("Internal server error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_maps_to_400() {
        let (status, body) = body_json(ApiError::validation("All fields are required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "All fields are required");
        assert!(body.get("code").is_none());
    }

    #[tokio::test]
    async fn conflict_maps_to_409() {
        let (status, body) = body_json(ApiError::Conflict("Email already registered".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Email already registered");
    }

    #[tokio::test]
    async fn unauthenticated_carries_sub_code() {
        let (status, body) = body_json(ApiError::unauthenticated(
            AuthCode::TokenExpired,
            "Token has expired",
        ))
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn upstream_exposes_detail_text() {
        let (status, body) = body_json(ApiError::upstream("Upload failed", "s3 timed out")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Upload failed");
        assert_eq!(body["error"], "s3 timed out");
    }

    #[tokio::test]
    async fn both_login_failure_modes_share_one_shape() {
        let (s1, b1) = body_json(ApiError::invalid_credentials()).await;
        let (s2, b2) = body_json(ApiError::invalid_credentials()).await;
        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s1, s2);
        assert_eq!(b1, b2);
        assert_eq!(b1["code"], "INVALID_CREDENTIALS");
    }

    #[test]
    fn conflict_message_rewrites_only_conflicts() {
        let err = ApiError::Conflict("Email already registered".into())
            .conflict_message("Email already in use");
        match err {
            ApiError::Conflict(msg) => assert_eq!(msg, "Email already in use"),
            other => panic!("expected Conflict, got {:?}", other),
        }

        let err = ApiError::NotFound("User not found".into())
            .conflict_message("Email already in use");
        match err {
            ApiError::NotFound(msg) => assert_eq!(msg, "User not found"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let (status, body) =
            body_json(ApiError::NotFound("Movie not found in favorites".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Movie not found in favorites");
    }
}
