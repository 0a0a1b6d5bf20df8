use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::error::{ApiError, AuthCode};
use crate::state::AppState;
use crate::users::repo::User;

/// Auth gate for protected routes. Verifies the bearer token, resolves
/// the user it names and hands the full row to the handler. Any failure
/// short-circuits the request with a 401 and a machine-readable code.
pub struct CurrentUser(pub User);

/// Pull the token out of `Authorization: Bearer <token>`. The scheme is
/// matched literally.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::unauthenticated(
                AuthCode::MissingToken,
                "No authentication token, access denied",
            )
        })?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            ApiError::unauthenticated(AuthCode::InvalidToken, "Invalid Authorization header")
        })?
        .trim();

    if token.is_empty() {
        return Err(ApiError::unauthenticated(
            AuthCode::MissingToken,
            "No authentication token, access denied",
        ));
    }
    Ok(token)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!("token verification failed");
            e
        })?;

        // The account may have been removed after the token was issued.
        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token subject no longer exists");
                ApiError::unauthenticated(AuthCode::UserNotFound, "User not found")
            })?;

        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn code_of(err: ApiError) -> AuthCode {
        match err {
            ApiError::Unauthenticated { code, .. } => code,
            other => panic!("expected Unauthenticated, got {:?}", other),
        }
    }

    #[test]
    fn extracts_token_from_bearer_header() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn missing_header_is_missing_token() {
        let err = bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(code_of(err), AuthCode::MissingToken);
    }

    #[test]
    fn wrong_scheme_is_invalid_token() {
        let err = bearer_token(&headers_with("Basic abc")).unwrap_err();
        assert_eq!(code_of(err), AuthCode::InvalidToken);
    }

    #[test]
    fn lowercase_bearer_is_rejected() {
        let err = bearer_token(&headers_with("bearer abc")).unwrap_err();
        assert_eq!(code_of(err), AuthCode::InvalidToken);
    }

    #[test]
    fn empty_token_after_scheme_is_missing_token() {
        let err = bearer_token(&headers_with("Bearer ")).unwrap_err();
        assert_eq!(code_of(err), AuthCode::MissingToken);
    }
}
