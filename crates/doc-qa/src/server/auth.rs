//! Bearer token authentication for the API routes

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::server::state::AppState;

/// Why a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `Authorization` header
    Missing,
    /// Header present but not `Bearer <token>`
    Malformed,
    /// Well-formed header with the wrong token
    InvalidToken,
}

impl AuthFailure {
    fn status(self) -> StatusCode {
        match self {
            AuthFailure::Missing | AuthFailure::Malformed => StatusCode::UNAUTHORIZED,
            AuthFailure::InvalidToken => StatusCode::FORBIDDEN,
        }
    }

    fn message(self) -> &'static str {
        match self {
            AuthFailure::Missing => "Missing Authorization header",
            AuthFailure::Malformed => "Authorization header must use the Bearer scheme",
            AuthFailure::InvalidToken => "Invalid token",
        }
    }
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let error_type = match self.status() {
            StatusCode::FORBIDDEN => "forbidden",
            _ => "unauthorized",
        };
        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.message(),
            }
        }));
        (self.status(), body).into_response()
    }
}

/// Check `Authorization: Bearer <token>` against the expected token
pub fn check_bearer(headers: &HeaderMap, expected: &str) -> Result<(), AuthFailure> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthFailure::Missing)?
        .to_str()
        .map_err(|_| AuthFailure::Malformed)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthFailure::Malformed)?;

    if token == expected {
        Ok(())
    } else {
        Err(AuthFailure::InvalidToken)
    }
}

/// Reject requests without the configured bearer token; a no-op when no token is configured
pub async fn require_bearer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthFailure> {
    if let Some(expected) = state.auth_token() {
        if let Err(failure) = check_bearer(req.headers(), expected) {
            tracing::warn!("Rejected {} {}: {}", req.method(), req.uri(), failure.message());
            return Err(failure);
        }
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_valid_token() {
        assert_eq!(check_bearer(&headers(Some("Bearer secret")), "secret"), Ok(()));
    }

    #[test]
    fn test_missing_and_malformed() {
        assert_eq!(check_bearer(&headers(None), "secret"), Err(AuthFailure::Missing));
        assert_eq!(
            check_bearer(&headers(Some("Basic c2VjcmV0")), "secret"),
            Err(AuthFailure::Malformed)
        );
        assert_eq!(
            check_bearer(&headers(Some("Bearer ")), "secret"),
            Err(AuthFailure::Malformed)
        );
    }

    #[test]
    fn test_wrong_token_is_forbidden() {
        let failure = check_bearer(&headers(Some("Bearer nope")), "secret").unwrap_err();
        assert_eq!(failure, AuthFailure::InvalidToken);
        assert_eq!(failure.into_response().status(), StatusCode::FORBIDDEN);
    }
}
