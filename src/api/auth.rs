// =============================================================================
// Bearer Token Authentication: Axum extractor
// =============================================================================
//
// Guards the endpoints that trigger outbound traffic (manual refresh) or
// expose failure details.  The expected token is `PULSE_ADMIN_TOKEN`; when it
// is unset every guarded request is refused.
//
//   async fn handler(_auth: AuthBearer, ...) { ... }
// =============================================================================

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

pub const ADMIN_TOKEN_VAR: &str = "PULSE_ADMIN_TOKEN";

/// Compare two byte slices without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

pub struct AuthBearer(pub String);

#[derive(Debug)]
pub struct AuthRejection {
    status: StatusCode,
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, axum::Json(body)).into_response()
    }
}

/// Validate an `Authorization` header value against `expected`.
fn check_bearer(header: Option<&str>, expected: &str) -> Result<String, AuthRejection> {
    if expected.is_empty() {
        return Err(AuthRejection {
            status: StatusCode::FORBIDDEN,
            message: "Server authentication not configured",
        });
    }

    let token = match header.and_then(|v| v.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return Err(AuthRejection {
                status: StatusCode::UNAUTHORIZED,
                message: "Missing or invalid authorization token",
            })
        }
    };

    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        return Err(AuthRejection {
            status: StatusCode::FORBIDDEN,
            message: "Invalid authorization token",
        });
    }

    Ok(token.to_string())
}

impl<S> FromRequestParts<S> for AuthBearer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Read on every request so rotation does not need a restart.
        let expected = std::env::var(ADMIN_TOKEN_VAR).unwrap_or_default();

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        check_bearer(header, &expected)
            .map(AuthBearer)
            .inspect_err(|rejection| warn!(reason = rejection.message, "request rejected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_identical() {
        assert!(constant_time_eq(b"hello", b"hello"));
    }

    #[test]
    fn constant_time_eq_different() {
        assert!(!constant_time_eq(b"hello", b"world"));
    }

    #[test]
    fn constant_time_eq_different_lengths() {
        assert!(!constant_time_eq(b"short", b"longer_string"));
    }

    #[test]
    fn bearer_accepts_matching_token() {
        assert_eq!(check_bearer(Some("Bearer s3cret"), "s3cret").unwrap(), "s3cret");
    }

    #[test]
    fn bearer_rejects_when_unconfigured() {
        let err = check_bearer(Some("Bearer anything"), "").unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn bearer_rejects_missing_or_malformed_header() {
        assert_eq!(check_bearer(None, "s3cret").unwrap_err().status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            check_bearer(Some("Basic s3cret"), "s3cret").unwrap_err().status,
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn bearer_rejects_wrong_token() {
        let err = check_bearer(Some("Bearer nope"), "s3cret").unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }
}
