// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::token::TokenError;
use crate::error::ApiError;
use crate::users::UserStoreError;

const LOGIN_FAILED_MESSAGE: &str = "The provided credentials were invalid.";
const AUTH_REQUIRED_MESSAGE: &str = "Authentication required";
const CSRF_MESSAGE: &str = "invalid csrf token";

/// Authentication error type.
///
/// `InvalidToken` never reaches a client: identity restoration turns it into
/// an anonymous caller. The other variants map onto [`ApiError`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid session token: {0}")]
    InvalidToken(#[from] TokenError),

    /// Unknown user and wrong password are deliberately indistinguishable.
    #[error("login failed")]
    AuthenticationFailed,

    #[error("authentication required")]
    Unauthorized,

    #[error("invalid csrf token")]
    CsrfMismatch,

    #[error("user lookup failed: {0}")]
    UpstreamLookup(#[from] UserStoreError),

    #[error("internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Machine-readable code for log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::AuthenticationFailed => "authentication_failed",
            AuthError::Unauthorized => "unauthorized",
            AuthError::CsrfMismatch => "csrf_mismatch",
            AuthError::UpstreamLookup(_) => "upstream_lookup",
            AuthError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidToken(_)
            | AuthError::AuthenticationFailed
            | AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::CsrfMismatch => StatusCode::FORBIDDEN,
            AuthError::UpstreamLookup(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = err.status_code();
        match err {
            AuthError::AuthenticationFailed => {
                ApiError::new(status, "Login failed", LOGIN_FAILED_MESSAGE)
                    .with_error("credential", LOGIN_FAILED_MESSAGE)
            }
            AuthError::InvalidToken(_) | AuthError::Unauthorized => {
                ApiError::new(status, AUTH_REQUIRED_MESSAGE, AUTH_REQUIRED_MESSAGE)
                    .with_error("message", AUTH_REQUIRED_MESSAGE)
            }
            AuthError::CsrfMismatch => ApiError::new(status, "Invalid CSRF token", CSRF_MESSAGE)
                .with_error("csrf", CSRF_MESSAGE),
            err @ (AuthError::UpstreamLookup(_) | AuthError::Internal(_)) => {
                ApiError::internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn login_failure_returns_401_without_detail() {
        let response = AuthError::AuthenticationFailed.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["title"], "Login failed");
        assert_eq!(body["errors"]["credential"], LOGIN_FAILED_MESSAGE);
        assert!(body.get("stack").is_none());
    }

    #[test]
    fn login_failure_carries_no_internal_detail() {
        assert!(ApiError::from(AuthError::AuthenticationFailed).detail.is_none());
    }

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let response = AuthError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["title"], "Authentication required");
        assert_eq!(body["errors"]["message"], "Authentication required");
    }

    #[tokio::test]
    async fn csrf_mismatch_returns_403() {
        let response = AuthError::CsrfMismatch.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["title"], "Invalid CSRF token");
        assert_eq!(body["message"], "invalid csrf token");
    }

    #[test]
    fn api_status_follows_status_code() {
        let errors = [
            AuthError::from(TokenError::Expired),
            AuthError::AuthenticationFailed,
            AuthError::Unauthorized,
            AuthError::CsrfMismatch,
            AuthError::Internal("boom".into()),
        ];
        for err in errors {
            let expected = err.status_code();
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn token_errors_are_invalid_token() {
        let err = AuthError::from(TokenError::InvalidSignature);
        assert!(matches!(err, AuthError::InvalidToken(TokenError::InvalidSignature)));
        assert_eq!(err.error_code(), "invalid_token");
    }

    #[test]
    fn upstream_failure_is_a_server_error_with_detail() {
        let err = AuthError::from(UserStoreError::Unavailable("connection refused".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "upstream_lookup");

        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.title, "Server Error");
        assert!(api.detail.unwrap().contains("connection refused"));
    }
}
