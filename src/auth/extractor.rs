// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the request's caller.
//!
//! Both read the [`CurrentUser`] left in the request extensions by
//! [`restore_user`](super::middleware::restore_user):
//!
//! ```rust,ignore
//! async fn profile(Authenticated(user): Authenticated) -> Json<Identity> {
//!     Json(user)
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, CurrentUser};
use crate::models::Identity;

/// A route reached without identity restoration is wired incorrectly.
fn missing_restoration() -> AuthError {
    AuthError::Internal("identity restoration did not run for this route".to_string())
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(missing_restoration)
    }
}

/// Extractor for logged-in callers; anonymous callers are rejected with 401.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await? {
            CurrentUser::Resolved(identity) => Ok(Authenticated(identity)),
            CurrentUser::Anonymous => Err(AuthError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(user: Option<CurrentUser>) -> Parts {
        let mut request = Request::builder().uri("/").body(()).unwrap();
        if let Some(user) = user {
            request.extensions_mut().insert(user);
        }
        request.into_parts().0
    }

    #[tokio::test]
    async fn current_user_reads_extension() {
        let mut parts = parts_with(Some(CurrentUser::Anonymous));
        let user = CurrentUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user, CurrentUser::Anonymous);
    }

    #[tokio::test]
    async fn missing_extension_is_internal_error() {
        let mut parts = parts_with(None);
        let err = CurrentUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }

    #[tokio::test]
    async fn authenticated_accepts_resolved_user() {
        let mut parts = parts_with(Some(CurrentUser::Resolved(Identity::new(7, "demo"))));
        let Authenticated(identity) = Authenticated::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(identity.id, 7);
    }

    #[tokio::test]
    async fn authenticated_rejects_anonymous() {
        let mut parts = parts_with(Some(CurrentUser::Anonymous));
        let err = Authenticated::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }
}
