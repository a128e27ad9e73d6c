// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity restoration and the access gate.
//!
//! [`restore_user`] runs on every API request. It never rejects a request
//! for a bad token: a missing, invalid or expired token, or one naming a
//! deleted user, simply yields [`CurrentUser::Anonymous`]. Only a failing
//! user lookup is an error.
//!
//! A stale session cookie is expired on the way out unless the handler set a
//! fresh one (a login carrying an old cookie, for instance).

use axum::{
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use super::{AuthError, CurrentUser};
use crate::state::AppState;

/// Outcome of identity restoration.
#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    pub user: CurrentUser,
    /// The request carried a session cookie that no longer identifies anyone.
    pub stale: bool,
}

impl Restored {
    fn anonymous(stale: bool) -> Self {
        Self {
            user: CurrentUser::Anonymous,
            stale,
        }
    }
}

/// Resolve the caller from the session cookie in `jar`.
pub async fn resolve_identity(state: &AppState, jar: &CookieJar) -> Result<Restored, AuthError> {
    let Some(token) = state.cookies.read(jar) else {
        return Ok(Restored::anonymous(false));
    };

    let user_id = match state.codec.verify(&token).map_err(AuthError::from) {
        Ok(user_id) => user_id,
        Err(err) => {
            tracing::debug!(code = err.error_code(), reason = %err, "ignoring session token");
            return Ok(Restored::anonymous(true));
        }
    };

    match state.users.find_by_id(user_id).await? {
        Some(identity) => Ok(Restored {
            user: CurrentUser::Resolved(identity),
            stale: false,
        }),
        None => {
            tracing::debug!(user_id, "session token names an unknown user");
            Ok(Restored::anonymous(true))
        }
    }
}

/// Middleware attaching a [`CurrentUser`] to every request.
pub async fn restore_user(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let restored = match resolve_identity(&state, &jar).await {
        Ok(restored) => restored,
        Err(err) => {
            tracing::warn!(code = err.error_code(), "identity restoration failed");
            return err.into_response();
        }
    };

    request.extensions_mut().insert(restored.user);
    let response = next.run(request).await;

    if !restored.stale || sets_session_cookie(&state, &response) {
        return response;
    }
    (state.cookies.clear(CookieJar::new()), response).into_response()
}

/// Middleware rejecting anonymous callers before the handler runs.
pub async fn require_auth(request: Request, next: Next) -> Response {
    match request.extensions().get::<CurrentUser>() {
        Some(CurrentUser::Resolved(_)) => next.run(request).await,
        Some(CurrentUser::Anonymous) => AuthError::Unauthorized.into_response(),
        None => AuthError::Internal("access gate reached without identity restoration".into())
            .into_response(),
    }
}

fn sets_session_cookie(state: &AppState, response: &Response) -> bool {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| state.cookies.is_session_cookie_header(value))
}
