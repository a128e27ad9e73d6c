// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, logout and session lookup.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{AuthError, CurrentUser};
use crate::error::ApiError;
use crate::models::{Identity, LoginRequest, LogoutResponse, SessionResponse};
use crate::state::AppState;

/// Log in with a username or email and a password.
///
/// On success the session cookie is set and the identity returned. Unknown
/// users and wrong passwords produce the same 401 body.
#[utoipa::path(
    post,
    path = "/api/session",
    tag = "Session",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = Identity),
        (status = 400, description = "Missing credential or password", body = crate::error::ErrorBody),
        (status = 401, description = "Login failed", body = crate::error::ErrorBody),
        (status = 403, description = "Missing or mismatched CSRF token", body = crate::error::ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<Identity>), ApiError> {
    let Json(request) = payload
        .map_err(|rejection| ApiError::bad_request().with_error("body", rejection.body_text()))?;
    validate_login(&request)?;

    let identity = state
        .users
        .find_by_credentials(request.credential.trim(), &request.password)
        .await
        .map_err(AuthError::from)?
        .ok_or(AuthError::AuthenticationFailed)?;

    let token = state
        .codec
        .issue(&identity)
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    tracing::info!(user_id = identity.id, "user logged in");
    Ok((state.cookies.set(jar, &token), Json(identity)))
}

/// Log out by expiring the session cookie.
///
/// The token itself stays valid until it expires; there is no revocation list.
#[utoipa::path(
    delete,
    path = "/api/session",
    tag = "Session",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse),
        (status = 403, description = "Missing or mismatched CSRF token", body = crate::error::ErrorBody)
    )
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    (
        state.cookies.clear(jar),
        Json(LogoutResponse {
            message: "success".to_string(),
        }),
    )
}

/// `POST /api/logout`, same as `DELETE /api/session`.
#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "Session",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse),
        (status = 403, description = "Missing or mismatched CSRF token", body = crate::error::ErrorBody)
    )
)]
pub async fn logout_alias(state: State<AppState>, jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    logout(state, jar).await
}

/// Log in as the seeded demo user without credentials.
///
/// Only routed outside production. The user is re-read from the store so a
/// removed demo account yields 404 instead of a token for nobody.
#[utoipa::path(
    get,
    path = "/api/set-token-cookie",
    tag = "Session",
    responses(
        (status = 200, description = "Logged in as the demo user", body = SessionResponse),
        (status = 404, description = "No demo user is seeded", body = crate::error::ErrorBody)
    )
)]
pub async fn set_demo_token_cookie(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let Some(demo) = &state.demo_user else {
        return Err(ApiError::not_found());
    };
    let identity = state
        .users
        .find_by_id(demo.id)
        .await
        .map_err(AuthError::from)?
        .ok_or_else(ApiError::not_found)?;

    let token = state
        .codec
        .issue(&identity)
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    tracing::info!(user_id = identity.id, "issued demo session");
    Ok((
        state.cookies.set(jar, &token),
        Json(SessionResponse {
            user: Some(identity),
        }),
    ))
}

/// Current session; `user` is `null` when not logged in.
#[utoipa::path(
    get,
    path = "/api/session",
    tag = "Session",
    responses(
        (status = 200, description = "Current session", body = SessionResponse)
    )
)]
pub async fn get_session(user: CurrentUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: user.into_identity(),
    })
}

fn validate_login(request: &LoginRequest) -> Result<(), ApiError> {
    let mut error = None;
    if request.credential.trim().is_empty() {
        error = Some(
            ApiError::bad_request()
                .with_error("credential", "Please provide a valid email or username."),
        );
    }
    if request.password.is_empty() {
        error = Some(
            error
                .unwrap_or_else(ApiError::bad_request)
                .with_error("password", "Please provide a password."),
        );
    }
    error.map_or(Ok(()), Err)
}
