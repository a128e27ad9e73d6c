// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Current-user endpoints.

use axum::Json;

use crate::auth::{Authenticated, CurrentUser};
use crate::models::Identity;

/// Identity of the caller, `null` when anonymous.
#[utoipa::path(
    get,
    path = "/api/restore-user",
    tag = "Users",
    responses(
        (status = 200, description = "Current identity or null", body = Identity)
    )
)]
pub async fn current_user(user: CurrentUser) -> Json<Option<Identity>> {
    Json(user.into_identity())
}

/// Identity of the caller; anonymous callers get 401.
#[utoipa::path(
    get,
    path = "/api/require-auth",
    tag = "Users",
    responses(
        (status = 200, description = "Current identity", body = Identity),
        (status = 401, description = "Authentication required", body = crate::error::ErrorBody)
    )
)]
pub async fn require_auth_user(Authenticated(user): Authenticated) -> Json<Identity> {
    Json(user)
}
