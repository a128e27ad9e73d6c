// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and the per-request caller.

use serde::{Deserialize, Serialize};

use crate::models::{Identity, UserId};

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id, as a decimal string.
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds). The token is invalid once `exp <= now`.
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(user_id: UserId, issued_at: i64, expires_at: i64) -> Self {
        Self {
            sub: user_id.to_string(),
            iat: issued_at,
            exp: expires_at,
        }
    }

    /// The subject as a user id, `None` if it is not an integer.
    pub fn user_id(&self) -> Option<UserId> {
        self.sub.parse().ok()
    }
}

/// Caller of the current request.
///
/// Produced exactly once per request by identity restoration and stored in
/// the request extensions. A request that never went through restoration has
/// no `CurrentUser` at all, which handlers treat as a server error.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentUser {
    Anonymous,
    Resolved(Identity),
}

impl CurrentUser {
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            CurrentUser::Resolved(identity) => Some(identity),
            CurrentUser::Anonymous => None,
        }
    }
}
