// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the session API. All types derive
//! `ToSchema` for the OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Identity**: the user record exposed by the user store
//! - **Session**: login credentials and session responses
//! - **CSRF**: the token handed out by the restore endpoint

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User identifier assigned by the user store.
pub type UserId = i64;

// =============================================================================
// Identity
// =============================================================================

/// A user as exposed by the user store.
///
/// Serialises as `{ "id", "username", ...public_fields }`. The session layer
/// only reads identities; it never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    /// Extra fields the user store chooses to publish (e.g. `email`).
    #[serde(flatten)]
    pub public_fields: BTreeMap<String, serde_json::Value>,
}

impl Identity {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            public_fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.public_fields.insert(name.into(), value.into());
        self
    }
}

// =============================================================================
// Session Models
// =============================================================================

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email address.
    #[serde(default)]
    pub credential: String,
    #[serde(default)]
    pub password: String,
}

/// Current session, `user` is `null` for anonymous requests.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub user: Option<Identity>,
}

/// Response after logging out.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

// =============================================================================
// CSRF Models
// =============================================================================

/// Body of `GET /api/csrf/restore`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CsrfTokenResponse {
    #[serde(rename = "XSRF-Token")]
    pub xsrf_token: String,
}

/// Body of `POST /api/test`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EchoResponse {
    #[serde(rename = "requestBody")]
    #[schema(value_type = Object)]
    pub request_body: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_serialises_flat() {
        let identity = Identity::new(7, "demo");
        assert_eq!(
            serde_json::to_value(&identity).unwrap(),
            serde_json::json!({ "id": 7, "username": "demo" })
        );

        let identity = identity.with_field("email", "demo@example.com");
        assert_eq!(
            serde_json::to_value(&identity).unwrap(),
            serde_json::json!({ "id": 7, "username": "demo", "email": "demo@example.com" })
        );
    }

    #[test]
    fn csrf_response_uses_header_style_key() {
        let body = CsrfTokenResponse {
            xsrf_token: "abc".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"XSRF-Token":"abc"}"#
        );
    }

    #[test]
    fn login_request_tolerates_missing_fields() {
        let request: LoginRequest = serde_json::from_str(r#"{"credential":"demo"}"#).unwrap();
        assert_eq!(request.credential, "demo");
        assert!(request.password.is_empty());
    }
}
