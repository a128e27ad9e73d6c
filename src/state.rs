// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{CsrfGuard, SessionCookies, TokenCodec};
use crate::config::{Environment, SessionConfig};
use crate::models::Identity;
use crate::users::UserStore;

/// Shared per-process state. Everything here is read-only after startup.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub environment: Environment,
    pub codec: Arc<TokenCodec>,
    pub cookies: SessionCookies,
    pub csrf: CsrfGuard,
    pub users: Arc<dyn UserStore>,
    /// Seeded demo user, served by `GET /api/set-token-cookie` in development.
    pub demo_user: Option<Identity>,
}

impl AppState {
    pub fn new(config: &SessionConfig, users: Arc<dyn UserStore>) -> Self {
        Self {
            environment: config.environment,
            codec: Arc::new(TokenCodec::from_config(config)),
            cookies: SessionCookies::from_config(config),
            csrf: CsrfGuard::from_config(config),
            users,
            demo_user: None,
        }
    }

    pub fn with_demo_user(mut self, identity: Identity) -> Self {
        self.demo_user = Some(identity);
        self
    }
}
