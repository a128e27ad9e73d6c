// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Session Server - Cookie Session Authentication
//!
//! Issues signed session tokens on login, keeps them in an HTTP-only cookie,
//! restores the caller's identity on every request and guards mutating
//! requests with a double-submit CSRF token.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and router (Axum)
//! - `auth` - Token codec, session cookies, CSRF guard and middleware
//! - `config` - Environment-driven configuration
//! - `error` - API error type and error-formatting boundary
//! - `users` - User store trait and in-memory implementation

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod users;
