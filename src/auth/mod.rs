// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Cookie-based session authentication for the API.
//!
//! ## Request Pipeline
//!
//! 1. [`csrf::csrf_guard`] rejects mutating requests whose `XSRF-TOKEN`
//!    cookie is not echoed back in a header
//! 2. [`middleware::restore_user`] reads the session cookie, verifies the
//!    token and resolves the caller to a [`CurrentUser`]
//! 3. [`middleware::require_auth`] (protected routes only) rejects
//!    anonymous callers
//! 4. Handlers read the caller through the [`CurrentUser`] or
//!    [`Authenticated`] extractors
//!
//! ## Security
//!
//! - Session tokens are HS256-signed and verified in constant time
//! - Invalid or expired tokens mean "not logged in", never an error
//! - The session cookie is always `HttpOnly`; `Secure` and `SameSite=Lax`
//!   are applied in production
//! - There is no server-side revocation: a token stays valid until it
//!   expires, logout only removes the cookie from the browser

pub mod claims;
pub mod cookies;
pub mod csrf;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod token;

pub use claims::{CurrentUser, SessionClaims};
pub use cookies::{CookiePolicy, SessionCookies};
pub use csrf::CsrfGuard;
pub use error::AuthError;
pub use extractor::Authenticated;
pub use token::{SessionToken, TokenCodec, TokenError};
