// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CSRF (Cross-Site Request Forgery) protection.
//!
//! Double-submit cookie pattern: the token lives in the script-readable
//! `XSRF-TOKEN` cookie and the client must echo it in a request header on
//! every mutating request. Nothing is stored server-side; the guarantee rests
//! on other origins being unable to read the cookie.
//!
//! Tokens are session-lived: [`CsrfGuard::restore`] hands back the existing
//! cookie value when it is well formed and only mints a new one otherwise.
//! The token is never used as an identity signal.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use base64ct::{Base64UrlUnpadded, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use subtle::ConstantTimeEq;

use super::cookies::CookiePolicy;
use super::error::AuthError;
use crate::config::SessionConfig;

/// Cookie carrying the CSRF token. Not HTTP-only.
pub const CSRF_COOKIE_NAME: &str = "XSRF-TOKEN";

/// Headers accepted for the echoed token, in order of preference.
pub const CSRF_HEADER_NAMES: [&str; 4] = ["x-csrf-token", "x-xsrf-token", "csrf-token", "xsrf-token"];

/// Random bytes per token (43 characters once encoded).
const TOKEN_BYTES: usize = 32;

/// Issues CSRF tokens and checks them on mutating requests.
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    policy: CookiePolicy,
}

impl CsrfGuard {
    pub fn new(policy: CookiePolicy) -> Self {
        Self { policy }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(CookiePolicy::from_config(config))
    }

    /// Mint a new unpredictable token.
    pub fn issue_csrf_token(&self) -> Result<String, AuthError> {
        let mut bytes = [0_u8; TOKEN_BYTES];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| AuthError::Internal("CSRF token generation failed".to_string()))?;
        Ok(Base64UrlUnpadded::encode_string(&bytes))
    }

    /// Return the session's CSRF token, minting one if the request has none,
    /// and (re)write the cookie.
    pub fn restore(&self, jar: CookieJar) -> Result<(CookieJar, String), AuthError> {
        let existing = jar
            .get(CSRF_COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| is_well_formed(value));

        let token = match existing {
            Some(token) => token,
            None => self.issue_csrf_token()?,
        };
        let jar = self.set_cookie(jar, &token);
        Ok((jar, token))
    }

    /// Store `token` in the script-readable CSRF cookie.
    pub fn set_cookie(&self, jar: CookieJar, token: &str) -> CookieJar {
        let mut cookie = self.policy.cookie(CSRF_COOKIE_NAME, token);
        cookie.set_http_only(false);
        jar.add(cookie)
    }

    /// Check the double-submitted token.
    ///
    /// Safe methods always pass. Everything else needs the cookie token and an
    /// identical header token.
    pub fn verify_csrf_token(
        &self,
        method: &Method,
        headers: &HeaderMap,
        jar: &CookieJar,
    ) -> Result<(), AuthError> {
        if !is_state_changing(method) {
            return Ok(());
        }

        let cookie = jar
            .get(CSRF_COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::CsrfMismatch)?;
        let echoed = echoed_token(headers).ok_or(AuthError::CsrfMismatch)?;

        if tokens_match(&cookie, echoed) {
            Ok(())
        } else {
            Err(AuthError::CsrfMismatch)
        }
    }
}

/// Middleware rejecting mutating requests that fail the double-submit check.
pub async fn csrf_guard(
    State(guard): State<CsrfGuard>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if let Err(err) = guard.verify_csrf_token(request.method(), request.headers(), &jar) {
        tracing::warn!(
            code = err.error_code(),
            method = %request.method(),
            path = %request.uri().path(),
            "rejected request with missing or mismatched CSRF token"
        );
        return err.into_response();
    }
    next.run(request).await
}

/// Everything except GET, HEAD, OPTIONS and TRACE is treated as state-changing.
pub fn is_state_changing(method: &Method) -> bool {
    !matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// First non-empty CSRF header on the request.
pub fn echoed_token(headers: &HeaderMap) -> Option<&str> {
    CSRF_HEADER_NAMES.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    })
}

/// Byte-for-byte comparison in constant time.
pub fn tokens_match(expected: &str, submitted: &str) -> bool {
    expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}

fn is_well_formed(token: &str) -> bool {
    Base64UrlUnpadded::decode_vec(token).is_ok_and(|bytes| bytes.len() == TOKEN_BYTES)
}
