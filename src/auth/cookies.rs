// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session cookie management.
//!
//! The only state touched here is the outgoing `Set-Cookie` headers, carried
//! by the returned [`CookieJar`].
//!
//! In development the `Secure` flag is off and no `SameSite` attribute is
//! written, so the API can be exercised over plain HTTP from another local
//! origin. Production sets `Secure` and `SameSite=Lax`.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::token::SessionToken;
use crate::config::{CookieSameSite, SessionConfig};

/// Security attributes shared by every cookie the service writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: Option<CookieSameSite>,
}

impl CookiePolicy {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            secure: config.cookie_secure,
            same_site: config.cookie_same_site,
        }
    }

    /// Build a cookie scoped to the whole site with this policy applied.
    pub fn cookie(&self, name: &str, value: impl Into<String>) -> Cookie<'static> {
        let mut cookie = Cookie::new(name.to_string(), value.into());
        cookie.set_path("/");
        cookie.set_secure(self.secure);
        cookie.set_same_site(self.same_site.map(|s| match s {
            CookieSameSite::Strict => SameSite::Strict,
            CookieSameSite::Lax => SameSite::Lax,
            CookieSameSite::None => SameSite::None,
        }));
        cookie
    }
}

/// Writes and clears the HTTP-only cookie that carries the session token.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    name: String,
    policy: CookiePolicy,
    max_age: time::Duration,
}

impl SessionCookies {
    pub fn from_config(config: &SessionConfig) -> Self {
        let max_age = i64::try_from(config.token_ttl.as_secs()).unwrap_or(i64::MAX);
        Self {
            name: config.cookie_name.clone(),
            policy: CookiePolicy::from_config(config),
            max_age: time::Duration::seconds(max_age),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw session token from the request cookies. Empty values count as absent.
    pub fn read(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.name)
            .map(|cookie| cookie.value().trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Set the session cookie to `token`.
    pub fn set(&self, jar: CookieJar, token: &SessionToken) -> CookieJar {
        let mut cookie = self.policy.cookie(&self.name, token.as_str());
        cookie.set_http_only(true);
        cookie.set_max_age(self.max_age);
        jar.add(cookie)
    }

    /// Expire the session cookie immediately.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        let mut cookie = self.policy.cookie(&self.name, "");
        cookie.set_http_only(true);
        cookie.make_removal();
        jar.add(cookie)
    }

    /// Whether `set_cookie` (a `Set-Cookie` header value) targets the session cookie.
    pub fn is_session_cookie_header(&self, set_cookie: &str) -> bool {
        set_cookie
            .split_once('=')
            .is_some_and(|(name, _)| name.trim() == self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, SigningSecret};
    use crate::models::Identity;
    use crate::auth::TokenCodec;
    use axum::response::IntoResponse;
    use axum::http::header::SET_COOKIE;

    fn config(environment: Environment) -> SessionConfig {
        let secret = SigningSecret::new(b"cookie-tests-cookie-tests-cookie-tests".to_vec()).unwrap();
        SessionConfig::for_environment(environment, secret)
    }

    fn set_cookie_headers(jar: CookieJar) -> Vec<String> {
        let response = (jar, ()).into_response();
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn token(config: &SessionConfig) -> SessionToken {
        TokenCodec::from_config(config)
            .issue(&Identity::new(7, "demo"))
            .unwrap()
    }

    #[test]
    fn production_cookie_is_http_only_secure_and_lax() {
        let config = config(Environment::Production);
        let cookies = SessionCookies::from_config(&config);
        let headers = set_cookie_headers(cookies.set(CookieJar::new(), &token(&config)));

        assert_eq!(headers.len(), 1);
        let header = &headers[0];
        assert!(header.starts_with("token="));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=604800"));
    }

    #[test]
    fn development_cookie_is_http_only_but_relaxed() {
        let config = config(Environment::Development);
        let cookies = SessionCookies::from_config(&config);
        let headers = set_cookie_headers(cookies.set(CookieJar::new(), &token(&config)));

        let header = &headers[0];
        assert!(header.contains("HttpOnly"));
        assert!(!header.contains("Secure"));
        assert!(!header.contains("SameSite"));
    }

    #[test]
    fn clear_expires_the_cookie() {
        let config = config(Environment::Production);
        let cookies = SessionCookies::from_config(&config);
        let headers = set_cookie_headers(cookies.clear(CookieJar::new()));

        assert_eq!(headers.len(), 1);
        let header = &headers[0];
        assert!(header.starts_with("token=;"));
        assert!(header.contains("Max-Age=0"));
        assert!(header.contains("Path=/"));
    }

    #[test]
    fn read_ignores_other_and_empty_cookies() {
        let config = config(Environment::Development);
        let cookies = SessionCookies::from_config(&config);

        let jar = CookieJar::new().add(Cookie::new("other", "x"));
        assert_eq!(cookies.read(&jar), None);

        let jar = jar.add(Cookie::new("token", ""));
        assert_eq!(cookies.read(&jar), None);

        let jar = jar.add(Cookie::new("token", "abc.def.ghi"));
        assert_eq!(cookies.read(&jar).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn recognises_its_own_set_cookie_header() {
        let config = config(Environment::Development);
        let cookies = SessionCookies::from_config(&config);
        assert!(cookies.is_session_cookie_header("token=abc; HttpOnly"));
        assert!(!cookies.is_session_cookie_header("tokenx=abc"));
        assert!(!cookies.is_session_cookie_header("XSRF-TOKEN=abc"));
    }
}
