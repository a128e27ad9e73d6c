// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and never
//! changes for the lifetime of the process. Cookie security attributes are
//! resolved here, not at each call site.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `APP_ENV` | `development` or `production` | `development` |
//! | `JWT_SECRET` | Session token signing secret (>= 32 bytes) | Required for production |
//! | `JWT_EXPIRES_IN` | Session token lifetime in seconds | `604800` (7 days) |
//! | `SESSION_COOKIE_NAME` | Name of the session cookie | `token` |
//! | `COOKIE_SECURE` | Force the `Secure` cookie attribute on or off | Per environment |
//! | `COOKIE_SAMESITE` | `strict`, `lax`, `none` or `unset` | Per environment |
//! | `TLS_CERT_PATH` | PEM certificate chain, enables HTTPS | Optional |
//! | `TLS_KEY_PATH` | PEM private key, enables HTTPS | Optional |
//! | `SEED_USERNAME` | Demo user added to the in-memory store | Optional |
//! | `SEED_PASSWORD` | Password of the demo user | Required with `SEED_USERNAME` |
//! | `SEED_EMAIL` | Email of the demo user | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";
/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";
/// Environment variable selecting development or production behaviour.
pub const APP_ENV: &str = "APP_ENV";
/// Environment variable holding the session token signing secret.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
/// Environment variable holding the session token lifetime in seconds.
pub const JWT_EXPIRES_IN_ENV: &str = "JWT_EXPIRES_IN";
/// Environment variable overriding the session cookie name.
pub const SESSION_COOKIE_NAME_ENV: &str = "SESSION_COOKIE_NAME";
/// Environment variable overriding the `Secure` cookie attribute.
pub const COOKIE_SECURE_ENV: &str = "COOKIE_SECURE";
/// Environment variable overriding the `SameSite` cookie attribute.
pub const COOKIE_SAMESITE_ENV: &str = "COOKIE_SAMESITE";
/// Environment variable with the TLS certificate chain path.
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
/// Environment variable with the TLS private key path.
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
/// Environment variables describing the optional demo user.
pub const SEED_USERNAME_ENV: &str = "SEED_USERNAME";
pub const SEED_PASSWORD_ENV: &str = "SEED_PASSWORD";
pub const SEED_EMAIL_ENV: &str = "SEED_EMAIL";
/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Default session token lifetime (7 days).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default session cookie name.
pub const DEFAULT_SESSION_COOKIE_NAME: &str = "token";

/// Minimum accepted length of the signing secret in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set when APP_ENV=production")]
    MissingSecret,

    #[error("JWT_SECRET must be at least 32 bytes long")]
    SecretTooShort,

    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,

    #[error("failed to generate an ephemeral signing secret")]
    SecretGeneration,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(invalid(APP_ENV, value)),
        }
    }
}

/// `SameSite` cookie attribute policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSameSite {
    Strict,
    Lax,
    None,
}

impl CookieSameSite {
    /// Parse the `COOKIE_SAMESITE` value. `unset` means no attribute.
    fn parse(value: &str) -> Result<Option<Self>, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Some(CookieSameSite::Strict)),
            "lax" => Ok(Some(CookieSameSite::Lax)),
            "none" => Ok(Some(CookieSameSite::None)),
            "unset" | "" => Ok(None),
            _ => Err(invalid(COOKIE_SAMESITE_ENV, value)),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Read `LOG_FORMAT` from the process environment, falling back to pretty output.
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Process-wide secret used to sign session tokens.
///
/// Immutable once constructed. Replacing it (by restarting with a different
/// `JWT_SECRET`) invalidates every outstanding session token.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort);
        }
        Ok(Self(bytes))
    }

    /// Generate a random secret. Tokens signed with it do not survive a restart.
    pub fn generate() -> Result<Self, ConfigError> {
        let mut bytes = vec![0_u8; 64];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| ConfigError::SecretGeneration)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Session and cookie settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub environment: Environment,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub cookie_same_site: Option<CookieSameSite>,
    pub token_ttl: Duration,
    pub signing_secret: SigningSecret,
}

impl SessionConfig {
    /// Settings with the defaults of the given environment.
    pub fn for_environment(environment: Environment, signing_secret: SigningSecret) -> Self {
        let production = environment.is_production();
        Self {
            environment,
            cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
            cookie_secure: production,
            cookie_same_site: production.then_some(CookieSameSite::Lax),
            token_ttl: DEFAULT_TOKEN_TTL,
            signing_secret,
        }
    }
}

/// TLS certificate and key locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsPaths>,
}

/// Demo user created at startup.
#[derive(Clone)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub seed: Option<SeedUser>,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup(APP_ENV) {
            Some(value) => Environment::parse(&value)?,
            None => Environment::default(),
        };

        let signing_secret = match lookup(JWT_SECRET_ENV) {
            Some(secret) => SigningSecret::new(secret.into_bytes())?,
            None if environment.is_production() => return Err(ConfigError::MissingSecret),
            None => {
                tracing::warn!(
                    "{JWT_SECRET_ENV} not set, using an ephemeral secret; sessions end on restart"
                );
                SigningSecret::generate()?
            }
        };

        let mut session = SessionConfig::for_environment(environment, signing_secret);

        if let Some(value) = lookup(JWT_EXPIRES_IN_ENV) {
            let seconds: u64 = value
                .trim()
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| invalid(JWT_EXPIRES_IN_ENV, &value))?;
            session.token_ttl = Duration::from_secs(seconds);
        }
        if let Some(name) = lookup(SESSION_COOKIE_NAME_ENV) {
            if !is_cookie_name(&name) {
                return Err(invalid(SESSION_COOKIE_NAME_ENV, &name));
            }
            session.cookie_name = name;
        }
        if let Some(value) = lookup(COOKIE_SECURE_ENV) {
            session.cookie_secure = parse_bool(COOKIE_SECURE_ENV, &value)?;
        }
        if let Some(value) = lookup(COOKIE_SAMESITE_ENV) {
            session.cookie_same_site = CookieSameSite::parse(&value)?;
        }
        // Browsers drop `SameSite=None` cookies that are not `Secure`.
        if session.cookie_same_site == Some(CookieSameSite::None) && !session.cookie_secure {
            return Err(invalid(COOKIE_SAMESITE_ENV, "none"));
        }

        let host = lookup(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup(PORT_ENV) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| invalid(PORT_ENV, &value))?,
            None => 8080,
        };
        let tls = match (lookup(TLS_CERT_PATH_ENV), lookup(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        let seed = match (lookup(SEED_USERNAME_ENV), lookup(SEED_PASSWORD_ENV)) {
            (Some(username), Some(password)) => Some(SeedUser {
                username,
                password,
                email: lookup(SEED_EMAIL_ENV),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(invalid(SEED_PASSWORD_ENV, "")),
            (None, Some(_)) => return Err(invalid(SEED_USERNAME_ENV, "")),
        };

        Ok(Self {
            server: ServerConfig { host, port, tls },
            session,
            seed,
        })
    }
}

fn invalid(var: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value)),
    }
}

/// RFC 6265 cookie-name token characters.
fn is_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn development_defaults_relax_cookie_attributes() {
        let config = load(&[]).unwrap();
        assert_eq!(config.session.environment, Environment::Development);
        assert!(!config.session.cookie_secure);
        assert_eq!(config.session.cookie_same_site, None);
        assert_eq!(config.session.cookie_name, "token");
        assert_eq!(config.session.token_ttl, DEFAULT_TOKEN_TTL);
        assert_eq!(config.server.port, 8080);
        assert!(config.server.tls.is_none());
    }

    #[test]
    fn production_defaults_are_secure_and_lax() {
        let config = load(&[(APP_ENV, "production"), (JWT_SECRET_ENV, SECRET)]).unwrap();
        assert!(config.session.environment.is_production());
        assert!(config.session.cookie_secure);
        assert_eq!(config.session.cookie_same_site, Some(CookieSameSite::Lax));
    }

    #[test]
    fn production_requires_secret() {
        let err = load(&[(APP_ENV, "production")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret));
    }

    #[test]
    fn short_secret_is_rejected() {
        let err = load(&[(JWT_SECRET_ENV, "too-short")]).unwrap_err();
        assert!(matches!(err, ConfigError::SecretTooShort));
    }

    #[test]
    fn explicit_overrides_win_over_environment_defaults() {
        let config = load(&[
            (APP_ENV, "production"),
            (JWT_SECRET_ENV, SECRET),
            (COOKIE_SECURE_ENV, "false"),
            (COOKIE_SAMESITE_ENV, "strict"),
            (SESSION_COOKIE_NAME_ENV, "session"),
            (JWT_EXPIRES_IN_ENV, "3600"),
        ])
        .unwrap();
        assert!(!config.session.cookie_secure);
        assert_eq!(config.session.cookie_same_site, Some(CookieSameSite::Strict));
        assert_eq!(config.session.cookie_name, "session");
        assert_eq!(config.session.token_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            load(&[(APP_ENV, "staging")]).unwrap_err(),
            ConfigError::InvalidValue { var: APP_ENV, .. }
        ));
        assert!(matches!(
            load(&[(JWT_EXPIRES_IN_ENV, "0")]).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
        assert!(matches!(
            load(&[(SESSION_COOKIE_NAME_ENV, "bad name")]).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
        assert!(matches!(
            load(&[(COOKIE_SECURE_ENV, "maybe")]).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn same_site_none_requires_secure_cookies() {
        assert!(matches!(
            load(&[(COOKIE_SAMESITE_ENV, "none")]).unwrap_err(),
            ConfigError::InvalidValue { var: COOKIE_SAMESITE_ENV, .. }
        ));
        assert!(matches!(
            load(&[(COOKIE_SAMESITE_ENV, "None"), (COOKIE_SECURE_ENV, "false")]).unwrap_err(),
            ConfigError::InvalidValue { var: COOKIE_SAMESITE_ENV, .. }
        ));

        let config = load(&[(COOKIE_SAMESITE_ENV, "none"), (COOKIE_SECURE_ENV, "true")]).unwrap();
        assert!(config.session.cookie_secure);
        assert_eq!(config.session.cookie_same_site, Some(CookieSameSite::None));
    }

    #[test]
    fn tls_paths_must_come_in_pairs() {
        let err = load(&[(TLS_CERT_PATH_ENV, "/etc/cert.pem")]).unwrap_err();
        assert!(matches!(err, ConfigError::IncompleteTls));

        let config = load(&[
            (TLS_CERT_PATH_ENV, "/etc/cert.pem"),
            (TLS_KEY_PATH_ENV, "/etc/key.pem"),
        ])
        .unwrap();
        assert_eq!(
            config.server.tls,
            Some(TlsPaths {
                cert: "/etc/cert.pem".into(),
                key: "/etc/key.pem".into(),
            })
        );
    }

    #[test]
    fn seed_user_needs_username_and_password() {
        assert!(load(&[]).unwrap().seed.is_none());

        let config = load(&[
            (SEED_USERNAME_ENV, "demo"),
            (SEED_PASSWORD_ENV, "password"),
        ])
        .unwrap();
        let seed = config.seed.unwrap();
        assert_eq!(seed.username, "demo");
        assert_eq!(seed.email, None);
        assert!(!format!("{seed:?}").contains("password"));

        assert!(matches!(
            load(&[(SEED_USERNAME_ENV, "demo")]).unwrap_err(),
            ConfigError::InvalidValue { var: SEED_PASSWORD_ENV, .. }
        ));
    }

    #[test]
    fn secret_debug_output_is_redacted() {
        let secret = SigningSecret::new(SECRET.as_bytes().to_vec()).unwrap();
        assert_eq!(format!("{secret:?}"), "SigningSecret(<redacted>)");
    }
}
