// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CSRF token endpoint.

use axum::{body::Bytes, extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde_json::Value;

use crate::auth::CsrfGuard;
use crate::error::ApiError;
use crate::models::{CsrfTokenResponse, EchoResponse};

/// Hand out the CSRF token and (re)set the `XSRF-TOKEN` cookie.
///
/// Clients call this once when they load and echo the token in an
/// `X-CSRF-Token` header on every mutating request.
#[utoipa::path(
    get,
    path = "/api/csrf/restore",
    tag = "CSRF",
    responses(
        (status = 200, description = "CSRF token", body = CsrfTokenResponse)
    )
)]
pub async fn restore_csrf_token(
    State(guard): State<CsrfGuard>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<CsrfTokenResponse>), ApiError> {
    let (jar, xsrf_token) = guard.restore(jar)?;
    Ok((jar, Json(CsrfTokenResponse { xsrf_token })))
}

/// Echo the JSON body back; reaching it proves the CSRF check passed.
///
/// An empty body echoes as `{}`.
#[utoipa::path(
    post,
    path = "/api/test",
    tag = "CSRF",
    request_body(content = Object, content_type = "application/json"),
    responses(
        (status = 200, description = "Echoed body", body = EchoResponse),
        (status = 400, description = "Body is not JSON", body = crate::error::ErrorBody),
        (status = 403, description = "Missing or mismatched CSRF token", body = crate::error::ErrorBody)
    )
)]
pub async fn echo_request_body(body: Bytes) -> Result<Json<EchoResponse>, ApiError> {
    Ok(Json(EchoResponse {
        request_body: parse_echo_body(&body)?,
    }))
}

fn parse_echo_body(body: &[u8]) -> Result<Value, ApiError> {
    if body.trim_ascii().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request().with_error("body", err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_body_echoes_an_empty_object() {
        assert_eq!(parse_echo_body(b"").unwrap(), json!({}));
        assert_eq!(parse_echo_body(b"  \n").unwrap(), json!({}));
    }

    #[test]
    fn json_body_is_echoed_verbatim() {
        assert_eq!(
            parse_echo_body(br#"{"hello":"world"}"#).unwrap(),
            json!({ "hello": "world" })
        );
    }

    #[test]
    fn malformed_body_is_a_bad_request() {
        let err = parse_echo_body(b"{not json").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
