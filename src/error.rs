// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API error type and the final error-formatting boundary.
//!
//! Every failure leaves the service as `{ title, message, errors, stack }`.
//! `stack` carries internal detail and is only rendered outside production;
//! [`format_errors`] is the layer that decides.

use std::collections::BTreeMap;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::Environment;

const SERVER_ERROR_TITLE: &str = "Server Error";
const SERVER_ERROR_MESSAGE: &str = "An unexpected error occurred.";
const NOT_FOUND_MESSAGE: &str = "The requested resource couldn't be found.";
const METHOD_NOT_ALLOWED_MESSAGE: &str = "The requested method is not supported for this resource.";

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub title: String,
    pub message: String,
    pub errors: Option<BTreeMap<String, String>>,
    /// Internal detail, never rendered in production.
    pub detail: Option<String>,
}

/// JSON error body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub title: String,
    pub message: String,
    pub errors: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            message: message.into(),
            errors: None,
            detail: None,
        }
    }

    pub fn with_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors
            .get_or_insert_with(BTreeMap::new)
            .insert(field.into(), message.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Resource Not Found", NOT_FOUND_MESSAGE)
            .with_error("message", NOT_FOUND_MESSAGE)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed",
            METHOD_NOT_ALLOWED_MESSAGE,
        )
        .with_error("message", METHOD_NOT_ALLOWED_MESSAGE)
    }

    /// Request validation failure; add offending fields with [`ApiError::with_error`].
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad request.", "Bad request.")
    }

    /// Generic server failure. `detail` is logged and shown only in development.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            SERVER_ERROR_TITLE,
            SERVER_ERROR_MESSAGE,
        )
        .with_detail(detail)
    }

    fn body(&self, include_stack: bool) -> ErrorBody {
        ErrorBody {
            title: self.title.clone(),
            message: self.message.clone(),
            errors: self.errors.clone(),
            stack: include_stack.then(|| self.detail.clone()).flatten(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body(false))).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Fallback handler for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

/// Fallback for known paths requested with an unsupported method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// Outermost error boundary.
///
/// Logs every [`ApiError`] that produced a response and, outside production,
/// re-renders the body with the internal detail as `stack`.
pub async fn format_errors(
    State(environment): State<Environment>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;

    let Some(error) = response.extensions().get::<ApiError>().cloned() else {
        return response;
    };

    if error.status.is_server_error() {
        tracing::error!(
            %method,
            %path,
            status = error.status.as_u16(),
            detail = error.detail.as_deref().unwrap_or(""),
            "{}",
            error.title
        );
    } else {
        tracing::debug!(
            %method,
            %path,
            status = error.status.as_u16(),
            "{}",
            error.title
        );
    }

    if environment.is_production() || error.detail.is_none() {
        return response;
    }

    // Keep status and headers set by the layers the error passed through.
    let (parts, _) = response.into_parts();
    let body = Json(error.body(true)).into_response().into_body();
    Response::from_parts(parts, body)
}
