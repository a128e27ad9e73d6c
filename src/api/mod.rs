// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::{header::HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    api::health::{HealthChecks, HealthResponse, ReadyResponse},
    auth::{
        csrf::csrf_guard,
        middleware::{require_auth, restore_user},
    },
    error::{format_errors, method_not_allowed, not_found, ErrorBody},
    models::{CsrfTokenResponse, EchoResponse, Identity, LoginRequest, LogoutResponse, SessionResponse},
    state::AppState,
};

pub mod csrf;
pub mod health;
pub mod session;
pub mod users;

/// Build the application router.
///
/// Layers, outermost first: request id and tracing, CORS (development
/// only), cross-origin resource policy, error formatting, CSRF check. `/api` routes additionally restore
/// the caller's identity and protected routes reject anonymous callers.
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/require-auth", get(users::require_auth_user))
        .route_layer(middleware::from_fn(require_auth));

    let mut api_routes = Router::new()
        .route("/csrf/restore", get(csrf::restore_csrf_token))
        .route(
            "/session",
            get(session::get_session)
                .post(session::login)
                .delete(session::logout),
        )
        .route("/logout", post(session::logout_alias))
        .route("/restore-user", get(users::current_user))
        .route("/test", post(csrf::echo_request_body))
        .merge(protected_routes);
    if !state.environment.is_production() {
        api_routes = api_routes.route("/set-token-cookie", get(session::set_demo_token_cookie));
    }
    let api_routes = api_routes
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn_with_state(state.clone(), restore_user))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state.clone());

    let mut app = Router::new()
        .nest("/api", api_routes)
        .nest("/health", health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.csrf.clone(), csrf_guard))
        .layer(middleware::from_fn_with_state(state.environment, format_errors))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("cross-origin"),
        ));

    if !state.environment.is_production() {
        app = app.layer(CorsLayer::permissive());
    }

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id,
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        csrf::restore_csrf_token,
        csrf::echo_request_body,
        session::get_session,
        session::set_demo_token_cookie,
        session::login,
        session::logout,
        session::logout_alias,
        users::current_user,
        users::require_auth_user,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Identity,
            LoginRequest,
            SessionResponse,
            LogoutResponse,
            CsrfTokenResponse,
            EchoResponse,
            ErrorBody,
            HealthResponse,
            ReadyResponse,
            HealthChecks
        )
    ),
    tags(
        (name = "Session", description = "Login, logout and the current session"),
        (name = "CSRF", description = "Double-submit CSRF token"),
        (name = "Users", description = "Current user"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::{Environment, SessionConfig, SigningSecret};
    use crate::users::InMemoryUserStore;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let secret = SigningSecret::new(b"router-tests-router-tests-router-tests".to_vec()).unwrap();
        let config = SessionConfig::for_environment(Environment::Development, secret);
        let users = Arc::new(InMemoryUserStore::with_iterations(1_000).unwrap());
        let app = router(AppState::new(&config, users));
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[test]
    fn openapi_document_lists_session_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/session"));
        assert!(doc.paths.paths.contains_key("/api/csrf/restore"));
        assert!(doc.paths.paths.contains_key("/health/ready"));
    }
}
