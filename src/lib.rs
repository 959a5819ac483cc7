pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod oauth;
pub mod observability;
pub mod roles;
pub mod services;
pub mod utils;

use axum::{
    http::Method,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::IamConfig;
use crate::middleware::{ip_rate_limit_middleware, security_headers_middleware, IpRateLimiter};
use crate::roles::RoleRegistry;
use crate::services::{ActivationService, AuthorizationFlow};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<IamConfig>,
    pub flow: AuthorizationFlow,
    pub activation: ActivationService,
    pub roles: Arc<RoleRegistry>,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    // Credential-bearing routes get their own IP limiters.
    let login_limiter = state.login_rate_limiter.clone();
    let login_routes = Router::new()
        .route(
            "/login/authorization",
            post(handlers::login::login).patch(handlers::consent::consent),
        )
        .route(
            "/login/authorization/consent",
            post(handlers::consent::consent),
        )
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    let register_limiter = state.register_rate_limiter.clone();
    let register_routes = Router::new()
        .route(
            "/register",
            get(handlers::register::register_page).post(handlers::register::register),
        )
        .route("/register/activate", post(handlers::register::activate))
        .layer(from_fn_with_state(register_limiter, ip_rate_limit_middleware));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/authorize", get(handlers::authorize::authorize))
        .merge(login_routes)
        .merge(register_routes)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PATCH])
                .allow_origin(tower_http::cors::Any),
        )
}
