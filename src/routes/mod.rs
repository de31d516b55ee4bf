//! HTTP route handlers for the JSON API.
//!
//! Account routes live under `/auth`, todo routes under `/todos`. API
//! responses are marked `no-store` since they carry tokens and per-user data;
//! the health routes are left alone for the orchestrator's probes.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod auth;
pub mod health;
pub mod home;
pub mod todos;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use http::header::{HeaderValue, CACHE_CONTROL};
use http::Method;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{HttpServerConfig, CACHE_CONTROL_NO_STORE, READY_PATH};
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Build the CORS layer from configured origins, or `None` when CORS is off.
///
/// Origins that are not valid header values are skipped with a warning.
fn cors_layer(config: &HttpServerConfig) -> Option<CorsLayer> {
    if config.cors_origins.is_empty() {
        return None;
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE]),
    )
}

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/", get(auth::me))
        .route("/auth/register", post(auth::register))
        .route("/auth/token", post(auth::login))
        .route("/auth/update", put(auth::update))
        .route("/auth/delete", delete(auth::delete));

    // Static segments take priority over `{todo_id}` in the matcher
    let todo_routes = Router::new()
        .route("/todos", post(todos::create))
        .route("/todos/list", get(todos::list))
        .route("/todos/completed", get(todos::completed))
        .route("/todos/pending", get(todos::pending))
        .route("/todos/toggle_complete/{todo_id}", post(todos::toggle_complete))
        .route(
            "/todos/{todo_id}",
            get(todos::get).patch(todos::update).delete(todos::delete),
        );

    let api_routes = Router::new()
        .route("/", get(home::index))
        .merge(auth_routes)
        .merge(todo_routes)
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
        ));

    // Health checks - no caching headers, always fresh for probes
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route(READY_PATH, get(health::ready));

    let mut router = Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .with_state(state.clone());

    if let Some(cors) = cors_layer(&state.config.http) {
        router = router.layer(cors);
    }

    // Request ID middleware - creates root span with request_id for correlation
    router.layer(middleware::from_fn(request_id_layer))
}
