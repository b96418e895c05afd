//! Axum router construction.
//!
//! The [`app`] function wires every endpoint to its handler and returns a
//! ready-to-serve [`axum::Router`].  Routes:
//!
//! - `GET /objects`, `POST /objects`
//! - `GET|HEAD|DELETE /objects/:key`, `GET /objects/:key/content`
//! - `GET /container`
//! - `GET /health`, `GET /metrics` (each toggled by `observability`)
//! - `GET /openapi.json`
//! - `GET /links/*path` (memory backend only)

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::errors::generate_request_id;
use crate::handlers::{links, objects};
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

/// Value of the `server` response header.
const SERVER_NAME: &str = "objectgate";

// -- OpenAPI document ---------------------------------------------------------

/// OpenAPI documentation for the objectgate HTTP API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "objectgate API",
        version = "0.1.0",
        description = "CRUD access to a single object-store container"
    ),
    paths(
        health_check,
        objects::list_objects,
        objects::post_object,
        objects::get_object_url,
        objects::get_object_content,
        objects::head_object,
        objects::delete_object,
        objects::get_container,
    ),
    components(schemas(objects::ContainerInfo)),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Object", description = "Object operations"),
        (name = "Container", description = "Container information"),
    )
)]
struct ApiDoc;

/// Build the axum [`Router`] with all routes.
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    let observability = &state.config.observability;

    let mut router = Router::new()
        .route(
            "/objects",
            get(objects::list_objects).post(objects::post_object),
        )
        .route(
            "/objects/:key",
            get(objects::get_object_url)
                .head(objects::head_object)
                .delete(objects::delete_object),
        )
        .route("/objects/:key/content", get(objects::get_object_content))
        .route("/container", get(objects::get_container))
        .route("/openapi.json", get(openapi_json));

    if observability.health_check {
        router = router.route("/health", get(health_check));
    }
    if observability.metrics {
        router = router.route("/metrics", get(metrics_handler));
    }
    if state.link_store.is_some() {
        router = router.route("/links/*path", get(links::download_link));
    }

    let body_limit = state.config.server.max_upload_size;

    router
        // Application state shared across all handlers.
        .with_state(state)
        // Layer ordering: inner layers run first, outer layers wrap them.
        // common_headers_middleware is innermost (adds standard headers).
        .layer(middleware::from_fn(common_headers_middleware))
        // metrics_middleware captures the full request lifecycle.
        .layer(middleware::from_fn(metrics_middleware))
        // One span per request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
}

// -- Common headers middleware -----------------------------------------------

/// Tower middleware that adds common response headers to every response:
/// - `x-request-id`: 16-character uppercase hex string
/// - `Date`: RFC 7231 formatted timestamp
/// - `Server`: `objectgate`
async fn common_headers_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    if !headers.contains_key("x-request-id") {
        if let Ok(value) = HeaderValue::from_str(&generate_request_id()) {
            headers.insert("x-request-id", value);
        }
    }

    let date = httpdate::fmt_http_date(std::time::SystemTime::now());
    if let Ok(value) = HeaderValue::from_str(&date) {
        headers.insert("date", value);
    }
    headers.insert("server", HeaderValue::from_static(SERVER_NAME));

    response
}

// -- Health check ------------------------------------------------------------

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Server is healthy", content_type = "application/json")
    )
)]
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "container": state.gateway.name(),
        })),
    )
}

/// `GET /openapi.json`
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
