//! HTTP router and handlers.
//!
//! The catch-all `/api/*path` route feeds the dispatcher; the management
//! routes expose the audit log and runtime endpoint registration for the
//! dashboard. State is explicitly constructed here and injected with
//! `Extension`, so the router is `Router<()>` and works with
//! `into_make_service()`.

use axum::{
    body::{Body, Bytes},
    extract::{Extension, Path, Request},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{any, get, post},
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{error, info};

use crate::config::{MockDefinition, ServerConfig};
use crate::dispatcher::{Dispatcher, CORS_HEADERS};
use crate::registry::EndpointRegistry;
use crate::store::{AuditRecord, ResponseSnapshot, RingLogStore};
use crate::template::iso_timestamp;

/// Shared app state: one registry, one log store, one dispatcher per process.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Mutex<EndpointRegistry>>,
    pub logs: Arc<Mutex<RingLogStore>>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    /// Build state from configuration: built-ins first, then the config
    /// file's endpoints on top (shadowing allowed).
    pub fn from_config(config: ServerConfig) -> Self {
        let mut registry = EndpointRegistry::with_builtins();
        for endpoint in config.endpoints {
            registry.register(endpoint);
        }

        let registry = Arc::new(Mutex::new(registry));
        let logs = Arc::new(Mutex::new(RingLogStore::new(config.settings.log_capacity)));
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::clone(&logs))
            .with_request_logging(config.settings.log_requests);

        Self {
            registry,
            logs,
            dispatcher,
        }
    }
}

/// Builds the router with state. Returns `Router<()>` so the caller can use
/// `.into_make_service()` for `axum::serve`.
pub fn create_router(config: ServerConfig) -> Router<()> {
    let state = AppState::from_config(config);

    Router::new()
        .route(
            "/api/server-logs",
            get(list_server_logs)
                .delete(clear_server_logs)
                .options(management_preflight),
        )
        .route(
            "/api/register-endpoint",
            post(register_endpoint)
                .get(list_registered_endpoints)
                .options(management_preflight),
        )
        .route("/api/*path", any(dispatch_mock))
        .layer(middleware::from_fn(attach_cors_headers))
        .layer(Extension(state))
}

/// Catch-all mock dispatch. OPTIONS short-circuits to the preflight path
/// before any body handling.
async fn dispatch_mock(
    Extension(state): Extension<AppState>,
    Path(rest): Path<String>,
    request: Request,
) -> Response {
    let received_at = Instant::now();
    let method = request.method().clone();
    let headers = flatten_headers(request.headers());
    let segments: Vec<String> = rest
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if method == Method::OPTIONS {
        let path = Dispatcher::normalize_path(&segments);
        let snapshot = state.dispatcher.preflight(&path, &headers);
        return snapshot_response(&snapshot, Body::empty());
    }

    let body = if method == Method::GET || method == Method::HEAD {
        String::new()
    } else {
        read_body_text(request).await
    };

    let snapshot = state
        .dispatcher
        .dispatch(method.as_str(), &segments, &headers, &body, received_at);
    let body = Body::from(snapshot.body.clone());
    snapshot_response(&snapshot, body)
}

/// Preflight handler for the management routes; the catch-all handles its
/// own OPTIONS.
async fn management_preflight(
    Extension(state): Extension<AppState>,
    request: Request,
) -> Response {
    let headers = flatten_headers(request.headers());
    let snapshot = state.dispatcher.preflight(request.uri().path(), &headers);
    snapshot_response(&snapshot, Body::empty())
}

#[derive(Serialize)]
struct ServerLogsResponse {
    logs: Vec<AuditRecord>,
    total: usize,
    timestamp: String,
}

async fn list_server_logs(Extension(state): Extension<AppState>) -> Json<ServerLogsResponse> {
    let logs = state.logs.lock().expect("log store lock").list();
    Json(ServerLogsResponse {
        total: logs.len(),
        logs,
        timestamp: iso_timestamp(),
    })
}

#[derive(Serialize)]
struct LogsClearedResponse {
    message: String,
    timestamp: String,
}

async fn clear_server_logs(Extension(state): Extension<AppState>) -> Json<LogsClearedResponse> {
    state.logs.lock().expect("log store lock").clear();
    info!("Server logs cleared");
    Json(LogsClearedResponse {
        message: "Server logs cleared".to_string(),
        timestamp: iso_timestamp(),
    })
}

#[derive(Serialize)]
struct RegisterAccepted {
    success: bool,
    message: String,
    endpoint: String,
}

#[derive(Serialize)]
struct RegisterRejected {
    success: bool,
    message: String,
}

/// Register (or overwrite) a mock definition. The payload is accepted as-is
/// once it decodes; malformed input gets a 500 with a failure envelope.
async fn register_endpoint(Extension(state): Extension<AppState>, body: Bytes) -> Response {
    match serde_json::from_slice::<MockDefinition>(&body) {
        Ok(definition) => {
            let path = definition.path.clone();
            info!(method = %definition.method, path = %path, "Endpoint registered");
            state
                .registry
                .lock()
                .expect("registry lock")
                .register(definition);
            (
                StatusCode::OK,
                Json(RegisterAccepted {
                    success: true,
                    message: "Endpoint registered successfully".to_string(),
                    endpoint: path,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to decode endpoint registration");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RegisterRejected {
                    success: false,
                    message: "Failed to register endpoint".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[derive(Serialize)]
struct EndpointsResponse {
    endpoints: Vec<MockDefinition>,
}

async fn list_registered_endpoints(
    Extension(state): Extension<AppState>,
) -> Json<EndpointsResponse> {
    let endpoints = state.registry.lock().expect("registry lock").definitions();
    Json(EndpointsResponse { endpoints })
}

/// Every response carries the CORS set, management envelopes included.
async fn attach_cors_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in CORS_HEADERS {
        if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
    response
}

/// Read the request body as text. Failures degrade to a descriptive
/// placeholder that dispatch treats as "the body"; they never abort the
/// request.
async fn read_body_text(request: Request) -> String {
    match axum::body::to_bytes(request.into_body(), usize::MAX).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => format!("Failed to read request body: {}", e),
    }
}

/// Flatten an axum header map to the single-value map the dispatcher and
/// audit records use.
fn flatten_headers(headers: &axum::http::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn snapshot_response(snapshot: &ResponseSnapshot, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() =
        StatusCode::from_u16(snapshot.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    for (name, value) in &snapshot.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}
