//! Request dispatcher: the catch-all path from inbound request to mock
//! response plus audit record.
//!
//! Dispatch resolves the normalized path against the registry, enforces
//! method matching, expands the stored response body, and appends one audit
//! record per request before the response is handed back. CORS preflight
//! bypasses the registry entirely but is still recorded.

use crate::registry::EndpointRegistry;
use crate::store::{AuditRecord, LogSource, ResponseSnapshot, RingLogStore};
use crate::template::TemplateEngine;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// The three CORS headers attached to every response.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    (
        "Access-Control-Allow-Methods",
        "GET, POST, PUT, DELETE, PATCH, OPTIONS",
    ),
    ("Access-Control-Allow-Headers", "Content-Type, Authorization"),
];

/// Why a request could not be served from the registry.
#[derive(Debug, Error)]
pub enum DispatchRejection {
    #[error("no endpoint registered for {path}")]
    NotFound {
        path: String,
        available_endpoints: Vec<String>,
    },

    #[error("method {method} not allowed for {path}, expected {allowed_method}")]
    MethodNotAllowed {
        path: String,
        method: String,
        allowed_method: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotFoundBody<'a> {
    error: &'a str,
    path: &'a str,
    available_endpoints: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MethodNotAllowedBody<'a> {
    error: &'a str,
    method: &'a str,
    allowed_method: &'a str,
}

impl DispatchRejection {
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::MethodNotAllowed { .. } => 405,
        }
    }

    fn into_snapshot(self) -> ResponseSnapshot {
        let status = self.status();
        let body = match &self {
            Self::NotFound {
                path,
                available_endpoints,
            } => serde_json::to_string(&NotFoundBody {
                error: "Endpoint not found",
                path,
                available_endpoints,
            }),
            Self::MethodNotAllowed {
                method,
                allowed_method,
                ..
            } => serde_json::to_string(&MethodNotAllowedBody {
                error: "Method not allowed",
                method,
                allowed_method,
            }),
        };

        ResponseSnapshot {
            status,
            content_type: "application/json".to_string(),
            body: body.unwrap_or_default(),
            headers: base_headers("application/json"),
        }
    }
}

/// `Content-Type` plus the fixed CORS set.
fn base_headers(content_type: &str) -> HashMap<String, String> {
    let mut headers = HashMap::with_capacity(4);
    headers.insert("Content-Type".to_string(), content_type.to_string());
    for (name, value) in CORS_HEADERS {
        headers.insert(name.to_string(), value.to_string());
    }
    headers
}

/// Resolves inbound requests to mock responses and records the exchange.
///
/// Holds shared handles to the registry and log store; constructed once at
/// server startup and cloned into the handler path.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Mutex<EndpointRegistry>>,
    logs: Arc<Mutex<RingLogStore>>,
    templates: TemplateEngine,
    log_requests: bool,
}

impl Dispatcher {
    pub fn new(registry: Arc<Mutex<EndpointRegistry>>, logs: Arc<Mutex<RingLogStore>>) -> Self {
        Self {
            registry,
            logs,
            templates: TemplateEngine::new(),
            log_requests: true,
        }
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    /// Reconstruct the logical path from its segment list. An empty segment
    /// list yields the bare `/api/` prefix.
    pub fn normalize_path(segments: &[String]) -> String {
        format!("/api/{}", segments.join("/"))
    }

    /// Dispatch one inbound request.
    ///
    /// `body` is the already-read request body text: empty for bodyless
    /// methods, or a read-failure placeholder when the stream could not be
    /// read. The audit record is appended before the snapshot is returned.
    pub fn dispatch(
        &self,
        method: &str,
        segments: &[String],
        headers: &HashMap<String, String>,
        body: &str,
        received_at: Instant,
    ) -> ResponseSnapshot {
        let path = Self::normalize_path(segments);

        // Resolve under the lock, then drop it before template expansion.
        let resolved = {
            let registry = self.registry.lock().expect("registry lock");
            match registry.lookup(&path) {
                None => Err(DispatchRejection::NotFound {
                    path: path.clone(),
                    available_endpoints: registry.paths(),
                }),
                Some(def) if !def.matches_method(method) => {
                    Err(DispatchRejection::MethodNotAllowed {
                        path: path.clone(),
                        method: method.to_string(),
                        allowed_method: def.method.clone(),
                    })
                }
                Some(def) => Ok(def.clone()),
            }
        };

        let snapshot = match resolved {
            Ok(def) => {
                if self.log_requests {
                    info!(
                        method = %method,
                        path = %path,
                        status = def.status_code,
                        "Request matched endpoint"
                    );
                }
                ResponseSnapshot {
                    status: def.status_code,
                    content_type: def.response_type.clone(),
                    body: self.templates.expand(&def, body),
                    headers: base_headers(&def.response_type),
                }
            }
            Err(rejection) => {
                if self.log_requests {
                    warn!(
                        method = %method,
                        path = %path,
                        status = rejection.status(),
                        "{}", rejection
                    );
                }
                rejection.into_snapshot()
            }
        };

        let processing_time_ms = received_at.elapsed().as_millis() as u64;
        let record = AuditRecord::from_exchange(
            method,
            &path,
            headers,
            body,
            snapshot.clone(),
            processing_time_ms,
            LogSource::Endpoint,
        );
        self.logs.lock().expect("log store lock").append(record);

        snapshot
    }

    /// Handle a CORS preflight: always 200 with the fixed CORS header set,
    /// no registry involvement, zero processing duration in the record.
    pub fn preflight(&self, path: &str, headers: &HashMap<String, String>) -> ResponseSnapshot {
        let snapshot = ResponseSnapshot {
            status: 200,
            content_type: "text/plain".to_string(),
            body: "CORS OK".to_string(),
            headers: base_headers("text/plain"),
        };

        let record =
            AuditRecord::from_exchange("OPTIONS", path, headers, "", snapshot.clone(), 0, LogSource::Cors);
        self.logs.lock().expect("log store lock").append(record);

        debug!(path = %path, "CORS preflight handled");
        snapshot
    }
}
