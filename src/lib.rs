//! Mock API Server
//!
//! A standalone HTTP server for defining mock endpoints, invoking them, and
//! inspecting the resulting traffic. Register a path + method + status +
//! body combination, call it from any HTTP client, and review the bounded
//! in-memory audit log of everything the server saw.
//!
//! # Features
//!
//! - **Endpoint registration**: upsert mock definitions at runtime over HTTP
//!   or from a YAML file at startup
//! - **Built-in endpoints**: a POST XML echo at `/api/test` and a GET JSON
//!   health probe at `/api/health`, shadowable but never removed
//! - **Template expansion**: `{{timestamp}}` substitution plus XML
//!   request-data injection before the root closing tag
//! - **Audit log**: the 200 most recent request/response exchanges,
//!   newest-first, including CORS preflights
//! - **CORS everywhere**: permissive cross-origin headers on every response
//!   so browser dashboards can talk to the server directly
//!
//! # Example Configuration
//!
//! ```yaml
//! endpoints:
//!   - path: /api/users
//!     method: GET
//!     responseType: application/json
//!     responseBody: '{"users": [], "fetchedAt": "{{timestamp}}"}'
//!     statusCode: 200
//! ```

pub mod config;
pub mod dispatcher;
pub mod registry;
pub mod server;
pub mod store;
pub mod template;

pub use config::{MockDefinition, ServerConfig};
pub use dispatcher::Dispatcher;
pub use registry::EndpointRegistry;
pub use server::create_router;
pub use store::{AuditRecord, LogSource, RingLogStore};
pub use template::TemplateEngine;
