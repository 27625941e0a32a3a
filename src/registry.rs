//! Endpoint registry: normalized path to mock definition.
//!
//! Exact-string lookup only; method wildcarding is the definition's concern.
//! Seeded with built-in endpoints that can be shadowed by later
//! registrations but never removed (there is no delete operation).

use crate::config::MockDefinition;
use std::collections::HashMap;

/// Registry of mock endpoint definitions, keyed by path.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, MockDefinition>,
}

impl EndpointRegistry {
    /// Empty registry, no built-ins. Mostly useful in tests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-seeded with the built-in endpoints: a POST XML echo at
    /// `/api/test` and a GET JSON health probe at `/api/health`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(builtin_test_endpoint());
        registry.register(builtin_health_endpoint());
        registry
    }

    /// Insert or overwrite the definition keyed by its path. Last write
    /// wins; no validation is performed here.
    pub fn register(&mut self, definition: MockDefinition) {
        self.endpoints.insert(definition.path.clone(), definition);
    }

    /// Exact-string lookup.
    pub fn lookup(&self, path: &str) -> Option<&MockDefinition> {
        self.endpoints.get(path)
    }

    /// All registered paths, sorted. Used for the 404 diagnostics payload.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.endpoints.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// All registered definitions, sorted by path.
    pub fn definitions(&self) -> Vec<MockDefinition> {
        let mut defs: Vec<MockDefinition> = self.endpoints.values().cloned().collect();
        defs.sort_by(|a, b| a.path.cmp(&b.path));
        defs
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

fn builtin_test_endpoint() -> MockDefinition {
    MockDefinition {
        id: Some("default".to_string()),
        path: "/api/test".to_string(),
        method: "POST".to_string(),
        response_type: "application/xml".to_string(),
        response_body: "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <response>\n  \
             <status>success</status>\n  \
             <message>API is working correctly</message>\n  \
             <timestamp>{{timestamp}}</timestamp>\n\
             </response>"
            .to_string(),
        status_code: 200,
    }
}

fn builtin_health_endpoint() -> MockDefinition {
    MockDefinition {
        id: Some("health".to_string()),
        path: "/api/health".to_string(),
        method: "GET".to_string(),
        response_type: "application/json".to_string(),
        response_body:
            r#"{"status":"ok","timestamp":"{{timestamp}}","service":"mock-api-server"}"#
                .to_string(),
        status_code: 200,
    }
}
