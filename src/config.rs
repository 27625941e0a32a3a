//! Configuration for the mock API server.
//!
//! Defines mock endpoint definitions and global settings, loadable from a
//! YAML file. Wire names are camelCase to stay compatible with the
//! dashboard's registration payloads.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Method wildcard: a definition with this method answers any verb.
pub const WILDCARD_METHOD: &str = "ALL";

/// Content type that triggers request-data injection into the response body.
pub const XML_CONTENT_TYPE: &str = "application/xml";

/// Main configuration for the mock API server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Mock endpoint definitions registered at startup (on top of the built-ins)
    #[serde(default)]
    pub endpoints: Vec<MockDefinition>,

    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            endpoint
                .validate()
                .map_err(|e| anyhow::anyhow!("Endpoint {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// A single mock endpoint definition: path + method mapped to a canned response.
///
/// The registry keys definitions by `path`; re-registering a path overwrites
/// the previous definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockDefinition {
    /// Optional client-assigned identifier (the dashboard sends one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Route path, unique key within the registry (e.g. `/api/test`)
    pub path: String,

    /// HTTP verb to answer, or [`WILDCARD_METHOD`] for any
    pub method: String,

    /// MIME type for the `Content-Type` header; `application/xml` enables
    /// request-data injection
    pub response_type: String,

    /// Response body template; may contain the `{{timestamp}}` token and,
    /// for XML, must carry its root closing tag as the injection anchor
    pub response_body: String,

    /// HTTP status code to return
    pub status_code: u16,
}

impl MockDefinition {
    /// Validate the definition. Only applied to file-loaded configuration;
    /// runtime registration over HTTP accepts any decodable definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.path.is_empty() {
            anyhow::bail!("Endpoint path cannot be empty");
        }
        if self.status_code < 100 || self.status_code > 599 {
            anyhow::bail!("Invalid status code: {}", self.status_code);
        }
        Ok(())
    }

    /// Whether this definition answers the given inbound method.
    pub fn matches_method(&self, method: &str) -> bool {
        self.method == WILDCARD_METHOD || self.method == method
    }

    /// Whether the response body is subject to XML request-data injection.
    pub fn is_xml(&self) -> bool {
        self.response_type == XML_CONTENT_TYPE
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSettings {
    /// Maximum number of audit records retained by the log store
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Log every dispatched request
    #[serde(default = "default_true")]
    pub log_requests: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            log_requests: true,
        }
    }
}

fn default_log_capacity() -> usize {
    200
}

fn default_true() -> bool {
    true
}
