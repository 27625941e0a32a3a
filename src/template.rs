//! Template expansion for stored response bodies.
//!
//! Two text-level rules, applied at dispatch time: timestamp token
//! substitution and, for XML responses, injection of the inbound request
//! data before the root closing tag. Dispatch logic never touches the
//! splice details, so this engine can be swapped for a document-tree
//! injector without changing the dispatcher.

use crate::config::MockDefinition;

/// Literal token replaced with the current instant wherever it appears in a
/// response body.
pub const TIMESTAMP_TOKEN: &str = "{{timestamp}}";

/// Current instant in ISO-8601 with millisecond precision.
pub fn iso_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Expands stored response bodies.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine;

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    /// Expand a definition's response body against the inbound request body.
    ///
    /// Every `{{timestamp}}` occurrence becomes the current instant. For
    /// `application/xml` definitions with a non-empty inbound body, the
    /// request data is injected before the root closing tag: re-serialized
    /// JSON when the body parses as JSON, a CDATA-wrapped verbatim copy
    /// otherwise. The parse failure is an expected branch, not an error.
    ///
    /// Precondition: XML templates must contain their root closing tag. A
    /// template without one gets timestamp substitution but no injection.
    pub fn expand(&self, definition: &MockDefinition, request_body: &str) -> String {
        let now = iso_timestamp();
        let body = definition.response_body.replace(TIMESTAMP_TOKEN, &now);

        if definition.is_xml() && !request_body.is_empty() {
            inject_request_data(&body, request_body, &now)
        } else {
            body
        }
    }
}

/// Insert the request-data elements immediately before the root closing tag,
/// keeping the document well-formed. The root closing tag is located as the
/// last `</...>` occurrence in the body.
fn inject_request_data(body: &str, request_body: &str, now: &str) -> String {
    let Some(insert_at) = find_root_closing_tag(body) else {
        return body.to_string();
    };

    let injected = match serde_json::from_str::<serde_json::Value>(request_body) {
        Ok(json) => format!(
            "  <requestData>{}</requestData>\n  <receivedAt>{}</receivedAt>\n",
            serde_json::to_string(&json).unwrap_or_default(),
            now
        ),
        Err(_) => format!(
            "  <requestBody><![CDATA[{}]]></requestBody>\n  <receivedAt>{}</receivedAt>\n",
            request_body, now
        ),
    };

    let mut out = String::with_capacity(body.len() + injected.len());
    out.push_str(&body[..insert_at]);
    out.push_str(&injected);
    out.push_str(&body[insert_at..]);
    out
}

fn find_root_closing_tag(body: &str) -> Option<usize> {
    let idx = body.rfind("</")?;
    body[idx..].find('>')?;
    Some(idx)
}
