//! End-to-end HTTP tests. Spawn the server on an ephemeral port and drive it
//! with reqwest.

use mock_api_server::{create_router, ServerConfig};
use std::net::SocketAddr;

async fn spawn_app() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    spawn_app_with(ServerConfig::default()).await
}

async fn spawn_app_with(config: ServerConfig) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(config);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    (addr, handle)
}

fn assert_cors_headers(response: &reqwest::Response) {
    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "*"
    );
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "GET, POST, PUT, DELETE, PATCH, OPTIONS"
    );
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "Content-Type, Authorization"
    );
}

#[tokio::test]
async fn health_builtin_returns_ok_json() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/api/health", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert_cors_headers(&response);

    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["status"], "ok");
    // The timestamp token was expanded into a real instant.
    let ts = json["timestamp"].as_str().unwrap();
    assert!(ts.ends_with('Z'));
    assert!(!ts.contains("{{"));
}

#[tokio::test]
async fn unknown_path_returns_404_with_available_endpoints() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/api/nothing/here", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    assert_cors_headers(&response);

    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["error"], "Endpoint not found");
    assert_eq!(json["path"], "/api/nothing/here");
    assert_eq!(
        json["availableEndpoints"],
        serde_json::json!(["/api/health", "/api/test"])
    );
}

#[tokio::test]
async fn wrong_method_returns_405_with_allowed_method() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/api/test", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 405);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["error"], "Method not allowed");
    assert_eq!(json["method"], "GET");
    assert_eq!(json["allowedMethod"], "POST");
}

#[tokio::test]
async fn test_builtin_injects_json_request_data() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/api/test", addr))
        .json(&serde_json::json!({"a": 1}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/xml"
    );

    let body = response.text().await.unwrap();
    let data_start = body.find("<requestData>").unwrap();
    let data_end = body.find("</requestData>").unwrap();
    let embedded = &body[data_start + "<requestData>".len()..data_end];
    let parsed: serde_json::Value = serde_json::from_str(embedded).unwrap();
    assert_eq!(parsed, serde_json::json!({"a": 1}));

    // Injection lands before the root closing tag, keeping the document
    // well-formed.
    assert!(data_end < body.find("</response>").unwrap());
    assert!(body.contains("<receivedAt>"));
}

#[tokio::test]
async fn non_json_body_falls_back_to_cdata() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/api/test", addr))
        .body("plain-text")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("<requestBody><![CDATA[plain-text]]></requestBody>"));
    assert!(body.find("]]></requestBody>").unwrap() < body.find("</response>").unwrap());
}

#[tokio::test]
async fn register_endpoint_then_dispatch() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/api/register-endpoint", addr))
        .json(&serde_json::json!({
            "path": "/api/users",
            "method": "GET",
            "responseType": "application/json",
            "responseBody": r#"{"users": ["alice"]}"#,
            "statusCode": 200
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["endpoint"], "/api/users");

    let response = client
        .get(format!("http://{}/api/users", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["users"], serde_json::json!(["alice"]));
}

#[tokio::test]
async fn reregistering_a_path_overwrites_the_definition() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();
    let register_url = format!("http://{}/api/register-endpoint", addr);

    for (status, body) in [(200u16, "first"), (418u16, "second")] {
        client
            .post(&register_url)
            .json(&serde_json::json!({
                "path": "/api/flaky",
                "method": "GET",
                "responseType": "text/plain",
                "responseBody": body,
                "statusCode": status
            }))
            .send()
            .await
            .unwrap();
    }

    let response = client
        .get(format!("http://{}/api/flaky", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 418);
    assert_eq!(response.text().await.unwrap(), "second");
}

#[tokio::test]
async fn malformed_registration_returns_500() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/api/register-endpoint", addr))
        .body("not json at all")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("register"));
}

#[tokio::test]
async fn options_preflight_returns_cors_and_is_logged() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .request(
            reqwest::Method::OPTIONS,
            format!("http://{}/api/whatever", addr),
        )
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_cors_headers(&response);
    assert_eq!(response.text().await.unwrap(), "");

    let logs: serde_json::Value = client
        .get(format!("http://{}/api/server-logs", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(logs["total"], 1);
    let record = &logs["logs"][0];
    assert_eq!(record["source"], "cors");
    assert_eq!(record["method"], "OPTIONS");
    assert_eq!(record["path"], "/api/whatever");
    assert_eq!(record["processingTime"], 0);
}

#[tokio::test]
async fn server_logs_list_and_clear() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .get(format!("http://{}/api/health", addr))
        .send()
        .await
        .unwrap();
    client
        .get(format!("http://{}/api/missing", addr))
        .send()
        .await
        .unwrap();

    let response = client
        .get(format!("http://{}/api/server-logs", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_cors_headers(&response);

    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["total"], 2);
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    // Newest-first: the 404 on /api/missing is at the head.
    assert_eq!(json["logs"][0]["path"], "/api/missing");
    assert_eq!(json["logs"][0]["response"]["status"], 404);
    assert_eq!(json["logs"][1]["path"], "/api/health");
    assert_eq!(json["logs"][1]["response"]["status"], 200);

    let response = client
        .delete(format!("http://{}/api/server-logs", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: serde_json::Value = response.json().await.unwrap();
    assert!(json["message"].as_str().unwrap().contains("cleared"));

    let json: serde_json::Value = client
        .get(format!("http://{}/api/server-logs", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["total"], 0);
    assert_eq!(json["logs"], serde_json::json!([]));
}

#[tokio::test]
async fn audit_record_captures_request_details() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(format!("http://{}/api/test", addr))
        .header("user-agent", "integration-test")
        .header("x-forwarded-for", "203.0.113.9")
        .json(&serde_json::json!({"probe": true}))
        .send()
        .await
        .unwrap();

    let logs: serde_json::Value = client
        .get(format!("http://{}/api/server-logs", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let record = &logs["logs"][0];
    assert_eq!(record["source"], "endpoint");
    assert_eq!(record["userAgent"], "integration-test");
    assert_eq!(record["ip"], "203.0.113.9");
    assert_eq!(record["requestBody"], r#"{"probe":true}"#);
    assert_eq!(record["response"]["contentType"], "application/xml");
    assert_eq!(
        record["requestHeaders"]["x-forwarded-for"],
        "203.0.113.9"
    );
}

#[tokio::test]
async fn config_endpoints_are_served_at_startup() {
    let config: ServerConfig = serde_yaml::from_str(
        r#"
endpoints:
  - path: /api/ping
    method: GET
    responseType: text/plain
    responseBody: pong
    statusCode: 200
"#,
    )
    .unwrap();
    let (addr, _handle) = spawn_app_with(config).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/api/ping", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "pong");
}

#[tokio::test]
async fn registered_endpoint_listing_includes_builtins() {
    let (addr, _handle) = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(format!("http://{}/api/register-endpoint", addr))
        .json(&serde_json::json!({
            "path": "/api/custom",
            "method": "PUT",
            "responseType": "application/json",
            "responseBody": "{}",
            "statusCode": 204
        }))
        .send()
        .await
        .unwrap();

    let json: serde_json::Value = client
        .get(format!("http://{}/api/register-endpoint", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let paths: Vec<&str> = json["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["/api/custom", "/api/health", "/api/test"]);
}
