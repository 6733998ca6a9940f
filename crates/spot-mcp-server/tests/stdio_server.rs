//! End-to-end tests: JSON-RPC lines in, JSON-RPC lines out, Spot API mocked.

use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;

use serde_json::{json, Value};
use spot_client::SpotConfig;
use spot_mcp_server::{build_server, AccessPolicy};
use tokio::io::{AsyncBufReadExt, BufReader};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_token(mock_server: &MockServer, expected_calls: u64, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "access-1", "expires_in": 3600 }))
                .set_delay(delay),
        )
        .expect(expected_calls)
        .mount(mock_server)
        .await;
}

/// Feed `requests` to a fresh server and collect responses keyed by id.
async fn exchange(
    mock_server: &MockServer,
    policy: AccessPolicy,
    requests: &[Value],
) -> HashMap<String, Value> {
    let input: String = requests.iter().map(|r| format!("{r}\n")).collect();
    exchange_raw(mock_server, policy, input).await
}

async fn exchange_raw(
    mock_server: &MockServer,
    policy: AccessPolicy,
    input: String,
) -> HashMap<String, Value> {
    let config = SpotConfig::default()
        .with_api_url(mock_server.uri())
        .with_auth_url(mock_server.uri())
        .with_refresh_token("rt-123");
    let server = build_server(config, policy).expect("server");

    let (server_out, client_in) = tokio::io::duplex(64 * 1024);
    let running = tokio::spawn(server.run(Cursor::new(input.into_bytes()), server_out));

    let mut responses = HashMap::new();
    let mut lines = BufReader::new(client_in).lines();
    while let Some(line) = lines.next_line().await.expect("read") {
        let response: Value = serde_json::from_str(&line).expect("response is JSON");
        assert_eq!(response["jsonrpc"], "2.0");
        responses.insert(response["id"].to_string(), response);
    }
    running.await.expect("join").expect("server run");
    responses
}

fn call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
}

fn tool_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"]
        .as_str()
        .expect("text content")
}

#[tokio::test]
async fn test_handshake_and_restricted_listing() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 0, Duration::ZERO).await;

    let responses = exchange(
        &mock_server,
        AccessPolicy::Restricted,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2025-03-26", "capabilities": {}}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"}),
        ],
    )
    .await;

    assert_eq!(responses.len(), 3, "notification must not be answered");

    let init = &responses["1"]["result"];
    assert_eq!(init["protocolVersion"], "2025-03-26");
    assert_eq!(init["serverInfo"]["name"], "spot-mcp");
    assert!(init["capabilities"]["tools"].is_object());

    assert_eq!(responses["2"]["result"], json!({}));

    let tools = responses["3"]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 16);
    assert!(tools.iter().all(|t| !t["name"].as_str().unwrap().starts_with("create_")));
    assert!(tools.iter().all(|t| t.get("inputSchema").is_some()));
}

#[tokio::test]
async fn test_tool_call_returns_api_payload() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 1, Duration::ZERO).await;

    Mock::given(method("GET"))
        .and(path("/ngpc.rxt.io/v1/namespaces/org-acme/cloudspaces/prod"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": { "name": "prod" },
            "status": { "phase": "Ready" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let responses = exchange(
        &mock_server,
        AccessPolicy::Restricted,
        &[call(7, "get_cloudspace", json!({"namespace": "org-acme", "name": "prod"}))],
    )
    .await;

    let result = &responses["7"]["result"];
    assert_eq!(result["isError"], false);
    let payload: Value = serde_json::from_str(tool_text(&responses["7"])).unwrap();
    assert_eq!(payload["status"]["phase"], "Ready");
}

#[tokio::test]
async fn test_concurrent_calls_share_one_token_exchange() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 1, Duration::from_millis(200)).await;

    Mock::given(method("GET"))
        .and(path("/ngpc.rxt.io/v1/regions"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(6)
        .mount(&mock_server)
        .await;

    let requests: Vec<Value> = (1..=6).map(|id| call(id, "list_regions", json!({}))).collect();
    let responses = exchange(&mock_server, AccessPolicy::Permissive, &requests).await;

    assert_eq!(responses.len(), 6);
    for response in responses.values() {
        assert_eq!(response["result"]["isError"], false);
    }
}

#[tokio::test]
async fn test_restricted_call_never_reaches_api() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 0, Duration::ZERO).await;

    Mock::given(method("POST"))
        .and(path("/ngpc.rxt.io/v1/namespaces/org-acme/cloudspaces"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let responses = exchange(
        &mock_server,
        AccessPolicy::Restricted,
        &[call(
            1,
            "create_cloudspace",
            json!({"namespace": "org-acme", "name": "prod", "region": "us-central-dfw-1"}),
        )],
    )
    .await;

    assert_eq!(responses["1"]["result"]["isError"], true);
    assert_eq!(
        tool_text(&responses["1"]),
        "Command 'create_cloudspace' is not available in read-only mode"
    );
}

#[tokio::test]
async fn test_upstream_and_auth_failures_are_tool_errors() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 1, Duration::ZERO).await;

    Mock::given(method("GET"))
        .and(path("/ngpc.rxt.io/v1/serverclasses/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("serverclass not found"))
        .mount(&mock_server)
        .await;

    let responses = exchange(
        &mock_server,
        AccessPolicy::Permissive,
        &[call(1, "get_server_class", json!({"name": "missing"}))],
    )
    .await;

    assert_eq!(responses["1"]["result"]["isError"], true);
    assert_eq!(
        tool_text(&responses["1"]),
        "request failed: HTTP 404 - serverclass not found"
    );
}

#[tokio::test]
async fn test_rejected_credential_is_reported_per_call() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
        .mount(&mock_server)
        .await;

    let responses = exchange(
        &mock_server,
        AccessPolicy::Permissive,
        &[
            call(1, "list_regions", json!({})),
            json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}),
        ],
    )
    .await;

    assert_eq!(responses["1"]["result"]["isError"], true);
    assert_eq!(
        tool_text(&responses["1"]),
        "authentication failed: HTTP 401 - invalid_grant"
    );
    assert_eq!(responses["2"]["result"], json!({}));
}

#[tokio::test]
async fn test_node_pools_of_a_cloudspace_use_label_selector() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 1, Duration::ZERO).await;

    for resource in ["spotnodepools", "ondemandnodepools"] {
        Mock::given(method("GET"))
            .and(path(format!("/ngpc.rxt.io/v1/namespaces/org-acme/{resource}")))
            .and(query_param("labelSelector", "ngpc.rxt.io/cloudspace=prod"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "items": [{ "kind": resource }] })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let responses = exchange(
        &mock_server,
        AccessPolicy::Restricted,
        &[call(
            1,
            "list_cloudspace_node_pools",
            json!({"namespace": "org-acme", "cloudspace": "prod"}),
        )],
    )
    .await;

    let payload: Value = serde_json::from_str(tool_text(&responses["1"])).unwrap();
    assert_eq!(payload["cloudspace"], "prod");
    assert_eq!(payload["spotNodePools"]["items"][0]["kind"], "spotnodepools");
    assert_eq!(payload["onDemandNodePools"]["items"][0]["kind"], "ondemandnodepools");
}

#[tokio::test]
async fn test_protocol_errors() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 0, Duration::ZERO).await;

    let input = [
        "{not json".to_string(),
        json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"}).to_string(),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"arguments": {}}})
            .to_string(),
        json!({"jsonrpc": "1.0", "id": 3, "method": "ping"}).to_string(),
        json!({"jsonrpc": "2.0", "id": 4, "params": {}}).to_string(),
        String::new(),
    ]
    .join("\n");

    let responses = exchange_raw(&mock_server, AccessPolicy::Permissive, input).await;

    assert_eq!(responses["null"]["error"]["code"], -32700);
    assert_eq!(responses["1"]["error"]["code"], -32601);
    assert_eq!(responses["2"]["error"]["code"], -32602);
    assert_eq!(responses["3"]["error"]["code"], -32600);
    assert_eq!(responses["4"]["error"]["code"], -32600);
}

#[tokio::test]
async fn test_valid_json_without_a_readable_id_is_an_invalid_request() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 0, Duration::ZERO).await;

    let input = json!({"jsonrpc": "2.0", "method": 42}).to_string();
    let responses = exchange_raw(&mock_server, AccessPolicy::Permissive, input).await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses["null"]["error"]["code"], -32600);
}

#[tokio::test]
async fn test_null_id_is_answered() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 0, Duration::ZERO).await;

    let responses = exchange(
        &mock_server,
        AccessPolicy::Permissive,
        &[json!({"jsonrpc": "2.0", "id": null, "method": "ping"})],
    )
    .await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses["null"]["result"], json!({}));
}

#[tokio::test]
async fn test_tool_arguments_cannot_redirect_the_request() {
    let mock_server = MockServer::start().await;
    mount_token(&mock_server, 1, Duration::ZERO).await;

    Mock::given(method("DELETE"))
        .and(path("/ngpc.rxt.io/v1/namespaces/ns/spotnodepools/p"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(
            "/ngpc.rxt.io/v1/namespaces/ns/cloudspaces/..%2Fspotnodepools%2Fp",
        ))
        .respond_with(ResponseTemplate::new(404).set_body_string("cloudspace not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let responses = exchange(
        &mock_server,
        AccessPolicy::Permissive,
        &[
            call(
                1,
                "delete_cloudspace",
                json!({"namespace": "ns", "name": "../spotnodepools/p"}),
            ),
            call(2, "delete_cloudspace", json!({"namespace": "ns", "name": ".."})),
        ],
    )
    .await;

    assert_eq!(responses["1"]["result"]["isError"], true);
    assert_eq!(
        tool_text(&responses["1"]),
        "request failed: HTTP 404 - cloudspace not found"
    );
    assert_eq!(responses["2"]["result"]["isError"], true);
    assert!(tool_text(&responses["2"]).starts_with("invalid path segment \"..\""));
}
