//! End-to-end envelope tests that need no database.
//!
//! The database settings point at a port that refuses connections, so any
//! test that reaches the backend sees a connection failure.

use pg_mcp_server::config::{DatabaseSettings, PoolSettings};
use pg_mcp_server::rpc::{RpcProcessor, RpcResponse};
use pg_mcp_server::{PostgresService, build_processor};
use serde_json::{Value, json};
use std::time::Duration;

fn processor() -> RpcProcessor {
    let db = DatabaseSettings::from_parts("127.0.0.1", 1, "tester", "hunter2", "none").unwrap();
    let settings = PoolSettings {
        min_connections: 1,
        max_connections: 2,
        acquire_timeout: Duration::from_secs(1),
        query_timeout: Duration::from_secs(1),
    };
    build_processor(PostgresService::new(db, settings))
}

async fn send(processor: &RpcProcessor, request: Value) -> Value {
    let response = processor
        .handle_text(&request.to_string())
        .await
        .expect("request with id must get a response");
    serde_json::to_value(response).unwrap()
}

fn call(name: &str, arguments: Value, id: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments },
        "id": id
    })
}

fn tool_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn test_echo_scenario_exact_response() {
    let response = send(&processor(), call("echo", json!({"message": "hi"}), json!(1))).await;
    assert_eq!(
        response,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "content": [{ "type": "text", "text": "Echo: hi" }],
                "isError": false
            }
        })
    );
}

#[tokio::test]
async fn test_echo_various_messages() {
    let processor = processor();
    let messages = [
        "",
        "multi\nline\nmessage",
        "こんにちは世界",
        "emoji 🚀 and ümlauts",
        "quotes \" and \\ backslashes",
        "  padded  ",
    ];
    for (idx, message) in messages.into_iter().enumerate() {
        let response = send(
            &processor,
            call("echo", json!({ "message": message }), json!(idx)),
        )
        .await;
        assert_eq!(tool_text(&response), format!("Echo: {message}"));
        assert_eq!(response["result"]["isError"], false);
    }
}

#[tokio::test]
async fn test_echo_without_message() {
    let response = send(&processor(), call("echo", json!({}), json!(2))).await;
    assert_eq!(tool_text(&response), "Echo: ");
}

#[tokio::test]
async fn test_ids_echoed_with_original_type() {
    let processor = processor();
    for id in [
        json!(0),
        json!(42),
        json!(-7),
        json!(1.5),
        json!("abc"),
        json!(""),
        json!(null),
        json!(9_007_199_254_740_993_u64),
    ] {
        let response = send(
            &processor,
            json!({"jsonrpc": "2.0", "method": "ping", "id": id}),
        )
        .await;
        assert_eq!(response["id"], id);
        assert!(response.get("result").is_some());
        assert!(response.get("error").is_none());
    }
}

#[tokio::test]
async fn test_parse_error_has_null_id() {
    let processor = processor();
    for text in ["", "{", "{\"jsonrpc\": \"2.0\",", "not json", "[1, 2"] {
        let response = processor.handle_text(text).await.unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["error"]["code"], -32700);
        assert_eq!(value["error"]["message"], "Parse error: Invalid JSON");
    }
}

#[tokio::test]
async fn test_unknown_method() {
    let response = send(
        &processor(),
        json!({"jsonrpc": "2.0", "method": "bogus", "id": 3}),
    )
    .await;
    assert_eq!(response["id"], 3);
    assert_eq!(response["error"]["code"], -32601);
    assert!(
        response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("bogus")
    );
    assert!(response.get("result").is_none());
}

#[tokio::test]
async fn test_unknown_tool() {
    let response = send(&processor(), call("drop_everything", json!({}), json!("t"))).await;
    assert_eq!(response["id"], "t");
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Unknown tool: drop_everything");
}

#[tokio::test]
async fn test_tools_call_without_name() {
    let response = send(
        &processor(),
        json!({"jsonrpc": "2.0", "method": "tools/call", "params": {}, "id": 5}),
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);
}

#[tokio::test]
async fn test_empty_query_is_tool_error() {
    let processor = processor();
    for query in ["", "   ", "\n\t"] {
        let response = send(&processor, call("postgres_query", json!({"query": query}), json!(7))).await;
        assert_eq!(response["result"]["isError"], true);
        assert!(tool_text(&response).contains("Query cannot be empty"));
    }
    let pools = processor.server().tools().service().pools();
    assert_eq!(pools.init_attempts(), 0);
}

#[tokio::test]
async fn test_empty_analyze_is_tool_error() {
    let response = send(
        &processor(),
        call("postgres_query_analyze", json!({"query": " "}), json!(8)),
    )
    .await;
    assert_eq!(response["result"]["isError"], true);
    assert!(tool_text(&response).contains("Query cannot be empty"));
}

#[tokio::test]
async fn test_backend_failure_is_tool_error_not_rpc_error() {
    let processor = processor();
    for (name, arguments) in [
        ("postgres_query", json!({"query": "SELECT 1"})),
        ("postgres_schema", json!({})),
        ("postgres_table_info", json!({"table_name": "missing"})),
        ("postgres_database_size", json!({})),
        ("postgres_locks", json!({})),
    ] {
        let response = send(&processor, call(name, arguments, json!(name))).await;
        assert!(response.get("error").is_none(), "{name} escalated");
        assert_eq!(response["result"]["isError"], true, "{name}");
    }
}

#[tokio::test]
async fn test_connection_test_reports_failure() {
    let response = send(&processor(), call("postgres_connection_test", json!({}), json!(9))).await;
    assert_eq!(response["result"]["isError"], true);
    let text = tool_text(&response);
    assert!(text.contains("Connection failed"));
    assert!(!text.contains("hunter2"));
}

#[tokio::test]
async fn test_initialize() {
    let processor = processor();
    let response = send(
        &processor,
        json!({"jsonrpc": "2.0", "method": "initialize", "params": {}, "id": 1}),
    )
    .await;
    let result = &response["result"];
    assert_eq!(result["protocol_version"], "2024-11-05");
    assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    assert_eq!(result["capabilities"]["resources"]["listChanged"], false);
    assert_eq!(result["server_info"]["name"], "postgres-mcp-server");
    assert_eq!(result["server_info"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_tools_list() {
    let response = send(
        &processor(),
        json!({"jsonrpc": "2.0", "method": "tools/list", "id": 1}),
    )
    .await;
    let tools = response["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    for expected in [
        "echo",
        "postgres_connection_test",
        "postgres_query",
        "postgres_schema",
        "postgres_table_info",
        "postgres_query_analyze",
    ] {
        assert!(names.contains(&expected), "missing {expected}");
    }
    for tool in tools {
        assert_eq!(tool["inputSchema"]["type"], "object");
        assert!(tool["description"].as_str().is_some());
    }
}

#[tokio::test]
async fn test_resources_list_is_empty() {
    let response = send(
        &processor(),
        json!({"jsonrpc": "2.0", "method": "resources/list", "id": 1}),
    )
    .await;
    assert_eq!(response["result"], json!({"resources": []}));
}

#[tokio::test]
async fn test_successful_notification_has_no_response() {
    let processor = processor();
    let request = call("echo", json!({"message": "quiet"}), json!(null));
    let mut notification = request.as_object().unwrap().clone();
    notification.remove("id");
    assert!(
        processor
            .handle_text(&Value::Object(notification).to_string())
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_failed_notification_still_reports() {
    let response = processor()
        .handle_text(r#"{"jsonrpc":"2.0","method":"bogus"}"#)
        .await
        .unwrap();
    assert_eq!(response.id, pg_mcp_server::rpc::RequestId::Null);
    assert!(response.is_error());
}

#[tokio::test]
async fn test_invalid_envelopes() {
    let processor = processor();
    let cases = [
        (json!([]), Value::Null, -32600),
        (json!({"method": "ping", "id": 1}), json!(1), -32600),
        (json!({"jsonrpc": "2.1", "method": "ping", "id": 1}), json!(1), -32600),
        (json!({"jsonrpc": "2.0", "id": 2}), json!(2), -32600),
        (json!({"jsonrpc": "2.0", "method": "ping", "id": {}}), Value::Null, -32600),
        (
            json!({"jsonrpc": "2.0", "method": "ping", "params": "x", "id": 3}),
            json!(3),
            -32602,
        ),
    ];
    for (request, id, code) in cases {
        let response = send(&processor, request.clone()).await;
        assert_eq!(response["id"], id, "{request}");
        assert_eq!(response["error"]["code"], code, "{request}");
    }
}

#[tokio::test]
async fn test_responses_have_exactly_one_outcome() {
    let processor = processor();
    let requests = [
        json!({"jsonrpc": "2.0", "method": "ping", "id": 1}),
        json!({"jsonrpc": "2.0", "method": "nope", "id": 2}),
        call("echo", json!({"message": "x"}), json!(3)),
        call("postgres_query", json!({"query": ""}), json!(4)),
    ];
    for request in requests {
        let response: RpcResponse = processor
            .handle_text(&request.to_string())
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        let has_result = value.get("result").is_some();
        let has_error = value.get("error").is_some();
        assert!(has_result ^ has_error, "{value}");
        assert_eq!(value["jsonrpc"], "2.0");
    }
}
