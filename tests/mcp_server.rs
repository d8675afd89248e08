//! MCP server integration tests: tool registration, garde validation
//! rejection, and a protocol round-trip over an in-process duplex
//! transport, in the same style as the teacher's server test suite.

use std::sync::Arc;

use rmcp::model::CallToolRequestParams;
use rmcp::ServiceExt;
use serde_json::json;

use findata_core::server::FinDataServer;
use tempfile::TempDir;

mod common;
use common::*;

fn make_test_server() -> (FinDataServer, TempDir) {
    let (store, tmp) = make_test_store();
    let ctx = Arc::new(make_test_context(store, vec![], vec![], vec![], vec![]));
    (FinDataServer::new(ctx), tmp)
}

#[test]
fn server_info_has_correct_metadata() {
    use rmcp::ServerHandler;

    let (server, _tmp) = make_test_server();
    let info = server.get_info();

    assert_eq!(info.server_info.name, "findata-core");
    assert!(info.capabilities.tools.is_some());
    assert!(info.instructions.is_some());
    assert!(info.instructions.unwrap().contains("get_transcript"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tool_router_lists_all_nine_tools() {
    let (server, _tmp) = make_test_server();

    let (server_tx, server_rx) = tokio::io::duplex(4096);
    let (client_tx, client_rx) = tokio::io::duplex(4096);

    let server_handle = tokio::spawn(async move { server.serve((client_rx, server_tx)).await.unwrap() });

    let client: rmcp::service::RunningService<rmcp::service::RoleClient, _> =
        ().serve((server_rx, client_tx)).await.unwrap();

    let tools = client.list_all_tools().await.unwrap();
    let tool_names: Vec<String> = tools.iter().map(|t| t.name.to_string()).collect();

    assert_eq!(tools.len(), 9, "expected 9 tools, got: {tool_names:?}");
    for expected in [
        "get_transcript",
        "get_bars",
        "get_exchange_rate",
        "get_news",
        "summarize",
        "score_sentiment",
        "semantic_query",
        "get_screening",
        "cache_health",
    ] {
        assert!(tool_names.contains(&expected.to_string()), "missing tool: {expected}");
    }

    client.cancel().await.unwrap();
    drop(server_handle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn get_bars_rejects_empty_symbol() {
    let (server, _tmp) = make_test_server();

    let (server_tx, server_rx) = tokio::io::duplex(4096);
    let (client_tx, client_rx) = tokio::io::duplex(4096);

    let _server_handle = tokio::spawn(async move { server.serve((client_rx, server_tx)).await.unwrap() });

    let client: rmcp::service::RunningService<rmcp::service::RoleClient, _> =
        ().serve((server_rx, client_tx)).await.unwrap();

    let result = client
        .peer()
        .call_tool(CallToolRequestParams {
            meta: None,
            name: "get_bars".into(),
            arguments: Some(
                serde_json::from_value(json!({
                    "symbol": "",
                    "start": "2026-01-01",
                    "end": "2026-01-31",
                }))
                .unwrap(),
            ),
            task: None,
        })
        .await
        .unwrap();

    assert!(result.is_error.unwrap_or(false));
    let text = result.content.first().and_then(|c| c.raw.as_text()).unwrap();
    assert!(text.text.contains("Validation error"), "got: {}", text.text);

    client.cancel().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn get_bars_rejects_malformed_date() {
    let (server, _tmp) = make_test_server();

    let (server_tx, server_rx) = tokio::io::duplex(4096);
    let (client_tx, client_rx) = tokio::io::duplex(4096);

    let _server_handle = tokio::spawn(async move { server.serve((client_rx, server_tx)).await.unwrap() });

    let client: rmcp::service::RunningService<rmcp::service::RoleClient, _> =
        ().serve((server_rx, client_tx)).await.unwrap();

    let result = client
        .peer()
        .call_tool(CallToolRequestParams {
            meta: None,
            name: "get_bars".into(),
            arguments: Some(
                serde_json::from_value(json!({
                    "symbol": "AAPL",
                    "start": "not-a-date",
                    "end": "2026-01-31",
                }))
                .unwrap(),
            ),
            task: None,
        })
        .await
        .unwrap();

    assert!(result.is_error.unwrap_or(false));

    client.cancel().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn get_exchange_rate_rejects_non_alpha_currency_code() {
    let (server, _tmp) = make_test_server();

    let (server_tx, server_rx) = tokio::io::duplex(4096);
    let (client_tx, client_rx) = tokio::io::duplex(4096);

    let _server_handle = tokio::spawn(async move { server.serve((client_rx, server_tx)).await.unwrap() });

    let client: rmcp::service::RunningService<rmcp::service::RoleClient, _> =
        ().serve((server_rx, client_tx)).await.unwrap();

    let result = client
        .peer()
        .call_tool(CallToolRequestParams {
            meta: None,
            name: "get_exchange_rate".into(),
            arguments: Some(serde_json::from_value(json!({"from": "US1", "to": "INR"})).unwrap()),
            task: None,
        })
        .await
        .unwrap();

    assert!(result.is_error.unwrap_or(false));

    client.cancel().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cache_health_round_trips_over_the_protocol() {
    let (server, _tmp) = make_test_server();

    let (server_tx, server_rx) = tokio::io::duplex(4096);
    let (client_tx, client_rx) = tokio::io::duplex(4096);

    let _server_handle = tokio::spawn(async move { server.serve((client_rx, server_tx)).await.unwrap() });

    let client: rmcp::service::RunningService<rmcp::service::RoleClient, _> =
        ().serve((server_rx, client_tx)).await.unwrap();

    let result = client
        .peer()
        .call_tool(CallToolRequestParams {
            meta: None,
            name: "cache_health".into(),
            arguments: None,
            task: None,
        })
        .await
        .unwrap();

    assert!(!result.is_error.unwrap_or(false));
    let text = result.content.first().and_then(|c| c.raw.as_text()).unwrap();
    let resp: serde_json::Value = serde_json::from_str(&text.text).unwrap();
    assert_eq!(resp["l1_prime_configured"], false);

    client.cancel().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn get_bars_golden_path_returns_bars_from_mock_provider() {
    let (store, _tmp) = make_test_store();
    let provider = Arc::new(FixedBarsProvider::new(
        "mock",
        vec![sample_bar(chrono::NaiveDate::from_ymd_opt(2026, 1, 2).unwrap())],
    ));
    let ctx = Arc::new(make_test_context(store, vec![provider], vec![], vec![], vec![]));
    let server = FinDataServer::new(ctx);

    let (server_tx, server_rx) = tokio::io::duplex(65536);
    let (client_tx, client_rx) = tokio::io::duplex(65536);

    let _server_handle = tokio::spawn(async move { server.serve((client_rx, server_tx)).await.unwrap() });

    let client: rmcp::service::RunningService<rmcp::service::RoleClient, _> =
        ().serve((server_rx, client_tx)).await.unwrap();

    let result = client
        .peer()
        .call_tool(CallToolRequestParams {
            meta: None,
            name: "get_bars".into(),
            arguments: Some(
                serde_json::from_value(json!({
                    "symbol": "AAPL",
                    "start": "2026-01-01",
                    "end": "2026-01-03",
                }))
                .unwrap(),
            ),
            task: None,
        })
        .await
        .unwrap();

    assert!(!result.is_error.unwrap_or(false));
    let text = result.content.first().and_then(|c| c.raw.as_text()).unwrap();
    let resp: serde_json::Value = serde_json::from_str(&text.text).unwrap();
    assert_eq!(resp["symbol"], "AAPL");
    assert_eq!(resp["bars"].as_array().unwrap().len(), 1);

    client.cancel().await.unwrap();
}
