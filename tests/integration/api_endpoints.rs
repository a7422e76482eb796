//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - All REST endpoints return correct responses
//! - System errors map to the right status codes
//! - WebSocket streaming works and admits one subscriber per system

use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use reqwest::StatusCode;
use serde_json::{Value, json};
use topology_sim::{
    api::{ApiConfig, ApiState, spawn_api_server},
    metrics::Message,
};

use crate::helpers::fast_config;

// Helper to create test API server
async fn spawn_test_api() -> SocketAddr {
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        enable_cors: true,
    };

    spawn_api_server(config, ApiState::new(fast_config()))
        .await
        .unwrap()
}

async fn create_system(client: &reqwest::Client, addr: SocketAddr) -> String {
    let response = client
        .post(format!("http://{addr}/api/systems"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn get_graph(client: &reqwest::Client, addr: SocketAddr, id: &str) -> Value {
    let response = client
        .get(format!("http://{addr}/api/systems/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.unwrap()
}

fn node_ids_of_type(graph: &Value, kind: &str) -> Vec<String> {
    graph["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|node| node["data"]["type"] == kind)
        .map(|node| node["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_endpoint() {
    let addr = spawn_test_api().await;

    let response = reqwest::get(format!("http://{addr}/api/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_create_system_has_default_topology() {
    let addr = spawn_test_api().await;
    let client = reqwest::Client::new();

    let id = create_system(&client, addr).await;
    let graph = get_graph(&client, addr, &id).await;

    assert_eq!(graph["id"], id.as_str());
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 5);
    assert_eq!(graph["edges"].as_array().unwrap().len(), 4);
    assert_eq!(node_ids_of_type(&graph, "client").len(), 1);
    assert_eq!(node_ids_of_type(&graph, "load balancer").len(), 1);
    assert_eq!(node_ids_of_type(&graph, "server").len(), 3);

    let server = graph["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|node| node["data"]["type"] == "server")
        .unwrap();
    let metric_names: Vec<_> = server["data"]["metrics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|metric| metric["name"].as_str().unwrap())
        .collect();
    assert_eq!(metric_names, vec!["Processed", "Queued", "Utilisation"]);
}

#[tokio::test]
async fn test_unknown_system_is_not_found() {
    let addr = spawn_test_api().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{addr}/api/systems/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let response = client
        .put(format!("http://{addr}/api/systems/nope/start"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_node_lifecycle() {
    let addr = spawn_test_api().await;
    let client = reqwest::Client::new();
    let id = create_system(&client, addr).await;
    let nodes = format!("http://{addr}/api/systems/{id}/nodes");

    let response = client
        .post(&nodes)
        .json(&json!({"type": "server"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let node: Value = response.json().await.unwrap();
    assert_eq!(node["data"]["type"], "server");
    assert_eq!(node["position"], json!({"x": 500, "y": 150}));
    let node_id = node["id"].as_str().unwrap().to_string();

    let response = client
        .patch(format!("{nodes}/{node_id}"))
        .json(&json!({"x": 12.4, "y": 99.6}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let graph = get_graph(&client, addr, &id).await;
    let moved = graph["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|node| node["id"] == node_id.as_str())
        .unwrap();
    assert_eq!(moved["position"], json!({"x": 12, "y": 100}));

    let response = client
        .patch(format!("{nodes}/missing"))
        .json(&json!({"x": 1, "y": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .post(&nodes)
        .json(&json!({"type": "database"}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    // Removing the load balancer takes its four edges with it
    let lb = node_ids_of_type(&graph, "load balancer").remove(0);
    let response = client
        .delete(format!("{nodes}?id={node_id}&id={lb}&id=missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let graph = get_graph(&client, addr, &id).await;
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 4);
    assert!(graph["edges"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_edge_lifecycle() {
    let addr = spawn_test_api().await;
    let client = reqwest::Client::new();
    let id = create_system(&client, addr).await;
    let edges = format!("http://{addr}/api/systems/{id}/edges");

    let graph = get_graph(&client, addr, &id).await;
    let client_id = node_ids_of_type(&graph, "client").remove(0);
    let server_id = node_ids_of_type(&graph, "server").remove(0);

    // Servers never send
    let response = client
        .post(&edges)
        .json(&json!({"source": server_id, "target": client_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(&edges)
        .json(&json!({"source": client_id, "target": "missing"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .post(&edges)
        .json(&json!({"source": client_id, "target": server_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let edge: Value = response.json().await.unwrap();
    assert_eq!(edge["source"], client_id.as_str());
    assert_eq!(edge["target"], server_id.as_str());
    assert_eq!(get_graph(&client, addr, &id).await["edges"].as_array().unwrap().len(), 5);

    let edge_id = edge["id"].as_str().unwrap();
    let response = client
        .delete(format!("{edges}?id={edge_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_graph(&client, addr, &id).await["edges"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_start_streams_metrics_to_single_subscriber() {
    let addr = spawn_test_api().await;
    let client = reqwest::Client::new();
    let id = create_system(&client, addr).await;
    let url = format!("ws://{addr}/api/systems/{id}/metrics");

    let (mut stream, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .unwrap();

    // The metrics stream is taken
    match tokio_tungstenite::connect_async(url.as_str()).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), 409);
        }
        other => panic!("expected 409 for second subscriber, got {other:?}"),
    }

    let response = client
        .put(format!("http://{addr}/api/systems/{id}/start"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("metrics should arrive")
        .unwrap()
        .unwrap();
    let message: Message = serde_json::from_str(&frame.into_text().unwrap()).unwrap();

    let graph = get_graph(&client, addr, &id).await;
    assert!(
        graph["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .any(|node| node["id"] == message.node_id.as_str())
    );
    assert!(!message.metrics.is_empty());
}

#[tokio::test]
async fn test_restart_after_completion() {
    let addr = spawn_test_api().await;
    let client = reqwest::Client::new();
    let id = create_system(&client, addr).await;
    let start = format!("http://{addr}/api/systems/{id}/start");

    // Publishers blocked on a full metrics buffer are cancelled by the restart
    for _ in 0..2 {
        let response = client.put(&start).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
