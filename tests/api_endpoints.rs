//! Integration tests for Chainlet API endpoints
//!
//! These tests drive the router through `axum-test` and check status codes
//! and JSON shapes for every route.

use axum_test::TestServer;
use chainlet::api::build_api_router;
use chainlet::blockchain::is_valid_chain;
use chainlet::config::{Config, MinerConfig};
use chainlet::node::Node;
use serde_json::{json, Value};
use std::sync::Arc;

const DIFFICULTY: u32 = 2;

fn test_server() -> TestServer {
    let config = Config {
        miner: MinerConfig {
            difficulty: DIFFICULTY,
            node_id: Some("api-test-node".to_string()),
            ..MinerConfig::default()
        },
        ..Config::default()
    };
    let node = Arc::new(Node::new(&config).expect("Failed to create node"));
    TestServer::new(build_api_router(node)).expect("Failed to create test server")
}

#[tokio::test]
async fn test_fresh_chain_holds_genesis() {
    let server = test_server();

    let response = server.get("/chain").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["length"], 1);
    assert_eq!(json["chain"][0]["index"], 1);
    assert_eq!(json["chain"][0]["proof"], 100);
    assert_eq!(json["chain"][0]["previous_hash"], "1");
    assert!(json["chain"][0]["transactions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_transaction_and_mine() {
    let server = test_server();

    let response = server
        .post("/transactions/new")
        .json(&json!({"sender": "A", "recipient": "B", "amount": 10}))
        .await;
    assert_eq!(response.status_code(), 201);
    let json: Value = response.json();
    assert_eq!(json["index"], 2);
    assert!(json["message"].is_string());

    let response = server.get("/mine").await;
    assert_eq!(response.status_code(), 200);
    let mined: Value = response.json();
    assert_eq!(mined["index"], 2);
    assert!(mined["proof"].is_number());
    assert!(mined["previous_hash"].is_string());
    let transactions = mined["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0]["sender"], "A");
    assert_eq!(transactions[0]["recipient"], "B");
    assert_eq!(transactions[1]["sender"], "0");
    assert_eq!(transactions[1]["recipient"], "api-test-node");

    let response = server.get("/chain").await;
    let chain: chainlet::sync::ChainResponse = response.json();
    assert_eq!(chain.length, 2);
    assert_eq!(chain.chain[1].previous_hash, chain.chain[0].hash());
    assert!(is_valid_chain(&chain.chain, DIFFICULTY));
}

#[tokio::test]
async fn test_submit_transaction_missing_field() {
    let server = test_server();

    let response = server
        .post("/transactions/new")
        .json(&json!({"sender": "A", "recipient": "B"}))
        .await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("amount"));

    // nothing was queued
    let response = server.get("/mine").await;
    let mined: Value = response.json();
    assert_eq!(mined["transactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_submit_transaction_malformed_body() {
    let server = test_server();

    let response = server
        .post("/transactions/new")
        .json(&json!({"sender": "A", "recipient": "B", "amount": "ten"}))
        .await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].is_string());

    let response = server.post("/transactions/new").text("not json").await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].is_string());

    let response = server
        .post("/nodes/register")
        .json(&json!({"nodes": "127.0.0.1:5001"}))
        .await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].is_string());

    let response = server.get("/health").await;
    let json: Value = response.json();
    assert_eq!(json["pending"], 0);
}

#[tokio::test]
async fn test_register_nodes() {
    let server = test_server();

    let response = server
        .post("/nodes/register")
        .json(&json!({"nodes": ["http://127.0.0.1:5001", "127.0.0.1:5001", "http://127.0.0.1:5002"]}))
        .await;
    assert_eq!(response.status_code(), 201);
    let json: Value = response.json();
    assert_eq!(json["total_nodes"], json!(["127.0.0.1:5001", "127.0.0.1:5002"]));

    let response = server.post("/nodes/register").json(&json!({})).await;
    assert_eq!(response.status_code(), 400);

    let response = server.post("/nodes/register").json(&json!({"nodes": []})).await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .post("/nodes/register")
        .json(&json!({"nodes": ["http://:99"]}))
        .await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_resolve_without_peers() {
    let server = test_server();

    let response = server.get("/nodes/resolve").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["replaced"], false);
    assert_eq!(json["chain"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_health() {
    let server = test_server();

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["node_id"], "api-test-node");
    assert_eq!(json["height"], 1);
    assert_eq!(json["pending"], 0);
    assert!(json["timestamp"].is_string());

    server
        .post("/transactions/new")
        .json(&json!({"sender": "A", "recipient": "B", "amount": 1.5}))
        .await;
    let json: Value = server.get("/health").await.json();
    assert_eq!(json["pending"], 1);
}
