//! REST API server for Chainlet
//!
//! Thin HTTP shell over [`Node`]: it decodes requests, checks that required
//! fields are present and renders the node's results as JSON.

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::error::ChainError;
use crate::node::Node;
use crate::sync::ChainResponse;
use crate::transaction::Transaction;

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            ChainError::MiningCancelled | ChainError::MiningTimedOut => {
                ApiError::Unavailable(err.to_string())
            }
            other => ApiError::BlockchainError(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Every field is optional at the decoding stage so a missing one is
/// reported as invalid input rather than a decoding failure.
#[derive(Deserialize)]
pub struct NewTransactionRequest {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
}

#[derive(Serialize, Deserialize)]
pub struct NewTransactionResponse {
    pub message: String,
    pub index: u64,
}

#[derive(Serialize, Deserialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

#[derive(Deserialize)]
pub struct RegisterNodesRequest {
    #[serde(default)]
    pub nodes: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize)]
pub struct RegisterNodesResponse {
    pub message: String,
    pub total_nodes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ResolveResponse {
    pub message: String,
    pub replaced: bool,
    pub chain: Vec<crate::blockchain::Block>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::InvalidInput(format!("Missing value: {}", field)))
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints.
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/mine", get(mine))
        .route("/transactions/new", post(new_transaction))
        .route("/chain", get(full_chain))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(resolve_conflicts))
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

/// Bind a listener on `host:port`. `host` may be an IP literal or a name
/// such as `localhost`; the first address it resolves to that binds wins.
pub async fn bind_listener(host: &str, port: u16) -> Result<TcpListener, ChainError> {
    TcpListener::bind((host, port))
        .await
        .map_err(|e| ChainError::ConfigError(format!("Cannot bind {}:{}: {}", host, port, e)))
}

/// Serve the API on `host:port` until Ctrl-C. On shutdown in-flight proof
/// searches are cancelled so pending `/mine` requests can finish.
pub async fn run_api_server(node: Arc<Node>, host: &str, port: u16) -> Result<(), ChainError> {
    let app = build_api_router(node.clone());
    let listener = bind_listener(host, port).await?;
    let addr = listener.local_addr()?;

    tracing::info!(%addr, node_id = %node.node_id(), "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(node))
        .await?;
    Ok(())
}

async fn shutdown_signal(node: Arc<Node>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown requested, cancelling proof searches");
    node.shutdown();
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    let block = node.mine().await?;

    Ok(Json(MineResponse {
        message: "New block forged".to_string(),
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

async fn new_transaction(
    State(node): State<Arc<Node>>,
    payload: Result<Json<NewTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NewTransactionResponse>), ApiError> {
    let Json(req) = payload?;
    let sender = required(req.sender, "sender")?;
    let recipient = required(req.recipient, "recipient")?;
    let amount = required(req.amount, "amount")?;

    let index = node
        .submit_transaction(Transaction::new(sender, recipient, amount))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(NewTransactionResponse {
            message: format!("Transaction will be added to Block {}", index),
            index,
        }),
    ))
}

async fn full_chain(State(node): State<Arc<Node>>) -> Json<ChainResponse> {
    Json(node.chain().await)
}

async fn register_nodes(
    State(node): State<Arc<Node>>,
    payload: Result<Json<RegisterNodesRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterNodesResponse>), ApiError> {
    let Json(req) = payload?;
    let nodes = required(req.nodes, "nodes")?;
    let total_nodes = node.register_peers(&nodes).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterNodesResponse {
            message: "New nodes have been added".to_string(),
            total_nodes,
        }),
    ))
}

async fn resolve_conflicts(State(node): State<Arc<Node>>) -> Result<Json<ResolveResponse>, ApiError> {
    let outcome = node.resolve_conflicts().await?;
    let message = if outcome.replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };

    Ok(Json(ResolveResponse {
        message: message.to_string(),
        replaced: outcome.replaced,
        chain: outcome.chain,
    }))
}

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let (height, pending) = {
        let chain = node.blockchain.read().await;
        (chain.len(), chain.mempool.len())
    };
    Json(serde_json::json!({
        "status": "healthy",
        "node_id": node.node_id(),
        "height": height,
        "pending": pending,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
