mod constants;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use blockvault_core::{hash_from_slice, Block};
use blockvault_storage::{ChainStore, StoreError};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Data directory for sled
    #[arg(long, default_value = "./data")]
    data_dir: String,
}

#[derive(Clone)]
struct AppState {
    store: Arc<ChainStore>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct TipOut {
    tip: String,
}

#[derive(Deserialize)]
struct SubmitIn {
    payload: String,
}

#[derive(Deserialize)]
struct ListParams {
    limit: Option<u32>,
}

#[derive(Serialize)]
struct BlockOut {
    hash: String,
    prev_hash: String,
    payload: String,
    timestamp: u64,
    difficulty_bits: u32,
    nonce: u64,
    valid: bool,
}

impl From<&Block> for BlockOut {
    fn from(block: &Block) -> Self {
        Self {
            hash: hex::encode(block.hash),
            prev_hash: hex::encode(&block.prev_hash),
            payload: String::from_utf8_lossy(&block.payload).into_owned(),
            timestamp: block.timestamp,
            difficulty_bits: block.difficulty_bits,
            nonce: block.nonce,
            valid: block.verify(),
        }
    }
}

struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn chain_tip(State(state): State<AppState>) -> Json<TipOut> {
    Json(TipOut {
        tip: hex::encode(state.store.tip()),
    })
}

async fn list_blocks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<BlockOut>>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(constants::DEFAULT_BLOCKS_PER_REQUEST)
        .min(constants::MAX_BLOCKS_PER_REQUEST);
    let mut out = Vec::new();
    for block in state.store.iter().take(limit as usize) {
        out.push(BlockOut::from(&block?));
    }
    Ok(Json(out))
}

async fn get_block(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<BlockOut>, ApiError> {
    let decoded = hex::decode(&hash)
        .ok()
        .and_then(|bytes| hash_from_slice(&bytes))
        .ok_or_else(|| ApiError(StoreError::NotFound(hash.clone())))?;
    let block = state.store.get(&decoded)?;
    Ok(Json(BlockOut::from(&block)))
}

async fn submit_block(
    State(state): State<AppState>,
    Json(body): Json<SubmitIn>,
) -> Result<Json<BlockOut>, ApiError> {
    // Mining is CPU-bound and can take a while; keep it off the runtime.
    let store = state.store.clone();
    let block = tokio::task::spawn_blocking(move || store.append(body.payload.into_bytes()))
        .await
        .expect("mining task panicked")?;
    Ok(Json(BlockOut::from(&block)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let store = Arc::new(ChainStore::open(&args.data_dir)?);
    let state = AppState { store };

    let app = Router::new()
        .route("/health", get(health))
        .route("/chain/tip", get(chain_tip))
        .route("/chain/blocks", get(list_blocks).post(submit_block))
        .route("/chain/blocks/{hash}", get(get_block))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!("blockvault-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
