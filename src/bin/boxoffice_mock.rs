//! Stand-in for the box-office provider, serving canned records by title.

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::info;

type Records = Arc<HashMap<String, Value>>;

#[derive(Debug, Deserialize)]
struct LookupQuery {
    #[serde(default)]
    title: String,
}

async fn lookup(State(records): State<Records>, Query(q): Query<LookupQuery>) -> Response {
    match records.get(&q.title) {
        Some(record) => Json(record.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let port: u16 = std::env::var("BOXOFFICE_MOCK_PORT")
        .unwrap_or_else(|_| "9099".to_string())
        .parse()
        .context("BOXOFFICE_MOCK_PORT")?;
    let path =
        std::env::var("BOXOFFICE_MOCK_DATA").unwrap_or_else(|_| "mock-boxoffice.json".to_string());

    let raw = tokio::fs::read(&path).await.with_context(|| format!("read mock data {path}"))?;
    let records: HashMap<String, Value> =
        serde_json::from_slice(&raw).with_context(|| format!("parse mock data {path}"))?;
    info!(entries = records.len(), path = %path, "loaded mock box office data");

    let app = Router::new()
        .route("/boxoffice", get(lookup))
        .with_state(Arc::new(records))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "mock box office listening");
    axum::serve(listener, app).await?;
    Ok(())
}
