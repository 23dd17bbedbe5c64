//! REST handlers for browsing trees and ingesting messages.
//!
//! Every tree request replays the channel's stored messages through a fresh
//! navigator; nothing is cached between requests.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use portal_channels::{TelegramAdapter, TgMessage};
use portal_core::record::id_string;
use portal_core::{
    IngestRequest, Layer, Snapshot, StoredMessage, TreeNavigator, TreeNode, build_navigator,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::SharedState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn internal(e: impl std::fmt::Display) -> ApiError {
    error!("Request failed: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub tree: TreeNode,
    pub current_layer_id: String,
    pub state: Snapshot,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ingested: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct TelegramIngestQuery {
    #[serde(rename = "selfUserId")]
    pub self_user_id: Option<String>,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn list_sources_handler(State(state): State<SharedState>) -> ApiResult<Vec<String>> {
    state.store.sources().await.map(Json).map_err(internal)
}

pub async fn list_channels_handler(
    State(state): State<SharedState>,
    Path(source): Path<String>,
) -> ApiResult<Vec<String>> {
    state.store.channels(&source).await.map(Json).map_err(internal)
}

async fn build_tree(state: &SharedState, source: &str, channel: &str) -> Result<TreeNavigator, ApiError> {
    let records = state.store.messages(source, channel).await.map_err(internal)?;
    let nav = build_navigator(&records, &state.perspective, state.strategy.build()).map_err(internal)?;
    debug!(source, channel, layers = nav.store().layer_count(), "Built tree");
    Ok(nav)
}

pub async fn tree_handler(
    State(state): State<SharedState>,
    Path((source, channel)): Path<(String, String)>,
) -> ApiResult<TreeNode> {
    let nav = build_tree(&state, &source, &channel).await?;
    Ok(Json(nav.render_tree()))
}

pub async fn layer_handler(
    State(state): State<SharedState>,
    Path((source, channel, layer_id)): Path<(String, String, String)>,
) -> ApiResult<Layer> {
    let nav = build_tree(&state, &source, &channel).await?;
    nav.get_layer(&layer_id).cloned().map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Layer not found".into(),
            }),
        )
    })
}

pub async fn view_handler(
    State(state): State<SharedState>,
    Path((source, channel)): Path<(String, String)>,
) -> ApiResult<ViewResponse> {
    let nav = build_tree(&state, &source, &channel).await?;
    Ok(Json(ViewResponse {
        tree: nav.render_tree(),
        current_layer_id: nav.get_current_layer_id().to_string(),
        state: nav.export_state(),
    }))
}

pub async fn messages_handler(
    State(state): State<SharedState>,
    Path((source, channel)): Path<(String, String)>,
) -> ApiResult<Vec<StoredMessage>> {
    state
        .store
        .messages(&source, &channel)
        .await
        .map(Json)
        .map_err(internal)
}

/// A single object or an array of objects.
fn items(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        single => vec![single],
    }
}

pub async fn ingest_handler(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> ApiResult<IngestResponse> {
    let records: Vec<StoredMessage> = items(body)
        .into_iter()
        .filter_map(|item| serde_json::from_value::<IngestRequest>(item).ok())
        .filter_map(IngestRequest::into_record)
        .collect();

    let ingested = if records.is_empty() {
        0
    } else {
        state.store.insert_batch(records).await.map_err(internal)?
    };
    info!(ingested, "Ingested messages");
    Ok(Json(IngestResponse { ingested }))
}

pub async fn ingest_telegram_handler(
    State(state): State<SharedState>,
    Query(query): Query<TelegramIngestQuery>,
    Json(mut body): Json<Value>,
) -> ApiResult<IngestResponse> {
    let self_user_id = query
        .self_user_id
        .or_else(|| body.get_mut("selfUserId").map(Value::take).and_then(id_string));

    let messages = match body.get_mut("messages").map(Value::take) {
        Some(Value::Array(list)) => list,
        _ => items(body),
    };
    let messages: Vec<TgMessage> = messages
        .into_iter()
        .filter_map(|m| serde_json::from_value(m).ok())
        .collect();

    let adapter = TelegramAdapter::new(state.store.clone(), self_user_id);
    let ingested = adapter.ingest_batch(&messages, None).await.map_err(internal)?;
    info!(ingested, "Ingested Telegram messages");
    Ok(Json(IngestResponse { ingested }))
}
