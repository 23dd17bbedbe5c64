//! End-to-end integration tests for the Knowledge Portal.
//!
//! These tests exercise the full pipeline from platform payloads to rendered
//! trees: Telegram ingestion, the SQLite message log, tree replay through the
//! HTTP gateway, and snapshot export/import.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use portal_channels::{TelegramAdapter, TgMessage};
use portal_core::{
    MessageStore, Perspective, Snapshot, StrategyKind, TreeNavigator, build_navigator,
};
use portal_gateway::{GatewayState, build_router};
use portal_store::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt;

// ── Fixtures ─────────────────────────────────────────────────────────────

const CHAT: i64 = -100777;
const ME: i64 = 111;
const ALICE: i64 = 222;
const HELPER: i64 = 333;

fn tg(message_id: i64, from: i64, text: &str, reply_to: Option<i64>) -> TgMessage {
    let mut msg = json!({
        "message_id": message_id,
        "date": 1_700_000_000 + message_id,
        "chat": {"id": CHAT},
        "from": {"id": from, "first_name": format!("user{from}")},
        "text": text,
    });
    if let Some(parent) = reply_to {
        msg["reply_to_message"] = json!({"message_id": parent, "chat": {"id": CHAT}});
    }
    serde_json::from_value(msg).unwrap()
}

/// A chat where I ask two questions, Alice answers, a helper bot chimes in,
/// and I open a side thread on Alice's answer before returning to my own.
fn conversation() -> Vec<TgMessage> {
    vec![
        tg(1, ME, "How should we store chats?", None),
        tg(2, ALICE, "Flat table, build trees on read.", Some(1)),
        tg(3, ME, "Why not store the tree?", Some(2)),
        tg(4, ALICE, "Because strategies change.", None),
        tg(5, HELPER, "Reminder: standup in 5.", Some(3)),
        tg(6, ME, "Back to my question.", Some(1)),
    ]
}

async fn seeded_store(dir: &tempfile::TempDir) -> Arc<dyn MessageStore> {
    let path = dir.path().join("portal.db");
    let store: Arc<dyn MessageStore> =
        Arc::new(SqliteStore::new(&path.to_string_lossy()).await.unwrap());
    let adapter = TelegramAdapter::new(store.clone(), Some(ME.to_string()));
    for msg in conversation() {
        adapter.ingest(&msg, None).await.unwrap();
    }
    store
}

fn perspective() -> Perspective {
    Perspective::new(Some(ME.to_string()), vec![HELPER.to_string()])
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_telegram_ingest_to_tree() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let channel = CHAT.to_string();

    let records = store.messages("telegram", &channel).await.unwrap();
    assert_eq!(records.len(), 6);
    assert_eq!(records[0].sender_role, "self");
    assert_eq!(records[2].reply_to_id.as_deref(), Some("tg:-100777:2"));

    let nav = build_navigator(&records, &perspective(), StrategyKind::Default.build()).unwrap();

    // 2 is Alice replying to me: a branch. 3 is me replying to Alice: a
    // deeper branch, which 4 continues. The helper bot's reply never branches.
    let tree = nav.render_tree();
    assert_eq!(tree.id, "A");
    assert_eq!(tree.message_count, 2);
    assert_eq!(tree.children[0].id, "B");
    assert_eq!(tree.children[0].branch_from_message_id.as_deref(), Some("tg:-100777:1"));
    assert_eq!(tree.children[0].children[0].id, "C");
    assert_eq!(nav.get_layer("C").unwrap().messages.len(), 3);

    let helper = nav.get_message_location("tg:-100777:5").unwrap();
    assert_eq!(helper.layer_id, "C");
    let back = nav.get_message_location("tg:-100777:6").unwrap();
    assert_eq!(back.layer_id, "A");
    assert_eq!(nav.get_current_layer_id(), "A");
}

#[tokio::test]
async fn e2e_gateway_serves_ingested_channel() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let state = Arc::new(GatewayState::new(store, perspective(), StrategyKind::Default));

    let (status, sources) = get_json(build_router(state.clone(), &[]), "/api/sources").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sources, json!(["telegram"]));

    let (_, channels) = get_json(
        build_router(state.clone(), &[]),
        "/api/sources/telegram/channels",
    )
    .await;
    assert_eq!(channels, json!(["-100777"]));

    let (status, view) = get_json(
        build_router(state.clone(), &[]),
        "/api/sources/telegram/channels/-100777/view",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["currentLayerId"], "A");
    assert_eq!(view["tree"]["children"][0]["id"], "B");

    // The snapshot embedded in the view restores to the same tree.
    let snapshot: Snapshot = serde_json::from_value(view["state"].clone()).unwrap();
    let restored = TreeNavigator::from_state(snapshot).unwrap();
    assert_eq!(
        serde_json::to_value(restored.render_tree()).unwrap(),
        view["tree"]
    );

    let (status, layer) = get_json(
        build_router(state, &[]),
        "/api/sources/telegram/channels/-100777/layers/C",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(layer["branchFromMessageId"], "tg:-100777:2");
    assert_eq!(layer["messages"][0]["sender"], "self");
    assert_eq!(layer["messages"][1]["sender"], "other");
    assert_eq!(layer["messages"][2]["sender"], "bot");
}

#[tokio::test]
async fn e2e_reingest_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let adapter = TelegramAdapter::new(store.clone(), Some(ME.to_string()));
    assert_eq!(adapter.ingest_batch(&conversation(), None).await.unwrap(), 6);

    let records = store.messages("telegram", &CHAT.to_string()).await.unwrap();
    assert_eq!(records.len(), 6);
}

#[tokio::test]
async fn e2e_strategy_changes_shape_not_data() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let records = store.messages("telegram", &CHAT.to_string()).await.unwrap();

    let flat = build_navigator(&records, &perspective(), StrategyKind::Flat.build()).unwrap();
    assert_eq!(flat.store().layer_count(), 1);
    assert_eq!(flat.render_tree().message_count, 6);

    // Thread strategy branches on every resolvable reply: 2, 3, 5 and 6.
    let thread = build_navigator(&records, &perspective(), StrategyKind::Thread.build()).unwrap();
    assert_eq!(thread.store().layer_count(), 5);
    assert_eq!(thread.store().message_count(), 6);
}
