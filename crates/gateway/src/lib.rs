//! HTTP API gateway for the Knowledge Portal.
//!
//! Exposes REST endpoints for browsing the layer tree of any stored channel
//! and for pushing messages into the log.
//!
//! Built on Axum for high performance async HTTP.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use portal_config::AppConfig;
use portal_core::{MessageStore, Perspective, StrategyKind};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub store: Arc<dyn MessageStore>,
    pub perspective: Perspective,
    pub strategy: StrategyKind,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(store: Arc<dyn MessageStore>, perspective: Perspective, strategy: StrategyKind) -> Self {
        Self {
            store,
            perspective,
            strategy,
        }
    }
}

/// CORS policy: any origin when none are configured, else exactly the
/// configured ones. Unparseable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS for the configured origins
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(api::health_handler))
        .route("/api/sources", get(api::list_sources_handler))
        .route("/api/sources/{source}/channels", get(api::list_channels_handler))
        .route(
            "/api/sources/{source}/channels/{channel}/tree",
            get(api::tree_handler),
        )
        .route(
            "/api/sources/{source}/channels/{channel}/layers/{layer_id}",
            get(api::layer_handler),
        )
        .route(
            "/api/sources/{source}/channels/{channel}/view",
            get(api::view_handler),
        )
        .route(
            "/api/sources/{source}/channels/{channel}/messages",
            get(api::messages_handler),
        )
        .route("/api/ingest", post(api::ingest_handler))
        .route("/api/ingest/telegram", post(api::ingest_telegram_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(cors_layer(cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let store = portal_store::open_store(&config.storage).await?;
    let strategy = config.navigation.strategy_kind()?;
    let state = Arc::new(GatewayState::new(
        store,
        config.perspective.to_perspective(),
        strategy,
    ));
    let app = build_router(state, &config.gateway.cors_origins);

    info!(addr = %addr, strategy = ?strategy, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gateway shutting down");
        })
        .await?;
    Ok(())
}
