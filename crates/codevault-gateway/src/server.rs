//! HTTP server: router, shared state, startup

use crate::api;
use crate::auth::AdminAuth;
use axum::{
    http::HeaderValue,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use codevault_core::{LevelCatalog, ServerConfig};
use codevault_engine::{GameRuntime, JsonFileStore, MemoryStore, TeamStore};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct AppState {
    pub runtime: Arc<GameRuntime>,
    pub admin: AdminAuth,
    pub started_at: std::time::Instant,
}

impl AppState {
    pub fn new(runtime: Arc<GameRuntime>, admin: AdminAuth) -> Self {
        Self {
            runtime,
            admin,
            started_at: std::time::Instant::now(),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return cors.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Every route the game client and admin console use.
pub fn router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/api/login", post(api::login))
        .route("/api/game-status", get(api::game_status))
        .route("/api/game-data/:team_id", get(api::game_data))
        .route("/api/submit-code", post(api::submit_code))
        .route("/api/submit-terminal", post(api::submit_terminal))
        .route("/api/skip-terminal", post(api::skip_terminal))
        .route("/api/report-violation", post(api::report_violation))
        .route("/api/leaderboard", get(api::leaderboard))
        .route("/api/admin/start-game", post(api::start_game))
        .route("/api/admin/end-game", post(api::end_game))
        .route("/api/admin/open-event", post(api::open_event))
        .route("/api/admin/reset-game", post(api::reset_game))
        .route("/api/admin/reset-team", post(api::reset_team))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Open the team store the configuration points at.
pub async fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn TeamStore>> {
    let store: Arc<dyn TeamStore> = match &config.data.teams_path {
        Some(path) => Arc::new(JsonFileStore::open(path).await?),
        None => {
            warn!("No team file configured; teams are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let catalog = LevelCatalog::load_or_builtin(config.data.catalog_path.as_deref())?;
    let store = open_store(&config).await?;
    let runtime = Arc::new(GameRuntime::load(catalog, config.policy.clone(), store).await?);
    let state = Arc::new(AppState::new(
        runtime.clone(),
        AdminAuth::from_config(&config.admin),
    ));
    let app = router(state, &config.cors_origins);

    let bind_addr: SocketAddr = format!("{}:{}", config.bind.to_addr(), config.port).parse()?;

    info!("Code Vault v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  Teams:   {}", runtime.team_count());
    info!("  Levels:  {}", runtime.catalog().len());
    match &config.data.teams_path {
        Some(path) => info!("  Store:   {}", path.display()),
        None => info!("  Store:   memory"),
    }
    if config.cors_origins.is_empty() {
        info!("  CORS:    any origin");
    } else {
        info!("  CORS:    {}", config.cors_origins.join(", "));
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "message": "Code Vault API is running. Use /health to validate.",
    }))
}

async fn health_handler(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse {
    let flags = state.runtime.flags().await;
    Json(json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
        "teams": state.runtime.team_count(),
        "started": flags.started,
        "eventActive": flags.event_active,
        "uptimeSecs": state.started_at.elapsed().as_secs(),
    }))
}
