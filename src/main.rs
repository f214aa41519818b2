use planner_server::{api, persist, settings::Settings, sync};

use api::AppState;
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = Settings::load();

    // ── Boot the planner ───────────────────────────────────────
    let save_file = persist::SaveFile::open(&settings.database_path)
        .expect("Failed to open save file");

    let planner = save_file.load_planner()
        .expect("Failed to load planner from save file");

    tracing::info!(
        weeks = planner.weeks.len(),
        revision = planner.revision,
        "planner loaded"
    );

    // ── Broadcast channel for the sync feed ────────────────────
    let (events_tx, _) = broadcast::channel::<String>(256);

    // ── Shared state ───────────────────────────────────────────
    let state: api::SharedState = Arc::new(AppState {
        planner: RwLock::new(planner),
        save_file,
        events_tx,
    });

    // ── Router ─────────────────────────────────────────────────
    let app = Router::new()
        .route("/api/weeks", get(api::list_weeks).post(api::create_week))
        .route("/api/weeks/:id", get(api::get_week).delete(api::delete_week))
        .route("/api/weeks/:id/tasks", post(api::add_task))
        .route(
            "/api/weeks/:id/tasks/:index",
            put(api::update_task).delete(api::delete_task),
        )
        .route("/api/weeks/:id/tasks/:index/status", patch(api::set_task_status))
        .route("/api/weeks/:id/resources", post(api::add_resource))
        .route("/api/weeks/:id/resources/:rid", delete(api::delete_resource))
        // Change feed (JSON over WebSocket)
        .route("/api/sync", get(sync::ws_handler))
        // Static files (built frontend)
        .fallback_service(
            ServeDir::new(&settings.static_dir).append_index_html_on_directories(true),
        )
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // ── Start ──────────────────────────────────────────────────
    let addr: SocketAddr = format!("{}:{}", settings.bind_address, settings.port)
        .parse()
        .expect("Invalid bind address");

    tracing::info!("server running on http://{addr}");
    tracing::info!("  Weeks API: http://{addr}/api/weeks");
    tracing::info!("  Sync WS:   ws://{addr}/api/sync");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
