use std::{future::Future, net::SocketAddr};

use {
    axum::{Json, Router, extract::State, response::IntoResponse, routing::get},
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::info,
};

use chorus_supervisor::ChannelSupervisor;

use crate::bots_routes::bots_router;

// ── Shared app state ─────────────────────────────────────────────────────────

/// Values applied when a start request omits them.
#[derive(Debug, Clone, Copy)]
pub struct StartDefaults {
    pub messages_per_minute: u32,
    pub sender_count: u32,
}

#[derive(Clone)]
pub struct AppState {
    pub supervisor: ChannelSupervisor,
    pub defaults: StartDefaults,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/bots", bots_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve `app` on `addr` until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "control surface listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "channels": state.supervisor.len(),
    }))
}
