//! Start, stop, and inspect managed channels.

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::{Path, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{get, post},
    },
    serde::Deserialize,
    tracing::{info, warn},
};

use chorus_supervisor::SupervisorError;

use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
struct StartRequest {
    messages_per_minute: Option<u32>,
    sender_count: Option<u32>,
}

/// Build the `/bots` router.
pub fn bots_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_handler))
        .route("/{channel}", get(status_handler))
        .route("/{channel}/start", post(start_handler))
        .route("/{channel}/stop", post(stop_handler))
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "detail": message.into() })),
    )
        .into_response()
}

fn error_response(err: &SupervisorError) -> Response {
    let status = match err {
        SupervisorError::AlreadyManaged { .. } => StatusCode::CONFLICT,
        SupervisorError::NotFound { .. } => StatusCode::NOT_FOUND,
        SupervisorError::InvalidParameter { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    detail(status, err.to_string())
}

async fn start_handler(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    body: Bytes,
) -> Response {
    // An empty body means "use the defaults".
    let request = if body.is_empty() {
        StartRequest::default()
    } else {
        match serde_json::from_slice::<StartRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                warn!(channel, error = %e, "bad start request");
                return detail(StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
            },
        }
    };
    let messages_per_minute = request
        .messages_per_minute
        .unwrap_or(state.defaults.messages_per_minute);
    let sender_count = request
        .sender_count
        .unwrap_or(state.defaults.sender_count);

    match state
        .supervisor
        .start(&channel, messages_per_minute, sender_count)
    {
        Ok(()) => {
            info!(channel, "start requested");
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({
                    "message": format!("Bot for channel '{channel}' is starting."),
                })),
            )
                .into_response()
        },
        Err(e) => error_response(&e),
    }
}

async fn stop_handler(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    match state.supervisor.stop(&channel).await {
        Ok(()) => Json(serde_json::json!({
            "message": format!("Bot for channel '{channel}' has been stopped."),
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn status_handler(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    match state.supervisor.status(&channel) {
        Ok(status) => Json(status).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn list_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "bots": state.supervisor.list() }))
}
