use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use shared::{encode_frame, Action};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod app_state;
mod config;
mod status;

use app_state::AppState;
use config::load_settings;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Deserialize)]
struct FatalRequest {
    message: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .init();

    let state = Arc::new(AppState::new(EVENT_CAPACITY));
    tokio::spawn(run_publisher(Arc::clone(&state), settings.update_interval()));
    let app = build_router(state);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/socket", get(ws_handler))
        .route("/status/fatal", post(raise_fatal).delete(clear_fatal))
        .with_state(state)
}

/// Advances the simulated upstream every period and pushes what changed.
async fn run_publisher(state: Arc<AppState>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        let scheduled = ticker.tick().await;
        let lag = scheduled.elapsed();
        {
            let mut status = state.status.lock().await;
            status.set_latency(lag.as_millis() as f64);
            status.advance(Utc::now().timestamp_millis() as f64);
        }
        let published = state.publish_updates().await;
        debug!(published, "published status updates");
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn raise_fatal(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FatalRequest>,
) -> StatusCode {
    warn!(message = %req.message, "fatal error raised");
    state.status.lock().await.raise_fatal(req.message);
    state.publish_updates().await;
    StatusCode::NO_CONTENT
}

async fn clear_fatal(State(state): State<Arc<AppState>>) -> StatusCode {
    info!("fatal error cleared");
    state.status.lock().await.clear_fatal();
    state.publish_updates().await;
    StatusCode::NO_CONTENT
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    let client_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    let (snapshot, mut events_rx) = {
        let status = state.status.lock().await;
        (status.snapshot(), state.events.subscribe())
    };
    let clients = {
        let mut clients = state.clients.lock().await;
        clients.insert(client_id);
        clients.len()
    };
    info!(%client_id, clients, "dashboard socket opened");

    let task_state = Arc::clone(&state);
    let send_task = tokio::spawn(async move {
        if send_actions(&mut sender, &snapshot).await.is_err() {
            return;
        }
        loop {
            match events_rx.recv().await {
                Ok(action) => {
                    if send_actions(&mut sender, std::slice::from_ref(&action))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%client_id, skipped, "dashboard socket lagged; resending snapshot");
                    let snapshot = task_state.status.lock().await.snapshot();
                    if send_actions(&mut sender, &snapshot).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // inbound frames carry nothing; read until the dashboard goes away
    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
    let clients = {
        let mut clients = state.clients.lock().await;
        clients.remove(&client_id);
        clients.len()
    };
    info!(%client_id, clients, "dashboard socket closed");
}

async fn send_actions(
    sender: &mut SplitSink<WebSocket, Message>,
    actions: &[Action],
) -> Result<(), axum::Error> {
    for action in actions {
        let text = match encode_frame(action) {
            Ok(text) => text,
            Err(err) => {
                warn!(kind = action.kind(), error = %err, "failed to encode action");
                continue;
            }
        };
        sender.send(Message::Text(text)).await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
