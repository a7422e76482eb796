//! WebSocket handler for real-time metric streaming

use axum::{
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use tokio::sync::{OwnedMutexGuard, mpsc};
use tracing::{debug, info, warn};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};
use crate::metrics;

/// WebSocket upgrade handler
///
/// GET /api/systems/:system_id/metrics
///
/// A system has a single metrics stream; while one subscriber holds it every
/// further upgrade is answered with `409`.
pub async fn metrics_handler(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
    Path(system_id): Path<String>,
) -> ApiResult<Response> {
    let system = state.system(&system_id).await?;

    let metrics_rx = system.metrics().try_lock_owned().map_err(|_| {
        ApiError::Conflict(format!("system {system_id} already has a metrics subscriber"))
    })?;

    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, system_id, metrics_rx)))
}

/// Handle WebSocket connection
async fn handle_websocket(
    socket: WebSocket,
    system_id: String,
    mut metrics_rx: OwnedMutexGuard<mpsc::Receiver<metrics::Message>>,
) {
    info!("metrics subscriber connected to system {system_id}");

    let (mut sender, mut receiver) = socket.split();

    // Forward metrics messages until the client goes away
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = metrics_rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!("failed to encode metrics message: {e}");
                    continue;
                }
            };

            if sender.send(Message::Text(text)).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    // Only used to notice the client closing the connection
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // Wait for either task to finish; aborting the sender releases the stream
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    info!("metrics subscriber disconnected from system {system_id}");
}
