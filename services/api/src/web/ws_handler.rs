//! services/api/src/web/ws_handler.rs
//!
//! Streams an import's status over a WebSocket until the import finishes or
//! the client goes away.

use crate::web::{
    jobs::{JobState, JobStatus},
    protocol::ServerMessage,
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn import_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Path(import_id): Path<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, import_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, import_id: Uuid) {
    info!("Progress feed opened for import {}", import_id);
    let (sender, receiver) = socket.split();
    let updates = app_state.jobs.subscribe(import_id).await;
    stream_status(import_id, updates, sender, receiver).await;
    info!("Progress feed closed for import {}", import_id);
}

/// Pushes a status frame for the current state and every change after it.
///
/// An unknown import gets a single error frame. After the finished frame the
/// feed sends a close frame and returns.
pub(crate) async fn stream_status<S, R>(
    import_id: Uuid,
    updates: Option<watch::Receiver<JobStatus>>,
    mut sender: S,
    mut receiver: R,
) where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let Some(mut updates) = updates else {
        let msg = ServerMessage::Error {
            message: format!("Import {} not found", import_id),
        };
        let _ = send(&mut sender, &msg).await;
        return;
    };

    loop {
        let status: JobStatus = updates.borrow_and_update().clone();
        let finished = status.state == JobState::Finished;
        if send(&mut sender, &ServerMessage::Status { status }).await.is_err() {
            error!("Failed to send status for import {}", import_id);
            return;
        }
        if finished {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = wait_for_close(&mut receiver) => {
                info!("Client left the progress feed for import {}", import_id);
                return;
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
}

async fn send<S>(sender: &mut S, msg: &ServerMessage) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    sender.send(Message::Text(msg.to_json().into())).await
}

/// Resolves once the client closes or drops the socket. Other frames are
/// read and discarded.
async fn wait_for_close<R>(receiver: &mut R)
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Close(_) = msg {
            return;
        }
    }
}
