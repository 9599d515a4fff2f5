//! WebSocket change feed

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};
use trellis_watcher::RunTokenFilter;

use crate::ServerState;

/// Control frames exchanged with clients. Change records themselves go out
/// as serialized `ChangeNotice`s (`"type": "fs"` or `"watchError"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WsMessage {
    /// First frame on every connection
    Hello {
        #[serde(rename = "runToken")]
        run_token: Option<String>,
    },
    /// A new analysis finished; later notices carry this token
    Analyzed {
        #[serde(rename = "runToken")]
        run_token: String,
        entry: String,
        nodes: usize,
        links: usize,
    },
    Ping,
    Pong,
    Error { message: String },
}

type Sender = SplitSink<WebSocket, Message>;

/// Serialize and send one frame. False once the client is gone.
async fn send_json<T: Serialize>(sender: &mut Sender, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(text) => sender.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            warn!("Failed to serialize WebSocket frame: {}", e);
            true
        }
    }
}

/// Handle WebSocket upgrade requests
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    info!("New WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let mut analyses = state.analysis_tx.subscribe();
    let mut subscription = state.propagator.subscribe();
    let mut filter = state
        .propagator
        .run_token()
        .map(RunTokenFilter::new)
        .unwrap_or_default();

    let hello = WsMessage::Hello {
        run_token: filter.observed().map(str::to_string),
    };
    if !send_json(&mut sender, &hello).await {
        warn!("Failed to greet WebSocket client");
        return;
    }

    // Replies to client frames are routed through the send task.
    let (reply_tx, mut reply_rx) = mpsc::channel::<WsMessage>(8);

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let reply = match serde_json::from_str::<WsMessage>(&text) {
                        Ok(WsMessage::Ping) => Some(WsMessage::Pong),
                        Ok(other) => {
                            debug!("Ignoring client message: {:?}", other);
                            None
                        }
                        Err(e) => Some(WsMessage::Error {
                            message: format!("unrecognized message: {}", e),
                        }),
                    };
                    if let Some(reply) = reply {
                        if reply_tx.send(reply).await.is_err() {
                            break;
                        }
                    }
                }
                Message::Close(_) => {
                    debug!("WebSocket client disconnected");
                    break;
                }
                _ => {}
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                notice = subscription.recv() => {
                    let Some(notice) = notice else {
                        warn!("Change feed dropped this client");
                        break;
                    };
                    if !filter.accepts(&notice) {
                        trace!("Dropping notice from run {}", notice.run_token());
                        continue;
                    }
                    if !send_json(&mut sender, &notice).await {
                        break;
                    }
                }
                announced = analyses.recv() => match announced {
                    Ok(msg) => {
                        if let WsMessage::Analyzed { run_token, .. } = &msg {
                            filter.observe(run_token.clone());
                        }
                        if !send_json(&mut sender, &msg).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged behind by {} analyses", n);
                        if let Some(token) = state.propagator.run_token() {
                            filter.observe(token);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => {
                    let Some(reply) = reply else { break };
                    if !send_json(&mut sender, &reply).await {
                        break;
                    }
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    info!("WebSocket connection closed");
}
