//! Terminal WebSocket handler - streams PTY I/O for a terminal window.
//!
//! The session belongs to the window: the desktop actor creates it on first
//! attach and stops it when the window closes. Disconnecting the socket
//! leaves the shell running so a reconnect replays recent output.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{broadcast, mpsc};

use crate::actors::desktop::DesktopActorMsg;
use crate::actors::terminal::TerminalMsg;
use crate::api::ApiState;

/// WebSocket message types for terminal communication
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminalWsMessage {
    /// Keyboard input from the client
    Input { data: String },
    Output { data: String },
    Resize { rows: u16, cols: u16 },
    Info { window_id: String, is_running: bool },
    Error { message: String },
}

/// WebSocket handler for a terminal window
pub async fn terminal_websocket(
    ws: WebSocketUpgrade,
    Path(window_id): Path<String>,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_terminal_socket(socket, state, window_id))
}

async fn handle_terminal_socket(socket: WebSocket, state: ApiState, window_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let desktop = state.app_state.desktop();
    let terminal = match ractor::call!(desktop, |reply| DesktopActorMsg::GetTerminal {
        window_id: window_id.clone(),
        reply,
    }) {
        Ok(Ok(terminal)) => terminal,
        Ok(Err(e)) => {
            send_terminal_message(
                &tx,
                TerminalWsMessage::Error {
                    message: e.to_string(),
                },
            );
            drop(tx);
            let _ = writer.await;
            return;
        }
        Err(e) => {
            send_terminal_message(
                &tx,
                TerminalWsMessage::Error {
                    message: format!("Desktop unavailable: {e}"),
                },
            );
            drop(tx);
            let _ = writer.await;
            return;
        }
    };

    let mut output_rx =
        match ractor::call!(terminal, |reply| TerminalMsg::SubscribeOutput { reply }) {
            Ok(rx) => rx,
            Err(e) => {
                send_terminal_message(
                    &tx,
                    TerminalWsMessage::Error {
                        message: format!("Failed to subscribe to output: {e}"),
                    },
                );
                drop(tx);
                let _ = writer.await;
                return;
            }
        };

    if let Ok(buffer) = ractor::call!(terminal, |reply| TerminalMsg::GetOutput { reply }) {
        for data in buffer {
            send_terminal_message(&tx, TerminalWsMessage::Output { data });
        }
    }

    if let Ok(info) = ractor::call!(terminal, |reply| TerminalMsg::GetInfo { reply }) {
        send_terminal_message(
            &tx,
            TerminalWsMessage::Info {
                window_id: info.window_id,
                is_running: info.is_running,
            },
        );
    }

    let tx_forward = tx.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            match output_rx.recv().await {
                Ok(data) => {
                    send_terminal_message(&tx_forward, TerminalWsMessage::Output { data });
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<TerminalWsMessage>(&text) {
                Ok(TerminalWsMessage::Input { data }) => {
                    let _ = ractor::call!(terminal, |reply| TerminalMsg::SendInput {
                        input: data,
                        reply,
                    });
                }
                Ok(TerminalWsMessage::Resize { rows, cols }) => {
                    let _ = ractor::call!(terminal, |reply| TerminalMsg::Resize {
                        rows,
                        cols,
                        reply,
                    });
                }
                _ => {
                    send_terminal_message(
                        &tx,
                        TerminalWsMessage::Error {
                            message: "Unknown message type".to_string(),
                        },
                    );
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    tracing::debug!(window_id = %window_id, "Terminal socket closed");
    forward_task.abort();
    writer.abort();
}

fn send_terminal_message(tx: &mpsc::UnboundedSender<Message>, msg: TerminalWsMessage) -> bool {
    match serde_json::to_string(&msg) {
        Ok(text) => tx.send(Message::Text(text.into())).is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize terminal WS message: {}", e);
            false
        }
    }
}

/// HTTP handler for terminal session info
pub async fn get_terminal_info(
    State(state): State<ApiState>,
    Path(window_id): Path<String>,
) -> impl IntoResponse {
    let desktop = state.app_state.desktop();
    let terminal = match ractor::call!(desktop, |reply| DesktopActorMsg::GetTerminal {
        window_id: window_id.clone(),
        reply,
    }) {
        Ok(Ok(terminal)) => terminal,
        Ok(Err(e)) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response();
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response();
        }
    };

    match ractor::call!(terminal, |reply| TerminalMsg::GetInfo { reply }) {
        Ok(info) => (StatusCode::OK, Json(json!({ "success": true, "terminal": info }))).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}
