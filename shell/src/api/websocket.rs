//! Desktop WebSocket - pushes desktop events and accepts UI input.
//!
//! On connect the client gets a full `desktop_state` snapshot, then every
//! [`DesktopEvent`](shared_types::DesktopEvent) as it is committed. Input
//! events (drag, resize, keys, measured surface boxes) are forwarded to the
//! desktop actor; live drag and resize frames are answered to this socket
//! only. Each socket is its own input source, so it can only steer gestures
//! it started.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use ractor::ActorRef;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc};

use crate::actors::desktop::{DesktopActorMsg, InputEvent, InputFeedback};
use crate::api::ApiState;
use crate::wm::InputSource;

static NEXT_SOURCE: AtomicU64 = AtomicU64::new(1);

/// Server -> client messages that are not desktop events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    DesktopState { desktop: shared_types::DesktopState },
    Pong,
    Error { message: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlMessage {
    Ping,
    /// Ask for a fresh snapshot
    Sync,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClientMessage {
    Control(ControlMessage),
    Input(InputEvent),
}

/// WebSocket handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ApiState) {
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
    let source: InputSource = NEXT_SOURCE.fetch_add(1, Ordering::Relaxed);

    // Subscribe before the snapshot so nothing committed in between is lost
    let mut events = match ractor::call!(desktop, |reply| DesktopActorMsg::Subscribe { reply }) {
        Ok(events) => events,
        Err(e) => {
            send_json(
                &tx,
                &WsMessage::Error {
                    message: format!("Desktop unavailable: {e}"),
                },
            );
            drop(tx);
            let _ = writer.await;
            return;
        }
    };
    send_snapshot(&desktop, &tx).await;
    tracing::info!(source, "Desktop WebSocket connected");

    let tx_events = tx.clone();
    let desktop_events = desktop.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if !send_json(&tx_events, &event) {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Desktop WebSocket lagged; resending snapshot");
                    send_snapshot(&desktop_events, &tx_events).await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut interaction = Interaction::default();
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Control(ControlMessage::Ping)) => {
                    send_json(&tx, &WsMessage::Pong);
                }
                Ok(ClientMessage::Control(ControlMessage::Sync)) => {
                    send_snapshot(&desktop, &tx).await;
                }
                Ok(ClientMessage::Input(event)) => {
                    interaction.observe(&event);
                    match ractor::call!(desktop, |reply| DesktopActorMsg::Input {
                        source,
                        event,
                        reply
                    }) {
                        Ok(Some(feedback)) => {
                            interaction.confirm(&feedback);
                            send_json(&tx, &feedback);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "Desktop actor rejected input");
                            break;
                        }
                    }
                }
                Err(e) => {
                    send_json(
                        &tx,
                        &WsMessage::Error {
                            message: format!("Invalid message: {e}"),
                        },
                    );
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // A client that vanishes mid-gesture must not leave a session behind
    for event in interaction.abandon() {
        let _ = ractor::call!(desktop, |reply| DesktopActorMsg::Input {
            source,
            event,
            reply
        });
    }

    tracing::info!(source, "Desktop WebSocket disconnected");
    forward_task.abort();
    writer.abort();
}

/// Gestures this socket has in flight.
#[derive(Debug, Default)]
struct Interaction {
    dragging: bool,
    resizing: bool,
}

impl Interaction {
    fn observe(&mut self, event: &InputEvent) {
        match event {
            InputEvent::DragEnd | InputEvent::DragCancel => self.dragging = false,
            InputEvent::ResizeEnd => self.resizing = false,
            _ => {}
        }
    }

    fn confirm(&mut self, feedback: &InputFeedback) {
        match feedback {
            InputFeedback::DragFrame(_) => self.dragging = true,
            InputFeedback::ResizeFrame(_) => self.resizing = true,
        }
    }

    fn abandon(self) -> Vec<InputEvent> {
        let mut pending = Vec::new();
        if self.dragging {
            pending.push(InputEvent::DragCancel);
        }
        if self.resizing {
            pending.push(InputEvent::ResizeEnd);
        }
        pending
    }
}

async fn send_snapshot(desktop: &ActorRef<DesktopActorMsg>, tx: &mpsc::UnboundedSender<Message>) {
    match ractor::call!(desktop, |reply| DesktopActorMsg::GetDesktopState { reply }) {
        Ok(snapshot) => {
            send_json(tx, &WsMessage::DesktopState { desktop: snapshot });
        }
        Err(e) => {
            send_json(
                tx,
                &WsMessage::Error {
                    message: format!("Failed to read desktop state: {e}"),
                },
            );
        }
    }
}

fn send_json<T: Serialize>(tx: &mpsc::UnboundedSender<Message>, msg: &T) -> bool {
    match serde_json::to_string(msg) {
        Ok(text) => tx.send(Message::Text(text.into())).is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize WS message: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::Key;

    #[test]
    fn test_client_messages_parse() {
        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, ClientMessage::Control(ControlMessage::Ping)));

        let key: ClientMessage =
            serde_json::from_str(r#"{"type":"key_down","key":"super"}"#).unwrap();
        assert!(matches!(
            key,
            ClientMessage::Input(InputEvent::KeyDown { key: Key::Super })
        ));

        let unknown_key: ClientMessage =
            serde_json::from_str(r#"{"type":"key_down","key":"F5"}"#).unwrap();
        assert!(matches!(
            unknown_key,
            ClientMessage::Input(InputEvent::KeyDown { key: Key::Other })
        ));

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn test_abandoned_gestures_are_closed() {
        let mut interaction = Interaction::default();
        interaction.confirm(&InputFeedback::DragFrame(crate::wm::DragFrame {
            window_id: "terminal-1".to_string(),
            x: 0,
            y: 0,
            snap: None,
        }));
        assert_eq!(interaction.abandon(), vec![InputEvent::DragCancel]);

        let mut interaction = Interaction::default();
        interaction.confirm(&InputFeedback::DragFrame(crate::wm::DragFrame {
            window_id: "terminal-1".to_string(),
            x: 0,
            y: 0,
            snap: None,
        }));
        interaction.observe(&InputEvent::DragEnd);
        assert!(interaction.abandon().is_empty());
    }
}
