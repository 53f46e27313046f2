use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use miner::services::{Notice, NoticeLevel, Notifier};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::AppState;

// Notification types that can be sent to users
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotificationType {
    #[serde(rename = "notice")]
    Notice { level: NoticeLevel, message: String },
    #[serde(rename = "countdown")]
    Countdown {
        countdown: String,
        remaining_secs: u32,
        balance: Decimal,
    },
    #[serde(rename = "connection_established")]
    ConnectionEstablished { uid: String, message: String },
}

// Global notification manager, one channel per connected user
pub type NotificationManager = Arc<Mutex<HashMap<String, broadcast::Sender<NotificationType>>>>;

// Create a new notification manager
pub fn create_notification_manager() -> NotificationManager {
    Arc::new(Mutex::new(HashMap::new()))
}

// Routes session notices to one user's websocket
pub struct UserNotifier {
    manager: NotificationManager,
    uid: String,
}

impl UserNotifier {
    pub fn new(manager: NotificationManager, uid: &str) -> Self {
        Self {
            manager,
            uid: uid.to_string(),
        }
    }
}

impl Notifier for UserNotifier {
    fn notify(&self, notice: Notice) {
        send_notification_to_user(
            &self.manager,
            &self.uid,
            NotificationType::Notice {
                level: notice.level,
                message: notice.message,
            },
        );
    }
}

// WebSocket handler
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket_with_auth(socket, state))
}

// Handle socket with authentication via first message
async fn handle_socket_with_auth(socket: WebSocket, state: AppState) {
    tracing::info!("WebSocket connection established, awaiting authentication");

    let (mut sender, mut receiver) = socket.split();

    // Wait for authentication message
    let uid = match receiver.next().await {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<AuthMessage>(&text) {
            Ok(auth_msg) => match state.registry.user_for_token(&auth_msg.session_id) {
                Some(user) => {
                    tracing::info!("User {} authenticated via WebSocket", user.uid);
                    user.uid
                }
                None => {
                    tracing::warn!("Invalid session ID in WebSocket auth");
                    let _ = sender
                        .send(Message::Text(
                            serde_json::to_string(&NotificationType::ConnectionEstablished {
                                uid: String::new(),
                                message: "Authentication failed: invalid session ID".to_string(),
                            })
                            .unwrap_or_default()
                            .into(),
                        ))
                        .await;
                    return;
                }
            },
            Err(e) => {
                tracing::warn!("Failed to parse WebSocket auth message: {}", e);
                let _ = sender
                    .send(Message::Text(
                        "Authentication failed: invalid message format"
                            .to_string()
                            .into(),
                    ))
                    .await;
                return;
            }
        },
        Some(Ok(Message::Close(_))) | None => {
            tracing::info!("WebSocket connection closed before authentication");
            return;
        }
        Some(Err(e)) => {
            tracing::error!("WebSocket error during authentication: {}", e);
            return;
        }
        _ => {
            tracing::warn!("Unexpected message type during WebSocket authentication");
            return;
        }
    };

    handle_authenticated_socket(sender, receiver, uid, state).await;
}

// Authentication message structure
#[derive(Debug, Deserialize)]
struct AuthMessage {
    #[serde(rename = "sessionId")]
    session_id: String,
}

async fn handle_authenticated_socket(
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut receiver: futures_util::stream::SplitStream<WebSocket>,
    uid: String,
    state: AppState,
) {
    let mut rx = subscribe(&state.notification_manager, &uid);

    let connection_msg = NotificationType::ConnectionEstablished {
        uid: uid.clone(),
        message: "Successfully connected to notifications".to_string(),
    };
    if let Ok(msg_text) = serde_json::to_string(&connection_msg) {
        if sender.send(Message::Text(msg_text.into())).await.is_err() {
            tracing::warn!("Failed to send connection message to user {}", uid);
        }
    }

    // Incoming messages are only watched for close
    let incoming_uid = uid.clone();
    let mut incoming_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    tracing::debug!("Ignoring message from user {}: {}", incoming_uid, text);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("WebSocket connection closed by user {}", incoming_uid);
                    break;
                }
                Err(e) => {
                    tracing::error!("WebSocket error for user {}: {}", incoming_uid, e);
                    break;
                }
                _ => {}
            }
        }
    });

    let outgoing_uid = uid.clone();
    let mut outgoing_task = tokio::spawn(async move {
        while let Ok(notification) = rx.recv().await {
            match serde_json::to_string(&notification) {
                Ok(msg_text) => {
                    if sender.send(Message::Text(msg_text.into())).await.is_err() {
                        tracing::warn!("Failed to send notification to user {}", outgoing_uid);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to serialize notification for user {}: {}",
                        outgoing_uid,
                        e
                    );
                }
            }
        }
    });

    let outgoing_done = tokio::select! {
        _ = &mut incoming_task => {
            tracing::info!("Incoming task completed for user {}", uid);
            false
        }
        _ = &mut outgoing_task => {
            tracing::info!("Outgoing task completed for user {}", uid);
            true
        }
    };

    // The receiver must be gone before the channel is released
    incoming_task.abort();
    if !outgoing_done {
        outgoing_task.abort();
        let _ = outgoing_task.await;
    }
    unsubscribe(&state.notification_manager, &uid);

    tracing::info!("WebSocket connection closed for user {}", uid);
}

// Join a user's channel, sharing it with any socket already open for them
pub fn subscribe(
    notification_manager: &NotificationManager,
    uid: &str,
) -> broadcast::Receiver<NotificationType> {
    let mut manager = notification_manager.lock().unwrap();
    manager
        .entry(uid.to_string())
        .or_insert_with(|| broadcast::channel(100).0)
        .subscribe()
}

// Release a user's channel once no socket is listening on it
pub fn unsubscribe(notification_manager: &NotificationManager, uid: &str) {
    let mut manager = notification_manager.lock().unwrap();
    if manager.get(uid).is_some_and(|tx| tx.receiver_count() == 0) {
        manager.remove(uid);
    }
}

pub fn send_notification_to_user(
    notification_manager: &NotificationManager,
    uid: &str,
    notification: NotificationType,
) {
    let manager = notification_manager.lock().unwrap();
    if let Some(tx) = manager.get(uid) {
        if let Err(e) = tx.send(notification) {
            tracing::debug!("Dropped notification for user {}: {}", uid, e);
        }
    }
}
