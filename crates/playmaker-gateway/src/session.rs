use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use playmaker_types::events::ChatFrame;
use playmaker_types::groups::notification_group;

use crate::dispatcher::{DispatchError, Dispatcher};
use crate::registry::GroupRegistry;

/// Handle one WebSocket connection on a chat thread.
///
/// The connection is registered in the thread's group before the first frame
/// is read, so nothing broadcast after acceptance can be missed. History is
/// not replayed; clients pull it over the HTTP API.
pub async fn handle_chat_socket(socket: WebSocket, dispatcher: Dispatcher, thread_name: String) {
    let conn_id = Uuid::new_v4();
    let registry = dispatcher.registry().clone();
    let rx = registry.add_member(&thread_name, conn_id).await;

    info!("Connection {} open on thread {}", conn_id, thread_name);

    let (sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(forward_pushes(sender, rx));

    let recv_thread = thread_name.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ChatFrame>(&text) {
                    Ok(frame) => {
                        handle_chat_frame(&dispatcher, &recv_thread, frame).await;
                    }
                    Err(e) => {
                        warn!(
                            "Bad chat frame on {}: {} -- raw: {}",
                            recv_thread,
                            e,
                            &text[..text.len().min(200)]
                        );
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Deregistration runs on every exit path, including abnormal ones.
    registry.remove_member(&thread_name, conn_id).await;
    info!("Connection {} closed on thread {}", conn_id, thread_name);
}

/// Handle one WebSocket connection on a user's notification stream.
/// Push-only: client frames are ignored.
pub async fn handle_notification_socket(socket: WebSocket, registry: GroupRegistry, user_id: i64) {
    let conn_id = Uuid::new_v4();
    let group = notification_group(user_id);
    let rx = registry.add_member(&group, conn_id).await;

    info!("Connection {} open on {}", conn_id, group);

    let (sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(forward_pushes(sender, rx));

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    registry.remove_member(&group, conn_id).await;
    info!("Connection {} closed on {}", conn_id, group);
}

/// Forward registry pushes to the client until either side goes away.
/// Fire-and-forget: no delivery acknowledgement is tracked.
async fn forward_pushes(
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<std::sync::Arc<str>>,
) {
    while let Some(payload) = rx.recv().await {
        if sender
            .send(Message::Text(payload.to_string().into()))
            .await
            .is_err()
        {
            break;
        }
    }
}

async fn handle_chat_frame(dispatcher: &Dispatcher, thread_name: &str, frame: ChatFrame) {
    match dispatcher
        .send_chat_message(frame.sender, frame.receiver, thread_name, &frame.message)
        .await
    {
        Ok(_) => {}
        // Unknown sender or receiver: drop the frame without a record and
        // without surfacing anything to the client.
        Err(DispatchError::UnknownUser(id)) => {
            warn!("Dropping chat frame on {}: user {} does not exist", thread_name, id);
        }
        Err(e) => {
            warn!("Chat dispatch failed on {}: {:#}", thread_name, e);
        }
    }
}
