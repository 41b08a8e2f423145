use std::sync::Arc;

use anyhow::anyhow;
use tracing::warn;

use playmaker_db::Database;
use playmaker_db::models::{UserRow, parse_timestamp};
use playmaker_types::events::{ChatPayload, NotificationPush, Outbound};
use playmaker_types::groups::notification_group;
use playmaker_types::models::{NotificationKind, UserPublic};

use crate::registry::GroupRegistry;

/// The one place that writes a durable record and then pushes it to live
/// connections. The durable write always precedes the push attempt; pushes
/// are best-effort and never roll a write back.
#[derive(Clone)]
pub struct Dispatcher {
    db: Arc<Database>,
    registry: GroupRegistry,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown user {0}")]
    UnknownUser(i64),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Dispatcher {
    pub fn new(db: Arc<Database>, registry: GroupRegistry) -> Self {
        Self { db, registry }
    }

    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Chat path: persist the message, push it to the thread group, then
    /// create and push the receiver's `message` notification.
    ///
    /// The notification half is an independent best-effort step: once the
    /// chat row is written and broadcast, a notification failure is logged
    /// and swallowed, never surfaced to the sender.
    pub async fn send_chat_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        thread_name: &str,
        body: &str,
    ) -> Result<ChatPayload, DispatchError> {
        let sender = self
            .fetch_user(sender_id)
            .await?
            .ok_or(DispatchError::UnknownUser(sender_id))?;
        let receiver = self
            .fetch_user(receiver_id)
            .await?
            .ok_or(DispatchError::UnknownUser(receiver_id))?;

        let row = {
            let db = self.db.clone();
            let thread = thread_name.to_string();
            let text = body.to_string();
            run_blocking(move || db.insert_chat_message(sender_id, receiver_id, &thread, Some(&text)))
                .await?
        };

        let payload = ChatPayload {
            id: row.id,
            sender: public_profile(&sender),
            receiver: public_profile(&receiver),
            message: row.body,
            thread_name: row.thread_name,
            date: parse_timestamp(&row.created_at),
        };

        let json = Outbound::Chat(payload.clone()).to_json()?;
        self.registry.broadcast(thread_name, &json).await;

        // Notification half — isolated from the chat path above.
        if let Err(e) = self
            .notify_chat_receiver(&sender, receiver_id, thread_name, body)
            .await
        {
            warn!(
                "Chat notification for user {} failed (message delivered): {:#}",
                receiver_id, e
            );
        }

        Ok(payload)
    }

    async fn notify_chat_receiver(
        &self,
        sender: &UserRow,
        receiver_id: i64,
        thread_name: &str,
        body: &str,
    ) -> anyhow::Result<()> {
        let text = format!("New message from {}", sender.username);
        let link = format!("/chat/{}", thread_name);

        {
            let db = self.db.clone();
            let sender_id = sender.id;
            let text = text.clone();
            let link = link.clone();
            run_blocking(move || {
                db.create_notification(
                    Some(sender_id),
                    receiver_id,
                    NotificationKind::Message,
                    &text,
                    Some(&link),
                )
            })
            .await?;
        }

        let push = NotificationPush {
            kind: NotificationKind::Message,
            sender: sender.username.clone(),
            message: Some(body.to_string()),
            text,
            link: Some(link),
        };
        let json = Outbound::Notification(push).to_json()?;
        self.registry
            .broadcast(&notification_group(receiver_id), &json)
            .await;

        Ok(())
    }

    /// Multi-recipient path: one notification row and one push per receiver,
    /// each iteration isolated from the others. No cross-receiver ordering.
    pub async fn fan_out(
        &self,
        kind: NotificationKind,
        text: &str,
        link: Option<&str>,
        sender_id: i64,
        receiver_ids: &[i64],
    ) -> anyhow::Result<()> {
        let sender_username = {
            let db = self.db.clone();
            run_blocking(move || db.get_username(sender_id)).await?
        };

        for &receiver_id in receiver_ids {
            let created = {
                let db = self.db.clone();
                let text = text.to_string();
                let link = link.map(str::to_string);
                run_blocking(move || {
                    db.create_notification(
                        Some(sender_id),
                        receiver_id,
                        kind,
                        &text,
                        link.as_deref(),
                    )
                })
                .await
            };

            if let Err(e) = created {
                warn!("Fan-out write for user {} failed, skipping: {:#}", receiver_id, e);
                continue;
            }

            let push = NotificationPush {
                kind,
                sender: sender_username.clone(),
                message: None,
                text: text.to_string(),
                link: link.map(str::to_string),
            };
            match Outbound::Notification(push).to_json() {
                Ok(json) => {
                    self.registry
                        .broadcast(&notification_group(receiver_id), &json)
                        .await;
                }
                Err(e) => warn!("Fan-out push for user {} not serialized: {}", receiver_id, e),
            }
        }

        Ok(())
    }

    pub async fn fetch_user(&self, id: i64) -> anyhow::Result<Option<UserRow>> {
        let db = self.db.clone();
        run_blocking(move || db.get_user(id)).await
    }
}

fn public_profile(user: &UserRow) -> UserPublic {
    UserPublic {
        id: user.id,
        username: user.username.clone(),
        profile_photo: user.profile_photo.clone(),
    }
}

/// Run a blocking store operation off the async runtime.
async fn run_blocking<T, F>(f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?
}
