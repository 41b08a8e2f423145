use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

/// Maps live group keys (`chat_{a}_{b}`, `notif_{user}`) to the connections
/// currently registered under them.
///
/// Cloneable handle over shared state; registrations are ephemeral and a
/// process restart drops them all. Safe for concurrent use from HTTP
/// handlers, background jobs, and connection sessions.
#[derive(Clone)]
pub struct GroupRegistry {
    inner: Arc<RwLock<HashMap<String, HashMap<Uuid, mpsc::UnboundedSender<Arc<str>>>>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a connection under a group key and hand back the receiving
    /// end of its delivery channel. Re-adding the same `(group, conn_id)`
    /// replaces the previous channel.
    pub async fn add_member(&self, group: &str, conn_id: Uuid) -> mpsc::UnboundedReceiver<Arc<str>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut groups = self.inner.write().await;
        groups.entry(group.to_string()).or_default().insert(conn_id, tx);
        debug!("Connection {} joined group {}", conn_id, group);
        rx
    }

    /// Remove one membership. Removing a non-member is a no-op; empty groups
    /// are pruned.
    pub async fn remove_member(&self, group: &str, conn_id: Uuid) {
        let mut groups = self.inner.write().await;
        if let Some(members) = groups.get_mut(group) {
            members.remove(&conn_id);
            if members.is_empty() {
                groups.remove(group);
            }
        }
        debug!("Connection {} left group {}", conn_id, group);
    }

    /// Deliver a pre-serialized payload to every member of the group.
    /// Best-effort: members whose channel is gone are treated as already
    /// closed and dropped from the group.
    pub async fn broadcast(&self, group: &str, payload: &str) {
        let payload: Arc<str> = Arc::from(payload);

        let dead: Vec<Uuid> = {
            let groups = self.inner.read().await;
            let Some(members) = groups.get(group) else {
                return;
            };
            members
                .iter()
                .filter_map(|(&conn_id, tx)| tx.send(payload.clone()).is_err().then_some(conn_id))
                .collect()
        };

        for conn_id in dead {
            self.remove_member(group, conn_id).await;
        }
    }

    pub async fn member_count(&self, group: &str) -> usize {
        self.inner
            .read()
            .await
            .get(group)
            .map_or(0, |members| members.len())
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}
