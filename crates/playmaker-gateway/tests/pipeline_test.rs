//! End-to-end pipeline tests: durable write, then best-effort push to every
//! connection registered for the target group, with offline receivers able to
//! pull their rows later.

use std::sync::Arc;

use uuid::Uuid;

use playmaker_db::Database;
use playmaker_gateway::dispatcher::{DispatchError, Dispatcher};
use playmaker_gateway::registry::GroupRegistry;
use playmaker_types::groups::{notification_group, thread_key};
use playmaker_types::models::NotificationKind;

fn pipeline(usernames: &[&str]) -> (Dispatcher, Arc<Database>, Vec<i64>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let ids = usernames
        .iter()
        .map(|name| db.create_user(name, None).unwrap())
        .collect();
    let dispatcher = Dispatcher::new(db.clone(), GroupRegistry::new());
    (dispatcher, db, ids)
}

#[tokio::test]
async fn chat_send_persists_and_pushes_both_halves() {
    let (dispatcher, db, ids) = pipeline(&["alice", "bob"]);
    let (a, b) = (ids[0], ids[1]);
    let thread = thread_key(a, b);
    assert_eq!(thread, "chat_1_2");

    let registry = dispatcher.registry().clone();
    let mut chat_rx = registry.add_member(&thread, Uuid::new_v4()).await;
    let mut notif_rx = registry
        .add_member(&notification_group(b), Uuid::new_v4())
        .await;

    let payload = dispatcher
        .send_chat_message(a, b, &thread, "hi")
        .await
        .unwrap();
    assert_eq!(payload.sender.id, a);
    assert_eq!(payload.message.as_deref(), Some("hi"));

    // Durable chat row with the canonical thread key.
    let rows = db.get_thread_messages(&thread, 50, 0).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sender_id, a);
    assert_eq!(rows[0].receiver_id, b);
    assert_eq!(rows[0].thread_name, "chat_1_2");
    assert_eq!(rows[0].body.as_deref(), Some("hi"));

    // Durable notification row for the receiver.
    let notifications = db.list_notifications(b).unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, "message");
    assert!(!notifications[0].seen);

    // Live push on the thread group.
    let chat_json = chat_rx.recv().await.unwrap();
    let chat: serde_json::Value = serde_json::from_str(&chat_json).unwrap();
    assert_eq!(chat["sender"]["username"], "alice");
    assert_eq!(chat["message"], "hi");
    assert_eq!(chat["thread_name"], "chat_1_2");

    // Live push on the receiver's notification group.
    let notif_json = notif_rx.recv().await.unwrap();
    let notif: serde_json::Value = serde_json::from_str(&notif_json).unwrap();
    assert_eq!(notif["type"], "message");
    assert_eq!(notif["sender"], "alice");
    assert_eq!(notif["text"], "New message from alice");
    assert_eq!(notif["link"], "/chat/chat_1_2");
}

#[tokio::test]
async fn thread_key_symmetric_across_send_direction() {
    let (dispatcher, db, ids) = pipeline(&["alice", "bob"]);
    let (a, b) = (ids[0], ids[1]);

    dispatcher
        .send_chat_message(a, b, &thread_key(a, b), "one")
        .await
        .unwrap();
    dispatcher
        .send_chat_message(b, a, &thread_key(b, a), "two")
        .await
        .unwrap();

    assert_eq!(db.count_thread_messages("chat_1_2").unwrap(), 2);
}

#[tokio::test]
async fn unknown_identity_drops_without_rows() {
    let (dispatcher, db, ids) = pipeline(&["alice", "bob"]);
    let thread = thread_key(ids[0], ids[1]);

    let err = dispatcher
        .send_chat_message(999, ids[1], &thread, "ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnknownUser(999)));

    let err = dispatcher
        .send_chat_message(ids[0], 999, &thread, "to nobody")
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnknownUser(999)));

    assert_eq!(db.count_thread_messages(&thread).unwrap(), 0);
    assert!(db.list_notifications(ids[1]).unwrap().is_empty());
}

#[tokio::test]
async fn fan_out_creates_a_row_per_receiver_and_pushes_to_connected() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let academy = db.create_user("academy_one", None).unwrap();
    let followers: Vec<i64> = (0..50)
        .map(|i| db.create_user(&format!("player_{}", i), None).unwrap())
        .collect();

    let registry = GroupRegistry::new();
    let dispatcher = Dispatcher::new(db.clone(), registry.clone());

    // Ten followers are online, the rest are not.
    let mut online = Vec::new();
    for &id in &followers[..10] {
        let rx = registry
            .add_member(&notification_group(id), Uuid::new_v4())
            .await;
        online.push((id, rx));
    }

    dispatcher
        .fan_out(
            NotificationKind::NewPost,
            "academy_one added a new post",
            Some("/view_post_details/1"),
            academy,
            &followers,
        )
        .await
        .unwrap();

    // Exactly one row per receiver, all unseen.
    for &id in &followers {
        let rows = db.list_notifications(id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, "new_post");
        assert!(!rows[0].seen);
    }

    // Each connected follower got exactly one push.
    for (_, rx) in online.iter_mut() {
        let json = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "new_post");
        assert_eq!(value["sender"], "academy_one");
        assert!(rx.try_recv().is_err());
    }

    // An offline follower still finds the row on the pull path.
    let offline = followers[49];
    let rows = db.list_notifications(offline).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text.as_deref(), Some("academy_one added a new post"));
}

#[tokio::test]
async fn fan_out_skips_unknown_receivers_and_continues() {
    let (dispatcher, db, ids) = pipeline(&["academy", "p1", "p2"]);

    // Receiver 999 violates the notifications FK; its iteration fails in
    // isolation and the remaining receivers are still processed.
    dispatcher
        .fan_out(
            NotificationKind::NewTrial,
            "academy added a new Trial",
            Some("/trial_details/3"),
            ids[0],
            &[ids[1], 999, ids[2]],
        )
        .await
        .unwrap();

    assert_eq!(db.list_notifications(ids[1]).unwrap().len(), 1);
    assert_eq!(db.list_notifications(ids[2]).unwrap().len(), 1);
}

#[tokio::test]
async fn closed_connection_misses_later_broadcasts() {
    let (dispatcher, _db, ids) = pipeline(&["alice", "bob"]);
    let registry = dispatcher.registry().clone();
    let group = notification_group(ids[1]);

    let conn = Uuid::new_v4();
    let mut rx = registry.add_member(&group, conn).await;

    dispatcher
        .fan_out(NotificationKind::Follow, "alice started following you", None, ids[0], &[ids[1]])
        .await
        .unwrap();
    assert!(rx.recv().await.is_some());

    registry.remove_member(&group, conn).await;
    dispatcher
        .fan_out(NotificationKind::Follow, "again", None, ids[0], &[ids[1]])
        .await
        .unwrap();

    assert!(rx.recv().await.is_none());
}
