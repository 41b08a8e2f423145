use crate::Database;
use crate::models::{ChatMessageRow, NotificationRow, UserRow};
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use playmaker_types::models::NotificationKind;

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, profile_photo: Option<&str>) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, profile_photo) VALUES (?1, ?2)",
                rusqlite::params![username, profile_photo],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    pub fn get_username(&self, id: i64) -> Result<String> {
        self.with_conn(|conn| {
            conn.query_row("SELECT username FROM users WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .map_err(|_| anyhow!("User not found: {}", id))
        })
    }

    // -- Chat messages --

    /// Insert a chat row and read it back with its assigned id and timestamp.
    pub fn insert_chat_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        thread_name: &str,
        body: Option<&str>,
    ) -> Result<ChatMessageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (sender_id, receiver_id, thread_name, body)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![sender_id, receiver_id, thread_name, body],
            )?;
            let id = conn.last_insert_rowid();
            query_chat_message(conn, id)?.ok_or_else(|| anyhow!("Chat row {} vanished", id))
        })
    }

    pub fn thread_has_messages(&self, thread_name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM chat_messages WHERE thread_name = ?1",
                [thread_name],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn count_thread_messages(&self, thread_name: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM chat_messages WHERE thread_name = ?1",
                [thread_name],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// One page of a thread, chronological within the page.
    pub fn get_thread_messages(
        &self,
        thread_name: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<ChatMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, thread_name, body, read, created_at
                 FROM chat_messages
                 WHERE thread_name = ?1
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?2 OFFSET ?3",
            )?;

            let rows = stmt
                .query_map(
                    rusqlite::params![thread_name, limit as i64, offset as i64],
                    map_chat_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Distinct users the given user has exchanged messages with.
    pub fn chat_partners(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT u.id, u.username, u.profile_photo, u.created_at
                 FROM users u
                 JOIN chat_messages m
                   ON (m.sender_id = u.id AND m.receiver_id = ?1)
                   OR (m.receiver_id = u.id AND m.sender_id = ?1)
                 ORDER BY u.username ASC",
            )?;

            let rows = stmt
                .query_map([user_id], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Notifications --

    pub fn create_notification(
        &self,
        sender_id: Option<i64>,
        receiver_id: i64,
        kind: NotificationKind,
        text: &str,
        link: Option<&str>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (sender_id, receiver_id, kind, text, link)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![sender_id, receiver_id, kind.as_str(), text, link],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// All notifications for a receiver, newest first.
    pub fn list_notifications(&self, receiver_id: i64) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, kind, text, link, seen, created_at
                 FROM notifications
                 WHERE receiver_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;

            let rows = stmt
                .query_map([receiver_id], map_notification_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Unseen badge count shown after login.
    pub fn count_unseen_notifications(&self, receiver_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE receiver_id = ?1 AND seen = 0",
                [receiver_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Flip `seen` on one notification. Receiver-scoped; returns false when
    /// the row does not exist or belongs to someone else.
    pub fn mark_notification_seen(&self, id: i64, receiver_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE notifications SET seen = 1 WHERE id = ?1 AND receiver_id = ?2",
                rusqlite::params![id, receiver_id],
            )?;
            Ok(updated > 0)
        })
    }

    /// Flip `seen` on every notification for one receiver. Returns the number
    /// of rows touched.
    pub fn mark_all_notifications_seen(&self, receiver_id: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE notifications SET seen = 1 WHERE receiver_id = ?1",
                [receiver_id],
            )?;
            Ok(updated)
        })
    }

    pub fn delete_notification(&self, id: i64, receiver_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND receiver_id = ?2",
                rusqlite::params![id, receiver_id],
            )?;
            Ok(deleted > 0)
        })
    }
}

fn query_user(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, profile_photo, created_at FROM users WHERE id = ?1")?;

    let row = stmt.query_row([id], map_user_row).optional()?;

    Ok(row)
}

fn query_chat_message(conn: &Connection, id: i64) -> Result<Option<ChatMessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, sender_id, receiver_id, thread_name, body, read, created_at
         FROM chat_messages WHERE id = ?1",
    )?;

    let row = stmt.query_row([id], map_chat_row).optional()?;

    Ok(row)
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        profile_photo: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_chat_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessageRow> {
    Ok(ChatMessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        thread_name: row.get(3)?,
        body: row.get(4)?,
        read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_notification_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        kind: row.get(3)?,
        text: row.get(4)?,
        link: row.get(5)?,
        seen: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playmaker_types::groups::thread_key;

    fn db_with_users(names: &[&str]) -> (Database, Vec<i64>) {
        let db = Database::open_in_memory().unwrap();
        let ids = names
            .iter()
            .map(|name| db.create_user(name, None).unwrap())
            .collect();
        (db, ids)
    }

    #[test]
    fn chat_rows_share_thread_regardless_of_direction() {
        let (db, ids) = db_with_users(&["alice", "bob"]);
        let (a, b) = (ids[0], ids[1]);

        let thread = thread_key(a, b);
        let m1 = db.insert_chat_message(a, b, &thread, Some("hi")).unwrap();
        let m2 = db
            .insert_chat_message(b, a, &thread_key(b, a), Some("hey"))
            .unwrap();

        assert_eq!(m1.thread_name, m2.thread_name);
        assert_eq!(db.count_thread_messages(&thread).unwrap(), 2);
        assert!(!m1.read);
    }

    #[test]
    fn thread_pagination_is_chronological() {
        let (db, ids) = db_with_users(&["alice", "bob"]);
        let thread = thread_key(ids[0], ids[1]);

        for i in 0..5 {
            db.insert_chat_message(ids[0], ids[1], &thread, Some(&format!("m{}", i)))
                .unwrap();
        }

        let page = db.get_thread_messages(&thread, 3, 0).unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].body.as_deref(), Some("m0"));
        assert_eq!(page[2].body.as_deref(), Some("m2"));

        let rest = db.get_thread_messages(&thread, 3, 3).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[1].body.as_deref(), Some("m4"));
    }

    #[test]
    fn chat_partners_are_distinct_both_directions() {
        let (db, ids) = db_with_users(&["alice", "bob", "carol", "dave"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        db.insert_chat_message(a, b, &thread_key(a, b), Some("x"))
            .unwrap();
        db.insert_chat_message(a, b, &thread_key(a, b), Some("y"))
            .unwrap();
        db.insert_chat_message(c, a, &thread_key(a, c), Some("z"))
            .unwrap();

        let partners = db.chat_partners(a).unwrap();
        let names: Vec<_> = partners.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["bob", "carol"]);
    }

    #[test]
    fn fan_out_creates_one_unseen_row_per_receiver() {
        let (db, ids) = db_with_users(&["academy", "p1", "p2", "p3"]);
        let sender = ids[0];

        for &receiver in &ids[1..] {
            db.create_notification(
                Some(sender),
                receiver,
                NotificationKind::NewPost,
                "academy added a new post",
                Some("/view_post_details/1"),
            )
            .unwrap();
        }

        for &receiver in &ids[1..] {
            let rows = db.list_notifications(receiver).unwrap();
            assert_eq!(rows.len(), 1);
            assert!(!rows[0].seen);
            assert_eq!(rows[0].kind, "new_post");
        }
    }

    #[test]
    fn mark_one_seen_leaves_others_untouched() {
        let (db, ids) = db_with_users(&["s", "r"]);
        let n1 = db
            .create_notification(Some(ids[0]), ids[1], NotificationKind::Follow, "f", None)
            .unwrap();
        let n2 = db
            .create_notification(Some(ids[0]), ids[1], NotificationKind::NewPost, "p", None)
            .unwrap();

        assert!(db.mark_notification_seen(n1, ids[1]).unwrap());

        let rows = db.list_notifications(ids[1]).unwrap();
        let seen: Vec<_> = rows.iter().map(|r| (r.id, r.seen)).collect();
        assert!(seen.contains(&(n1, true)));
        assert!(seen.contains(&(n2, false)));
    }

    #[test]
    fn mark_all_seen_is_receiver_scoped() {
        let (db, ids) = db_with_users(&["s", "r1", "r2"]);
        for &r in &[ids[1], ids[2]] {
            db.create_notification(Some(ids[0]), r, NotificationKind::Follow, "f", None)
                .unwrap();
            db.create_notification(Some(ids[0]), r, NotificationKind::NewTrial, "t", None)
                .unwrap();
        }

        assert_eq!(db.mark_all_notifications_seen(ids[1]).unwrap(), 2);

        assert!(db.list_notifications(ids[1]).unwrap().iter().all(|r| r.seen));
        assert!(db.list_notifications(ids[2]).unwrap().iter().all(|r| !r.seen));
    }

    #[test]
    fn mark_seen_rejects_foreign_receiver() {
        let (db, ids) = db_with_users(&["s", "r1", "r2"]);
        let n = db
            .create_notification(Some(ids[0]), ids[1], NotificationKind::Follow, "f", None)
            .unwrap();

        assert!(!db.mark_notification_seen(n, ids[2]).unwrap());
        assert!(!db.list_notifications(ids[1]).unwrap()[0].seen);
    }

    #[test]
    fn delete_is_receiver_scoped() {
        let (db, ids) = db_with_users(&["s", "r1", "r2"]);
        let n = db
            .create_notification(Some(ids[0]), ids[1], NotificationKind::Follow, "f", None)
            .unwrap();

        assert!(!db.delete_notification(n, ids[2]).unwrap());
        assert!(db.delete_notification(n, ids[1]).unwrap());
        assert!(db.list_notifications(ids[1]).unwrap().is_empty());
    }

    #[test]
    fn notifications_listed_newest_first() {
        let (db, ids) = db_with_users(&["s", "r"]);
        let first = db
            .create_notification(Some(ids[0]), ids[1], NotificationKind::Follow, "first", None)
            .unwrap();
        let second = db
            .create_notification(Some(ids[0]), ids[1], NotificationKind::NewPost, "second", None)
            .unwrap();

        let rows = db.list_notifications(ids[1]).unwrap();
        assert_eq!(rows[0].id, second);
        assert_eq!(rows[1].id, first);
    }
}
