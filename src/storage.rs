use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use directories::ProjectDirs;
use log::warn;
use rusqlite::{params, Connection};

use crate::api::models::Notification;

fn db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("org", "crumbshare", "CrumbShare")?;
    Some(proj.data_dir().join("cache.sqlite"))
}

fn ensure_dir(path: &PathBuf) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn open_default() -> rusqlite::Result<Connection> {
    let path = db_path().ok_or_else(|| rusqlite::Error::InvalidPath("no data dir".into()))?;
    let _ = ensure_dir(&path);
    Connection::open(path)
}

// Read flags are kept per account so a shared machine never leaks read
// state between logins. The notification cache lets the UI render the last
// successful fetch before the first poll completes.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS read_flags (
            account_id TEXT NOT NULL,
            notification_id TEXT NOT NULL,
            marked_at INTEGER NOT NULL,
            PRIMARY KEY (account_id, notification_id)
        );
        CREATE TABLE IF NOT EXISTS notification_cache (
            account_id TEXT NOT NULL,
            notification_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            fetched_at INTEGER NOT NULL,
            PRIMARY KEY (account_id, notification_id)
        );
        "#,
    )
}

pub fn init() -> rusqlite::Result<()> {
    let conn = open_default()?;
    init_schema(&conn)
}

/// Record that this account has seen a notification. Set semantics:
/// marking an already-marked id changes nothing.
pub fn mark_read(conn: &Connection, account_id: &str, notification_id: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO read_flags (account_id, notification_id, marked_at)
         VALUES (?1, ?2, ?3)",
        params![account_id, notification_id, Utc::now().timestamp()],
    )?;
    Ok(())
}

/// Ids this account has already acknowledged. Missing or unreadable data
/// degrades to an empty set, never an error.
pub fn load_read_ids(conn: &Connection, account_id: &str) -> HashSet<String> {
    match try_load_read_ids(conn, account_id) {
        Ok(ids) => ids,
        Err(e) => {
            warn!("read store unavailable, treating as empty: {e}");
            HashSet::new()
        }
    }
}

fn try_load_read_ids(conn: &Connection, account_id: &str) -> rusqlite::Result<HashSet<String>> {
    let mut stmt =
        conn.prepare("SELECT notification_id FROM read_flags WHERE account_id = ?1")?;
    let rows = stmt.query_map(params![account_id], |row| row.get::<_, String>(0))?;
    let mut ids = HashSet::new();
    for r in rows {
        ids.insert(r?);
    }
    Ok(ids)
}

/// Replace the stored id set for one account. Saving the same set twice is
/// harmless.
pub fn save_read_ids(
    conn: &mut Connection,
    account_id: &str,
    ids: &HashSet<String>,
) -> rusqlite::Result<()> {
    let now = Utc::now().timestamp();
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM read_flags WHERE account_id = ?1", params![account_id])?;
    for id in ids {
        tx.execute(
            "INSERT OR IGNORE INTO read_flags (account_id, notification_id, marked_at)
             VALUES (?1, ?2, ?3)",
            params![account_id, id, now],
        )?;
    }
    tx.commit()
}

/// Mirror the latest successful fetch so the next launch can render
/// something immediately.
pub fn cache_notifications(
    conn: &mut Connection,
    account_id: &str,
    notifications: &[Notification],
) -> rusqlite::Result<()> {
    let now = Utc::now().timestamp();
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM notification_cache WHERE account_id = ?1",
        params![account_id],
    )?;
    for n in notifications {
        let payload = match serde_json::to_string(n) {
            Ok(p) => p,
            Err(e) => {
                warn!("skipping uncacheable notification {}: {e}", n.id);
                continue;
            }
        };
        tx.execute(
            "INSERT OR REPLACE INTO notification_cache
             (account_id, notification_id, payload, fetched_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![account_id, n.id, payload, now],
        )?;
    }
    tx.commit()
}

/// The cached copy of the last fetch. Rows that no longer parse are
/// dropped silently; a damaged cache is just an empty one.
pub fn cached_notifications(conn: &Connection, account_id: &str) -> Vec<Notification> {
    let mut stmt = match conn
        .prepare("SELECT payload FROM notification_cache WHERE account_id = ?1")
    {
        Ok(s) => s,
        Err(e) => {
            warn!("notification cache unavailable: {e}");
            return Vec::new();
        }
    };
    let rows = match stmt.query_map(params![account_id], |row| row.get::<_, String>(0)) {
        Ok(r) => r,
        Err(e) => {
            warn!("notification cache unreadable: {e}");
            return Vec::new();
        }
    };
    rows.filter_map(|r| r.ok())
        .filter_map(|payload| serde_json::from_str(&payload).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::NotificationCategory;
    use chrono::TimeZone;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        init_schema(&conn).expect("schema");
        conn
    }

    fn alert(id: &str) -> Notification {
        Notification {
            id: id.to_string(),
            category: NotificationCategory::ProductAlert,
            message: format!("alert {id}"),
            sender_name: None,
            avatar_path: None,
            entity_id: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            read: false,
        }
    }

    #[test]
    fn mark_read_is_idempotent() {
        let conn = test_conn();
        mark_read(&conn, "acct", "42").expect("first mark");
        mark_read(&conn, "acct", "42").expect("second mark");
        let ids = load_read_ids(&conn, "acct");
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("42"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut conn = test_conn();
        let ids: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        save_read_ids(&mut conn, "acct", &ids).expect("save");
        save_read_ids(&mut conn, "acct", &ids).expect("repeat save");
        assert_eq!(load_read_ids(&conn, "acct"), ids);
    }

    #[test]
    fn read_ids_are_scoped_per_account() {
        let conn = test_conn();
        mark_read(&conn, "bakery-1", "42").expect("mark");
        assert!(load_read_ids(&conn, "charity-2").is_empty());
        assert!(load_read_ids(&conn, "bakery-1").contains("42"));
    }

    #[test]
    fn load_without_schema_degrades_to_empty() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        assert!(load_read_ids(&conn, "acct").is_empty());
    }

    #[test]
    fn notification_cache_round_trips_and_replaces() {
        let mut conn = test_conn();
        cache_notifications(&mut conn, "acct", &[alert("1"), alert("2")]).expect("cache");
        assert_eq!(cached_notifications(&conn, "acct").len(), 2);

        // A later fetch fully replaces the earlier snapshot.
        cache_notifications(&mut conn, "acct", &[alert("3")]).expect("recache");
        let cached = cached_notifications(&conn, "acct");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, "3");
    }

    #[test]
    fn malformed_cache_rows_are_dropped() {
        let mut conn = test_conn();
        cache_notifications(&mut conn, "acct", &[alert("1")]).expect("cache");
        conn.execute(
            "INSERT INTO notification_cache (account_id, notification_id, payload, fetched_at)
             VALUES ('acct', 'bad', 'not json', 0)",
            [],
        )
        .expect("inject");
        let cached = cached_notifications(&conn, "acct");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, "1");
    }
}
