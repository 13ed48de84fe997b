use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use log::warn;

use crate::api::client::{ApiClient, ApiError};
use crate::api::models::Notification;

/// Fixed refresh period. The web app polled every 1–2 s depending on the
/// view; one shared cadence is enough here.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Reconcile a fetch with the local read store: de-duplicate by id (first
/// occurrence wins), recompute the read flag, and order the result for
/// display — unread first, then most recent (for product alerts: most
/// urgent expiration) first within each group.
pub fn merge_notifications(
    fetched: Vec<Notification>,
    read_ids: &HashSet<String>,
) -> Vec<Notification> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Notification> = Vec::with_capacity(fetched.len());
    for mut n in fetched {
        if !seen.insert(n.id.clone()) {
            continue;
        }
        n.read = n.read || read_ids.contains(&n.id);
        merged.push(n);
    }
    // sort_by is stable, so ties keep fetch order.
    merged.sort_by(|a, b| a.read.cmp(&b.read).then(b.timestamp.cmp(&a.timestamp)));
    merged
}

pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}

/// One full refresh pass: fetch the role-appropriate lists, reconcile with
/// the read store, and refresh the startup cache. A broken local store
/// downgrades to "nothing marked read" rather than failing the refresh.
pub async fn refresh(client: &ApiClient, account_id: &str) -> Result<Vec<Notification>, ApiError> {
    let batch = client.notifications().await?;
    let merged = match crate::storage::open_default() {
        Ok(mut conn) => {
            let read_ids = crate::storage::load_read_ids(&conn, account_id);
            let merged = merge_notifications(batch.flatten(), &read_ids);
            if let Err(e) = crate::storage::cache_notifications(&mut conn, account_id, &merged) {
                warn!("could not cache notifications: {e}");
            }
            merged
        }
        Err(e) => {
            warn!("read store unavailable: {e}");
            merge_notifications(batch.flatten(), &HashSet::new())
        }
    };
    Ok(merged)
}

/// A fixed-period refresh bound to its owner's lifetime: fires once
/// immediately, then every `POLL_INTERVAL` until `cancel()`. Overlapping
/// in-flight refreshes are allowed; completions are idempotent projections
/// of server state plus the read store, so the last one wins.
pub struct Poller {
    source: RefCell<Option<glib::SourceId>>,
}

impl Poller {
    pub fn start<F: Fn() + 'static>(tick: F) -> Self {
        let tick = Rc::new(tick);
        tick();
        let tick_for_timer = tick.clone();
        let source = glib::timeout_add_local(POLL_INTERVAL, move || {
            tick_for_timer();
            glib::ControlFlow::Continue
        });
        Self {
            source: RefCell::new(Some(source)),
        }
    }

    /// Stops future ticks. In-flight fetches finish on the runtime and
    /// their results are discarded by the closed receiver.
    pub fn cancel(&self) {
        if let Some(id) = self.source.borrow_mut().take() {
            id.remove();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::NotificationCategory;
    use chrono::{TimeZone, Utc};

    fn alert(id: &str, day: u32) -> Notification {
        Notification {
            id: id.to_string(),
            category: NotificationCategory::ProductAlert,
            message: format!("alert {id}"),
            sender_name: None,
            avatar_path: None,
            entity_id: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            read: false,
        }
    }

    fn ids(list: &[Notification]) -> Vec<&str> {
        list.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn stored_ids_come_back_read() {
        let read: HashSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();
        let merged = merge_notifications(vec![alert("a", 1), alert("b", 2), alert("c", 3)], &read);
        for n in &merged {
            assert_eq!(n.read, read.contains(&n.id), "wrong flag on {}", n.id);
        }
    }

    #[test]
    fn unread_sorts_before_read_regardless_of_timestamps() {
        let read: HashSet<String> = ["new"].iter().map(|s| s.to_string()).collect();
        // The read notification is the most recent one; it still sinks.
        let merged = merge_notifications(vec![alert("new", 30), alert("old", 1)], &read);
        assert_eq!(ids(&merged), vec!["old", "new"]);
        assert!(!merged[0].read);
        assert!(merged[1].read);
    }

    #[test]
    fn empty_store_sorts_by_descending_expiration() {
        let merged = merge_notifications(
            vec![alert("jan3", 3), alert("jan1", 1), alert("jan2", 2)],
            &HashSet::new(),
        );
        assert_eq!(ids(&merged), vec!["jan3", "jan2", "jan1"]);
        assert!(merged.iter().all(|n| !n.read));
    }

    #[test]
    fn marking_then_refetching_renders_read() {
        let mut read = HashSet::new();
        let before = merge_notifications(vec![alert("42", 5)], &read);
        assert!(!before[0].read);

        // User clicks the alert; the id lands in the store.
        read.insert("42".to_string());
        let after = merge_notifications(vec![alert("42", 5)], &read);
        assert!(after[0].read, "server does not track this flag; the store must");
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let mut dup = alert("a", 1);
        dup.message = "second copy".to_string();
        let merged = merge_notifications(vec![alert("a", 1), dup, alert("b", 2)], &HashSet::new());
        assert_eq!(merged.len(), 2);
        let a = merged.iter().find(|n| n.id == "a").unwrap();
        assert_eq!(a.message, "alert a");
    }

    #[test]
    fn equal_timestamps_keep_fetch_order() {
        let merged = merge_notifications(
            vec![alert("first", 4), alert("second", 4), alert("third", 4)],
            &HashSet::new(),
        );
        assert_eq!(ids(&merged), vec!["first", "second", "third"]);
    }

    #[test]
    fn unread_count_ignores_read() {
        let read: HashSet<String> = ["a"].iter().map(|s| s.to_string()).collect();
        let merged = merge_notifications(vec![alert("a", 1), alert("b", 2)], &read);
        assert_eq!(unread_count(&merged), 1);
        assert_eq!(unread_count(&[]), 0);
    }
}
