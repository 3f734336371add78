//! Live queries. Every write through `records` re-lists the owner's records
//! and publishes the full result here; every open list view for that owner
//! holds a `watch::Receiver` and re-renders on change. Page loads and
//! filter changes read the last published snapshot instead of querying.
//!
//! Snapshots replace each other wholesale, so a receiver that misses an
//! intermediate value (watch channels coalesce) loses nothing.

use super::models::{Habit, JournalEntry, Note};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};
use tokio::sync::watch;

#[derive(Debug)]
pub enum Snapshot<T> {
    /// Nothing has been fetched for this owner yet.
    Pending,
    Records { version: u64, records: Arc<Vec<T>> },
    Failed { version: u64, message: String },
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Pending => Self::Pending,
            Self::Records { version, records } => Self::Records {
                version: *version,
                records: Arc::clone(records),
            },
            Self::Failed { version, message } => Self::Failed {
                version: *version,
                message: message.clone(),
            },
        }
    }
}

impl<T> Snapshot<T> {
    pub fn version(&self) -> u64 {
        match self {
            Self::Pending => 0,
            Self::Records { version, .. } | Self::Failed { version, .. } => {
                *version
            }
        }
    }
    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// One live query per owner for a single record kind.
pub struct Feed<T> {
    name: &'static str,
    senders: Mutex<HashMap<i32, watch::Sender<Snapshot<T>>>>,
    next_version: AtomicU64,
}

impl<T: Send + Sync + 'static> Feed<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            senders: Mutex::new(HashMap::new()),
            next_version: AtomicU64::new(1),
        }
    }

    fn senders(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<i32, watch::Sender<Snapshot<T>>>>
    {
        // A panic while holding this lock cannot leave the map half-written,
        // so a poisoned lock is still usable.
        self.senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start observing `owner_id`'s records. Drop the receiver to
    /// unsubscribe. The current value is `Snapshot::Pending` until somebody
    /// publishes.
    pub fn subscribe(&self, owner_id: i32) -> watch::Receiver<Snapshot<T>> {
        let mut senders = self.senders();
        let sender = senders
            .entry(owner_id)
            .or_insert_with(|| watch::channel(Snapshot::Pending).0);
        tracing::debug!(feed = self.name, owner_id, "subscribed");
        sender.subscribe()
    }

    /// Reserve a version before running the query whose result will be
    /// published under it. Versions only go up, so a slow query that
    /// finishes after a faster, newer one cannot overwrite it.
    pub fn next_version(&self) -> u64 {
        self.next_version.fetch_add(1, Ordering::Relaxed)
    }

    /// Publish the outcome of a list query. Returns whether the snapshot
    /// was accepted (it is dropped if a newer one is already held, or if
    /// nobody is listening).
    pub fn publish(
        &self,
        owner_id: i32,
        version: u64,
        result: Result<Vec<T>, String>,
    ) -> bool {
        let next = match result {
            Ok(records) => Snapshot::Records {
                version,
                records: Arc::new(records),
            },
            Err(message) => Snapshot::Failed { version, message },
        };
        self.offer(owner_id, next)
    }

    /// `publish` for a snapshot the caller has already built.
    pub fn offer(&self, owner_id: i32, next: Snapshot<T>) -> bool {
        let version = next.version();
        let mut senders = self.senders();
        senders.retain(|_, sender| sender.receiver_count() > 0);
        let Some(sender) = senders.get(&owner_id) else {
            return false;
        };
        let accepted = sender.send_if_modified(|current| {
            if current.version() < version {
                *current = next;
                true
            } else {
                false
            }
        });
        tracing::debug!(feed = self.name, owner_id, version, accepted, "publish");
        accepted
    }

    /// The last snapshot published for `owner_id`. It is only kept while
    /// it is current: see `watched`.
    pub fn latest(&self, owner_id: i32) -> Snapshot<T> {
        self.senders()
            .get(&owner_id)
            .map(|sender| sender.borrow().clone())
            .unwrap_or(Snapshot::Pending)
    }

    /// Is anybody subscribed to `owner_id`? If not, the cached snapshot is
    /// dropped, since the write that is asking will make it stale.
    pub fn watched(&self, owner_id: i32) -> bool {
        let mut senders = self.senders();
        match senders.get(&owner_id) {
            Some(sender) if sender.receiver_count() > 0 => true,
            Some(_) => {
                senders.remove(&owner_id);
                false
            }
            None => false,
        }
    }
}

pub struct LiveHub {
    pub habits: Feed<Habit>,
    pub journals: Feed<JournalEntry>,
    pub notes: Feed<Note>,
}

impl Default for LiveHub {
    fn default() -> Self {
        Self {
            habits: Feed::new("habits"),
            journals: Feed::new("journals"),
            notes: Feed::new("notes"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(snapshot: &Snapshot<i32>) -> Vec<i32> {
        match snapshot {
            Snapshot::Records { records, .. } => records.as_ref().clone(),
            other => panic!("expected records, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_subscribers_get_full_snapshots() {
        let feed = Feed::<i32>::new("test");
        let mut rx = feed.subscribe(1);
        assert!(rx.borrow().is_pending());

        let v = feed.next_version();
        assert!(feed.publish(1, v, Ok(vec![1, 2])));
        rx.changed().await.unwrap();
        assert_eq!(records(&rx.borrow_and_update()), vec![1, 2]);

        let v = feed.next_version();
        assert!(feed.publish(1, v, Ok(vec![2])));
        rx.changed().await.unwrap();
        assert_eq!(records(&rx.borrow_and_update()), vec![2]);
    }

    #[test]
    fn test_out_of_order_publish_is_dropped() {
        let feed = Feed::<i32>::new("test");
        let _rx = feed.subscribe(1);
        let older = feed.next_version();
        let newer = feed.next_version();

        assert!(feed.publish(1, newer, Ok(vec![2])));
        assert!(!feed.publish(1, older, Ok(vec![1])));
        assert_eq!(records(&feed.latest(1)), vec![2]);
    }

    #[test]
    fn test_owners_are_isolated() {
        let feed = Feed::<i32>::new("test");
        let rx_a = feed.subscribe(1);
        let rx_b = feed.subscribe(2);
        let v = feed.next_version();
        feed.publish(1, v, Ok(vec![7]));

        assert_eq!(records(&rx_a.borrow()), vec![7]);
        assert!(rx_b.borrow().is_pending());
    }

    #[test]
    fn test_dropping_the_receiver_unsubscribes() {
        let feed = Feed::<i32>::new("test");
        let rx = feed.subscribe(1);
        assert!(feed.watched(1));
        drop(rx);
        assert!(!feed.watched(1));

        let v = feed.next_version();
        assert!(!feed.publish(1, v, Ok(vec![1])));
        assert!(feed.latest(1).is_pending());
    }

    #[test]
    fn test_unwatched_cache_is_dropped_on_write() {
        let feed = Feed::<i32>::new("test");
        let rx = feed.subscribe(1);
        let v = feed.next_version();
        feed.publish(1, v, Ok(vec![1]));
        drop(rx);
        // Still cached for the next page load...
        assert_eq!(records(&feed.latest(1)), vec![1]);
        // ...until a write finds nobody watching.
        assert!(!feed.watched(1));
        assert!(feed.latest(1).is_pending());
    }

    #[test]
    fn test_offer_keeps_the_newest() {
        let feed = Feed::<i32>::new("test");
        let _rx = feed.subscribe(1);
        let older = feed.next_version();
        let newer = feed.next_version();
        assert!(feed.offer(
            1,
            Snapshot::Records {
                version: newer,
                records: Arc::new(vec![2])
            }
        ));
        assert!(!feed.offer(
            1,
            Snapshot::Records {
                version: older,
                records: Arc::new(vec![1])
            }
        ));
        assert_eq!(records(&feed.latest(1)), vec![2]);
    }

    #[test]
    fn test_failures_are_published() {
        let feed = Feed::<i32>::new("test");
        let rx = feed.subscribe(1);
        let v = feed.next_version();
        feed.publish(1, v, Err("boom".into()));
        assert!(matches!(
            &*rx.borrow(),
            Snapshot::Failed { message, .. } if message == "boom"
        ));
    }
}
