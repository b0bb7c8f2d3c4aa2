//! Idempotency guard for content events.
//!
//! An event is admitted at most once per session. Admission is a single
//! check-and-insert under the session lock, so two concurrent deliveries of
//! the same event cannot both pass. Events are marked when admitted, not when
//! they finish: a failed event is never retried.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::SessionHandle;

/// Event ids a session has admitted.
///
/// Unbounded unless constructed with a limit, in which case the oldest ids
/// are forgotten first.
#[derive(Debug, Default)]
pub struct ProcessedEvents {
    ids: HashSet<String>,
    order: VecDeque<String>,
    limit: Option<usize>,
}

impl ProcessedEvents {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            limit: limit.filter(|&l| l > 0),
        }
    }

    /// Record `event_id`. Returns false if it was already present.
    pub fn admit(&mut self, event_id: &str) -> bool {
        if !self.ids.insert(event_id.to_string()) {
            return false;
        }
        if let Some(limit) = self.limit {
            self.order.push_back(event_id.to_string());
            while self.order.len() > limit {
                if let Some(oldest) = self.order.pop_front() {
                    self.ids.remove(&oldest);
                }
            }
        }
        true
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.ids.contains(event_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl SessionHandle {
    /// Admit `event_id` for side-effecting work.
    ///
    /// True only for the first caller for this (session, event) pair.
    pub fn try_begin(&self, event_id: &str) -> bool {
        let admitted = self.update(|s| s.processed_events.admit(event_id));
        if !admitted {
            debug!(event = %event_id, "Event already admitted");
        }
        admitted
    }

    /// Whether `event_id` was admitted earlier.
    pub fn has_processed(&self, event_id: &str) -> bool {
        self.read(|s| s.processed_events.contains(event_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::session::{SessionStore, UserId};

    #[test]
    fn admit_is_first_wins() {
        let mut events = ProcessedEvents::new(None);
        assert!(events.admit("1:10"));
        assert!(!events.admit("1:10"));
        assert!(events.admit("1:11"));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn unbounded_history_keeps_everything() {
        let mut events = ProcessedEvents::new(None);
        for i in 0..1000 {
            events.admit(&i.to_string());
        }
        assert_eq!(events.len(), 1000);
        assert!(events.contains("0"));
    }

    #[test]
    fn bounded_history_evicts_oldest() {
        let mut events = ProcessedEvents::new(Some(2));
        events.admit("a");
        events.admit("b");
        events.admit("c");
        assert!(!events.contains("a"));
        assert!(events.contains("b"));
        assert!(events.contains("c"));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn zero_limit_means_unbounded() {
        let mut events = ProcessedEvents::new(Some(0));
        events.admit("a");
        events.admit("b");
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn try_begin_rejects_second_attempt() {
        let store = SessionStore::new();
        let session = store.get_or_create(&UserId::from("u1"));
        assert!(session.try_begin("chat:1"));
        assert!(!session.try_begin("chat:1"));
        assert!(session.has_processed("chat:1"));
    }

    #[test]
    fn same_event_id_for_different_users_is_independent() {
        let store = SessionStore::new();
        let a = store.get_or_create(&UserId::from("a"));
        let b = store.get_or_create(&UserId::from("b"));
        assert!(a.try_begin("evt"));
        assert!(b.try_begin("evt"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicates_admit_exactly_one() {
        let store = SessionStore::new();
        let admitted = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                let admitted = Arc::clone(&admitted);
                tokio::spawn(async move {
                    let session = store.get_or_create(&UserId::from("dup"));
                    if session.try_begin("chat:99") {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
    }
}
