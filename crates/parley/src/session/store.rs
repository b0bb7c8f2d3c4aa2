//! Concurrent session store.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::{SessionHandle, UserId, UserSession};

/// All live sessions, keyed by user.
///
/// The sharded map is only held long enough to find or insert a user's
/// handle; mutations lock that user's session alone.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<UserId, SessionHandle>>,
    max_tracked_events: Option<usize>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose sessions remember at most `limit` admitted event ids.
    /// `None` keeps every id for the lifetime of the process.
    pub fn with_event_limit(limit: Option<usize>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            max_tracked_events: limit,
        }
    }

    /// Fetch the user's session, creating a default one on first contact.
    ///
    /// Never replaces an existing session, even when two callers race to
    /// create the same user.
    pub fn get_or_create(&self, user_id: &UserId) -> SessionHandle {
        if let Some(handle) = self.sessions.get(user_id) {
            return handle.value().clone();
        }

        self.sessions
            .entry(user_id.clone())
            .or_insert_with(|| {
                debug!(user = %user_id, "Creating session");
                SessionHandle::new(UserSession::new(user_id.clone(), self.max_tracked_events))
            })
            .value()
            .clone()
    }

    /// Fetch an existing session without creating one.
    pub fn get(&self, user_id: &UserId) -> Option<SessionHandle> {
        self.sessions.get(user_id).map(|h| h.value().clone())
    }

    /// Apply `f` to the user's session atomically, creating it if needed.
    pub fn update<R>(&self, user_id: &UserId, f: impl FnOnce(&mut UserSession) -> R) -> R {
        self.get_or_create(user_id).update(f)
    }

    /// Number of users with a session.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;
    use crate::language::LanguageCode;
    use crate::session::OutputFormat;

    #[test]
    fn get_or_create_returns_defaults_for_new_user() {
        let store = SessionStore::new();
        let session = store.get_or_create(&UserId::from("alice"));
        let prefs = session.preferences();
        assert_eq!(prefs.output_format, OutputFormat::Text);
        assert_eq!(prefs.language, LanguageCode::DEFAULT);
        assert!(!session.welcome_sent());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_or_create_never_overwrites() {
        let store = SessionStore::new();
        let user = UserId::from("alice");
        store.update(&user, |s| s.output_format = OutputFormat::Voice);

        let again = store.get_or_create(&user);
        assert_eq!(again.preferences().output_format, OutputFormat::Voice);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_does_not_create() {
        let store = SessionStore::new();
        assert!(store.get(&UserId::from("ghost")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn users_are_isolated() {
        let store = SessionStore::new();
        let es = LanguageCode::parse("es").unwrap();
        store.update(&UserId::from("a"), |s| s.language = es);

        let b = store.get_or_create(&UserId::from("b"));
        assert_eq!(b.preferences().language, LanguageCode::DEFAULT);
    }

    #[test]
    fn concurrent_creation_yields_one_session() {
        let store = SessionStore::new();
        let user = UserId::from("racer");
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let user = user.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.update(&user, |s| s.processed_events.admit(&format!("{:p}", s)));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 1);
        // All eight writers hit the same session object.
        let session = store.get(&user).unwrap();
        assert_eq!(session.read(|s| s.processed_events.len()), 1);
    }
}
