use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::info;
use tokio::time::Instant;

use super::exporter::ExporterId;
use super::session::Session;

/// A session shared between the store and an in-flight decode.
///
/// The per-session lock serializes decodes for one exporter; decodes for
/// different exporters lock different sessions.
pub type SharedSession = Arc<Mutex<Session>>;

/// Bookkeeping kept next to each session. Wall-clock times are for logs only;
/// idleness is measured on the monotonic clock.
#[derive(Debug)]
struct Entry {
    session: SharedSession,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    last_access: Instant,
}

/// Owns one [`Session`] per exporter identity.
///
/// Sessions are created lazily on first sight of an exporter and live until
/// the store is dropped or [`evict_idle`](SessionStore::evict_idle) removes
/// them. Lookups are safe to call concurrently; two concurrent calls for the
/// same identity always observe the same session.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<ExporterId, Entry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `exporter`, creating and registering a fresh
    /// one if none exists yet. Every call counts as activity for eviction.
    pub fn get_or_create(&self, exporter: &ExporterId) -> SharedSession {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = sessions.entry(*exporter).or_insert_with(|| {
            let session = Session::new();
            info!("New session {} for exporter {}", session.id(), exporter);
            Entry {
                session: Arc::new(Mutex::new(session)),
                first_seen: now,
                last_seen: now,
                last_access: Instant::now(),
            }
        });
        entry.last_seen = now;
        entry.last_access = Instant::now();
        Arc::clone(&entry.session)
    }

    /// Looks up a session without counting as activity.
    pub fn get(&self, exporter: &ExporterId) -> Option<SharedSession> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(exporter)
            .map(|entry| Arc::clone(&entry.session))
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops sessions with no activity for longer than `max_idle` as of `now`.
    ///
    /// Sessions still referenced outside the store (a decode in flight) are
    /// kept regardless of age. Returns the number of sessions removed.
    pub fn evict_idle(&self, max_idle: Duration, now: Instant) -> usize {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|exporter, entry| {
            if Arc::strong_count(&entry.session) > 1 {
                return true;
            }
            if now.saturating_duration_since(entry.last_access) <= max_idle {
                return true;
            }
            let Ok(session) = entry.session.try_lock() else {
                return true;
            };
            info!(
                "Evicting session {} for exporter {} (first seen {}, last seen {})",
                session.id(),
                exporter,
                entry.first_seen.to_rfc3339(),
                entry.last_seen.to_rfc3339()
            );
            false
        });
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::thread;

    fn exporter(s: &str) -> ExporterId {
        ExporterId::Socket(s.parse::<SocketAddr>().unwrap())
    }

    #[test]
    fn same_identity_yields_same_session() {
        let store = SessionStore::new();
        let a = store.get_or_create(&exporter("192.0.2.1:2000"));
        let b = store.get_or_create(&exporter("192.0.2.1:2000"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn distinct_identities_are_isolated() {
        let store = SessionStore::new();
        let a = store.get_or_create(&exporter("192.0.2.1:2000"));
        let b = store.get_or_create(&exporter("192.0.2.2:2000"));
        assert!(!Arc::ptr_eq(&a, &b));

        a.lock().unwrap().netflow9_templates_mut().insert(
            (1, 256),
            crate::decoding::template::Template {
                id: 256,
                scope_field_count: 0,
                fields: vec![],
            },
        );
        assert_eq!(a.lock().unwrap().template_count(), 1);
        assert_eq!(b.lock().unwrap().template_count(), 0);
    }

    #[test]
    fn concurrent_lookups_create_one_session() {
        let store = Arc::new(SessionStore::new());
        let id = exporter("198.51.100.7:9995");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let session = store.get_or_create(&id);
                    let session_id = session.lock().unwrap().id();
                    session_id
                })
            })
            .collect();
        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn evict_idle_skips_sessions_in_use() {
        let store = SessionStore::new();
        let busy = store.get_or_create(&exporter("192.0.2.1:1"));
        drop(store.get_or_create(&exporter("192.0.2.2:1")));

        let later = Instant::now() + Duration::from_secs(120);
        assert_eq!(store.evict_idle(Duration::from_secs(60), later), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(&exporter("192.0.2.1:1")).is_some());
        drop(busy);

        assert_eq!(store.evict_idle(Duration::from_secs(60), later), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn recently_seen_sessions_survive_eviction() {
        let store = SessionStore::new();
        drop(store.get_or_create(&exporter("192.0.2.3:1")));
        assert_eq!(store.evict_idle(Duration::from_secs(60), Instant::now()), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idleness_follows_the_monotonic_clock() {
        let store = SessionStore::new();
        let id = exporter("192.0.2.4:1");
        drop(store.get_or_create(&id));

        tokio::time::advance(Duration::from_secs(50)).await;
        drop(store.get_or_create(&id));
        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(store.evict_idle(Duration::from_secs(60), Instant::now()), 0);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.evict_idle(Duration::from_secs(60), Instant::now()), 1);
        assert!(store.get(&id).is_none());
    }
}
