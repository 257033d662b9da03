//! Process-local bookkeeping of the sessions this node claimed.
//!
//! The store is the only authority on which sessions are alive. This
//! module keeps a best-effort local view for counting: each id claimed
//! here, with the deadline its TTL implies. Whenever this node renews a
//! session (access or write) the deadline moves forward.
//!
//! Entries leave in two ways:
//! - explicit removal through the manager, and
//! - deadline lapse. Lapsed entries are purged lazily, on a count or at
//!   most once a second on a claim, so a node whose sessions end by
//!   timing out doesn't keep one id per session forever.
//!
//! Renewals made by *other* nodes are invisible here, so a session kept
//! alive elsewhere may drop out of the local count early. That only
//! affects the count, never whether the session works.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum gap between full purges triggered by new claims.
const PURGE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct LocalState {
    deadlines: HashMap<String, Instant>,
    last_purge: Option<Instant>,
}

impl LocalState {
    fn purge(&mut self, now: Instant) {
        self.deadlines.retain(|_, deadline| *deadline > now);
        self.last_purge = Some(now);
    }
}

/// Ids claimed by one manager, each with its expected expiry.
#[derive(Debug, Default)]
pub(crate) struct LocalSessions {
    state: Mutex<LocalState>,
}

impl LocalSessions {
    /// Records a freshly claimed id.
    pub(crate) async fn insert(&self, id: String, ttl_secs: u64) {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let due = state
            .last_purge
            .is_none_or(|at| now.saturating_duration_since(at) >= PURGE_INTERVAL);
        if due {
            state.purge(now);
        }
        state.deadlines.insert(id, now + Duration::from_secs(ttl_secs));
    }

    /// Pushes the deadline of a known id forward. Ids this node never
    /// claimed are ignored.
    pub(crate) async fn renew(&self, id: &str, ttl_secs: u64) {
        let deadline = Instant::now() + Duration::from_secs(ttl_secs);
        if let Some(entry) = self.state.lock().await.deadlines.get_mut(id) {
            *entry = deadline;
        }
    }

    pub(crate) async fn remove(&self, id: &str) {
        self.state.lock().await.deadlines.remove(id);
    }

    /// Number of ids whose deadline hasn't passed. Purges the rest.
    pub(crate) async fn count(&self) -> usize {
        let mut state = self.state.lock().await;
        state.purge(Instant::now());
        state.deadlines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_count_excludes_lapsed_ids() {
        let local = LocalSessions::default();
        local.insert("short".into(), 1).await;
        local.insert("long".into(), 60).await;

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(local.count().await, 1);
        assert_eq!(local.state.lock().await.deadlines.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_purges_lapsed_ids_without_count() {
        let local = LocalSessions::default();
        for i in 0..100 {
            local.insert(format!("s{i}"), 1).await;
        }
        tokio::time::advance(Duration::from_secs(5)).await;

        local.insert("fresh".into(), 60).await;

        assert_eq!(local.state.lock().await.deadlines.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renew_keeps_id_past_original_deadline() {
        let local = LocalSessions::default();
        local.insert("s1".into(), 10).await;
        tokio::time::advance(Duration::from_secs(8)).await;

        local.renew("s1", 10).await;
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(local.count().await, 1);
    }

    #[tokio::test]
    async fn test_renew_unknown_id_does_not_add_it() {
        let local = LocalSessions::default();

        local.renew("elsewhere", 10).await;

        assert_eq!(local.count().await, 0);
    }
}
