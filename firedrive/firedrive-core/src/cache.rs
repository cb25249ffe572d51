//! Small in-process TTL cache for expensive storage scans.
//!
//! Keys embed the team id so a write can drop everything that team may be
//! seeing stale; this is the only cache invalidation the system has.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

pub struct TtlCache<V> {
    inner: RwLock<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let inner = self.inner.read();
            if let Some((expires, value)) = inner.get(key) {
                if *expires > now {
                    return Some(value.clone());
                }
            } else {
                return None;
            }
        }
        // Expired; drop it on the way out.
        self.inner.write().remove(key);
        None
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.inner
            .write()
            .insert(key.into(), (Instant::now() + ttl, value));
    }

    /// Drop every entry whose key mentions the team.
    pub fn invalidate_team(&self, team_id: &str) -> usize {
        let mut inner = self.inner.write();
        let before = inner.len();
        inner.retain(|key, _| !key.contains(team_id));
        before - inner.len()
    }

    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let count = inner.len();
        inner.clear();
        count
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
