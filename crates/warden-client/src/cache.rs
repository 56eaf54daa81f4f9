// In-memory per-project snapshot cache.
// Freshness is the caller's concern: `get` returns stale entries unchanged so
// "present but stale" and "absent" stay distinguishable to the composing logic.
use dashmap::DashMap;
use std::time::{Duration, Instant};
use warden_types::{ControlPlaneSnapshot, ProjectId};

/// One cached snapshot revision plus its expiry.
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub snapshot: ControlPlaneSnapshot,
    pub version: String,
    pub expires_at: Instant,
}

impl CachedSnapshot {
    pub fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

/// Counts reported by [`SnapshotCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub fresh: usize,
    pub expired: usize,
}

#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: DashMap<ProjectId, CachedSnapshot>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, project_id: &ProjectId) -> Option<CachedSnapshot> {
        self.entries.get(project_id).map(|entry| entry.clone())
    }

    /// Replace the entry for `project_id` wholesale and return the previous
    /// one, if any. Entries are never partially updated.
    pub fn insert(
        &self,
        project_id: ProjectId,
        snapshot: ControlPlaneSnapshot,
        ttl: Duration,
    ) -> Option<CachedSnapshot> {
        let entry = CachedSnapshot {
            version: snapshot.version.clone(),
            snapshot,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(project_id, entry)
    }

    pub fn remove(&self, project_id: &ProjectId) -> Option<CachedSnapshot> {
        self.entries.remove(project_id).map(|(_, entry)| entry)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every expired entry and return how many were removed.
    ///
    /// Correctness never depends on this running (a stale entry is simply
    /// never treated as valid); it bounds memory held for projects that are no
    /// longer queried.
    pub fn sweep_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh());
        before.saturating_sub(self.entries.len())
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for entry in self.entries.iter() {
            stats.entries += 1;
            if entry.is_fresh() {
                stats.fresh += 1;
            } else {
                stats.expired += 1;
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
