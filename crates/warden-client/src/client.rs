//! Snapshot client facade.
//!
//! # Purpose
//! Composes the fetcher, cache, tracker, and validation policy into the
//! admission API that data-plane call sites use: return the cached snapshot
//! when fresh, refetch when not, and always degrade to a deny verdict rather
//! than surface a control-plane failure.
//!
//! # Design notes
//! Per project the cache moves through {no entry} -> {cached, fresh} ->
//! {cached, stale} -> {no entry}: a failed refresh removes the stale entry so
//! expired data is never served past its TTL. Concurrent refreshes of the
//! same project collapse into one fetch through a per-project lock; the
//! losers re-check the cache instead of issuing duplicate requests.
use crate::cache::{CacheStats, SnapshotCache};
use crate::config::ClientConfig;
use crate::fetch::SnapshotFetcher;
use crate::policy::{
    AdmissionPolicy, ConnectionVerdict, RealtimeAdmission, StorageAdmission, StorageVerdict,
    Verdict,
};
use crate::tracker::ConnectionTracker;
use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use warden_types::{ControlPlaneSnapshot, CorrelationId, ProjectId};

/// Generic snapshot client, parameterized by the admission policy of the
/// embedding service.
pub struct SnapshotClient<P: AdmissionPolicy> {
    config: ClientConfig,
    fetcher: SnapshotFetcher,
    cache: SnapshotCache,
    tracker: ConnectionTracker,
    // One lock per project so concurrent refreshes collapse into one fetch.
    fetch_locks: DashMap<ProjectId, Arc<Mutex<()>>>,
    policy: P,
}

/// Snapshot client for the realtime/WebSocket gateway.
pub type RealtimeClient = SnapshotClient<RealtimeAdmission>;

/// Snapshot client for the object-storage gateway.
pub type StorageClient = SnapshotClient<StorageAdmission>;

impl<P: AdmissionPolicy> SnapshotClient<P> {
    /// Build a client from configuration.
    ///
    /// Misconfiguration (an unset control-plane URL) is the only error this
    /// returns; every later failure resolves to a deny verdict instead.
    pub fn new(config: ClientConfig, policy: P) -> Result<Self> {
        config.validate()?;
        let fetcher = SnapshotFetcher::new(&config.control_plane_url, config.request_timeout);
        Ok(Self {
            fetcher,
            cache: SnapshotCache::new(),
            tracker: ConnectionTracker::new(),
            fetch_locks: DashMap::new(),
            config,
            policy,
        })
    }

    /// Current snapshot for `project_id`: the cached one when fresh, a
    /// refetched one otherwise. `None` means unavailable and must be treated
    /// as a deny by callers.
    pub async fn snapshot(
        &self,
        project_id: &ProjectId,
        correlation_id: Option<&CorrelationId>,
    ) -> Option<ControlPlaneSnapshot> {
        if let Some(entry) = self.cache.get(project_id)
            && entry.is_fresh()
        {
            t_counter!("warden_client_cache_hits").increment(1);
            return Some(entry.snapshot);
        }
        t_counter!("warden_client_cache_misses").increment(1);
        self.refresh(project_id, correlation_id).await
    }

    async fn refresh(
        &self,
        project_id: &ProjectId,
        correlation_id: Option<&CorrelationId>,
    ) -> Option<ControlPlaneSnapshot> {
        let lock = self
            .fetch_locks
            .entry(project_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let refreshed = {
            let _guard = lock.lock().await;
            // A concurrent caller may have refreshed while we waited.
            if let Some(entry) = self.cache.get(project_id)
                && entry.is_fresh()
            {
                return Some(entry.snapshot);
            }
            match self.fetcher.fetch(project_id, correlation_id).await {
                Ok(snapshot) => {
                    let previous =
                        self.cache
                            .insert(project_id.clone(), snapshot.clone(), self.config.cache_ttl);
                    if let Some(previous) = previous
                        && previous.version != snapshot.version
                    {
                        tracing::info!(
                            project_id = %project_id,
                            previous_version = %previous.version,
                            version = %snapshot.version,
                            "project snapshot version changed"
                        );
                    }
                    Some(snapshot)
                }
                Err(err) => {
                    // Fail closed: a stale entry must not outlive a failed refresh.
                    if self.cache.remove(project_id).is_some() {
                        tracing::warn!(
                            project_id = %project_id,
                            error = %err,
                            "evicted cached snapshot after failed refresh"
                        );
                    }
                    None
                }
            }
        };
        // Drop the lock entry once nobody else is waiting on it.
        self.fetch_locks
            .remove_if(project_id, |_, lock| Arc::strong_count(lock) <= 2);
        refreshed
    }

    /// Evaluate the service's admission policy against the current snapshot
    /// and the process-local usage count.
    pub async fn validate(
        &self,
        project_id: &ProjectId,
        correlation_id: Option<&CorrelationId>,
    ) -> P::Verdict {
        let snapshot = self.snapshot(project_id, correlation_id).await;
        let local_count = self.tracker.get(project_id);
        let verdict = self.policy.evaluate(snapshot.as_ref(), local_count);
        if let Some(reason) = verdict.reason() {
            t_counter!("warden_client_denials", "reason" => reason.as_str()).increment(1);
            tracing::debug!(
                project_id = %project_id,
                correlation_id = correlation_id.map(CorrelationId::as_str),
                reason = %reason,
                "admission denied"
            );
        }
        verdict
    }

    /// Boolean shorthand over [`SnapshotClient::validate`].
    pub async fn can_admit(
        &self,
        project_id: &ProjectId,
        correlation_id: Option<&CorrelationId>,
    ) -> bool {
        self.validate(project_id, correlation_id).await.allowed()
    }

    pub async fn is_project_active(
        &self,
        project_id: &ProjectId,
        correlation_id: Option<&CorrelationId>,
    ) -> bool {
        self.snapshot(project_id, correlation_id)
            .await
            .is_some_and(|snapshot| snapshot.project.status.is_active())
    }

    pub async fn is_service_enabled(
        &self,
        project_id: &ProjectId,
        correlation_id: Option<&CorrelationId>,
    ) -> bool {
        self.snapshot(project_id, correlation_id)
            .await
            .is_some_and(|snapshot| snapshot.service_enabled(self.policy.service()))
    }

    /// Record an accepted connection; returns the new local count.
    pub fn increment_connection_count(&self, project_id: &ProjectId) -> u64 {
        self.tracker.increment(project_id)
    }

    /// Record a closed connection; returns the new local count (clamped at 0).
    pub fn decrement_connection_count(&self, project_id: &ProjectId) -> u64 {
        self.tracker.decrement(project_id)
    }

    pub fn connection_count(&self, project_id: &ProjectId) -> u64 {
        self.tracker.get(project_id)
    }

    pub fn reset_connection_count(&self, project_id: &ProjectId) {
        self.tracker.reset(project_id);
    }

    pub fn clear_connection_counts(&self) {
        self.tracker.clear_all();
    }

    /// Drop the cached snapshot for one project, for out-of-band invalidation
    /// ahead of the TTL.
    pub fn invalidate(&self, project_id: &ProjectId) {
        if self.cache.remove(project_id).is_some() {
            tracing::debug!(project_id = %project_id, "cache entry invalidated");
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Remove expired cache entries; returns how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let removed = self.cache.sweep_expired();
        t_gauge!("warden_client_cache_entries").set(self.cache.len() as f64);
        removed
    }

    /// Seed the cache for a known project set on cold start. Returns how many
    /// snapshots were fetched; failures are skipped (they will be retried on
    /// first admission).
    pub async fn prewarm(
        &self,
        project_ids: &[ProjectId],
        correlation_id: Option<&CorrelationId>,
    ) -> usize {
        let mut warmed = 0;
        for project_id in project_ids {
            if self.snapshot(project_id, correlation_id).await.is_some() {
                warmed += 1;
            }
        }
        warmed
    }

    /// Spawn the periodic sweep of expired cache entries, independent of
    /// request traffic.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(self);
        let sweep_interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = client.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired snapshot cache entries");
                }
            }
        })
    }
}

impl SnapshotClient<RealtimeAdmission> {
    /// Realtime-gateway client with the connection admission policy.
    pub fn realtime(config: ClientConfig) -> Result<Self> {
        Self::new(config, RealtimeAdmission)
    }

    pub async fn validate_connection(
        &self,
        project_id: &ProjectId,
        correlation_id: Option<&CorrelationId>,
    ) -> ConnectionVerdict {
        self.validate(project_id, correlation_id).await
    }

    pub async fn can_accept_connection(
        &self,
        project_id: &ProjectId,
        correlation_id: Option<&CorrelationId>,
    ) -> bool {
        self.can_admit(project_id, correlation_id).await
    }

    /// Configured connection ceiling for the project, `None` when unlimited
    /// or unavailable.
    pub async fn connection_limit(
        &self,
        project_id: &ProjectId,
        correlation_id: Option<&CorrelationId>,
    ) -> Option<u64> {
        self.snapshot(project_id, correlation_id)
            .await
            .and_then(|snapshot| snapshot.quotas.realtime_connections)
    }
}

impl SnapshotClient<StorageAdmission> {
    /// Storage-gateway client with the operation admission policy.
    pub fn storage(config: ClientConfig) -> Result<Self> {
        Self::new(config, StorageAdmission)
    }

    pub async fn validate_storage_operation(
        &self,
        project_id: &ProjectId,
        correlation_id: Option<&CorrelationId>,
    ) -> StorageVerdict {
        self.validate(project_id, correlation_id).await
    }
}
