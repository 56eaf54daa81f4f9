//! Snapshot distribution and local authorization cache for warden data-plane
//! services.
//!
//! # Purpose
//! Lets a downstream service (realtime gateway, storage gateway) authorize
//! every connection and operation against control-plane state without a
//! synchronous database query on the hot path: snapshots are fetched over
//! HTTP, cached with a TTL, and admission is decided purely from the cached
//! copy plus a process-local usage count.
//!
//! # How it fits
//! The control plane owns project status, service toggles, and quotas and
//! serves them at `/api/internal/snapshot`. Each embedding service holds one
//! [`SnapshotClient`] parameterized by its admission policy and calls it on
//! connection accept / operation start; connection open and close sites also
//! drive the local counters.
//!
//! # Key invariants
//! - Fail closed: when a snapshot cannot be obtained (fetch failure, timeout,
//!   missing project), admission is denied with `SNAPSHOT_UNAVAILABLE`.
//! - A failed refresh evicts the stale cache entry; expired state is never
//!   served past its TTL.
//! - Admission APIs never error during degraded operation; misconfiguration
//!   at construction time is the only fallible path.
//!
//! # Important configuration
//! - `WARDEN_CONTROL_PLANE_URL` must point at the control plane.
//! - `WARDEN_CACHE_TTL_MS` bounds how long authorization may act on state the
//!   control plane has since changed.
//!
//! # Examples
//! ```rust
//! use warden_client::{ClientConfig, RealtimeClient};
//! use warden_types::ProjectId;
//!
//! let client =
//!     RealtimeClient::realtime(ClientConfig::new("http://127.0.0.1:7443")).expect("config");
//! let project = ProjectId::new("proj-1");
//! assert_eq!(client.increment_connection_count(&project), 1);
//! assert_eq!(client.decrement_connection_count(&project), 0);
//! ```
//!
//! # Common pitfalls
//! - Connection counters are per process: horizontally scaled services each
//!   hold an independent partial view, so a configured limit bounds each
//!   instance, not the global total.
//! - Call sites must pair every `increment_connection_count` with exactly one
//!   `decrement_connection_count`, including on abnormal closes.

#[macro_use]
mod macros;

pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod policy;
pub mod tracker;

pub use cache::{CacheStats, CachedSnapshot, SnapshotCache};
pub use client::{RealtimeClient, SnapshotClient, StorageClient};
pub use config::ClientConfig;
pub use errors::{FetchError, FetchResult};
pub use fetch::{CORRELATION_HEADER, SnapshotFetcher};
pub use policy::{
    AdmissionPolicy, ConnectionVerdict, DenyReason, RealtimeAdmission, StorageAdmission,
    StorageVerdict, Verdict, validate_connection, validate_storage_operation,
};
pub use tracker::ConnectionTracker;
