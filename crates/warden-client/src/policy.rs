//! Admission validation over cached control-plane snapshots.
//!
//! # Purpose
//! Pure decision logic: given a possibly absent snapshot and the local usage
//! count, produce an allow/deny verdict with a typed reason. No I/O, no
//! mutable state, fully unit-testable in isolation.
//!
//! # How it fits
//! The snapshot client facade resolves the snapshot and the local count, then
//! delegates here. Realtime connection admission and storage operation
//! admission share one ordered check sequence and differ only in the quota
//! field they enforce and the verdict payload they return.
//!
//! # Key invariants
//! - Checks short-circuit from most fundamental to most specific: snapshot
//!   presence, then project status, then service enablement, then numeric
//!   headroom. A caller never sees a quota denial for a suspended project.
//! - `allowed == false` always carries a reason; `allowed == true` never does.
//! - An absent snapshot always denies (fail closed).

use serde::Serialize;
use std::fmt;
use warden_types::{ControlPlaneSnapshot, ProjectStatus, ServiceKind};

/// Seconds a caller should wait before retrying a transient denial.
pub(crate) const RETRY_AFTER_SECS: u64 = 30;

/// Closed taxonomy of denial reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    SnapshotUnavailable,
    ProjectSuspended,
    ProjectArchived,
    ProjectDeleted,
    ProjectNotActive,
    ServiceDisabled,
    ConnectionLimitExceeded,
    StorageQuotaExceeded,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SnapshotUnavailable => "SNAPSHOT_UNAVAILABLE",
            Self::ProjectSuspended => "PROJECT_SUSPENDED",
            Self::ProjectArchived => "PROJECT_ARCHIVED",
            Self::ProjectDeleted => "PROJECT_DELETED",
            Self::ProjectNotActive => "PROJECT_NOT_ACTIVE",
            Self::ServiceDisabled => "SERVICE_DISABLED",
            Self::ConnectionLimitExceeded => "CONNECTION_LIMIT_EXCEEDED",
            Self::StorageQuotaExceeded => "STORAGE_QUOTA_EXCEEDED",
        }
    }

    fn from_status(status: ProjectStatus) -> Self {
        match status {
            ProjectStatus::Suspended => Self::ProjectSuspended,
            ProjectStatus::Archived => Self::ProjectArchived,
            ProjectStatus::Deleted => Self::ProjectDeleted,
            // Active never reaches here; Unknown and future states deny generically.
            _ => Self::ProjectNotActive,
        }
    }

    /// Whether the condition can clear on its own (worth retrying later).
    fn is_transient(&self) -> bool {
        matches!(self, Self::SnapshotUnavailable | Self::ConnectionLimitExceeded)
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common read surface over the per-service verdict types.
pub trait Verdict {
    fn allowed(&self) -> bool;
    fn reason(&self) -> Option<DenyReason>;
}

/// Outcome of a realtime connection admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionVerdict {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    pub retry_after_secs: Option<u64>,
}

impl ConnectionVerdict {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            retry_after_secs: None,
        }
    }

    fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            retry_after_secs: reason.is_transient().then_some(RETRY_AFTER_SECS),
        }
    }
}

impl Verdict for ConnectionVerdict {
    fn allowed(&self) -> bool {
        self.allowed
    }

    fn reason(&self) -> Option<DenyReason> {
        self.reason
    }
}

/// Outcome of a storage operation admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageVerdict {
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    pub quota: Option<u64>,
    pub remaining: Option<u64>,
}

impl StorageVerdict {
    fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            quota: None,
            remaining: None,
        }
    }
}

impl Verdict for StorageVerdict {
    fn allowed(&self) -> bool {
        self.allowed
    }

    fn reason(&self) -> Option<DenyReason> {
        self.reason
    }
}

// Shared prefix of every admission check: can we trust any data at all, is
// the project alive, is the service switched on.
fn gate(snapshot: Option<&ControlPlaneSnapshot>, service: ServiceKind) -> Result<(), DenyReason> {
    let Some(snapshot) = snapshot else {
        return Err(DenyReason::SnapshotUnavailable);
    };
    if !snapshot.project.status.is_active() {
        return Err(DenyReason::from_status(snapshot.project.status));
    }
    if !snapshot.service_enabled(service) {
        return Err(DenyReason::ServiceDisabled);
    }
    Ok(())
}

/// Connection admission for the realtime service.
///
/// `limit` is the configured connection ceiling (`None` means unlimited);
/// `local_count` is the process-local count of open connections.
pub fn validate_connection(
    snapshot: Option<&ControlPlaneSnapshot>,
    local_count: u64,
    limit: Option<u64>,
) -> ConnectionVerdict {
    if let Err(reason) = gate(snapshot, ServiceKind::Realtime) {
        return ConnectionVerdict::deny(reason);
    }
    if let Some(limit) = limit
        && local_count >= limit
    {
        return ConnectionVerdict::deny(DenyReason::ConnectionLimitExceeded);
    }
    ConnectionVerdict::allow()
}

/// Storage operation admission.
///
/// Same ordered checks as [`validate_connection`]; the verdict reports the
/// configured quota and the headroom left under it.
pub fn validate_storage_operation(
    snapshot: Option<&ControlPlaneSnapshot>,
    local_count: u64,
    quota: Option<u64>,
) -> StorageVerdict {
    if let Err(reason) = gate(snapshot, ServiceKind::Storage) {
        return StorageVerdict::deny(reason);
    }
    match quota {
        Some(quota) if local_count >= quota => StorageVerdict {
            allowed: false,
            reason: Some(DenyReason::StorageQuotaExceeded),
            quota: Some(quota),
            remaining: Some(0),
        },
        Some(quota) => StorageVerdict {
            allowed: true,
            reason: None,
            quota: Some(quota),
            remaining: Some(quota - local_count),
        },
        None => StorageVerdict {
            allowed: true,
            reason: None,
            quota: None,
            remaining: None,
        },
    }
}

/// Per-service admission rules injected into the generic snapshot client.
pub trait AdmissionPolicy: Send + Sync + 'static {
    type Verdict: Verdict + Send + 'static;

    fn service(&self) -> ServiceKind;

    fn evaluate(&self, snapshot: Option<&ControlPlaneSnapshot>, local_count: u64) -> Self::Verdict;
}

/// Connection admission for the realtime gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealtimeAdmission;

impl AdmissionPolicy for RealtimeAdmission {
    type Verdict = ConnectionVerdict;

    fn service(&self) -> ServiceKind {
        ServiceKind::Realtime
    }

    fn evaluate(&self, snapshot: Option<&ControlPlaneSnapshot>, local_count: u64) -> Self::Verdict {
        let limit = snapshot.and_then(|snapshot| snapshot.quotas.realtime_connections);
        validate_connection(snapshot, local_count, limit)
    }
}

/// Operation admission for the object-storage gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageAdmission;

impl AdmissionPolicy for StorageAdmission {
    type Verdict = StorageVerdict;

    fn service(&self) -> ServiceKind {
        ServiceKind::Storage
    }

    fn evaluate(&self, snapshot: Option<&ControlPlaneSnapshot>, local_count: u64) -> Self::Verdict {
        let quota = snapshot.and_then(|snapshot| snapshot.quotas.storage_operations);
        validate_storage_operation(snapshot, local_count, quota)
    }
}
