//! Shared control-plane data model for warden services.
//!
//! # Purpose
//! Defines the snapshot wire model and the typed identifiers exchanged between
//! the warden control plane and the data-plane services that embed
//! `warden-client`.
//!
//! # How it fits
//! The control plane serializes one [`ControlPlaneSnapshot`] per project; every
//! downstream service deserializes it, caches it, and evaluates admission
//! decisions against it without further coordination.
//!
//! # Key invariants
//! - A snapshot is a value type: it is never merged, patched, or mutated after
//!   it has been received.
//! - [`ProjectStatus`] values unknown to this build deserialize to
//!   [`ProjectStatus::Unknown`] rather than failing, so newer control-plane
//!   states degrade to a deny instead of a decode error.
//!
//! # Common pitfalls
//! - A service absent from [`ControlPlaneSnapshot::services`] is treated as
//!   disabled; producers must emit an explicit entry to enable a service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Project identifier wrapper.
///
/// Newtype around the string ID the control plane assigns to a tenant project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Request correlation identifier, propagated to the control plane so its logs
/// can be matched against the calling service's trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Project lifecycle state as owned by the control plane.
///
/// Clients never transition this state; they only respect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Active,
    Suspended,
    Archived,
    Deleted,
    /// Any status this build does not know about. Treated as not active.
    #[serde(other)]
    Unknown,
}

impl ProjectStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Downstream services governed by per-project service toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Realtime,
    Storage,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of one project's control-plane state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPlaneSnapshot {
    /// Opaque revision identifier, used for change detection and logging only.
    pub version: String,
    pub project: ProjectState,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
    #[serde(default)]
    pub quotas: Quotas,
    #[serde(default)]
    pub limits: Limits,
}

impl ControlPlaneSnapshot {
    /// Whether `service` is explicitly enabled for this project.
    ///
    /// A missing entry counts as disabled so that an incomplete snapshot can
    /// never grant access a complete one would refuse.
    pub fn service_enabled(&self, service: ServiceKind) -> bool {
        self.services
            .get(service.as_str())
            .is_some_and(|config| config.enabled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    pub status: ProjectStatus,
    /// Informational deployment tag (for example `live`, `test`, `dev`).
    #[serde(default)]
    pub environment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub enabled: bool,
}

/// Numeric ceilings relevant to the downstream services.
///
/// `None` means the ceiling is not configured and must not be enforced.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quotas {
    #[serde(default)]
    pub realtime_connections: Option<u64>,
    #[serde(default)]
    pub storage_operations: Option<u64>,
    #[serde(default)]
    pub storage_bytes: Option<u64>,
}

/// Rate-limit configuration, carried through for the embedding service.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default)]
    pub requests_per_second: Option<u64>,
    #[serde(default)]
    pub burst: Option<u64>,
}
