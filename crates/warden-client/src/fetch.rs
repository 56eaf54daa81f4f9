// Bounded-time snapshot fetch against the control plane.
// One GET per call, no retries and no backoff; the outcome is classified into
// FetchError so callers can tell a missing project from a degraded plane.
use crate::errors::{FetchError, FetchResult};
use serde::Deserialize;
use std::time::Duration;
use warden_types::{ControlPlaneSnapshot, CorrelationId, ProjectId};

/// Header carrying the caller's correlation id to the control plane.
pub const CORRELATION_HEADER: &str = "x-request-id";

#[derive(Debug, Deserialize)]
struct SnapshotEnvelope {
    snapshot: Option<ControlPlaneSnapshot>,
}

pub struct SnapshotFetcher {
    base_url: String,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl SnapshotFetcher {
    pub fn new(base_url: &str, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            request_timeout,
        }
    }

    pub async fn fetch(
        &self,
        project_id: &ProjectId,
        correlation_id: Option<&CorrelationId>,
    ) -> FetchResult<ControlPlaneSnapshot> {
        let result = self.fetch_inner(project_id, correlation_id).await;
        match &result {
            Ok(snapshot) => {
                t_counter!("warden_client_fetch_ok").increment(1);
                tracing::debug!(
                    project_id = %project_id,
                    correlation_id = correlation_id.map(CorrelationId::as_str),
                    version = %snapshot.version,
                    "snapshot fetched"
                );
            }
            Err(err) => {
                t_counter!("warden_client_fetch_err").increment(1);
                tracing::warn!(
                    project_id = %project_id,
                    correlation_id = correlation_id.map(CorrelationId::as_str),
                    error = %err,
                    "snapshot fetch failed"
                );
            }
        }
        result
    }

    async fn fetch_inner(
        &self,
        project_id: &ProjectId,
        correlation_id: Option<&CorrelationId>,
    ) -> FetchResult<ControlPlaneSnapshot> {
        let url = format!(
            "{}/api/internal/snapshot?project_id={}",
            self.base_url, project_id
        );
        let mut request = self.client.get(url).timeout(self.request_timeout);
        if let Some(correlation_id) = correlation_id {
            request = request.header(CORRELATION_HEADER, correlation_id.as_str());
        }
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => return Err(FetchError::Timeout(self.request_timeout)),
            Err(err) => return Err(FetchError::Transport(err)),
        };
        let status = response.status();
        match status.as_u16() {
            404 => return Err(FetchError::NotFound),
            503 => return Err(FetchError::Unavailable),
            code if !status.is_success() => return Err(FetchError::Status(code)),
            _ => {}
        }
        let envelope: SnapshotEnvelope = match response.json().await {
            Ok(envelope) => envelope,
            Err(err) if err.is_timeout() => return Err(FetchError::Timeout(self.request_timeout)),
            Err(err) if err.is_decode() => return Err(FetchError::Malformed(err.to_string())),
            Err(err) => return Err(FetchError::Transport(err)),
        };
        envelope
            .snapshot
            .ok_or_else(|| FetchError::Malformed("response missing snapshot field".to_string()))
    }
}
