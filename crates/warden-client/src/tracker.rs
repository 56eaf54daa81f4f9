// Per-process connection counters, keyed by project.
// These are a local approximation only: each process sees its own connections,
// and horizontally scaled deployments hold independent partial views.
use dashmap::DashMap;
use warden_types::ProjectId;

#[derive(Debug, Default)]
pub struct ConnectionTracker {
    counts: DashMap<ProjectId, u64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted connection and return the new count.
    pub fn increment(&self, project_id: &ProjectId) -> u64 {
        let mut entry = self.counts.entry(project_id.clone()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Record a closed connection and return the new count.
    ///
    /// Clamps at zero: a double-decrement (error handler and close handler
    /// both firing) must not corrupt future admission decisions.
    pub fn decrement(&self, project_id: &ProjectId) -> u64 {
        let mut entry = self.counts.entry(project_id.clone()).or_insert(0);
        *entry = entry.saturating_sub(1);
        *entry
    }

    pub fn get(&self, project_id: &ProjectId) -> u64 {
        self.counts.get(project_id).map(|entry| *entry).unwrap_or(0)
    }

    pub fn reset(&self, project_id: &ProjectId) {
        if let Some(mut entry) = self.counts.get_mut(project_id) {
            *entry = 0;
        }
    }

    pub fn clear_all(&self) {
        self.counts.clear();
    }

    pub fn tracked_projects(&self) -> usize {
        self.counts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_then_decrement_restores_count() {
        let tracker = ConnectionTracker::new();
        let project = ProjectId::new("p1");
        assert_eq!(tracker.get(&project), 0);
        assert_eq!(tracker.increment(&project), 1);
        assert_eq!(tracker.increment(&project), 2);
        assert_eq!(tracker.decrement(&project), 1);
        assert_eq!(tracker.get(&project), 1);
    }

    #[test]
    fn decrement_clamps_at_zero() {
        let tracker = ConnectionTracker::new();
        let project = ProjectId::new("p1");
        assert_eq!(tracker.decrement(&project), 0);
        tracker.increment(&project);
        tracker.decrement(&project);
        assert_eq!(tracker.decrement(&project), 0);
        assert_eq!(tracker.get(&project), 0);
    }

    #[test]
    fn reset_zeroes_one_project_only() {
        let tracker = ConnectionTracker::new();
        let p1 = ProjectId::new("p1");
        let p2 = ProjectId::new("p2");
        tracker.increment(&p1);
        tracker.increment(&p2);
        tracker.reset(&p1);
        assert_eq!(tracker.get(&p1), 0);
        assert_eq!(tracker.get(&p2), 1);
    }

    #[test]
    fn clear_all_forgets_every_project() {
        let tracker = ConnectionTracker::new();
        tracker.increment(&ProjectId::new("p1"));
        tracker.increment(&ProjectId::new("p2"));
        tracker.clear_all();
        assert_eq!(tracker.tracked_projects(), 0);
        assert_eq!(tracker.get(&ProjectId::new("p1")), 0);
    }

    #[test]
    fn counts_are_independent_per_project() {
        let tracker = ConnectionTracker::new();
        let p1 = ProjectId::new("p1");
        let p2 = ProjectId::new("p2");
        tracker.increment(&p1);
        tracker.increment(&p1);
        tracker.increment(&p2);
        assert_eq!(tracker.get(&p1), 2);
        assert_eq!(tracker.get(&p2), 1);
    }
}
