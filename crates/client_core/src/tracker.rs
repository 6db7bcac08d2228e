//! De-duplication and sticky display for polled alignment results.

use sha2::{Digest, Sha256};
use shared::protocol::ResultRecord;

pub type ContentHash = [u8; 32];

#[derive(Debug, Clone, PartialEq)]
pub enum ResultUpdate {
    /// The set differs from what is on screen and must be drawn.
    Render(Vec<ResultRecord>),
    Unchanged,
}

/// Remembers the last rendered result set.
///
/// A poll re-renders only when the serialized set changes, and once a
/// non-empty set was shown an empty poll keeps it on screen.
#[derive(Debug, Default, Clone)]
pub struct ResultTracker {
    last_hash: Option<ContentHash>,
    displayed: bool,
}

impl ResultTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, results: Vec<ResultRecord>) -> ResultUpdate {
        if results.is_empty() {
            return ResultUpdate::Unchanged;
        }

        let hash = content_hash(&results);
        if self.last_hash == Some(hash) {
            return ResultUpdate::Unchanged;
        }

        self.last_hash = Some(hash);
        self.displayed = true;
        ResultUpdate::Render(results)
    }

    /// Forgets the rendered set ahead of a new run.
    pub fn reset(&mut self) {
        self.last_hash = None;
        self.displayed = false;
    }

    pub fn is_displayed(&self) -> bool {
        self.displayed
    }
}

pub fn content_hash(results: &[ResultRecord]) -> ContentHash {
    let serialized = serde_json::to_vec(results).unwrap_or_default();
    let digest = Sha256::digest(&serialized);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tube: &str, success: bool) -> ResultRecord {
        ResultRecord {
            tube_name: tube.to_string(),
            success,
            alignment_id: None,
            alignment_name: None,
            sequence_url: Some(format!("https://bench.example/{tube}")),
            error: None,
            response_data: None,
        }
    }

    #[test]
    fn identical_polls_render_once() {
        let mut tracker = ResultTracker::new();
        let set = vec![record("T1", true), record("T2", false)];

        assert!(matches!(tracker.observe(set.clone()), ResultUpdate::Render(_)));
        assert_eq!(tracker.observe(set), ResultUpdate::Unchanged);
    }

    #[test]
    fn changed_set_renders_again() {
        let mut tracker = ResultTracker::new();
        tracker.observe(vec![record("T1", true)]);

        let update = tracker.observe(vec![record("T1", true), record("T2", true)]);
        match update {
            ResultUpdate::Render(records) => assert_eq!(records.len(), 2),
            other => panic!("expected render, got {other:?}"),
        }
    }

    #[test]
    fn empty_poll_keeps_displayed_results() {
        let mut tracker = ResultTracker::new();
        tracker.observe(vec![record("T1", true)]);

        assert_eq!(tracker.observe(Vec::new()), ResultUpdate::Unchanged);
        assert!(tracker.is_displayed());
    }

    #[test]
    fn reset_allows_same_set_to_render_again() {
        let mut tracker = ResultTracker::new();
        let set = vec![record("T1", true)];
        tracker.observe(set.clone());

        tracker.reset();
        assert!(!tracker.is_displayed());
        assert!(matches!(tracker.observe(set), ResultUpdate::Render(_)));
    }

    #[test]
    fn hash_depends_on_order() {
        let a = vec![record("T1", true), record("T2", true)];
        let b = vec![record("T2", true), record("T1", true)];
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
