//! The frontier: ordered candidate post ids currently being probed.
//!
//! Always non-empty, ascending, deduplicated. It grows only by appending the
//! successor of its last element (exhausted pass with no find) and collapses
//! only to `[found + 1]` (successful commit). At rest between cycles,
//! `frontier[0] - 1` equals the persisted cursor.

/// Ordered, deduplicated list of candidate post ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontier {
    ids: Vec<i64>,
}

impl Frontier {
    /// Seed the frontier from the persisted cursor: `[cursor + 1]`.
    pub fn seed(cursor: i64) -> Self {
        Self { ids: vec![cursor + 1] }
    }

    /// Append the successor of the last id, unless already present.
    ///
    /// Called after a full pass where every candidate came back not-found.
    /// The frontier never grows any other way; in particular it never gains
    /// an element in the middle.
    pub fn grow(&mut self) {
        let next = self.last() + 1;
        if !self.ids.contains(&next) {
            self.ids.push(next);
        }
    }

    /// Collapse to `[found + 1]` after a successful discovery commit.
    pub fn collapse_to(&mut self, found: i64) {
        self.ids = vec![found + 1];
    }

    /// Replace the candidate list wholesale (admin override path).
    /// Sorts and deduplicates; an empty input is replaced by `[1]`.
    pub fn set(&mut self, mut ids: Vec<i64>) {
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            ids.push(1);
        }
        self.ids = ids;
    }

    /// Snapshot of the candidate ids, ascending.
    pub fn ids(&self) -> Vec<i64> {
        self.ids.clone()
    }

    pub fn first(&self) -> i64 {
        self.ids[0]
    }

    pub fn last(&self) -> i64 {
        *self.ids.last().expect("frontier is never empty")
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
