//! Error high-water mark.
//!
//! Workers claim jobs by moving them into the processing queue. A worker
//! that crashes leaves its claimed job there forever. Any processing depth
//! beyond the live worker count (after jobs already written off) must be
//! such stranded work, so it is folded into a count that only ever grows.

use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorTracker {
    err_hwm: u64,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from the first observation: whatever exceeds the worker count at
    /// startup is taken to be already orphaned.
    pub fn seeded(proc_len: u64, worker_count: u64) -> Self {
        Self {
            err_hwm: proc_len.saturating_sub(worker_count),
        }
    }

    pub fn high_water_mark(&self) -> u64 {
        self.err_hwm
    }

    /// Fold newly stranded jobs into the mark. Returns how much it grew.
    pub fn observe(&mut self, proc_len: u64, worker_count: u64) -> u64 {
        let unattributed = proc_len.saturating_sub(self.err_hwm);
        if unattributed <= worker_count {
            return 0;
        }
        let grown = unattributed - worker_count;
        self.err_hwm += grown;
        warn!(
            proc_len,
            worker_count,
            grown,
            err_hwm = self.err_hwm,
            "processing jobs attributed to lost workers"
        );
        grown
    }

    /// Processing depth net of written-off jobs, floored at zero.
    pub fn effective_proc_len(&self, proc_len: u64) -> u64 {
        proc_len.saturating_sub(self.err_hwm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_from_initial_deficit() {
        assert_eq!(ErrorTracker::seeded(12, 5).high_water_mark(), 7);
        assert_eq!(ErrorTracker::seeded(3, 5).high_water_mark(), 0);
    }

    #[test]
    fn excess_is_absorbed_exactly() {
        let mut tracker = ErrorTracker::new();
        assert_eq!(tracker.observe(12, 5), 7);
        assert_eq!(tracker.high_water_mark(), 7);
        assert_eq!(tracker.effective_proc_len(12), 5);
    }

    #[test]
    fn no_growth_while_within_worker_count() {
        let mut tracker = ErrorTracker::seeded(10, 4);
        assert_eq!(tracker.observe(10, 4), 0);
        assert_eq!(tracker.observe(8, 4), 0);
        assert_eq!(tracker.high_water_mark(), 6);
    }

    #[test]
    fn never_decreases_when_queue_drains() {
        let mut tracker = ErrorTracker::new();
        tracker.observe(20, 5);
        let mark = tracker.high_water_mark();

        for (proc_len, workers) in [(0, 5), (3, 0), (15, 10), (0, 0), (40, 1)] {
            let before = tracker.high_water_mark();
            tracker.observe(proc_len, workers);
            assert!(tracker.high_water_mark() >= before);
        }
        assert!(tracker.high_water_mark() >= mark);
    }

    #[test]
    fn over_attribution_clamps_to_zero() {
        let tracker = ErrorTracker::seeded(10, 0);
        assert_eq!(tracker.effective_proc_len(4), 0);
    }

    #[test]
    fn growth_accumulates_across_ticks() {
        let mut tracker = ErrorTracker::new();
        tracker.observe(12, 5); // 7
        // Two more workers die holding jobs: proc stays 12, workers drop to 3.
        assert_eq!(tracker.observe(12, 3), 2);
        assert_eq!(tracker.high_water_mark(), 9);
        assert_eq!(tracker.effective_proc_len(12), 3);
    }
}
