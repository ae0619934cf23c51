// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operation counters for diagnostics.

/// Cumulative counts of what the state manager has done since startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct StateStats {
    /// Claims prepared from scratch.
    pub prepares: u64,
    /// Prepare calls answered from the checkpoint.
    pub idempotent_prepares: u64,
    /// Claims unprepared.
    pub unprepares: u64,
    /// Unprepare calls for claims that were not prepared.
    pub noop_unprepares: u64,
    /// Prepare or unprepare calls that returned an error.
    pub failures: u64,
    /// Orphaned CDI specs removed by reconciliation.
    pub orphans_removed: u64,
    /// Missing CDI specs re-published by reconciliation.
    pub descriptors_restored: u64,
}

impl StateStats {
    pub(crate) fn record_prepare(&mut self) {
        self.prepares += 1;
    }

    pub(crate) fn record_idempotent_prepare(&mut self) {
        self.idempotent_prepares += 1;
    }

    pub(crate) fn record_unprepare(&mut self) {
        self.unprepares += 1;
    }

    pub(crate) fn record_noop_unprepare(&mut self) {
        self.noop_unprepares += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub(crate) fn record_reconcile(&mut self, removed: usize, restored: usize) {
        self.orphans_removed += removed as u64;
        self.descriptors_restored += restored as u64;
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Prepares: {} ({} idempotent), unprepares: {} ({} no-op), {} failures, \
             reconcile removed {} / restored {}",
            self.prepares,
            self.idempotent_prepares,
            self.unprepares,
            self.noop_unprepares,
            self.failures,
            self.orphans_removed,
            self.descriptors_restored,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut s = StateStats::default();
        s.record_prepare();
        s.record_idempotent_prepare();
        s.record_idempotent_prepare();
        s.record_unprepare();
        s.record_noop_unprepare();
        s.record_failure();
        s.record_reconcile(2, 1);

        assert_eq!(s.prepares, 1);
        assert_eq!(s.idempotent_prepares, 2);
        assert_eq!(s.orphans_removed, 2);
        assert_eq!(s.descriptors_restored, 1);
    }

    #[test]
    fn test_summary() {
        let mut s = StateStats::default();
        s.record_prepare();
        let summary = s.summary();
        assert!(summary.contains("Prepares: 1 (0 idempotent)"));
        assert!(summary.contains("0 failures"));
    }
}
