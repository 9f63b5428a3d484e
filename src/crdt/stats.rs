// model = "claude-opus-4-5"
// created = "2026-08-01"
// modified = "2026-08-01"
// driver = "Isaac Clayton"

//! Reclamation and memory statistics.

use std::time::Duration;

use serde::Serialize;

/// Accumulated timing statistics for tombstone reclamation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GcStats {
    /// Number of reclamation runs.
    pub runs: u64,
    /// Total tombstones removed across all runs.
    pub tombstones_removed: u64,
    /// Total time spent reclaiming, in microseconds.
    pub total_time_us: u64,
    /// Duration of the most recent run.
    pub last_time_us: u64,
    /// Duration of the slowest run.
    pub max_time_us: u64,
}

impl GcStats {
    /// Record one reclamation run.
    pub fn record(&mut self, elapsed: Duration, removed: usize) {
        let micros = elapsed.as_micros() as u64;
        self.runs += 1;
        self.tombstones_removed += removed as u64;
        self.total_time_us += micros;
        self.last_time_us = micros;
        if micros > self.max_time_us {
            self.max_time_us = micros;
        }
    }

    /// Average run duration in microseconds.
    pub fn avg_time_us(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        return self.total_time_us as f64 / self.runs as f64;
    }
}

/// A point-in-time snapshot of a sequence's memory footprint.
///
/// Byte figures are estimates from container sizes, not allocator
/// measurements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    /// Atoms in the ordered container, tombstones included, sentinel
    /// excluded.
    pub atom_count: usize,
    /// Tombstones in the ordered container.
    pub tombstone_count: usize,
    /// Atoms parked in the orphan buffer.
    pub orphan_count: usize,
    /// Deletes waiting for their target to arrive.
    pub pending_delete_count: usize,
    /// Estimated bytes held by the ordered container.
    pub container_bytes: usize,
    /// Estimated bytes held by the id index.
    pub index_bytes: usize,
    /// Estimated bytes held by the orphan buffer.
    pub orphan_bytes: usize,
    /// Estimated bytes held by the version map.
    pub version_bytes: usize,
}

impl MemoryStats {
    /// Total estimated bytes.
    pub fn total_bytes(&self) -> usize {
        return self.container_bytes + self.index_bytes + self.orphan_bytes + self.version_bytes;
    }
}
