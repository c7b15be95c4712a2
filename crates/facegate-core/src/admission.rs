//! Sample admission: decides whether the current frame becomes a new scan.

use crate::types::{AssistScore, Scan};
use serde::{Deserialize, Serialize};

/// Quality and pacing rules for admitting scans into a sample buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionPolicy {
    /// Minimum assist score (exclusive) for multi-sample collection.
    pub quality_threshold: f32,
    /// Minimum assist score (exclusive) when a single sample is collected.
    pub single_sample_threshold: f32,
    /// Minimum gap (exclusive) between consecutive scans, so the set covers
    /// more than one head pose.
    pub min_interval_ms: i64,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            quality_threshold: 80.0,
            single_sample_threshold: 90.0,
            min_interval_ms: 500,
        }
    }
}

impl AdmissionPolicy {
    /// Quality bar for a session collecting `target_count` scans.
    pub fn threshold_for(&self, target_count: usize) -> f32 {
        if target_count == 1 {
            self.single_sample_threshold
        } else {
            self.quality_threshold
        }
    }

    /// Whether a frame scored `current` at `now_ms` should be admitted.
    pub fn should_admit(
        &self,
        history: &[Scan],
        current: &AssistScore,
        target_count: usize,
        now_ms: i64,
    ) -> bool {
        if history.len() >= target_count {
            return false;
        }
        let good_enough = current.score > self.threshold_for(target_count);
        match history.last() {
            None => good_enough,
            Some(last) => now_ms - last.timestamp_ms > self.min_interval_ms && good_enough,
        }
    }
}
