//! Lighting gate: suppresses sample admission in dim frames.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingGate {
    /// Minimum mean brightness (0–255) for a frame to contribute a scan.
    pub min_brightness: f32,
}

impl Default for LightingGate {
    fn default() -> Self {
        Self {
            min_brightness: 100.0,
        }
    }
}

impl LightingGate {
    /// Frames without a brightness estimate are not held back.
    pub fn is_lit(&self, brightness: Option<f32>) -> bool {
        brightness.map_or(true, |b| b >= self.min_brightness)
    }
}
