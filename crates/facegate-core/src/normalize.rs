//! Landmark normalizer: flattens a face mesh into a fixed-length vector.
//!
//! Over-long input (e.g. a refined 478-point mesh) is clipped to the first
//! 1404 values; short input is rejected.

use crate::types::{Landmark, FLAT_LANDMARK_LEN, LANDMARK_COUNT};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("invalid landmark shape: expected {expected} values (468x3), got {actual}")]
    InvalidLandmarkShape { expected: usize, actual: usize },
}

/// Flatten landmarks in point order (x, y, z per point) and fit to 1404 values.
pub fn normalize(landmarks: &[Landmark]) -> Result<Vec<f32>, NormalizeError> {
    let flat: Vec<f32> = landmarks
        .iter()
        .take(LANDMARK_COUNT)
        .flat_map(|l| [l.x, l.y, l.z])
        .collect();
    // Report the full flattened length on failure, not the clipped one.
    if flat.len() < FLAT_LANDMARK_LEN {
        return Err(NormalizeError::InvalidLandmarkShape {
            expected: FLAT_LANDMARK_LEN,
            actual: landmarks.len() * 3,
        });
    }
    normalize_flat(flat)
}

/// Fit an already-flattened vector to 1404 values.
pub fn normalize_flat(mut values: Vec<f32>) -> Result<Vec<f32>, NormalizeError> {
    if values.len() < FLAT_LANDMARK_LEN {
        return Err(NormalizeError::InvalidLandmarkShape {
            expected: FLAT_LANDMARK_LEN,
            actual: values.len(),
        });
    }
    if values.len() > FLAT_LANDMARK_LEN {
        tracing::debug!(
            actual = values.len(),
            kept = FLAT_LANDMARK_LEN,
            "truncating over-long landmark vector"
        );
        values.truncate(FLAT_LANDMARK_LEN);
    }
    Ok(values)
}
