//! Blink-based liveness gate.
//!
//! A printed photo or a still frame held up to the camera never closes its
//! eyes. The gate watches the eye aspect ratio (EAR) of each frame and opens
//! once it sees a genuine open→closed transition.
//!
//! EAR follows Soukupová & Čech (2016): the vertical eye opening divided by
//! the horizontal eye width. It stays roughly constant while the eye is open
//! and drops towards zero during a blink.

use crate::types::{Blink, Landmark};
use serde::{Deserialize, Serialize};

/// EAR below this is considered a closed eye.
pub const DEFAULT_EAR_THRESHOLD: f32 = 0.2;

/// Which eye to measure (subject's perspective, MediaPipe mesh indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    /// Mesh indices `[p1, p2, p3, p4, p5, p6]`: outer corner, two upper-lid
    /// points, inner corner, two lower-lid points.
    pub(crate) fn points(self) -> [usize; 6] {
        match self {
            Eye::Left => [33, 160, 158, 133, 153, 144],
            Eye::Right => [362, 384, 387, 263, 373, 381],
        }
    }
}

/// Eye aspect ratio for one eye, or `None` if the mesh lacks the points or
/// the eye has zero width.
pub fn eye_aspect_ratio(landmarks: &[Landmark], eye: Eye) -> Option<f32> {
    let idx = eye.points();
    let p = |i: usize| landmarks.get(idx[i]);
    let (p1, p2, p3, p4, p5, p6) = (p(0)?, p(1)?, p(2)?, p(3)?, p(4)?, p(5)?);

    let top = p2.midpoint(p3);
    let bottom = p5.midpoint(p6);
    let vertical = top.distance_2d(&bottom);
    let horizontal = p1.distance_2d(p4);
    if horizontal <= 0.0 {
        return None;
    }
    Some(vertical / horizontal)
}

/// Mean EAR over both eyes; falls back to whichever eye is measurable.
pub fn combined_ear(landmarks: &[Landmark]) -> Option<f32> {
    match (
        eye_aspect_ratio(landmarks, Eye::Left),
        eye_aspect_ratio(landmarks, Eye::Right),
    ) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivenessState {
    Unverified,
    Verified,
}

/// Edge-triggered blink detector gating sample collection for one session.
#[derive(Debug, Clone)]
pub struct LivenessGate {
    threshold: f32,
    last_ear: f32,
    state: LivenessState,
    blinks: Vec<Blink>,
}

impl Default for LivenessGate {
    fn default() -> Self {
        Self::new(DEFAULT_EAR_THRESHOLD)
    }
}

impl LivenessGate {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            // Eyes are assumed open before the first frame.
            last_ear: 1.0,
            state: LivenessState::Unverified,
            blinks: Vec::new(),
        }
    }

    /// Feed one frame's EAR. Returns true if this frame completed a blink.
    pub fn observe(&mut self, ear: f32, timestamp_ms: i64) -> bool {
        let closed = ear < self.threshold;
        let was_closed = self.last_ear < self.threshold;
        self.last_ear = ear;

        if !closed || was_closed {
            return false;
        }

        self.blinks.push(Blink { ear, timestamp_ms });
        if self.state == LivenessState::Unverified {
            tracing::info!(ear, timestamp_ms, "blink detected; liveness verified");
            self.state = LivenessState::Verified;
        } else {
            tracing::debug!(ear, count = self.blinks.len(), "blink detected");
        }
        true
    }

    pub fn state(&self) -> LivenessState {
        self.state
    }

    pub fn is_verified(&self) -> bool {
        self.state == LivenessState::Verified
    }

    pub fn blinks(&self) -> &[Blink] {
        &self.blinks
    }

    /// Back to `Unverified` with an empty blink history.
    pub fn reset(&mut self) {
        *self = Self::new(self.threshold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mesh with both eyes 10 units wide and `opening` units tall.
    fn mesh_with_eyes(opening: f32) -> Vec<Landmark> {
        let mut mesh = vec![Landmark::new(0.0, 0.0, 0.0); 468];
        for (eye, x0) in [(Eye::Left, 100.0), (Eye::Right, 200.0)] {
            let [p1, p2, p3, p4, p5, p6] = eye.points();
            mesh[p1] = Landmark::new(x0, 50.0, 0.0);
            mesh[p4] = Landmark::new(x0 + 10.0, 50.0, 0.0);
            mesh[p2] = Landmark::new(x0 + 3.0, 50.0 - opening / 2.0, 0.0);
            mesh[p3] = Landmark::new(x0 + 7.0, 50.0 - opening / 2.0, 0.0);
            mesh[p5] = Landmark::new(x0 + 7.0, 50.0 + opening / 2.0, 0.0);
            mesh[p6] = Landmark::new(x0 + 3.0, 50.0 + opening / 2.0, 0.0);
        }
        mesh
    }

    #[test]
    fn test_ear_geometry() {
        let mesh = mesh_with_eyes(3.0);
        let left = eye_aspect_ratio(&mesh, Eye::Left).unwrap();
        let right = eye_aspect_ratio(&mesh, Eye::Right).unwrap();
        assert!((left - 0.3).abs() < 1e-6);
        assert!((right - 0.3).abs() < 1e-6);
        assert!((combined_ear(&mesh).unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_ear_short_mesh() {
        let mesh = vec![Landmark::new(1.0, 1.0, 1.0); 100];
        assert!(eye_aspect_ratio(&mesh, Eye::Right).is_none());
        // Lid points 144..160 are beyond a 100-point mesh.
        assert!(eye_aspect_ratio(&mesh, Eye::Left).is_none());
        assert!(combined_ear(&mesh).is_none());
    }

    #[test]
    fn test_single_blink_for_sustained_closure() {
        let mut gate = LivenessGate::default();
        let ears = [0.5, 0.5, 0.1, 0.1, 0.5];
        let fired: Vec<bool> = ears
            .iter()
            .enumerate()
            .map(|(i, &ear)| gate.observe(ear, i as i64 * 100))
            .collect();
        assert_eq!(fired, vec![false, false, true, false, false]);
        assert_eq!(gate.blinks().len(), 1);
        assert_eq!(gate.blinks()[0].timestamp_ms, 200);
        assert!(gate.is_verified());
    }

    #[test]
    fn test_open_eyes_stay_unverified() {
        let mut gate = LivenessGate::default();
        for i in 0..20 {
            gate.observe(0.35, i);
        }
        assert_eq!(gate.state(), LivenessState::Unverified);
        assert!(gate.blinks().is_empty());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut gate = LivenessGate::default();
        assert!(!gate.observe(DEFAULT_EAR_THRESHOLD, 0));
        assert!(gate.observe(0.19, 1));
    }

    #[test]
    fn test_second_blink_recorded_state_unchanged() {
        let mut gate = LivenessGate::default();
        for (i, ear) in [0.3, 0.1, 0.3, 0.1, 0.3].into_iter().enumerate() {
            gate.observe(ear, i as i64);
        }
        assert_eq!(gate.blinks().len(), 2);
        assert_eq!(gate.state(), LivenessState::Verified);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut gate = LivenessGate::default();
        gate.observe(0.1, 0);
        gate.reset();
        assert_eq!(gate.state(), LivenessState::Unverified);
        assert!(gate.blinks().is_empty());
        // Last EAR is open again after reset, so a closed frame counts.
        assert!(gate.observe(0.1, 1));
    }

    #[test]
    fn test_mesh_blink_sequence() {
        let mut gate = LivenessGate::default();
        for (i, opening) in [3.0, 3.0, 0.5, 3.0].into_iter().enumerate() {
            let ear = combined_ear(&mesh_with_eyes(opening)).unwrap();
            gate.observe(ear, i as i64);
        }
        assert!(gate.is_verified());
    }
}
