//! Capture session: the per-frame loop for one registration or verification
//! attempt.
//!
//! Every frame is scored for positioning and fed to the liveness gate. Only
//! once a blink has been seen, the frame is lit, and the admission policy
//! agrees is the landmark mesh encoded and buffered. Encoding failures drop
//! the frame, never the session.

use crate::assist;
use crate::liveness::{combined_ear, LivenessGate};
use crate::normalize::{normalize, NormalizeError};
use crate::policy::Policy;
use crate::projection::{ProjectionError, ProjectionModel};
use crate::types::{AssistScore, BoundingBox, Encoding, Landmark, Scan};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Normalize and project one landmark mesh.
pub fn encode(landmarks: &[Landmark], model: &ProjectionModel) -> Result<Encoding, EncodeError> {
    let flat = normalize(landmarks)?;
    Ok(model.project(&flat)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Registration,
    Verification,
}

/// What the frame source delivers each tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    pub timestamp_ms: i64,
    #[serde(default)]
    pub face_box: Option<BoundingBox>,
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
    /// Mean frame brightness, 0–255.
    #[serde(default)]
    pub brightness: Option<f32>,
}

/// Why a frame did not contribute a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hold {
    Complete,
    AwaitingBlink,
    TooDark,
    NotAdmitted,
    NoLandmarks,
    EncodingFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutcome {
    pub assist: AssistScore,
    pub ear: Option<f32>,
    pub blinked: bool,
    pub admitted: bool,
    pub hold: Option<Hold>,
}

/// A completed sample buffer, ready for the submission endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Submission {
    Register {
        identity: String,
        encodings: Vec<Encoding>,
        /// Assist score of each encoding's frame; empty when unknown.
        #[serde(default)]
        quality_scores: Vec<f32>,
    },
    Verify {
        identity: String,
        encoding: Encoding,
    },
}

/// State of one authentication attempt.
pub struct CaptureSession {
    identity: String,
    mode: SessionMode,
    policy: Policy,
    target: BoundingBox,
    mirrored: bool,
    gate: LivenessGate,
    scans: Vec<Scan>,
}

impl CaptureSession {
    pub fn new(
        identity: impl Into<String>,
        mode: SessionMode,
        policy: Policy,
        frame_width: f32,
        frame_height: f32,
        mirrored: bool,
    ) -> Self {
        Self {
            identity: identity.into(),
            mode,
            policy,
            target: BoundingBox::target_for_frame(frame_width, frame_height),
            mirrored,
            gate: LivenessGate::new(policy.liveness.ear_threshold),
            scans: Vec::new(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn target_box(&self) -> &BoundingBox {
        &self.target
    }

    pub fn target_count(&self) -> usize {
        match self.mode {
            SessionMode::Registration => self.policy.registration_samples,
            SessionMode::Verification => self.policy.verification_samples,
        }
    }

    pub fn liveness(&self) -> &LivenessGate {
        &self.gate
    }

    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    /// At least one scan and the target count reached.
    pub fn is_complete(&self) -> bool {
        !self.scans.is_empty() && self.scans.len() >= self.target_count()
    }

    /// Run one detection cycle.
    pub fn process_frame(&mut self, frame: &FrameInput, model: &ProjectionModel) -> FrameOutcome {
        let assist = assist::score(Some(&self.target), frame.face_box.as_ref(), self.mirrored);

        let ear = frame.landmarks.as_deref().and_then(combined_ear);
        let blinked = ear.is_some_and(|e| self.gate.observe(e, frame.timestamp_ms));

        let hold = self.admit(frame, &assist, model);

        FrameOutcome {
            assist,
            ear,
            blinked,
            admitted: hold.is_none(),
            hold,
        }
    }

    /// Try to add a scan for this frame; `None` on success.
    fn admit(
        &mut self,
        frame: &FrameInput,
        assist: &AssistScore,
        model: &ProjectionModel,
    ) -> Option<Hold> {
        if self.is_complete() {
            return Some(Hold::Complete);
        }
        if !self.gate.is_verified() {
            return Some(Hold::AwaitingBlink);
        }
        if !self.policy.lighting.is_lit(frame.brightness) {
            return Some(Hold::TooDark);
        }
        if !self.policy.admission.should_admit(
            &self.scans,
            assist,
            self.target_count(),
            frame.timestamp_ms,
        ) {
            return Some(Hold::NotAdmitted);
        }
        let Some(landmarks) = frame.landmarks.as_deref() else {
            return Some(Hold::NoLandmarks);
        };

        match encode(landmarks, model) {
            Ok(encoding) => {
                self.scans.push(Scan {
                    encoding,
                    quality_score: assist.score,
                    timestamp_ms: frame.timestamp_ms,
                });
                tracing::info!(
                    identity = %self.identity,
                    collected = self.scans.len(),
                    target = self.target_count(),
                    quality = assist.score,
                    "scan admitted"
                );
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, timestamp_ms = frame.timestamp_ms, "frame dropped: encoding failed");
                Some(Hold::EncodingFailed)
            }
        }
    }

    /// The completed buffer as a submission, or `None` while still collecting.
    pub fn submission(&self) -> Option<Submission> {
        if !self.is_complete() {
            return None;
        }
        let identity = self.identity.clone();
        Some(match self.mode {
            SessionMode::Registration => Submission::Register {
                identity,
                encodings: self.scans.iter().map(|s| s.encoding.clone()).collect(),
                quality_scores: self.scans.iter().map(|s| s.quality_score).collect(),
            },
            SessionMode::Verification => Submission::Verify {
                identity,
                encoding: self.scans.first()?.encoding.clone(),
            },
        })
    }

    /// Abandon the attempt: drop buffered scans and require a fresh blink.
    pub fn cancel(&mut self) {
        tracing::info!(
            identity = %self.identity,
            discarded = self.scans.len(),
            "capture session cancelled"
        );
        self.scans.clear();
        self.gate.reset();
    }
}
