//! Tunable thresholds for capture and matching, loadable from TOML.
//!
//! ```toml
//! registration_samples = 10
//! verification_samples = 1
//!
//! [admission]
//! quality_threshold = 80.0
//! single_sample_threshold = 90.0
//! min_interval_ms = 500
//!
//! [matching]
//! neighbors = 10
//! min_votes = 7
//!
//! [liveness]
//! ear_threshold = 0.2
//!
//! [lighting]
//! min_brightness = 100.0
//! ```
//!
//! Every key is optional; omitted keys keep their defaults.

use crate::admission::AdmissionPolicy;
use crate::lighting::LightingGate;
use crate::liveness::DEFAULT_EAR_THRESHOLD;
use crate::matcher::MatchPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("policy file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("policy file parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid policy: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessPolicy {
    pub ear_threshold: f32,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub registration_samples: usize,
    pub verification_samples: usize,
    pub admission: AdmissionPolicy,
    pub matching: MatchPolicy,
    pub liveness: LivenessPolicy,
    pub lighting: LightingGate,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            registration_samples: 10,
            verification_samples: 1,
            admission: AdmissionPolicy::default(),
            matching: MatchPolicy::default(),
            liveness: LivenessPolicy::default(),
            lighting: LightingGate::default(),
        }
    }
}

impl Policy {
    pub fn from_toml_str(raw: &str) -> Result<Self, PolicyError> {
        let policy: Policy = toml::from_str(raw)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path)?;
        let policy = Self::from_toml_str(&raw)?;
        tracing::info!(path = %path.display(), ?policy, "loaded policy");
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.registration_samples == 0 || self.verification_samples == 0 {
            return Err(PolicyError::Invalid("sample counts must be at least 1".into()));
        }
        if self.matching.neighbors == 0 {
            return Err(PolicyError::Invalid("matching.neighbors must be at least 1".into()));
        }
        if self.matching.min_votes == 0 || self.matching.min_votes > self.matching.neighbors {
            return Err(PolicyError::Invalid(format!(
                "matching.min_votes must be in 1..={}, got {}",
                self.matching.neighbors, self.matching.min_votes
            )));
        }
        if self.admission.min_interval_ms < 0 {
            return Err(PolicyError::Invalid("admission.min_interval_ms must not be negative".into()));
        }
        if self.liveness.ear_threshold.is_nan() || self.liveness.ear_threshold <= 0.0 {
            return Err(PolicyError::Invalid("liveness.ear_threshold must be positive".into()));
        }
        Ok(())
    }
}
