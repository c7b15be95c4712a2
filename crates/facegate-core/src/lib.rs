//! facegate-core: Face-encoding verification pipeline.
//!
//! Turns a MediaPipe landmark mesh into a fixed-length PCA encoding, guides
//! the user into position, gates sample collection on a blink and on frame
//! quality, and decides identity claims by k-nearest-neighbour vote.

pub mod admission;
pub mod assist;
pub mod lighting;
pub mod liveness;
pub mod matcher;
pub mod normalize;
pub mod policy;
pub mod projection;
pub mod session;
pub mod types;

pub use admission::AdmissionPolicy;
pub use liveness::{LivenessGate, LivenessState};
pub use matcher::{KnnMatcher, MatchOutcome, MatchPolicy, Matcher};
pub use policy::Policy;
pub use projection::ProjectionModel;
pub use session::{CaptureSession, FrameInput, FrameOutcome, SessionMode, Submission};
pub use types::{AssistScore, BoundingBox, Encoding, GalleryEntry, Landmark, Scan};
