//! Offline tools: encode a single landmark mesh, or replay a recorded frame
//! stream through a capture session.

use anyhow::{bail, Context, Result};
use facegate_core::session::{encode, Hold};
use facegate_core::{CaptureSession, FrameInput, Landmark, Policy, ProjectionModel, SessionMode, Submission};
use std::io::BufRead;
use std::path::Path;

pub struct ReplayOptions<'a> {
    pub identity: &'a str,
    pub mode: SessionMode,
    pub mirrored: bool,
    pub width: f32,
    pub height: f32,
    pub policy: Policy,
}

pub fn load_policy(path: Option<&Path>) -> Result<Policy> {
    match path {
        Some(p) => Policy::load(p).with_context(|| format!("failed to load policy {}", p.display())),
        None => Ok(Policy::default()),
    }
}

pub fn run_encode(model_path: &Path, landmarks_path: &Path) -> Result<()> {
    let model = ProjectionModel::load(model_path)?;
    let raw = std::fs::read_to_string(landmarks_path)
        .with_context(|| format!("failed to read {}", landmarks_path.display()))?;
    let landmarks: Vec<Landmark> =
        serde_json::from_str(&raw).context("landmarks must be a JSON array of [x, y, z]")?;
    let encoding = encode(&landmarks, &model)?;
    println!("{}", serde_json::to_string(&encoding)?);
    Ok(())
}

/// Parse a JSON-lines frame recording; blank lines are skipped.
pub fn read_frames(reader: impl BufRead) -> Result<Vec<FrameInput>> {
    let mut frames = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame = serde_json::from_str(&line).with_context(|| format!("frame on line {}", n + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

/// Drive a session over the recorded frames and return its submission.
pub fn replay(frames: &[FrameInput], model: &ProjectionModel, opts: ReplayOptions<'_>) -> Result<Submission> {
    let mut session = CaptureSession::new(
        opts.identity,
        opts.mode,
        opts.policy,
        opts.width,
        opts.height,
        opts.mirrored,
    );

    for frame in frames {
        let out = session.process_frame(frame, model);
        let ear = out.ear.map_or_else(|| "-".to_string(), |e| format!("{e:.3}"));
        let status = match out.hold {
            None => format!("admitted {}/{}", session.scans().len(), session.target_count()),
            Some(Hold::AwaitingBlink) => "waiting for blink".to_string(),
            Some(hold) => format!("{hold:?}"),
        };
        println!(
            "{:>8} ms  score {:>5.1}  {:<8}  {:<18}  ear {:<6}{}  {}",
            frame.timestamp_ms,
            out.assist.score,
            out.assist.color_hint,
            out.assist.message,
            ear,
            if out.blinked { "  blink" } else { "" },
            status,
        );
        if session.is_complete() {
            break;
        }
    }

    match session.submission() {
        Some(submission) => Ok(submission),
        None => bail!(
            "recording ended with {}/{} scans collected",
            session.scans().len(),
            session.target_count()
        ),
    }
}
