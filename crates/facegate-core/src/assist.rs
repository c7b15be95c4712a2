//! Capture assist: scores how well an observed face box matches the target
//! capture region and tells the user which way to move.

use crate::types::{AssistScore, BoundingBox};

pub const NO_FACE_MESSAGE: &str = "No face detected";
pub const PERFECT_MESSAGE: &str = "Perfect";
pub const CLOSER_MESSAGE: &str = "Move closer";
/// Colour shown while no face is detected.
pub const NEUTRAL_COLOR: &str = "#ffffff";

/// Remapped scores above this are reported as a perfect 100.
const SNAP_THRESHOLD: f32 = 90.0;
/// Exponent of the aggregate → reported score curve.
const REMAP_EXPONENT: f32 = 1.5;
/// Hue of a perfect score (green), in degrees.
const GREEN_HUE: f32 = 120.0;

/// Box edge, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom];
}

/// Signed edge offsets between an observed box and the target.
///
/// Each offset is positive when the observed edge lies inside the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeOffsets {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl EdgeOffsets {
    pub fn between(target: &BoundingBox, observed: &BoundingBox) -> Self {
        Self {
            left: observed.tl_x - target.tl_x,
            right: target.br_x - observed.br_x,
            top: observed.tl_y - target.tl_y,
            bottom: target.br_y - observed.br_y,
        }
    }

    pub fn get(&self, edge: Edge) -> f32 {
        match edge {
            Edge::Left => self.left,
            Edge::Right => self.right,
            Edge::Top => self.top,
            Edge::Bottom => self.bottom,
        }
    }

    /// Face sits strictly inside the target on every edge.
    fn all_inside(&self) -> bool {
        Edge::ALL.iter().all(|&e| self.get(e) > 0.0)
    }

    /// Direction the subject should move to fix `edge`.
    fn correction(&self, edge: Edge) -> &'static str {
        let inside = self.get(edge) >= 0.0;
        match (edge, inside) {
            (Edge::Left, false) | (Edge::Right, true) => "Move right",
            (Edge::Left, true) | (Edge::Right, false) => "Move left",
            (Edge::Top, true) | (Edge::Bottom, false) => "Move up",
            (Edge::Top, false) | (Edge::Bottom, true) => "Move down",
        }
    }
}

/// Per-edge 0–100 sub-scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeScores {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl EdgeScores {
    pub fn from_offsets(target: &BoundingBox, offsets: &EdgeOffsets) -> Self {
        let width = target.width();
        let height = target.height();
        let sub = |offset: f32, extent: f32| (100.0 - 100.0 * offset.abs() / extent).max(0.0);
        Self {
            left: sub(offsets.left, width),
            right: sub(offsets.right, width),
            top: sub(offsets.top, height),
            bottom: sub(offsets.bottom, height),
        }
    }

    pub fn get(&self, edge: Edge) -> f32 {
        match edge {
            Edge::Left => self.left,
            Edge::Right => self.right,
            Edge::Top => self.top,
            Edge::Bottom => self.bottom,
        }
    }

    pub fn mean(&self) -> f32 {
        (self.left + self.right + self.top + self.bottom) / 4.0
    }

    /// Lowest-scoring edge; earlier edges win ties.
    pub fn worst(&self) -> Edge {
        let mut worst = Edge::Left;
        for edge in Edge::ALL {
            if self.get(edge) < self.get(worst) {
                worst = edge;
            }
        }
        worst
    }
}

/// Score an observed face box against the target capture box.
///
/// With `mirrored`, both boxes are reflected about the target's vertical
/// centre line first, compensating for a horizontally flipped front camera.
pub fn score(
    target: Option<&BoundingBox>,
    observed: Option<&BoundingBox>,
    mirrored: bool,
) -> AssistScore {
    let (Some(target), Some(observed)) = (target, observed) else {
        return no_face();
    };
    if !target.is_valid() {
        tracing::debug!(?target, "degenerate target box; treating as no face");
        return no_face();
    }

    let (target, observed) = if mirrored {
        let axis = (target.tl_x + target.br_x) / 2.0;
        (target.mirrored_about(axis), observed.mirrored_about(axis))
    } else {
        (*target, *observed)
    };

    let offsets = EdgeOffsets::between(&target, &observed);
    let scores = EdgeScores::from_offsets(&target, &offsets);

    let remapped = remap(scores.mean());

    // Under reflection the opposite-handed "inside" condition is the same
    // predicate, so one check serves both camera orientations.
    let message = if remapped >= 100.0 {
        PERFECT_MESSAGE
    } else if offsets.all_inside() {
        CLOSER_MESSAGE
    } else {
        offsets.correction(scores.worst())
    };

    AssistScore {
        score: remapped,
        message: message.to_string(),
        color_hint: color_hint(remapped),
    }
}

fn no_face() -> AssistScore {
    AssistScore {
        score: 0.0,
        message: NO_FACE_MESSAGE.to_string(),
        color_hint: NEUTRAL_COLOR.to_string(),
    }
}

/// Non-linear remap of the mean sub-score, snapping near-perfect to 100.
fn remap(aggregate: f32) -> f32 {
    let curved = (100.0 * (aggregate / 100.0).powf(REMAP_EXPONENT)).min(100.0);
    if curved > SNAP_THRESHOLD {
        100.0
    } else {
        curved
    }
}

/// `#rrggbb` shade from red (0) to green (100); white at exactly 0.
pub fn color_hint(score: f32) -> String {
    let score = score.clamp(0.0, 100.0);
    let hue = GREEN_HUE * score / 100.0;
    let lightness = if score <= 0.0 { 1.0 } else { 0.5 };
    let (r, g, b) = hsl_to_rgb(hue, 1.0, lightness);
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h {
        h if h < 1.0 => (c, x, 0.0),
        h if h < 2.0 => (x, c, 0.0),
        h if h < 3.0 => (0.0, c, x),
        h if h < 4.0 => (0.0, x, c),
        h if h < 5.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    let to_byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_byte(r), to_byte(g), to_byte(b))
}
