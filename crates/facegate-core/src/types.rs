use serde::{Deserialize, Serialize};

/// Number of points in a MediaPipe face mesh.
pub const LANDMARK_COUNT: usize = 468;
/// Length of a flattened landmark set (x, y, z per point).
pub const FLAT_LANDMARK_LEN: usize = LANDMARK_COUNT * 3;
/// Dimension of a PCA face encoding.
pub const ENCODING_DIM: usize = 100;

/// A single 3-D facial keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Midpoint between two landmarks.
    pub fn midpoint(&self, other: &Landmark) -> Landmark {
        Landmark {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
        }
    }

    /// Planar (x/y only) distance between two landmarks.
    pub fn distance_2d(&self, other: &Landmark) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

impl From<[f32; 3]> for Landmark {
    fn from(p: [f32; 3]) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

impl From<Landmark> for [f32; 3] {
    fn from(l: Landmark) -> Self {
        [l.x, l.y, l.z]
    }
}

/// Face bounding box in frame pixel coordinates.
///
/// A valid detection has `br_x > tl_x` and `br_y > tl_y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub tl_x: f32,
    pub tl_y: f32,
    pub br_x: f32,
    pub br_y: f32,
}

impl BoundingBox {
    pub fn new(tl_x: f32, tl_y: f32, br_x: f32, br_y: f32) -> Self {
        Self { tl_x, tl_y, br_x, br_y }
    }

    pub fn width(&self) -> f32 {
        self.br_x - self.tl_x
    }

    pub fn height(&self) -> f32 {
        self.br_y - self.tl_y
    }

    pub fn is_valid(&self) -> bool {
        self.br_x > self.tl_x && self.br_y > self.tl_y
    }

    /// Ideal capture region for a frame: the middle half horizontally and
    /// the middle five-sevenths vertically.
    pub fn target_for_frame(width: f32, height: f32) -> Self {
        Self {
            tl_x: width / 4.0,
            tl_y: height / 7.0,
            br_x: 3.0 * width / 4.0,
            br_y: 6.0 * height / 7.0,
        }
    }

    /// Reflect horizontally about the vertical line `x = axis`.
    pub fn mirrored_about(&self, axis: f32) -> Self {
        Self {
            tl_x: 2.0 * axis - self.br_x,
            tl_y: self.tl_y,
            br_x: 2.0 * axis - self.tl_x,
            br_y: self.br_y,
        }
    }
}

/// PCA-reduced signature of one facial scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding {
    pub values: Vec<f32>,
}

impl Encoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Euclidean distance to another encoding of the same dimension.
    pub fn euclidean_distance(&self, other: &Encoding) -> f32 {
        crate::matcher::euclidean_distance(&self.values, &other.values)
    }
}

impl From<Vec<f32>> for Encoding {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// Positioning feedback for one detection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistScore {
    /// Quality in [0, 100].
    pub score: f32,
    pub message: String,
    /// `#rrggbb` shade between red (0) and green (100).
    pub color_hint: String,
}

/// One admitted sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub encoding: Encoding,
    pub quality_score: f32,
    pub timestamp_ms: i64,
}

/// A recorded open→closed eye transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blink {
    pub ear: f32,
    pub timestamp_ms: i64,
}

/// One registered encoding with its owning identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub identity: String,
    pub encoding: Encoding,
}
