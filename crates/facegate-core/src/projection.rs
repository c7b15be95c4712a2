//! PCA projector: maps a flattened face mesh to a 100-dimensional encoding.
//!
//! The projection is pre-fitted offline and loaded once per process. Two
//! artifact layouts are accepted:
//!
//! - native: `{ "mean": [...], "components": [[...], ...], "scale": [...]? }`
//!   with components stored row-per-axis (n_components × n_features);
//! - `ml-pca` export: `{ "means": [...], "U": [[...]], "stdevs": [...], "scale": bool,
//!   "center": bool, "excludedComponents": n }` with `U` stored features × components.

use crate::types::{Encoding, ENCODING_DIM, FLAT_LANDMARK_LEN};
use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("projection model not found: {0}")]
    ModelNotFound(String),
    #[error("projection model I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("projection model parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("malformed projection model: {0}")]
    Shape(String),
    #[error("input has {actual} features, model expects {expected}")]
    InputMismatch { expected: usize, actual: usize },
    #[error("projection produced {actual} components, expected {expected}")]
    ProjectionDimensionMismatch { expected: usize, actual: usize },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModelFile {
    Native {
        mean: Vec<f32>,
        components: Vec<Vec<f32>>,
        #[serde(default)]
        scale: Option<Vec<f32>>,
    },
    MlPca {
        means: Vec<f32>,
        #[serde(rename = "U")]
        u: Vec<Vec<f32>>,
        #[serde(default)]
        stdevs: Vec<f32>,
        #[serde(default)]
        scale: bool,
        #[serde(default = "default_center")]
        center: bool,
        #[serde(rename = "excludedComponents", default)]
        excluded_components: usize,
    },
}

fn default_center() -> bool {
    true
}

/// Pre-fitted linear projection (mean, optional per-feature scale, component matrix).
#[derive(Debug, Clone)]
pub struct ProjectionModel {
    mean: Array1<f32>,
    scale: Option<Array1<f32>>,
    /// n_components × n_features.
    components: Array2<f32>,
}

impl ProjectionModel {
    /// Load a projection artifact from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ProjectionError> {
        if !path.exists() {
            return Err(ProjectionError::ModelNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        let model = Self::from_json(&raw)?;

        tracing::info!(
            path = %path.display(),
            features = model.n_features(),
            components = model.n_components(),
            scaled = model.scale.is_some(),
            "loaded PCA projection model"
        );

        Ok(model)
    }

    /// Parse either artifact layout from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, ProjectionError> {
        match serde_json::from_str::<ModelFile>(raw)? {
            ModelFile::Native {
                mean,
                components,
                scale,
            } => Self::from_parts(mean, components, scale),
            ModelFile::MlPca {
                means,
                u,
                stdevs,
                scale,
                center,
                excluded_components,
            } => {
                let n_features = u.len();
                let total = u.first().map(Vec::len).unwrap_or(0);
                let kept = total.checked_sub(excluded_components).ok_or_else(|| {
                    ProjectionError::Shape(format!(
                        "{excluded_components} excluded components but U has only {total}"
                    ))
                })?;
                if u.iter().any(|row| row.len() != total) {
                    return Err(ProjectionError::Shape("ragged U matrix".into()));
                }
                // Transpose U (features × components) into row-per-axis form.
                let components: Vec<Vec<f32>> = (0..kept)
                    .map(|c| u.iter().map(|row| row[c]).collect())
                    .collect();
                let mean = if center { means } else { vec![0.0; n_features] };
                let scale = if scale { Some(stdevs) } else { None };
                Self::from_parts(mean, components, scale)
            }
        }
    }

    /// Build a model from its parts, validating shapes.
    pub fn from_parts(
        mean: Vec<f32>,
        components: Vec<Vec<f32>>,
        scale: Option<Vec<f32>>,
    ) -> Result<Self, ProjectionError> {
        let n_features = mean.len();
        if n_features == 0 {
            return Err(ProjectionError::Shape("empty mean vector".into()));
        }
        if let Some((i, row)) = components
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != n_features)
        {
            return Err(ProjectionError::Shape(format!(
                "component {i} has {} features, mean has {n_features}",
                row.len()
            )));
        }
        let scale = match scale {
            Some(s) if s.len() != n_features => {
                return Err(ProjectionError::Shape(format!(
                    "scale has {} features, mean has {n_features}",
                    s.len()
                )));
            }
            Some(s) if s.iter().any(|&v| v == 0.0) => {
                return Err(ProjectionError::Shape("zero entry in scale vector".into()));
            }
            other => other.map(Array1::from),
        };

        let rows = components.len();
        let flat: Vec<f32> = components.into_iter().flatten().collect();
        let components = Array2::from_shape_vec((rows, n_features), flat)
            .map_err(|e| ProjectionError::Shape(e.to_string()))?;

        if n_features != FLAT_LANDMARK_LEN || rows != ENCODING_DIM {
            tracing::warn!(
                features = n_features,
                components = rows,
                "projection model shape differs from the 1404→100 face mesh layout"
            );
        }

        Ok(Self {
            mean: Array1::from(mean),
            scale,
            components,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    /// Project a normalized landmark vector into an encoding.
    pub fn project(&self, flat: &[f32]) -> Result<Encoding, ProjectionError> {
        if flat.len() != self.n_features() {
            return Err(ProjectionError::InputMismatch {
                expected: self.n_features(),
                actual: flat.len(),
            });
        }

        let mut centered = &ArrayView1::from(flat) - &self.mean;
        if let Some(scale) = &self.scale {
            centered /= scale;
        }
        let projected = self.components.dot(&centered);

        if projected.len() != ENCODING_DIM {
            return Err(ProjectionError::ProjectionDimensionMismatch {
                expected: ENCODING_DIM,
                actual: projected.len(),
            });
        }

        Ok(Encoding::new(projected.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Axis-aligned model: component i picks feature i.
    fn identity_model(features: usize, components: usize) -> ProjectionModel {
        let rows = (0..components)
            .map(|c| (0..features).map(|f| if f == c { 1.0 } else { 0.0 }).collect())
            .collect();
        ProjectionModel::from_parts(vec![0.5; features], rows, None).unwrap()
    }

    #[test]
    fn test_project_subtracts_mean_and_multiplies() {
        let model = identity_model(FLAT_LANDMARK_LEN, ENCODING_DIM);
        let input: Vec<f32> = (0..FLAT_LANDMARK_LEN).map(|i| i as f32).collect();
        let enc = model.project(&input).unwrap();
        assert_eq!(enc.len(), ENCODING_DIM);
        assert_eq!(enc.values[0], -0.5);
        assert_eq!(enc.values[99], 98.5);
    }

    #[test]
    fn test_project_is_deterministic() {
        let rows: Vec<Vec<f32>> = (0..ENCODING_DIM)
            .map(|c| {
                (0..FLAT_LANDMARK_LEN)
                    .map(|f| ((c * 31 + f * 7) % 13) as f32 / 13.0 - 0.5)
                    .collect()
            })
            .collect();
        let model =
            ProjectionModel::from_parts(vec![0.1; FLAT_LANDMARK_LEN], rows, None).unwrap();
        let input: Vec<f32> = (0..FLAT_LANDMARK_LEN).map(|i| (i as f32).sin()).collect();
        let a = model.project(&input).unwrap();
        let b = model.project(&input).unwrap();
        for (x, y) in a.values.iter().zip(b.values.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_wrong_component_count_is_rejected() {
        let model = identity_model(FLAT_LANDMARK_LEN, 50);
        let err = model.project(&vec![0.0; FLAT_LANDMARK_LEN]).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::ProjectionDimensionMismatch { expected: 100, actual: 50 }
        ));
    }

    #[test]
    fn test_wrong_input_length_is_rejected() {
        let model = identity_model(FLAT_LANDMARK_LEN, ENCODING_DIM);
        let err = model.project(&[0.0; 10]).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::InputMismatch { expected: 1404, actual: 10 }
        ));
    }

    #[test]
    fn test_ragged_components_rejected() {
        let err = ProjectionModel::from_parts(vec![0.0; 3], vec![vec![1.0; 3], vec![1.0; 2]], None)
            .unwrap_err();
        assert!(matches!(err, ProjectionError::Shape(_)));
    }

    #[test]
    fn test_scale_divides_centered_input() {
        let rows = (0..ENCODING_DIM)
            .map(|c| (0..FLAT_LANDMARK_LEN).map(|f| if f == c { 1.0 } else { 0.0 }).collect())
            .collect();
        let model = ProjectionModel::from_parts(
            vec![1.0; FLAT_LANDMARK_LEN],
            rows,
            Some(vec![2.0; FLAT_LANDMARK_LEN]),
        )
        .unwrap();
        let input: Vec<f32> = (0..FLAT_LANDMARK_LEN).map(|i| i as f32).collect();
        let enc = model.project(&input).unwrap();
        assert_eq!(enc.values[0], -0.5);
        assert_eq!(enc.values[5], 2.0);
    }

    #[test]
    fn test_zero_scale_rejected() {
        let err = ProjectionModel::from_parts(vec![0.0; 2], vec![vec![1.0, 0.0]], Some(vec![1.0, 0.0]))
            .unwrap_err();
        assert!(matches!(err, ProjectionError::Shape(_)));
    }

    #[test]
    fn test_native_json_layout() {
        let raw = r#"{"mean": [1.0, 2.0], "components": [[1.0, 0.0]]}"#;
        let model = ProjectionModel::from_json(raw).unwrap();
        assert_eq!(model.n_features(), 2);
        assert_eq!(model.n_components(), 1);
    }

    #[test]
    fn test_ml_pca_layout_is_transposed() {
        // U is features × components: 3 features, 2 components, 1 excluded.
        let raw = r#"{
            "name": "PCA", "center": true, "scale": false,
            "means": [0.0, 0.0, 0.0],
            "stdevs": [1.0, 1.0, 1.0],
            "U": [[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]],
            "S": [2.0, 1.0],
            "excludedComponents": 1
        }"#;
        let model = ProjectionModel::from_json(raw).unwrap();
        assert_eq!(model.n_features(), 3);
        assert_eq!(model.n_components(), 1);
        assert_eq!(model.components.row(0).to_vec(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ProjectionModel::load(Path::new("/nonexistent/pca.json")).unwrap_err();
        assert!(matches!(err, ProjectionError::ModelNotFound(_)));
    }
}
