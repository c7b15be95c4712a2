//! Nearest-neighbour identity matcher.
//!
//! A claim is accepted when enough of the query's nearest gallery neighbours
//! (across every registered identity) belong to the claimed identity.

use crate::types::{Encoding, GalleryEntry};
use serde::{Deserialize, Serialize};

/// k-NN vote parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Neighbours considered per query.
    pub neighbors: usize,
    /// Neighbours that must belong to the claimed identity.
    pub min_votes: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            neighbors: 10,
            min_votes: 7,
        }
    }
}

/// Result of evaluating one identity claim.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub accepted: bool,
    /// Neighbours among the nearest that belong to the claimed identity.
    pub votes: usize,
    /// Neighbours actually considered (≤ policy.neighbors).
    pub considered: usize,
    /// Distance to the closest gallery entry, if any.
    pub nearest_distance: Option<f32>,
}

/// Strategy for deciding an identity claim against a gallery.
pub trait Matcher {
    fn evaluate(&self, query: &Encoding, claimed: &str, gallery: &[GalleryEntry]) -> MatchOutcome;

    fn validate(&self, query: &Encoding, claimed: &str, gallery: &[GalleryEntry]) -> bool {
        self.evaluate(query, claimed, gallery).accepted
    }
}

/// Euclidean distance. Callers must pass equal-length slices.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Display-only similarity in [0, 100]: `100 − 100·d / len`.
pub fn similarity(a: &Encoding, b: &Encoding) -> f32 {
    if a.is_empty() {
        return 0.0;
    }
    let max_distance = a.len() as f32;
    let d = a.euclidean_distance(b);
    (100.0 - 100.0 * d / max_distance).clamp(0.0, 100.0)
}

/// Majority vote over the k nearest gallery entries.
#[derive(Debug, Clone, Default)]
pub struct KnnMatcher {
    pub policy: MatchPolicy,
}

impl KnnMatcher {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }
}

impl Matcher for KnnMatcher {
    fn evaluate(&self, query: &Encoding, claimed: &str, gallery: &[GalleryEntry]) -> MatchOutcome {
        let mut neighbors: Vec<(&str, f32)> = gallery
            .iter()
            .map(|entry| {
                let d = if entry.encoding.len() == query.len() {
                    query.euclidean_distance(&entry.encoding)
                } else {
                    tracing::warn!(
                        identity = %entry.identity,
                        expected = query.len(),
                        actual = entry.encoding.len(),
                        "gallery encoding dimension mismatch; ignoring entry"
                    );
                    f32::INFINITY
                };
                (entry.identity.as_str(), d)
            })
            // A poisoned (NaN/Inf) distance is never a neighbour.
            .filter(|(_, d)| d.is_finite())
            .collect();

        // Stable: equal distances keep gallery order.
        neighbors.sort_by(|a, b| a.1.total_cmp(&b.1));
        neighbors.truncate(self.policy.neighbors);

        let votes = neighbors.iter().filter(|(id, _)| *id == claimed).count();
        let considered = neighbors.len();
        let accepted = gallery.len() >= self.policy.neighbors && votes >= self.policy.min_votes;

        tracing::debug!(
            claimed,
            votes,
            considered,
            gallery = gallery.len(),
            accepted,
            "k-NN vote"
        );

        MatchOutcome {
            accepted,
            votes,
            considered,
            nearest_distance: neighbors.first().map(|(_, d)| *d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(identity: &str, values: Vec<f32>) -> GalleryEntry {
        GalleryEntry {
            identity: identity.into(),
            encoding: Encoding::new(values),
        }
    }

    /// `same` entries for alice near the origin, `other` entries for bob further out.
    fn gallery(same: usize, other: usize) -> Vec<GalleryEntry> {
        let mut g: Vec<GalleryEntry> = (0..same)
            .map(|i| entry("alice", vec![i as f32 * 0.01, 0.0]))
            .collect();
        g.extend((0..other).map(|i| entry("bob", vec![0.5 + i as f32 * 0.01, 0.0])));
        g
    }

    #[test]
    fn test_euclidean_distance() {
        assert_eq!(euclidean_distance(&[0.0, 0.0, 0.0], &[3.0, 4.0, 0.0]), 5.0);
    }

    #[test]
    fn test_seven_of_ten_accepts() {
        let query = Encoding::new(vec![0.0, 0.0]);
        assert!(KnnMatcher::default().validate(&query, "alice", &gallery(7, 3)));
    }

    #[test]
    fn test_six_of_ten_rejects() {
        let query = Encoding::new(vec![0.0, 0.0]);
        let outcome = KnnMatcher::default().evaluate(&query, "alice", &gallery(6, 4));
        assert!(!outcome.accepted);
        assert_eq!(outcome.votes, 6);
        assert_eq!(outcome.considered, 10);
    }

    #[test]
    fn test_small_gallery_rejects() {
        let query = Encoding::new(vec![0.0, 0.0]);
        let outcome = KnnMatcher::default().evaluate(&query, "alice", &gallery(9, 0));
        assert!(!outcome.accepted);
        assert_eq!(outcome.votes, 9);
    }

    #[test]
    fn test_only_nearest_ten_count() {
        // 10 bob entries closer than 10 alice entries.
        let mut g: Vec<GalleryEntry> = (0..10).map(|i| entry("alice", vec![5.0 + i as f32, 0.0])).collect();
        g.extend((0..10).map(|i| entry("bob", vec![i as f32 * 0.1, 0.0])));
        let query = Encoding::new(vec![0.0, 0.0]);
        let outcome = KnnMatcher::default().evaluate(&query, "alice", &g);
        assert_eq!(outcome.votes, 0);
        assert!(!outcome.accepted);
        assert!(KnnMatcher::default().validate(&query, "bob", &g));
    }

    #[test]
    fn test_ties_keep_gallery_order() {
        // 11 entries at identical distance: the first 10 in gallery order win.
        let mut g: Vec<GalleryEntry> = (0..3).map(|_| entry("bob", vec![1.0, 0.0])).collect();
        g.extend((0..8).map(|_| entry("alice", vec![0.0, 1.0])));
        let query = Encoding::new(vec![0.0, 0.0]);
        let outcome = KnnMatcher::default().evaluate(&query, "alice", &g);
        assert_eq!(outcome.votes, 7);
        assert!(outcome.accepted);
    }

    #[test]
    fn test_nan_query_rejected() {
        let query = Encoding::new(vec![f32::NAN, 0.0]);
        let outcome = KnnMatcher::default().evaluate(&query, "alice", &gallery(10, 10));
        assert!(!outcome.accepted);
        assert_eq!(outcome.considered, 0);
    }

    #[test]
    fn test_mismatched_dimension_ignored() {
        let mut g = gallery(7, 3);
        g.insert(0, entry("bob", vec![0.0, 0.0, 0.0]));
        let query = Encoding::new(vec![0.0, 0.0]);
        let outcome = KnnMatcher::default().evaluate(&query, "alice", &g);
        assert_eq!(outcome.votes, 7);
        assert!(outcome.accepted);
    }

    #[test]
    fn test_custom_policy() {
        let matcher = KnnMatcher::new(MatchPolicy { neighbors: 3, min_votes: 2 });
        let query = Encoding::new(vec![0.0, 0.0]);
        assert!(matcher.validate(&query, "alice", &gallery(2, 5)));
        assert!(!matcher.validate(&query, "alice", &gallery(1, 5)));
    }

    #[test]
    fn test_similarity_range() {
        let a = Encoding::new(vec![0.0; 100]);
        assert_eq!(similarity(&a, &a), 100.0);
        let mut far = vec![0.0; 100];
        far[0] = 1000.0;
        assert_eq!(similarity(&a, &Encoding::new(far)), 0.0);
        let mut near = vec![0.0; 100];
        near[0] = 10.0;
        assert!((similarity(&a, &Encoding::new(near)) - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_nearest_distance_reported() {
        let query = Encoding::new(vec![0.0, 0.0]);
        let outcome = KnnMatcher::default().evaluate(&query, "bob", &gallery(0, 3));
        assert!((outcome.nearest_distance.unwrap() - 0.5).abs() < 1e-6);
        assert!(KnnMatcher::default().evaluate(&query, "bob", &[]).nearest_distance.is_none());
    }
}
