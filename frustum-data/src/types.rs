//! Core frustum types.
//!
//! CPU-side representations of labelled point sets. Frustums are ragged
//! (point count varies per frustum) and stay in an explicit variable-length
//! container; they only become rectangular at sampling time, downstream.

use glam::{Vec2, Vec3};

/// A single point with a per-point label.
///
/// The label is carried as a float (1.0 = foreground, 0.0 = background) to
/// match the persisted format, where it occupies the fourth column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelledPoint {
    /// Position in sensor space (X forward/depth, Y left-right, Z up).
    pub position: Vec3,
    /// Per-point label.
    pub label: f32,
}

impl LabelledPoint {
    pub fn new(position: Vec3, label: f32) -> Self {
        Self { position, label }
    }
}

/// A variable-length set of labelled points from one detection frustum.
///
/// Immutable after preprocessing: the normalization functions in
/// [`crate::normalize`] return new frustums rather than mutating in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    pub points: Vec<LabelledPoint>,
}

impl Frustum {
    pub fn new(points: Vec<LabelledPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Mean of the X,Y coordinates over all points (top-down centroid).
    ///
    /// Returns `Vec2::ZERO` for an empty frustum; callers that need a
    /// direction out of this must treat the zero vector as degenerate.
    pub fn centroid_topdown(&self) -> Vec2 {
        if self.points.is_empty() {
            return Vec2::ZERO;
        }
        let sum: Vec2 = self.points.iter().map(|p| p.position.truncate()).sum();
        sum / self.points.len() as f32
    }

    /// Coordinate rows only, labels dropped.
    pub fn positions(&self) -> Vec<Vec3> {
        self.points.iter().map(|p| p.position).collect()
    }

    /// Label column only.
    pub fn labels(&self) -> Vec<f32> {
        self.points.iter().map(|p| p.label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid_topdown() {
        let frustum = Frustum::new(vec![
            LabelledPoint::new(Vec3::new(1.0, 2.0, 5.0), 1.0),
            LabelledPoint::new(Vec3::new(3.0, 4.0, -5.0), 0.0),
        ]);
        assert_eq!(frustum.centroid_topdown(), Vec2::new(2.0, 3.0));
    }

    #[test]
    fn test_centroid_of_empty_frustum_is_zero() {
        let frustum = Frustum::new(Vec::new());
        assert_eq!(frustum.centroid_topdown(), Vec2::ZERO);
    }

    #[test]
    fn test_positions_and_labels_stay_aligned() {
        let frustum = Frustum::new(vec![
            LabelledPoint::new(Vec3::new(1.0, 0.0, 0.0), 1.0),
            LabelledPoint::new(Vec3::new(0.0, 1.0, 0.0), 0.0),
            LabelledPoint::new(Vec3::new(0.0, 0.0, 1.0), 1.0),
        ]);
        assert_eq!(frustum.positions().len(), frustum.labels().len());
        assert_eq!(frustum.labels(), vec![1.0, 0.0, 1.0]);
    }
}
