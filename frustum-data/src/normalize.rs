//! Geometric and statistical normalization of frustums.
//!
//! Two primitives, applied in a fixed order by the training pipeline:
//!
//! 1. [`rotate_to_center`]: rotate about the vertical axis so the top-down
//!    centroid direction lines up with the depth (X) axis.
//! 2. [`scale_standard`] / [`scale_with_stats`]: standardize coordinates to
//!    zero mean / unit variance.
//!
//! The ordering matters: standardizing before rotation would compute the
//! statistics on a non-canonical orientation.

use glam::{Mat2, Vec3};
use thiserror::Error;
use tracing::trace;

use crate::types::{Frustum, LabelledPoint};

/// Standard deviations below this are treated as zero variance.
const MIN_STD: f32 = 1e-6;

/// Errors from the normalization primitives.
///
/// Both indicate unusable input data (a degenerate frustum), not transient
/// conditions; callers abort rather than retry.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The top-down centroid sits at the origin, so no rotation direction
    /// is defined.
    #[error("top-down centroid has zero norm, rotation is undefined")]
    DegenerateCentroid,

    /// A coordinate column has (near-)zero variance, so standardization
    /// would divide by zero.
    #[error("zero variance on the {axis} axis, standardization is undefined")]
    DegenerateScale { axis: char },

    /// The frustum has no points, so there are no statistics to compute.
    #[error("cannot standardize an empty frustum")]
    EmptyFrustum,
}

/// Per-column standardization statistics for the three coordinate axes.
///
/// Computed once over the training set and reused verbatim for validation
/// and inference; recomputing per split causes train/serve skew. The pair
/// is serializable so it can be persisted next to any trained model.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScaleStats {
    /// Per-axis standard deviation (the divisor).
    pub scale: Vec3,
    /// Per-axis mean (the offset).
    pub mean: Vec3,
}

/// Rotate a frustum about the vertical axis so its top-down centroid
/// direction aligns with the depth (X) axis.
///
/// Only the X,Y coordinates move; Z and the label pass through untouched.
/// The transform is rigid, so point count and pairwise distances are
/// preserved.
///
/// The angle is the arc-cosine of the normalized X component of the
/// centroid, so the sign of the centroid's Y component is ignored; frustums
/// come from a forward-facing sensor where this is well behaved.
///
/// # Errors
///
/// [`NormalizeError::DegenerateCentroid`] when the centroid has zero norm
/// (all points share X = Y = 0, or the frustum is empty).
pub fn rotate_to_center(frustum: &Frustum) -> Result<Frustum, NormalizeError> {
    let centroid = frustum.centroid_topdown();
    let norm = centroid.length();
    if norm <= f32::EPSILON {
        return Err(NormalizeError::DegenerateCentroid);
    }

    let angle = (centroid.x / norm).clamp(-1.0, 1.0).acos();
    trace!(angle, "rotating frustum to center");

    // Row-vector convention from the persisted data, so rotate by -angle.
    let rotation = Mat2::from_angle(-angle);

    let points = frustum
        .points
        .iter()
        .map(|p| {
            let xy = rotation * p.position.truncate();
            LabelledPoint::new(Vec3::new(xy.x, xy.y, p.position.z), p.label)
        })
        .collect();

    Ok(Frustum::new(points))
}

/// Standardize the coordinate columns to zero mean / unit variance and
/// return the statistics that were used.
///
/// The mean and (population) standard deviation are computed per coordinate
/// column over all points; labels pass through untouched. The returned
/// [`ScaleStats`] let the caller aggregate statistics across many frustums
/// and later re-apply them with [`scale_with_stats`].
///
/// # Errors
///
/// [`NormalizeError::DegenerateScale`] when any coordinate column has
/// (near-)zero variance, naming the offending axis, and
/// [`NormalizeError::EmptyFrustum`] when there are no points at all.
/// Erroring here is deliberate: silently producing NaN/Inf would only
/// fail much later, deep inside training.
pub fn scale_standard(frustum: &Frustum) -> Result<(Frustum, ScaleStats), NormalizeError> {
    if frustum.is_empty() {
        return Err(NormalizeError::EmptyFrustum);
    }

    let n = frustum.len() as f32;
    let mean: Vec3 = frustum.points.iter().map(|p| p.position).sum::<Vec3>() / n;
    let var: Vec3 = frustum
        .points
        .iter()
        .map(|p| {
            let d = p.position - mean;
            d * d
        })
        .sum::<Vec3>()
        / n;
    let scale = Vec3::new(var.x.sqrt(), var.y.sqrt(), var.z.sqrt());

    for (std, axis) in [(scale.x, 'x'), (scale.y, 'y'), (scale.z, 'z')] {
        if std < MIN_STD {
            return Err(NormalizeError::DegenerateScale { axis });
        }
    }

    let stats = ScaleStats { scale, mean };
    Ok((scale_with_stats(frustum, &stats), stats))
}

/// Apply pre-computed standardization statistics to a frustum.
///
/// This is the validation/inference path: it never computes statistics of
/// its own, it only consumes the pair produced from the training set.
pub fn scale_with_stats(frustum: &Frustum, stats: &ScaleStats) -> Frustum {
    let points = frustum
        .points
        .iter()
        .map(|p| LabelledPoint::new((p.position - stats.mean) / stats.scale, p.label))
        .collect();
    Frustum::new(points)
}
