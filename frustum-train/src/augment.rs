//! Stochastic label-invariant augmentation.

use glam::Vec3;
use rand::Rng;

use crate::batching::SampledBatch;

/// Per-axis signs of the left-right mirror.
pub const FLIP_SIGNS: Vec3 = Vec3::new(1.0, -1.0, 1.0);

/// With probability 0.5, mirror the batch left-to-right by negating the Y
/// coordinate of every point.
///
/// Labels are untouched; the flip is a rigid transform, so per-point
/// foreground/background assignments stay valid. Applied independently on
/// every batch draw. Returns whether the flip was applied.
pub fn flip(batch: &mut SampledBatch, rng: &mut impl Rng) -> bool {
    if rng.random::<f32>() < 0.5 {
        return false;
    }

    for example in &mut batch.points {
        for position in example.iter_mut() {
            *position *= FLIP_SIGNS;
        }
    }
    true
}
