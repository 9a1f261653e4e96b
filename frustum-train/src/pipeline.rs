//! Train/val preprocessing orchestration.
//!
//! The training path computes normalization statistics; the validation
//! path only consumes them. That asymmetry is the central invariant of the
//! pipeline: both splits of one run must be standardized with the same
//! `(scale, mean)` pair, or the deployed model sees differently scaled
//! inputs than it was trained on.
//!
//! Preprocessing is a pure map over independent frustums and runs in
//! parallel; frustum order in the output matches the input.

use std::path::{Path, PathBuf};

use glam::Vec3;
use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

use frustum_data::{
    Frustum, LoaderError, NormalizeError, ScaleStats, read_raw_data, rotate_to_center,
    scale_standard, scale_with_stats,
};

/// Errors surfaced by the training input pipeline.
///
/// All of these indicate unusable input data and abort the run; none are
/// transient, so there is nothing to retry.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The loader found nothing for the requested class under the given
    /// directory.
    #[error("no frustums tagged '{class_name}' found under {}", .dir.display())]
    EmptyDataset { dir: PathBuf, class_name: String },

    /// A frustum could not be normalized; `index` identifies it within the
    /// loaded split (filename sort order).
    #[error("frustum {index}: {source}")]
    Normalize {
        index: usize,
        #[source]
        source: NormalizeError,
    },

    /// A frustum with zero points reached the resampler.
    #[error("frustum {index} has no points to sample from")]
    EmptyFrustum { index: usize },

    #[error(transparent)]
    Loader(#[from] LoaderError),
}

/// Load one split from disk, requiring at least one matching frustum.
///
/// Thin wrapper over [`read_raw_data`] that turns the loader's empty
/// result into [`PipelineError::EmptyDataset`], so zero training examples
/// halt the run with a diagnostic instead of reaching tensor assembly.
pub fn load_split(
    dir: &Path,
    class_name: &str,
    sample_limit: Option<usize>,
) -> Result<Vec<Frustum>, PipelineError> {
    let frustums = read_raw_data(dir, class_name, sample_limit)?;
    if frustums.is_empty() {
        return Err(PipelineError::EmptyDataset {
            dir: dir.to_path_buf(),
            class_name: class_name.to_owned(),
        });
    }
    Ok(frustums)
}

/// Preprocess the training split: rotate, standardize, and aggregate the
/// per-frustum statistics into the run's single global pair.
///
/// The global pair is the unweighted arithmetic mean of the per-frustum
/// `(scale, mean)` pairs; every frustum counts equally regardless of its
/// point count. Returns the standardized frustums (input order preserved)
/// together with that pair.
pub fn preprocess_raw_train(
    frustums: &[Frustum],
) -> Result<(Vec<Frustum>, ScaleStats), PipelineError> {
    assert!(
        !frustums.is_empty(),
        "preprocess_raw_train requires at least one frustum"
    );

    let normalized: Vec<(Frustum, ScaleStats)> = frustums
        .par_iter()
        .enumerate()
        .map(|(index, frustum)| {
            let rotated = rotate_to_center(frustum)
                .map_err(|source| PipelineError::Normalize { index, source })?;
            scale_standard(&rotated).map_err(|source| PipelineError::Normalize { index, source })
        })
        .collect::<Result<_, PipelineError>>()?;

    let n = normalized.len() as f32;
    let scale = normalized.iter().map(|(_, s)| s.scale).sum::<Vec3>() / n;
    let mean = normalized.iter().map(|(_, s)| s.mean).sum::<Vec3>() / n;
    let stats = ScaleStats { scale, mean };

    info!(
        count = normalized.len(),
        scale = ?stats.scale,
        mean = ?stats.mean,
        "aggregated training statistics"
    );

    Ok((normalized.into_iter().map(|(f, _)| f).collect(), stats))
}

/// Preprocess the validation split with the training run's statistics.
///
/// Rotates each frustum, then applies the *given* pair; this path never
/// computes statistics of its own. Returns the split coordinate and label
/// sequences, ready for sampling.
pub fn preprocess_raw_val(
    frustums: &[Frustum],
    stats: &ScaleStats,
) -> Result<(Vec<Vec<Vec3>>, Vec<Vec<f32>>), PipelineError> {
    let scaled: Vec<Frustum> = frustums
        .par_iter()
        .enumerate()
        .map(|(index, frustum)| {
            let rotated = rotate_to_center(frustum)
                .map_err(|source| PipelineError::Normalize { index, source })?;
            Ok(scale_with_stats(&rotated, stats))
        })
        .collect::<Result<_, PipelineError>>()?;

    Ok(data_and_label_split(&scaled))
}

/// Split frustums into aligned coordinate and label sequences.
pub fn data_and_label_split(frustums: &[Frustum]) -> (Vec<Vec<Vec3>>, Vec<Vec<f32>>) {
    let xs = frustums.iter().map(Frustum::positions).collect();
    let ys = frustums.iter().map(Frustum::labels).collect();
    (xs, ys)
}
