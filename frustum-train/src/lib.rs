//! Frustum Training Crate
//!
//! The training-side input pipeline for a per-point frustum classifier:
//! train/val preprocessing around a single global statistics pair,
//! fixed-size resampling of ragged point sets, left-right flip
//! augmentation, and batched epoch iteration with bounded prefetch.
//!
//! The classifier itself (network architecture, optimizer, checkpointing)
//! is a downstream consumer of the batches produced here.
//!
//! ## Modules
//!
//! - [`pipeline`]: train/val preprocessing orchestration
//! - [`sampling`]: fixed-size resampling with replacement
//! - [`augment`]: stochastic label-invariant augmentation
//! - [`batching`]: epoch/batch iteration and prefetch

pub mod augment;
pub mod batching;
pub mod pipeline;
pub mod sampling;

pub use augment::{FLIP_SIGNS, flip};
pub use batching::{BatchStream, Prefetcher, RaggedDataset, SampledBatch, steps_per_epoch};
pub use pipeline::{
    PipelineError, data_and_label_split, load_split, preprocess_raw_train, preprocess_raw_val,
};
pub use sampling::sample_data;
