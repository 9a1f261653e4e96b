//! Frustum Data Crate
//!
//! Loading and normalization of labelled frustum point clouds. A frustum is
//! the variable-length point set extracted from one detection box projected
//! into 3D, with a per-point foreground/background label.
//!
//! This crate is ML-framework agnostic and focuses on the data contract:
//! the persisted frustum file format, directory loading with class
//! filtering, and the geometric/statistical normalization primitives
//! (centroid rotation and standardization).

pub mod loader;
pub mod normalize;
pub mod types;

pub use loader::{
    FRUSTUM_EXT, LoaderError, list_frustum_files, load_frustum, read_raw_data, write_frustum,
};
pub use normalize::{
    NormalizeError, ScaleStats, rotate_to_center, scale_standard, scale_with_stats,
};
pub use types::{Frustum, LabelledPoint};
