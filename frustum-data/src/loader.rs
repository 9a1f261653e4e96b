//! Persisted frustum files and directory loading.
//!
//! One file per frustum, JSON with two fields: `points` (an array of
//! `[x, y, z, label]` rows) and `class_name` (the object category the
//! frustum was extracted for). Loading filters by exact class match, in
//! filename sort order.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{Frustum, LabelledPoint};

/// File extension of persisted frustum files.
pub const FRUSTUM_EXT: &str = "json";

/// Errors that can occur while reading or writing frustum files.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frustum file {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// On-disk frustum representation.
#[derive(Debug, Serialize, Deserialize)]
struct FrustumFile {
    class_name: String,
    points: Vec<[f32; 4]>,
}

/// Load a single frustum file, returning the point set and its class tag.
pub fn load_frustum(path: &Path) -> Result<(Frustum, String), LoaderError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let raw: FrustumFile =
        serde_json::from_reader(reader).map_err(|source| LoaderError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    let points = raw
        .points
        .iter()
        .map(|&[x, y, z, label]| LabelledPoint::new(glam::Vec3::new(x, y, z), label))
        .collect();

    debug!(path = %path.display(), class = %raw.class_name, "loaded frustum");
    Ok((Frustum::new(points), raw.class_name))
}

/// Write a frustum to `path` in the persisted format.
pub fn write_frustum(path: &Path, frustum: &Frustum, class_name: &str) -> Result<(), LoaderError> {
    let raw = FrustumFile {
        class_name: class_name.to_owned(),
        points: frustum
            .points
            .iter()
            .map(|p| [p.position.x, p.position.y, p.position.z, p.label])
            .collect(),
    };

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer(writer, &raw).map_err(|source| LoaderError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// List the frustum files under `dir`, sorted by filename.
///
/// A directory that does not exist yields an empty list, not an error.
pub fn list_frustum_files(dir: &Path) -> Result<Vec<PathBuf>, LoaderError> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "frustum directory does not exist");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == FRUSTUM_EXT) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load the frustums under `dir` whose class tag equals `allowed_class`.
///
/// Files with a different class tag are silently skipped; that mismatch is
/// expected and high-frequency, not an error. `sample_limit` caps the
/// number of loaded frustums, stopping early once reached; `None` or
/// `Some(0)` means no cap.
///
/// Returns an empty sequence when the directory is missing or contains no
/// matching files. Callers must handle the empty case explicitly: zero
/// training examples should halt a pipeline with a clear diagnostic.
pub fn read_raw_data(
    dir: &Path,
    allowed_class: &str,
    sample_limit: Option<usize>,
) -> Result<Vec<Frustum>, LoaderError> {
    let mut frustums = Vec::new();

    for path in list_frustum_files(dir)? {
        let (frustum, class_name) = load_frustum(&path)?;
        if class_name != allowed_class {
            continue;
        }

        frustums.push(frustum);

        if sample_limit.is_some_and(|limit| limit > 0 && frustums.len() >= limit) {
            debug!(limit = sample_limit, "sample limit reached");
            break;
        }
    }

    info!(
        dir = %dir.display(),
        class = allowed_class,
        count = frustums.len(),
        "read raw frustum data"
    );
    Ok(frustums)
}
