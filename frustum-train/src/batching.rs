//! Epoch/batch iteration over preprocessed ragged data.
//!
//! Batches are yielded epoch-major, in dataset order within each epoch;
//! the last batch of an epoch may be short. Resampling (and augmentation,
//! on the training stream) are redrawn on every batch, so consecutive
//! epochs see independent draws of the same frustums.
//!
//! A [`Prefetcher`] can compute a bounded number of batches ahead of the
//! consumer on a worker thread without reordering them.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use glam::Vec3;
use rand::rngs::StdRng;
use tracing::debug;

use crate::augment::flip;
use crate::pipeline::PipelineError;
use crate::sampling::sample_data;

/// Aligned ragged sequences of coordinates and labels, shared read-only
/// between the consumer and the prefetch worker.
#[derive(Debug)]
pub struct RaggedDataset {
    xs: Vec<Vec<Vec3>>,
    ys: Vec<Vec<f32>>,
}

impl RaggedDataset {
    pub fn new(xs: Vec<Vec<Vec3>>, ys: Vec<Vec<f32>>) -> Self {
        assert_eq!(xs.len(), ys.len(), "coordinates and labels must align");
        assert!(!xs.is_empty(), "RaggedDataset requires at least one example");
        Self { xs, ys }
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

/// A rectangular batch of resampled examples.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledBatch {
    /// Per example, exactly `num_points` coordinate rows.
    pub points: Vec<Vec<Vec3>>,
    /// Labels aligned with `points`.
    pub labels: Vec<Vec<f32>>,
}

impl SampledBatch {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Number of batches in one pass over `count` examples.
pub fn steps_per_epoch(count: usize, batch_size: usize) -> usize {
    count.div_ceil(batch_size)
}

/// Iterator over resampled (and optionally augmented) batches across a
/// fixed number of epochs.
///
/// The random generator is owned and injected at construction, so a
/// seeded run draws a reproducible sequence of batches. After yielding an
/// error the stream is fused and returns `None`.
pub struct BatchStream {
    data: Arc<RaggedDataset>,
    num_points: usize,
    batch_size: usize,
    epochs: usize,
    augment: bool,
    rng: StdRng,
    epoch: usize,
    cursor: usize,
    failed: bool,
}

impl BatchStream {
    pub fn new(
        data: Arc<RaggedDataset>,
        num_points: usize,
        batch_size: usize,
        epochs: usize,
        augment: bool,
        rng: StdRng,
    ) -> Self {
        assert!(num_points > 0, "num_points must be positive");
        assert!(batch_size > 0, "batch_size must be positive");
        Self {
            data,
            num_points,
            batch_size,
            epochs,
            augment,
            rng,
            epoch: 0,
            cursor: 0,
            failed: false,
        }
    }
}

impl Iterator for BatchStream {
    type Item = Result<SampledBatch, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.epoch >= self.epochs {
            return None;
        }

        let start = self.cursor;
        let end = (start + self.batch_size).min(self.data.len());

        let drawn = sample_data(
            &self.data.xs[start..end],
            &self.data.ys[start..end],
            self.num_points,
            &mut self.rng,
        );
        let mut batch = match drawn {
            Ok((points, labels)) => SampledBatch { points, labels },
            Err(PipelineError::EmptyFrustum { index }) => {
                self.failed = true;
                // Report the example's position within the dataset, not
                // within the batch slice.
                return Some(Err(PipelineError::EmptyFrustum {
                    index: start + index,
                }));
            }
            Err(other) => {
                self.failed = true;
                return Some(Err(other));
            }
        };

        if self.augment {
            flip(&mut batch, &mut self.rng);
        }

        self.cursor = end;
        if self.cursor >= self.data.len() {
            self.cursor = 0;
            self.epoch += 1;
            debug!(epoch = self.epoch, "epoch boundary");
        }

        Some(Ok(batch))
    }
}

/// Bounded lookahead over a batch stream.
///
/// A worker thread computes up to `depth` batches ahead of the consumer;
/// batch order is preserved. Dropping the prefetcher disconnects the
/// channel and the worker stops at its next send.
pub struct Prefetcher {
    rx: mpsc::Receiver<Result<SampledBatch, PipelineError>>,
}

impl Prefetcher {
    pub fn new(stream: BatchStream, depth: usize) -> Self {
        let (tx, rx) = mpsc::sync_channel(depth);
        thread::spawn(move || {
            for item in stream {
                if tx.send(item).is_err() {
                    break;
                }
            }
        });
        Self { rx }
    }
}

impl Iterator for Prefetcher {
    type Item = Result<SampledBatch, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    /// Ten single-point examples; with one point each, sampling is
    /// deterministic and every row identifies its source example.
    fn tagged_dataset() -> Arc<RaggedDataset> {
        let xs = (0..10)
            .map(|i| vec![Vec3::new(i as f32, 1.0, 0.0)])
            .collect();
        let ys = (0..10).map(|i| vec![i as f32]).collect();
        Arc::new(RaggedDataset::new(xs, ys))
    }

    #[test]
    fn test_steps_per_epoch_rounds_up() {
        assert_eq!(steps_per_epoch(10, 4), 3);
        assert_eq!(steps_per_epoch(8, 4), 2);
        assert_eq!(steps_per_epoch(1, 32), 1);
    }

    #[test]
    fn test_stream_yields_all_epochs_with_short_last_batch() {
        let stream = BatchStream::new(
            tagged_dataset(),
            16,
            4,
            3,
            false,
            StdRng::seed_from_u64(0),
        );
        let batches: Vec<_> = stream.map(Result::unwrap).collect();

        assert_eq!(batches.len(), 3 * steps_per_epoch(10, 4));
        for epoch in batches.chunks(3) {
            assert_eq!(epoch[0].len(), 4);
            assert_eq!(epoch[1].len(), 4);
            assert_eq!(epoch[2].len(), 2);
        }
    }

    #[test]
    fn test_batches_follow_dataset_order_every_epoch() {
        let stream = BatchStream::new(
            tagged_dataset(),
            8,
            4,
            2,
            false,
            StdRng::seed_from_u64(0),
        );

        let mut expected = (0..10).cycle();
        for batch in stream {
            for labels in batch.unwrap().labels {
                let tag = expected.next().unwrap() as f32;
                assert!(labels.iter().all(|&l| l == tag));
            }
        }
    }

    #[test]
    fn test_empty_example_surfaces_with_dataset_index_and_fuses() {
        let xs = vec![vec![Vec3::ONE], vec![Vec3::ONE], Vec::new()];
        let ys = vec![vec![1.0], vec![0.0], Vec::new()];
        let mut stream = BatchStream::new(
            Arc::new(RaggedDataset::new(xs, ys)),
            8,
            2,
            1,
            false,
            StdRng::seed_from_u64(0),
        );

        assert!(stream.next().unwrap().is_ok());
        assert!(matches!(
            stream.next(),
            Some(Err(PipelineError::EmptyFrustum { index: 2 }))
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_prefetcher_preserves_count_and_order() {
        let stream = BatchStream::new(
            tagged_dataset(),
            8,
            4,
            2,
            false,
            StdRng::seed_from_u64(0),
        );
        let direct: Vec<_> = BatchStream::new(
            tagged_dataset(),
            8,
            4,
            2,
            false,
            StdRng::seed_from_u64(0),
        )
        .map(Result::unwrap)
        .collect();

        let prefetched: Vec<_> = Prefetcher::new(stream, 4).map(Result::unwrap).collect();
        assert_eq!(prefetched.len(), direct.len());
        // Single-point examples make sampling deterministic, so the two
        // runs must agree batch for batch.
        assert_eq!(prefetched, direct);
    }

    #[test]
    fn test_augmented_stream_keeps_labels_intact() {
        let stream = BatchStream::new(
            tagged_dataset(),
            4,
            4,
            4,
            true,
            StdRng::seed_from_u64(9),
        );

        let mut expected = (0..10).cycle();
        for batch in stream {
            for labels in batch.unwrap().labels {
                let tag = expected.next().unwrap() as f32;
                assert!(labels.iter().all(|&l| l == tag));
            }
        }
    }
}
