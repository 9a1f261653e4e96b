//! Fixed-size resampling of ragged point sets.
//!
//! This is the single place where ragged data becomes rectangular: every
//! example is resampled to exactly `num_points` rows by drawing indices
//! uniformly at random *with replacement*, so a frustum may be upsampled
//! or downsampled regardless of its own point count.
//!
//! Resampling is stochastic and re-executed on every call; nothing here is
//! cached, so each epoch sees a fresh draw.

use glam::Vec3;
use rand::Rng;

use crate::pipeline::PipelineError;

/// Resample each example in the batch to exactly `num_points` rows.
///
/// For each example independently, draws `num_points` indices uniformly
/// with replacement from `[0, N_i)` and gathers the corresponding
/// coordinate rows and labels, keeping each row's coordinate/label pair
/// together. Output order within an example is the draw order.
///
/// The random generator is injected so callers can seed it for
/// reproducible tests.
///
/// # Errors
///
/// [`PipelineError::EmptyFrustum`] when an example has zero points;
/// `index` is the example's position within `xs`.
pub fn sample_data(
    xs: &[Vec<Vec3>],
    ys: &[Vec<f32>],
    num_points: usize,
    rng: &mut impl Rng,
) -> Result<(Vec<Vec<Vec3>>, Vec<Vec<f32>>), PipelineError> {
    debug_assert_eq!(xs.len(), ys.len(), "coordinates and labels must align");

    let mut out_x = Vec::with_capacity(xs.len());
    let mut out_y = Vec::with_capacity(ys.len());

    for (index, (positions, labels)) in xs.iter().zip(ys).enumerate() {
        if positions.is_empty() {
            return Err(PipelineError::EmptyFrustum { index });
        }

        let mut sampled_x = Vec::with_capacity(num_points);
        let mut sampled_y = Vec::with_capacity(num_points);
        for _ in 0..num_points {
            let i = rng.random_range(0..positions.len());
            sampled_x.push(positions[i]);
            sampled_y.push(labels[i]);
        }

        out_x.push(sampled_x);
        out_y.push(sampled_y);
    }

    Ok((out_x, out_y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ragged_example(count: usize) -> (Vec<Vec3>, Vec<f32>) {
        let positions = (0..count)
            .map(|i| Vec3::new(i as f32, i as f32 * 2.0, -(i as f32)))
            .collect();
        let labels = (0..count).map(|i| (i % 2) as f32).collect();
        (positions, labels)
    }

    #[test]
    fn test_output_is_exactly_num_points_regardless_of_input_length() {
        let (x_a, y_a) = ragged_example(3);
        let (x_b, y_b) = ragged_example(500);
        let mut rng = StdRng::seed_from_u64(7);

        let (xs, ys) =
            sample_data(&[x_a, x_b], &[y_a, y_b], 64, &mut rng).unwrap();
        for (x, y) in xs.iter().zip(&ys) {
            assert_eq!(x.len(), 64);
            assert_eq!(y.len(), 64);
        }
    }

    #[test]
    fn test_every_sampled_row_comes_from_the_source() {
        let (x, y) = ragged_example(20);
        let mut rng = StdRng::seed_from_u64(7);

        let (xs, ys) = sample_data(&[x.clone()], &[y.clone()], 100, &mut rng).unwrap();
        for (position, label) in xs[0].iter().zip(&ys[0]) {
            let source = x
                .iter()
                .position(|p| p == position)
                .expect("sampled position must exist in the source");
            assert_eq!(y[source], *label, "coordinate/label pair must stay together");
        }
    }

    #[test]
    fn test_different_seeds_draw_different_selections() {
        let (x, y) = ragged_example(1000);
        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(2);

        let (sampled_a, _) = sample_data(&[x.clone()], &[y.clone()], 256, &mut rng_a).unwrap();
        let (sampled_b, _) = sample_data(&[x], &[y], 256, &mut rng_b).unwrap();

        assert_ne!(sampled_a, sampled_b);
    }

    #[test]
    fn test_empty_example_fails_fast_with_its_index() {
        let (x, y) = ragged_example(5);
        let mut rng = StdRng::seed_from_u64(7);

        let result = sample_data(&[x, Vec::new()], &[y, Vec::new()], 16, &mut rng);
        assert!(matches!(
            result,
            Err(PipelineError::EmptyFrustum { index: 1 })
        ));
    }
}
