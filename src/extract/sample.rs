use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;

use crate::{
    extract::points::PointSet,
    foundation::error::{Stage, WovenError, WovenResult},
};

/// Enforce the point ceiling with a seeded subsample without replacement.
///
/// Sets at or under `max_points` pass through untouched. Larger sets are shuffled with a
/// `ChaCha8Rng` seeded from `seed` and truncated, so the output order is the shuffled order
/// and `(candidates, max_points, seed)` always maps to the same result.
pub fn sample_points(candidates: PointSet, max_points: usize, seed: u64) -> WovenResult<PointSet> {
    if max_points == 0 {
        return Err(WovenError::config(Stage::Sample, "max_points must be >= 1"));
    }
    if candidates.len() <= max_points {
        return Ok(candidates);
    }

    let (w, h) = (candidates.width(), candidates.height());
    let before = candidates.len();
    let mut points = candidates.into_points();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    points.shuffle(&mut rng);
    points.truncate(max_points);

    tracing::debug!(before, after = points.len(), seed, "subsampled points");
    Ok(PointSet::new(w, h, points))
}

#[cfg(test)]
#[path = "../../tests/unit/extract/sample.rs"]
mod tests;
