use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    extract::points::PointSet,
    foundation::error::{Stage, WovenError, WovenResult},
    weave::builder::WeaveSegment,
};

/// Mixed into the run seed so the weave draws from its own stream.
const WEAVE_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// How strand start times, pulse phases and intensities are derived.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimingParams {
    /// Delay spread from the top-left to the bottom-right corner.
    pub sweep_seconds: f32,
    /// Upper bound of the seeded per-strand delay jitter.
    pub jitter_seconds: f32,
    /// Floor applied to the magnitude-derived weight.
    pub min_weight: f32,
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            sweep_seconds: 4.0,
            jitter_seconds: 0.6,
            min_weight: 0.2,
        }
    }
}

impl TimingParams {
    /// Sweep and jitter must be finite and non-negative, `min_weight` in `(0, 1]`.
    pub fn validate(&self) -> WovenResult<()> {
        let ok = |v: f32| v.is_finite() && v >= 0.0;
        if !ok(self.sweep_seconds) || !ok(self.jitter_seconds) {
            return Err(WovenError::config(
                Stage::Weave,
                format!(
                    "sweep_seconds/jitter_seconds must be non-negative (got {}/{})",
                    self.sweep_seconds, self.jitter_seconds
                ),
            ));
        }
        if !(self.min_weight > 0.0 && self.min_weight <= 1.0) {
            return Err(WovenError::config(
                Stage::Weave,
                format!("min_weight must be in (0, 1] (got {})", self.min_weight),
            ));
        }
        Ok(())
    }
}

/// Turn index pairs into timed segments, in pair order.
///
/// Delay follows a diagonal sweep over the segment midpoint plus seeded jitter; the phase
/// is seeded; weight is the mean endpoint magnitude relative to the strongest point.
pub(crate) fn assign_timing(
    points: &PointSet,
    pairs: &[(u32, u32)],
    timing: &TimingParams,
    seed: u64,
) -> Vec<WeaveSegment> {
    let pts = points.as_slice();
    let diag = f64::from(points.width()) + f64::from(points.height());
    let diag = if diag > 0.0 { diag } else { 1.0 };
    let max_mag = points.max_mag();
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ WEAVE_STREAM);

    pairs
        .iter()
        .map(|&(from, to)| {
            let a = &pts[from as usize];
            let b = &pts[to as usize];

            let mid = a.position().midpoint(b.position());
            let sweep = ((mid.x + mid.y) / diag) as f32 * timing.sweep_seconds;
            let jitter = rng.random::<f32>() * timing.jitter_seconds;
            let phase = rng.random::<f32>();

            let weight = if max_mag == 0 {
                1.0
            } else {
                let mean = (f64::from(a.mag) + f64::from(b.mag)) * 0.5;
                ((mean / f64::from(max_mag)) as f32).clamp(timing.min_weight, 1.0)
            };

            WeaveSegment {
                from,
                to,
                phase: round3(phase).min(0.999),
                delay: round3(sweep + jitter),
                weight: round3(weight).max(0.001),
            }
        })
        .collect()
}

fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
#[path = "../../tests/unit/weave/timing.rs"]
mod tests;
