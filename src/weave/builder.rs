use crate::{
    extract::points::PointSet,
    foundation::error::{Stage, WovenError, WovenResult},
    weave::{
        grid::SpatialGrid,
        timing::{TimingParams, assign_timing},
    },
};

/// Rule deciding which point pairs become strands.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeavePolicy {
    /// Each point links to its `k` nearest neighbours within `max_distance`.
    KNearest {
        /// Links per point.
        k: usize,
        /// Search radius in resized-image pixels.
        max_distance: f64,
    },
    /// Each point links to every neighbour within `max_distance`, nearest first, capped at
    /// `max_links`.
    DistanceBounded {
        /// Search radius in resized-image pixels.
        max_distance: f64,
        /// Cap on links per point.
        max_links: usize,
    },
    /// Consecutive points in set order are linked when within `max_distance`.
    Chain {
        /// Largest gap that is still linked.
        max_distance: f64,
    },
}

impl Default for WeavePolicy {
    fn default() -> Self {
        Self::KNearest {
            k: 3,
            max_distance: 14.0,
        }
    }
}

impl WeavePolicy {
    fn max_distance(&self) -> f64 {
        match *self {
            Self::KNearest { max_distance, .. }
            | Self::DistanceBounded { max_distance, .. }
            | Self::Chain { max_distance } => max_distance,
        }
    }

    /// Reject zero link counts and non-positive or non-finite distances.
    pub fn validate(&self) -> WovenResult<()> {
        let d = self.max_distance();
        if !d.is_finite() || d <= 0.0 {
            return Err(WovenError::config(
                Stage::Weave,
                format!("max_distance must be a positive finite number (got {d})"),
            ));
        }
        match *self {
            Self::KNearest { k: 0, .. } => {
                Err(WovenError::config(Stage::Weave, "k must be >= 1"))
            }
            Self::DistanceBounded { max_links: 0, .. } => {
                Err(WovenError::config(Stage::Weave, "max_links must be >= 1"))
            }
            _ => Ok(()),
        }
    }
}

/// Topology and timing options for the weave.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WeaveParams {
    /// Which points get linked.
    pub policy: WeavePolicy,
    /// How linked segments are timed.
    pub timing: TimingParams,
}

impl WeaveParams {
    /// Validate the policy and timing.
    pub fn validate(&self) -> WovenResult<()> {
        self.policy.validate()?;
        self.timing.validate()
    }
}

/// A directed strand between two points of the same [`PointSet`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WeaveSegment {
    /// Index of the start point.
    pub from: u32,
    /// Index of the end point.
    pub to: u32,
    /// Pulse phase offset in `[0, 1)`.
    pub phase: f32,
    /// Seconds before the strand starts drawing.
    pub delay: f32,
    /// Glow intensity in `(0, 1]`.
    pub weight: f32,
}

/// The finished, read-only weave.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct WeaveSegments(Vec<WeaveSegment>);

impl WeaveSegments {
    pub(crate) fn from_vec(segments: Vec<WeaveSegment>) -> Self {
        Self(segments)
    }

    /// Segments in build order.
    pub fn as_slice(&self) -> &[WeaveSegment] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Latest strand start, in seconds (0 when empty).
    pub fn max_delay(&self) -> f32 {
        self.0.iter().map(|s| s.delay).fold(0.0, f32::max)
    }

    /// Check every endpoint against a point set of `point_count` points.
    pub fn validate(&self, point_count: usize) -> WovenResult<()> {
        for (n, s) in self.0.iter().enumerate() {
            if s.from as usize >= point_count || s.to as usize >= point_count {
                return Err(WovenError::input(
                    Stage::Weave,
                    format!(
                        "segment {n} ({} -> {}) references a point outside 0..{point_count}",
                        s.from, s.to
                    ),
                ));
            }
            if s.from == s.to {
                return Err(WovenError::input(
                    Stage::Weave,
                    format!("segment {n} links point {} to itself", s.from),
                ));
            }
            if !(s.delay.is_finite() && s.phase.is_finite() && s.weight.is_finite()) {
                return Err(WovenError::input(
                    Stage::Weave,
                    format!("segment {n} has non-finite timing"),
                ));
            }
        }
        Ok(())
    }
}

/// Connect `points` into a woven topology and time every strand.
///
/// Neighbour candidates are ranked by squared distance, ties broken by ascending point
/// index. A pair linked from both ends is emitted once, from the lower index. Segments
/// come out ordered by `from`, then by neighbour rank. Fewer than two points yield an
/// empty weave.
#[tracing::instrument(skip(points), fields(points = points.len()))]
pub fn build_weave(points: &PointSet, params: &WeaveParams, seed: u64) -> WovenResult<WeaveSegments> {
    params.validate()?;
    if points.len() < 2 {
        return Ok(WeaveSegments::default());
    }
    if points.len() > u32::MAX as usize {
        return Err(WovenError::config(
            Stage::Weave,
            format!("{} points exceed the u32 index range", points.len()),
        ));
    }

    let pairs = match params.policy {
        WeavePolicy::KNearest { k, max_distance } => neighbour_pairs(points, max_distance, k),
        WeavePolicy::DistanceBounded {
            max_distance,
            max_links,
        } => neighbour_pairs(points, max_distance, max_links),
        WeavePolicy::Chain { max_distance } => chain_pairs(points, max_distance),
    };

    let segments = assign_timing(points, &pairs, &params.timing, seed);
    tracing::debug!(segments = segments.len(), "built weave");
    Ok(WeaveSegments::from_vec(segments))
}

fn max_d2(max_distance: f64) -> u64 {
    (max_distance * max_distance).floor() as u64
}

fn neighbour_pairs(points: &PointSet, max_distance: f64, cap: usize) -> Vec<(u32, u32)> {
    let pts = points.as_slice();
    let grid = SpatialGrid::build(pts, max_distance);
    let limit = max_d2(max_distance);

    let mut links: Vec<Vec<u32>> = Vec::with_capacity(pts.len());
    let mut scratch = Vec::new();
    for i in 0..pts.len() {
        scratch.clear();
        grid.within(pts, i, limit, &mut scratch);
        scratch.sort_unstable();
        links.push(scratch.iter().take(cap).map(|&(_, j)| j).collect());
    }

    let mut pairs = Vec::new();
    for (i, targets) in links.iter().enumerate() {
        let i = i as u32;
        for &j in targets {
            if j < i && links[j as usize].contains(&i) {
                continue;
            }
            pairs.push((i, j));
        }
    }
    pairs
}

fn chain_pairs(points: &PointSet, max_distance: f64) -> Vec<(u32, u32)> {
    let limit = max_d2(max_distance);
    points
        .as_slice()
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0].distance_squared(&w[1]) <= limit)
        .map(|(i, _)| (i as u32, i as u32 + 1))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/weave/builder.rs"]
mod tests;
