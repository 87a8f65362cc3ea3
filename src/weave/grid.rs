use crate::extract::points::FeaturePoint;

/// Uniform bucket grid over a point slice for radius queries.
///
/// Buckets are `Vec`s filled in point order, so every query visits candidates in a
/// platform-independent order.
pub(crate) struct SpatialGrid {
    cell: u64,
    cols: u64,
    rows: u64,
    min_x: u32,
    min_y: u32,
    buckets: Vec<Vec<u32>>,
}

impl SpatialGrid {
    /// Build a grid whose cells are at least `radius` wide.
    ///
    /// Cell math runs in `u64`, so any `u32` coordinate range is accepted.
    pub(crate) fn build(points: &[FeaturePoint], radius: f64) -> Self {
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0u32, 0u32);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if points.is_empty() {
            (min_x, min_y, max_x, max_y) = (0, 0, 0, 0);
        }

        let extent_x = u64::from(max_x - min_x);
        let extent_y = u64::from(max_y - min_y);
        let span_x = extent_x as f64 + 1.0;
        let span_y = extent_y as f64 + 1.0;
        // Keep the bucket count proportional to the point count for sparse sets.
        let budget = (points.len() as f64 * 4.0).max(1024.0);
        let min_cell_for_budget = ((span_x * span_y) / budget).sqrt();
        let mut cell = radius.max(min_cell_for_budget).max(1.0).ceil() as u64;
        // Long thin extents: widen cells until the bucket count fits the budget.
        while (extent_x / cell + 1).saturating_mul(extent_y / cell + 1) > (budget as u64) * 4 {
            cell *= 2;
        }

        let cols = extent_x / cell + 1;
        let rows = extent_y / cell + 1;
        let mut buckets = vec![Vec::new(); (cols * rows) as usize];
        for (i, p) in points.iter().enumerate() {
            let (cx, cy) = cell_of(p, min_x, min_y, cell);
            buckets[(cy * cols + cx) as usize].push(i as u32);
        }

        Self {
            cell,
            cols,
            rows,
            min_x,
            min_y,
            buckets,
        }
    }

    /// Push `(distance², index)` for every point within `max_d2` of `points[i]`, excluding
    /// `i` itself.
    pub(crate) fn within(
        &self,
        points: &[FeaturePoint],
        i: usize,
        max_d2: u64,
        out: &mut Vec<(u64, u32)>,
    ) {
        let p = &points[i];
        let (cx, cy) = cell_of(p, self.min_x, self.min_y, self.cell);

        for by in cy.saturating_sub(1)..=(cy + 1).min(self.rows - 1) {
            for bx in cx.saturating_sub(1)..=(cx + 1).min(self.cols - 1) {
                for &j in &self.buckets[(by * self.cols + bx) as usize] {
                    if j as usize == i {
                        continue;
                    }
                    let d2 = p.distance_squared(&points[j as usize]);
                    if d2 <= max_d2 {
                        out.push((d2, j));
                    }
                }
            }
        }
    }
}

fn cell_of(p: &FeaturePoint, min_x: u32, min_y: u32, cell: u64) -> (u64, u64) {
    (
        u64::from(p.x - min_x) / cell,
        u64::from(p.y - min_y) / cell,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/weave/grid.rs"]
mod tests;
