use super::*;

fn pt(x: u32, y: u32) -> FeaturePoint {
    FeaturePoint {
        x,
        y,
        nx: 0.0,
        ny: 0.0,
        mag: 1,
    }
}

fn query(grid: &SpatialGrid, points: &[FeaturePoint], i: usize, max_d2: u64) -> Vec<(u64, u32)> {
    let mut out = Vec::new();
    grid.within(points, i, max_d2, &mut out);
    out.sort_unstable();
    out
}

#[test]
fn finds_points_within_radius_only() {
    let points = vec![pt(0, 0), pt(3, 4), pt(10, 0), pt(0, 30)];
    let grid = SpatialGrid::build(&points, 5.0);
    assert_eq!(query(&grid, &points, 0, 25), vec![(25, 1)]);
    assert_eq!(query(&grid, &points, 3, 25), vec![]);
}

#[test]
fn matches_brute_force_on_scattered_points() {
    let points: Vec<FeaturePoint> = (0..400u32)
        .map(|i| pt((i * 7919) % 97, (i * 104_729) % 61))
        .collect();
    let radius = 6.0;
    let max_d2 = 36;
    let grid = SpatialGrid::build(&points, radius);

    for i in 0..points.len() {
        let mut expected: Vec<(u64, u32)> = points
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(j, q)| (points[i].distance_squared(q), j as u32))
            .filter(|&(d2, _)| d2 <= max_d2)
            .collect();
        expected.sort_unstable();
        assert_eq!(query(&grid, &points, i, max_d2), expected, "point {i}");
    }
}

#[test]
fn coincident_points_are_neighbours_at_zero() {
    let points = vec![pt(5, 5), pt(5, 5)];
    let grid = SpatialGrid::build(&points, 1.0);
    assert_eq!(query(&grid, &points, 0, 0), vec![(0, 1)]);
}

#[test]
fn full_u32_coordinate_range_is_accepted() {
    let points = vec![pt(0, 0), pt(u32::MAX, 0), pt(u32::MAX - 3, 4), pt(0, u32::MAX)];
    let grid = SpatialGrid::build(&points, 14.0);
    assert!(grid.buckets.len() <= 1024 * 4);
    assert_eq!(query(&grid, &points, 1, 196), vec![(25, 2)]);
    assert_eq!(query(&grid, &points, 0, 196), vec![]);
}

#[test]
fn far_apart_points_have_saturating_distance() {
    assert_eq!(pt(0, 0).distance_squared(&pt(u32::MAX, u32::MAX)), u64::MAX);
}
