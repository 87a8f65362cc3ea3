/// An edge pixel picked up by the extractor.
///
/// Coordinates are integer pixels in the resized image space; `nx`/`ny` is the unit
/// gradient direction and `mag` the gradient magnitude.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeaturePoint {
    /// Column in the resized image.
    pub x: u32,
    /// Row in the resized image.
    pub y: u32,
    /// Gradient direction, x component, rounded to 3 decimals.
    pub nx: f32,
    /// Gradient direction, y component, rounded to 3 decimals.
    pub ny: f32,
    /// Gradient magnitude, truncated.
    pub mag: u32,
}

impl FeaturePoint {
    /// Pixel position as a point.
    pub fn position(&self) -> kurbo::Point {
        kurbo::Point::new(f64::from(self.x), f64::from(self.y))
    }

    /// Squared pixel distance; exact for integer coordinates.
    pub fn distance_squared(&self, other: &Self) -> u64 {
        let dx = u64::from(self.x.abs_diff(other.x));
        let dy = u64::from(self.y.abs_diff(other.y));
        (dx * dx).saturating_add(dy * dy)
    }
}

/// Ordered feature points plus the size of the image space they live in.
///
/// Order is significant downstream and there is no way to mutate the points once the
/// set is built.
#[derive(Clone, Debug, PartialEq)]
pub struct PointSet {
    width: u32,
    height: u32,
    points: Vec<FeaturePoint>,
}

impl PointSet {
    /// Wrap `points` living in a `width` x `height` image.
    pub fn new(width: u32, height: u32, points: Vec<FeaturePoint>) -> Self {
        Self {
            width,
            height,
            points,
        }
    }

    /// Width of the image space.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the image space.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in set order.
    pub fn as_slice(&self) -> &[FeaturePoint] {
        &self.points
    }

    /// Point at `index`.
    pub fn get(&self, index: usize) -> Option<&FeaturePoint> {
        self.points.get(index)
    }

    /// Unwrap into the ordered points.
    pub fn into_points(self) -> Vec<FeaturePoint> {
        self.points
    }

    /// Largest gradient magnitude in the set (0 when empty).
    pub fn max_mag(&self) -> u32 {
        self.points.iter().map(|p| p.mag).max().unwrap_or(0)
    }
}
