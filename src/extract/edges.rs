use std::path::Path;

use image::{DynamicImage, GrayImage, imageops::FilterType};

use crate::{
    extract::points::{FeaturePoint, PointSet},
    foundation::error::{Stage, WovenError, WovenResult},
};

/// Extraction and sampling options.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExtractParams {
    /// Longest side of the working image; larger inputs are downscaled.
    pub max_dim: u32,
    /// Minimum Sobel magnitude for a pixel to become a candidate.
    pub threshold: f32,
    /// Stride between visited rows and columns.
    pub sample_rate: u32,
    /// Ceiling on the number of points kept after sampling.
    pub max_points: usize,
    /// Seed for every pseudo-random decision of a run.
    pub seed: u64,
}

impl Default for ExtractParams {
    fn default() -> Self {
        Self {
            max_dim: 520,
            threshold: 95.0,
            sample_rate: 2,
            max_points: 50_000,
            seed: 123,
        }
    }
}

impl ExtractParams {
    /// Reject zero `max_dim`, `sample_rate` or `max_points` and non-finite or negative thresholds.
    pub fn validate(&self) -> WovenResult<()> {
        if self.max_dim == 0 {
            return Err(WovenError::config(Stage::Extract, "max_dim must be >= 1"));
        }
        if self.sample_rate == 0 {
            return Err(WovenError::config(
                Stage::Extract,
                "sample_rate must be >= 1",
            ));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(WovenError::config(
                Stage::Extract,
                format!(
                    "threshold must be a non-negative finite number (got {})",
                    self.threshold
                ),
            ));
        }
        if self.max_points == 0 {
            return Err(WovenError::config(Stage::Sample, "max_points must be >= 1"));
        }
        Ok(())
    }
}

/// Decode the image at `path`.
pub fn load_image(path: &Path) -> WovenResult<DynamicImage> {
    let reader = image::ImageReader::open(path).map_err(|e| {
        WovenError::input(
            Stage::Extract,
            format!("cannot open image '{}': {e}", path.display()),
        )
    })?;
    let reader = reader.with_guessed_format().map_err(|e| {
        WovenError::input(
            Stage::Extract,
            format!("cannot read image '{}': {e}", path.display()),
        )
    })?;
    reader.decode().map_err(|e| {
        WovenError::input(
            Stage::Extract,
            format!("cannot decode image '{}': {e}", path.display()),
        )
    })
}

/// Decode the image at `path` and extract its candidate points.
pub fn extract_points_from_path(path: &Path, params: &ExtractParams) -> WovenResult<PointSet> {
    let img = load_image(path)?;
    extract_points(&img, params)
}

/// Edge-derived candidate points of `img`, in row-major order.
///
/// The result may hold far more points than `max_points`; see
/// [`crate::sample_points`] for the reduction step.
#[tracing::instrument(skip(img), fields(src_w = img.width(), src_h = img.height()))]
pub fn extract_points(img: &DynamicImage, params: &ExtractParams) -> WovenResult<PointSet> {
    params.validate()?;

    let gray = downscaled_luma(img, params.max_dim);
    let (w, h) = gray.dimensions();
    let step = params.sample_rate as usize;

    let mut points = Vec::new();
    if w >= 3 && h >= 3 {
        for y in (1..h - 1).step_by(step) {
            for x in (1..w - 1).step_by(step) {
                let (gx, gy) = sobel_at(&gray, x, y);
                let mag = (gx * gx + gy * gy).sqrt();
                if mag >= params.threshold {
                    let inv = if mag > 0.0 { 1.0 / mag } else { 0.0 };
                    points.push(FeaturePoint {
                        x,
                        y,
                        nx: round3(gx * inv),
                        ny: round3(gy * inv),
                        mag: mag as u32,
                    });
                }
            }
        }
    }

    if points.is_empty() {
        return Err(WovenError::empty_result(
            Stage::Extract,
            format!(
                "no edge response >= threshold {} in {w}x{h} working image (max_dim={}, sample_rate={})",
                params.threshold, params.max_dim, params.sample_rate
            ),
        ));
    }

    tracing::debug!(candidates = points.len(), w, h, "extracted edge points");
    Ok(PointSet::new(w, h, points))
}

/// Longest side clamped to `max_dim` (aspect preserved, never upscaled), as 8-bit luma.
pub(crate) fn downscaled_luma(img: &DynamicImage, max_dim: u32) -> GrayImage {
    let (w, h) = (img.width(), img.height());
    let scale = (f64::from(max_dim) / f64::from(w.max(1)))
        .min(f64::from(max_dim) / f64::from(h.max(1)))
        .min(1.0);
    if scale < 1.0 {
        let new_w = ((f64::from(w) * scale) as u32).max(1);
        let new_h = ((f64::from(h) * scale) as u32).max(1);
        img.resize_exact(new_w, new_h, FilterType::Triangle)
            .to_luma8()
    } else {
        img.to_luma8()
    }
}

/// 3x3 Sobel response at an interior pixel.
fn sobel_at(gray: &GrayImage, x: u32, y: u32) -> (f32, f32) {
    let p = |dx: i32, dy: i32| -> f32 {
        let px = (x as i32 + dx) as u32;
        let py = (y as i32 + dy) as u32;
        f32::from(gray.get_pixel(px, py).0[0])
    };

    let gx = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1)) - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
    let gy = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1)) - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));
    (gx, gy)
}

fn round3(v: f32) -> f32 {
    // `+ 0.0` folds -0.0 into 0.0 so equal inputs serialize identically.
    (v * 1000.0).round() / 1000.0 + 0.0
}

#[cfg(test)]
#[path = "../../tests/unit/extract/edges.rs"]
mod tests;
