use crate::foundation::error::{Stage, WovenError, WovenResult};

/// Rendering and export options for one run.
///
/// Validated once with [`RenderConfig::validate`] and treated as immutable afterwards.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Logical canvas width.
    pub width: u32,
    /// Logical canvas height.
    pub height: u32,
    /// Capture and playback frame rate.
    pub fps: u32,
    /// Upper bound on captured frames.
    pub max_frames: u64,
    /// Device-pixel-ratio applied to the logical canvas when rasterizing.
    pub dpr: f64,
    /// Select the pixel-exact encoding profile.
    pub lossless: bool,
    /// Transparent background and an alpha-capable encoding profile.
    pub alpha: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            fps: 30,
            max_frames: 600,
            dpr: 2.0,
            lossless: false,
            alpha: false,
        }
    }
}

impl RenderConfig {
    /// Check sizes, rate, frame cap and dpr. With `alpha` the device surface must have even sides.
    pub fn validate(&self) -> WovenResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(WovenError::config(
                Stage::Config,
                format!(
                    "width/height must be non-zero (got {}x{})",
                    self.width, self.height
                ),
            ));
        }
        if self.fps == 0 {
            return Err(WovenError::config(Stage::Config, "fps must be non-zero"));
        }
        if self.max_frames == 0 {
            return Err(WovenError::config(
                Stage::Config,
                "max_frames must be non-zero",
            ));
        }
        if !self.dpr.is_finite() || self.dpr <= 0.0 {
            return Err(WovenError::config(
                Stage::Config,
                format!("dpr must be a positive finite number (got {})", self.dpr),
            ));
        }

        let (w, h) = self.device_size_f64();
        if w < 1.0 || h < 1.0 || w > f64::from(u16::MAX) || h > f64::from(u16::MAX) {
            return Err(WovenError::config(
                Stage::Config,
                format!(
                    "resolution {}x{} at dpr {} gives a {w}x{h} surface; each side must be within 1..={}",
                    self.width,
                    self.height,
                    self.dpr,
                    u16::MAX
                ),
            ));
        }

        if self.alpha {
            let (w, h) = self.device_size();
            if !w.is_multiple_of(2) || !h.is_multiple_of(2) {
                // yuva420p subsamples chroma 2x2.
                return Err(WovenError::config(
                    Stage::Config,
                    format!("alpha output needs an even surface size, got {w}x{h} (width/height x dpr)"),
                ));
            }
        }
        Ok(())
    }

    /// Raster size in pixels: logical size scaled by `dpr`, rounded.
    pub fn device_size(&self) -> (u32, u32) {
        let (w, h) = self.device_size_f64();
        (w as u32, h as u32)
    }

    fn device_size_f64(&self) -> (f64, f64) {
        (
            (f64::from(self.width) * self.dpr).round(),
            (f64::from(self.height) * self.dpr).round(),
        )
    }

    /// The render-relevant subset embedded into a generated program.
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.width,
            height: self.height,
            dpr: self.dpr,
            transparent: self.alpha,
        }
    }
}

/// Canvas description a program is generated for.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Logical width.
    pub width: u32,
    /// Logical height.
    pub height: u32,
    /// Device-pixel-ratio used in capture mode.
    pub dpr: f64,
    /// Leave the background transparent instead of filling it.
    pub transparent: bool,
}

impl Viewport {
    /// Affine mapping data-space pixels (`data_w x data_h`) into device pixels.
    ///
    /// The data rectangle is scaled uniformly to fit the logical canvas, centered, then
    /// multiplied by `dpr`.
    pub fn data_to_device(&self, data_w: u32, data_h: u32) -> kurbo::Affine {
        let (cw, ch) = (f64::from(self.width), f64::from(self.height));
        let (dw, dh) = (f64::from(data_w.max(1)), f64::from(data_h.max(1)));
        let scale = (cw / dw).min(ch / dh);
        let ox = (cw - dw * scale) * 0.5;
        let oy = (ch - dh * scale) * 0.5;
        kurbo::Affine::scale(self.dpr)
            * kurbo::Affine::translate((ox, oy))
            * kurbo::Affine::scale(scale)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
