use crate::{
    foundation::core::Rgb8,
    foundation::error::{Stage, WovenError, WovenResult},
    program::data::EffectData,
};

/// Version tag of the drawing logic shared by the bundled template and [`crate::CpuHost`].
pub const STYLE_VERSION: &str = "woven-glow/1";

/// Constants of the woven-glow look.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StyleParams {
    /// Seconds a strand takes to draw from its start point to its end point.
    pub strand_seconds: f32,
    /// Seconds the finished weave stays on screen.
    pub hold_seconds: f32,
    /// Glow pulse frequency.
    pub pulse_hz: f32,
    /// Core line width, logical pixels.
    pub line_width: f32,
    /// Glow halo width, logical pixels.
    pub glow_width: f32,
    /// Radius of the spark at a drawing strand's tip.
    pub head_radius: f32,
    /// Opacity of the static point dots (0 hides them).
    pub point_alpha: f32,
    /// Strand and glow color.
    pub color: Rgb8,
    /// Fill used when the viewport is not transparent.
    pub background: Rgb8,
}

impl Default for StyleParams {
    fn default() -> Self {
        Self {
            strand_seconds: 1.6,
            hold_seconds: 1.0,
            pulse_hz: 0.5,
            line_width: 0.9,
            glow_width: 4.0,
            head_radius: 1.6,
            point_alpha: 0.18,
            color: Rgb8::new(120, 220, 255),
            background: Rgb8::new(5, 8, 16),
        }
    }
}

impl StyleParams {
    /// Durations and widths must be finite and non-negative, `strand_seconds` positive and
    /// `point_alpha` in `[0, 1]`.
    pub fn validate(&self) -> WovenResult<()> {
        let fields = [
            ("strand_seconds", self.strand_seconds),
            ("hold_seconds", self.hold_seconds),
            ("pulse_hz", self.pulse_hz),
            ("line_width", self.line_width),
            ("glow_width", self.glow_width),
            ("head_radius", self.head_radius),
        ];
        for (name, v) in fields {
            if !v.is_finite() || v < 0.0 {
                return Err(WovenError::config(
                    Stage::Program,
                    format!("style.{name} must be non-negative (got {v})"),
                ));
            }
        }
        if self.strand_seconds <= 0.0 {
            return Err(WovenError::config(
                Stage::Program,
                "style.strand_seconds must be > 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.point_alpha) {
            return Err(WovenError::config(
                Stage::Program,
                format!("style.point_alpha must be in [0, 1] (got {})", self.point_alpha),
            ));
        }
        Ok(())
    }

    /// Eased drawing progress of a strand at time `t`, in `[0, 1]`.
    pub(crate) fn strand_progress(&self, t: f64, delay: f32) -> f64 {
        let p = ((t - f64::from(delay)) / f64::from(self.strand_seconds)).clamp(0.0, 1.0);
        1.0 - (1.0 - p).powi(3)
    }

    /// Pulsing glow intensity of a strand at time `t`.
    pub(crate) fn intensity(&self, t: f64, weight: f32, phase: f32) -> f64 {
        let wave = (std::f64::consts::TAU * (t * f64::from(self.pulse_hz) + f64::from(phase))).sin();
        f64::from(weight) * (0.65 + 0.35 * wave)
    }
}

/// Natural length of a program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timeline {
    /// Last strand finished plus the hold.
    pub duration_seconds: f64,
}

impl Timeline {
    /// Length of `data` animated in `style`, snapped to microseconds.
    pub fn of(data: &EffectData, style: &StyleParams) -> Self {
        let draw = if data.segments().is_empty() {
            0.0
        } else {
            f64::from(data.segments().max_delay()) + f64::from(style.strand_seconds)
        };
        // Inputs are f32; snap to microseconds so 2.4 + 1.6 + 1.0 is exactly 5.0.
        let duration = ((draw + f64::from(style.hold_seconds)) * 1e6).round() / 1e6;
        Self {
            duration_seconds: duration,
        }
    }

    /// `ceil(duration * fps)`, at least one frame.
    pub fn natural_frames(&self, fps: u32) -> u64 {
        let exact = self.duration_seconds * f64::from(fps);
        // Absorb float noise so 2.0s at 30fps is 60 frames, not 61.
        ((exact - 1e-9).ceil().max(1.0)) as u64
    }
}

#[cfg(test)]
#[path = "../../tests/unit/program/style.rs"]
mod tests;
