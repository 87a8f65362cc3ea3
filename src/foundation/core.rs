pub use kurbo::{Affine, Point, Vec2};

/// Index of a captured frame, counted from zero.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl std::fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Virtual playback clock: time is derived from the frame index, never from wall-clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VirtualClock {
    /// Frame being produced.
    pub frame: FrameIndex,
    /// Capture frame rate.
    pub fps: u32,
}

impl VirtualClock {
    /// Clock positioned at `frame`.
    pub fn at(frame: FrameIndex, fps: u32) -> Self {
        Self { frame, fps }
    }

    /// Seconds since the start of the animation (`frame / fps`).
    pub fn seconds(self) -> f64 {
        if self.fps == 0 {
            return 0.0;
        }
        (self.frame.0 as f64) / f64::from(self.fps)
    }
}

/// A rasterized frame as RGBA8 pixels.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Straight-alpha RGBA8 copy of the pixels.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if !self.premultiplied {
            return out;
        }
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }

    /// RGB8 copy with alpha dropped; only meaningful for opaque frames.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() / 4 * 3);
        for px in self.data.chunks_exact(4) {
            out.extend_from_slice(&px[..3]);
        }
        out
    }
}

/// Straight-alpha RGB color, serialized as `[r, g, b]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb8 {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Rgb8 {
    /// Color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<[u8; 3]> for Rgb8 {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb8> for [u8; 3] {
    fn from(c: Rgb8) -> Self {
        [c.r, c.g, c.b]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
