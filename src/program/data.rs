use std::path::Path;

use anyhow::Context as _;

use crate::{
    extract::points::{FeaturePoint, PointSet},
    foundation::error::{Stage, WovenError, WovenResult},
    weave::builder::WeaveSegments,
};

/// Schema version written into every data artifact.
pub const DATA_VERSION: u32 = 1;

/// The data artifact: sampled points and their weave.
///
/// Serialized as
/// `{"version":1,"w":..,"h":..,"seed":..,"points":[{"x","y","nx","ny","mag"}],"segments":[{"from","to","phase","delay","weight"}]}`.
/// Deserialization re-checks every segment against the point list.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawEffectData")]
pub struct EffectData {
    version: u32,
    w: u32,
    h: u32,
    seed: u64,
    points: Vec<FeaturePoint>,
    segments: WeaveSegments,
}

#[derive(serde::Deserialize)]
struct RawEffectData {
    version: u32,
    w: u32,
    h: u32,
    #[serde(default)]
    seed: u64,
    points: Vec<FeaturePoint>,
    #[serde(default)]
    segments: WeaveSegments,
}

impl TryFrom<RawEffectData> for EffectData {
    type Error = WovenError;

    fn try_from(raw: RawEffectData) -> WovenResult<Self> {
        if raw.version != DATA_VERSION {
            return Err(WovenError::input(
                Stage::Program,
                format!(
                    "unsupported data version {} (expected {DATA_VERSION})",
                    raw.version
                ),
            ));
        }
        raw.segments.validate(raw.points.len())?;
        Ok(Self {
            version: raw.version,
            w: raw.w,
            h: raw.h,
            seed: raw.seed,
            points: raw.points,
            segments: raw.segments,
        })
    }
}

impl EffectData {
    /// Take ownership of a point set and its weave.
    pub fn new(points: PointSet, segments: WeaveSegments, seed: u64) -> WovenResult<Self> {
        segments.validate(points.len())?;
        let (w, h) = (points.width(), points.height());
        Ok(Self {
            version: DATA_VERSION,
            w,
            h,
            seed,
            points: points.into_points(),
            segments,
        })
    }

    /// Schema version, always [`DATA_VERSION`].
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Width of the image space the points live in.
    pub fn width(&self) -> u32 {
        self.w
    }

    /// Height of the image space the points live in.
    pub fn height(&self) -> u32 {
        self.h
    }

    /// Seed the points and weave were built with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Points in artifact order.
    pub fn points(&self) -> &[FeaturePoint] {
        &self.points
    }

    /// The weave over [`Self::points`].
    pub fn segments(&self) -> &WeaveSegments {
        &self.segments
    }

    /// Compact JSON, as written to the data artifact.
    pub fn to_json(&self) -> WovenResult<String> {
        serde_json::to_string(self).map_err(|e| WovenError::serde(format!("encode data: {e}")))
    }

    /// Parse and validate an artifact.
    pub fn from_json(bytes: &[u8]) -> WovenResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            WovenError::input(Stage::Program, format!("invalid data artifact: {e}"))
        })
    }

    /// Write the compact JSON artifact to `path`.
    pub fn write(&self, path: &Path) -> WovenResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("write data artifact '{}'", path.display()))?;
        Ok(())
    }

    /// Read and validate an artifact file.
    pub fn read(path: &Path) -> WovenResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            WovenError::input(
                Stage::Program,
                format!("cannot read data artifact '{}': {e}", path.display()),
            )
        })?;
        Self::from_json(&bytes)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/program/data.rs"]
mod tests;
