use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use image::ImageEncoder as _;

use crate::{
    capture::host::RenderHost,
    foundation::config::RenderConfig,
    foundation::core::{FrameIndex, FrameRGBA, VirtualClock},
    foundation::error::{Stage, WovenError, WovenResult},
    program::generator::EffectProgram,
};

/// Directory holding a completed frame sequence, relative to the output directory.
pub const FRAMES_DIR: &str = "frames";
/// Directory frames are written to while a capture is in progress.
pub const STAGING_DIR: &str = ".frames.partial";

const MIN_PAD: usize = 5;

/// A complete, ordered frame sequence on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedSequence {
    /// Directory holding the frames.
    pub dir: PathBuf,
    /// Number of frames, `min(natural_frames, max_frames)`.
    pub frame_count: u64,
    /// Raster width in device pixels.
    pub width: u32,
    /// Raster height in device pixels.
    pub height: u32,
    /// Frame rate the frames were captured at.
    pub fps: u32,
    /// Frames are RGBA; otherwise RGB.
    pub has_alpha: bool,
    /// Digits in the zero-padded frame number.
    pub pad: usize,
}

impl CapturedSequence {
    /// Path of the PNG for `frame`.
    pub fn frame_path(&self, frame: FrameIndex) -> PathBuf {
        self.dir.join(frame_file_name(frame, self.pad))
    }

    /// printf-style input pattern for the encoder (`frame_%05d.png`).
    pub fn input_pattern(&self) -> PathBuf {
        self.dir.join(format!("frame_%0{}d.png", self.pad))
    }
}

/// Digits needed so that lexicographic order of `total` frame names is numeric order.
pub fn pad_width(total: u64) -> usize {
    let last = total.saturating_sub(1);
    let digits = last.checked_ilog10().map_or(1, |d| d as usize + 1);
    digits.max(MIN_PAD)
}

/// `frame_NNNNN.png` with `pad` digits.
pub fn frame_file_name(frame: FrameIndex, pad: usize) -> String {
    format!("frame_{:0pad$}.png", frame.0)
}

/// Capture `program` frame by frame into `<out_dir>/frames`.
///
/// Frames go to a staging directory first and are promoted only once every frame has
/// been written and synced. Any failure removes the staging directory and reports the
/// failing frame. Leftovers from earlier runs are cleared before starting.
#[tracing::instrument(skip(host, program, config), fields(out = %out_dir.display()))]
pub fn capture_frames(
    host: &mut dyn RenderHost,
    program: &EffectProgram,
    config: &RenderConfig,
    out_dir: &Path,
) -> WovenResult<CapturedSequence> {
    config.validate()?;

    let staging = out_dir.join(STAGING_DIR);
    let final_dir = out_dir.join(FRAMES_DIR);
    remove_dir_if_exists(&staging)?;
    remove_dir_if_exists(&final_dir)?;

    let timeline = host.load(program, config)?;
    let total = timeline.natural_frames.min(config.max_frames);
    let pad = pad_width(total);

    std::fs::create_dir_all(&staging)
        .with_context(|| format!("create staging directory '{}'", staging.display()))?;

    tracing::info!(
        frames = total,
        natural = timeline.natural_frames,
        w = timeline.surface_width,
        h = timeline.surface_height,
        "capturing frames"
    );

    for i in 0..total {
        let frame = FrameIndex(i);
        let result = capture_one(host, config, frame, &staging, pad);
        if let Err(e) = result {
            if let Err(cleanup) = std::fs::remove_dir_all(&staging) {
                tracing::warn!(dir = %staging.display(), "failed to remove staging frames: {cleanup}");
            }
            return Err(e.at_frame(frame));
        }
    }

    std::fs::rename(&staging, &final_dir).with_context(|| {
        format!(
            "promote '{}' to '{}'",
            staging.display(),
            final_dir.display()
        )
    })?;

    Ok(CapturedSequence {
        dir: final_dir,
        frame_count: total,
        width: timeline.surface_width,
        height: timeline.surface_height,
        fps: config.fps,
        has_alpha: config.alpha,
        pad,
    })
}

fn capture_one(
    host: &mut dyn RenderHost,
    config: &RenderConfig,
    frame: FrameIndex,
    dir: &Path,
    pad: usize,
) -> WovenResult<()> {
    let ticket = host.request_frame(VirtualClock::at(frame, config.fps))?;
    host.await_paint(ticket)?;
    let rgba = host.rasterize(ticket)?;
    write_frame_png(&dir.join(frame_file_name(frame, pad)), &rgba, config.alpha)
}

/// Render a single frame of `program` to a PNG at `path`.
///
/// `frame` may lie past the natural end; the program then shows its settled state.
pub fn capture_still(
    host: &mut dyn RenderHost,
    program: &EffectProgram,
    config: &RenderConfig,
    frame: FrameIndex,
    path: &Path,
) -> WovenResult<FrameRGBA> {
    host.load(program, config)?;
    let ticket = host
        .request_frame(VirtualClock::at(frame, config.fps))
        .map_err(|e| e.at_frame(frame))?;
    host.await_paint(ticket).map_err(|e| e.at_frame(frame))?;
    let rgba = host.rasterize(ticket).map_err(|e| e.at_frame(frame))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory '{}'", parent.display()))?;
    }
    write_frame_png(path, &rgba, config.alpha)?;
    Ok(rgba)
}

/// Encode `frame` as PNG (RGBA when `alpha`, else RGB) and sync it to disk.
pub fn write_frame_png(path: &Path, frame: &FrameRGBA, alpha: bool) -> WovenResult<()> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.data.len() != expected {
        return Err(WovenError::input(
            Stage::Capture,
            format!(
                "frame data is {} bytes, expected {expected} for {}x{}",
                frame.data.len(),
                frame.width,
                frame.height
            ),
        ));
    }

    let (pixels, color) = if alpha {
        (frame.to_straight_rgba8(), image::ExtendedColorType::Rgba8)
    } else {
        (frame.to_rgb8(), image::ExtendedColorType::Rgb8)
    };

    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png)
        .write_image(&pixels, frame.width, frame.height, color)
        .with_context(|| format!("encode png '{}'", path.display()))?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("create frame '{}'", path.display()))?;
    file.write_all(&png)
        .with_context(|| format!("write frame '{}'", path.display()))?;
    file.sync_all()
        .with_context(|| format!("sync frame '{}'", path.display()))?;
    Ok(())
}

pub(crate) fn remove_dir_if_exists(dir: &Path) -> WovenResult<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("remove stale directory '{}'", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/capture/session.rs"]
mod tests;
