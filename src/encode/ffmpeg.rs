use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;
use image::ImageDecoder as _;

use crate::{
    capture::session::CapturedSequence,
    foundation::core::FrameIndex,
    foundation::error::{Stage, WovenError, WovenResult},
};

/// Environment override for the `ffmpeg` binary.
pub const FFMPEG_ENV: &str = "WOVENGLOW_FFMPEG";
/// Environment override for the `ffprobe` binary.
pub const FFPROBE_ENV: &str = "WOVENGLOW_FFPROBE";

const VP9_ENCODER: &str = "libvpx-vp9";

/// Which external binaries to run. Unset fields fall back to the environment, then `PATH`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// `ffmpeg` binary; falls back to `WOVENGLOW_FFMPEG`, then `ffmpeg` on `PATH`.
    pub ffmpeg: Option<PathBuf>,
    /// `ffprobe` binary; falls back to `WOVENGLOW_FFPROBE`, then `ffprobe` on `PATH`.
    pub ffprobe: Option<PathBuf>,
}

impl EncoderSettings {
    fn resolve(explicit: &Option<PathBuf>, env: &str, fallback: &str) -> PathBuf {
        explicit
            .clone()
            .or_else(|| std::env::var_os(env).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(fallback))
    }

    /// The `ffmpeg` to run.
    pub fn ffmpeg_program(&self) -> PathBuf {
        Self::resolve(&self.ffmpeg, FFMPEG_ENV, "ffmpeg")
    }

    /// The `ffprobe` to run.
    pub fn ffprobe_program(&self) -> PathBuf {
        Self::resolve(&self.ffprobe, FFPROBE_ENV, "ffprobe")
    }
}

/// Encoding options for one video.
#[derive(Clone, Debug)]
pub struct EncodeConfig {
    /// Input and output frame rate.
    pub fps: u32,
    /// Use the lossless profile.
    pub lossless: bool,
    /// Keep per-pixel transparency.
    pub alpha: bool,
    /// Final video path; written via a `.partial` sibling.
    pub out_path: PathBuf,
}

/// What the located encoder can do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncoderCaps {
    /// `libvpx-vp9` is compiled in (the only profile family used, and the alpha-capable one).
    pub vp9: bool,
}

/// Fixed VP9/WebM profile chosen for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeProfile {
    /// Encode with `-lossless 1`.
    pub lossless: bool,
    /// Frames keep their alpha channel and `yuva420p` is used.
    pub alpha: bool,
}

impl EncodeProfile {
    /// Pixel format handed to the encoder.
    ///
    /// Lossless without alpha encodes planar RGB (`gbrp`), which reproduces the frames
    /// exactly. VP9 carries alpha only as `yuva420p`, so lossless with alpha is lossless
    /// coding of subsampled chroma and not pixel-exact.
    pub fn pix_fmt(self) -> &'static str {
        match (self.alpha, self.lossless) {
            (true, _) => "yuva420p",
            (false, true) => "gbrp",
            (false, false) => "yuv444p",
        }
    }

    /// Codec arguments for this profile.
    pub fn codec_args(self) -> Vec<&'static str> {
        let mut args = vec!["-c:v", VP9_ENCODER];
        if self.lossless {
            args.extend(["-lossless", "1"]);
        } else {
            args.extend(["-b:v", "0", "-crf", "18", "-row-mt", "1"]);
        }
        args.extend(["-pix_fmt", self.pix_fmt()]);
        if self.alpha {
            args.extend(["-metadata:s:v:0", "alpha_mode=1", "-auto-alt-ref", "0"]);
        }
        args
    }
}

/// Pick the profile for `cfg`, or explain why encoding cannot go ahead.
///
/// Alpha with frames that carry no alpha, or with an encoder lacking an alpha-capable
/// profile, is a configuration error. An encoder without VP9 otherwise only makes
/// encoding unavailable.
pub fn plan_profile(
    cfg: &EncodeConfig,
    frames_have_alpha: bool,
    caps: EncoderCaps,
) -> WovenResult<EncodeProfile> {
    if cfg.alpha && !frames_have_alpha {
        return Err(WovenError::config(
            Stage::Encode,
            "alpha=true but the captured frames have no alpha channel",
        ));
    }
    if !caps.vp9 {
        if cfg.alpha {
            return Err(WovenError::config(
                Stage::Encode,
                format!("alpha=true but ffmpeg has no alpha-capable profile ({VP9_ENCODER} missing)"),
            ));
        }
        return Err(WovenError::encoding_unavailable(format!(
            "ffmpeg was found but lacks the {VP9_ENCODER} encoder"
        )));
    }
    Ok(EncodeProfile {
        lossless: cfg.lossless,
        alpha: cfg.alpha,
    })
}

/// Full ffmpeg argument list for encoding `input_pattern` into `out_path`.
pub fn build_args(
    profile: EncodeProfile,
    input_pattern: &Path,
    fps: u32,
    out_path: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-framerate"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(fps.to_string().into());
    args.push("-start_number".into());
    args.push("0".into());
    args.push("-i".into());
    args.push(input_pattern.as_os_str().to_owned());
    args.push("-an".into());
    args.extend(profile.codec_args().into_iter().map(OsString::from));
    args.push("-f".into());
    args.push("webm".into());
    args.push(out_path.as_os_str().to_owned());
    args
}

/// Encodes captured frame sequences with the system `ffmpeg`.
#[derive(Clone, Debug)]
pub struct VideoAssembler {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl VideoAssembler {
    /// Find a runnable `ffmpeg`.
    ///
    /// Returns [`WovenError::EncodingUnavailable`] when it cannot be started.
    pub fn locate(settings: &EncoderSettings) -> WovenResult<Self> {
        let ffmpeg = settings.ffmpeg_program();
        if !is_runnable(&ffmpeg) {
            return Err(WovenError::encoding_unavailable(format!(
                "'{}' could not be run (install ffmpeg or set {FFMPEG_ENV})",
                ffmpeg.display()
            )));
        }
        Ok(Self {
            ffmpeg,
            ffprobe: settings.ffprobe_program(),
        })
    }

    /// Query the encoder list.
    pub fn caps(&self) -> WovenResult<EncoderCaps> {
        let output = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                WovenError::encoding_unavailable(format!(
                    "failed to query '{}' encoders: {e}",
                    self.ffmpeg.display()
                ))
            })?;
        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(parse_encoder_caps(&listing))
    }

    /// Encode `frames` into `cfg.out_path`.
    ///
    /// The video is written to `<out_path>.partial` and renamed on success; on any
    /// failure no file is left at either path.
    #[tracing::instrument(skip(self, frames), fields(frames = frames.frame_count, out = %cfg.out_path.display()))]
    pub fn assemble(&self, frames: &CapturedSequence, cfg: &EncodeConfig) -> WovenResult<PathBuf> {
        if cfg.fps == 0 {
            return Err(WovenError::config(Stage::Encode, "fps must be non-zero"));
        }
        if frames.frame_count == 0 {
            return Err(WovenError::input(Stage::Encode, "no frames to encode"));
        }

        let has_alpha = frames_have_alpha(frames)?;
        let profile = plan_profile(cfg, has_alpha, self.caps()?)?;

        remove_file_if_exists(&cfg.out_path)?;
        let partial = partial_path(&cfg.out_path);
        remove_file_if_exists(&partial)?;
        if let Some(parent) = cfg.out_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output directory '{}'", parent.display()))?;
        }

        let result = self
            .run_ffmpeg(profile, frames, cfg.fps, &partial)
            .and_then(|()| self.verify_frame_count(&partial, frames.frame_count));
        if let Err(e) = result {
            if let Err(cleanup) = remove_file_if_exists(&partial) {
                tracing::warn!("failed to remove partial video: {cleanup}");
            }
            return Err(e);
        }

        std::fs::rename(&partial, &cfg.out_path).with_context(|| {
            format!(
                "move '{}' to '{}'",
                partial.display(),
                cfg.out_path.display()
            )
        })?;
        tracing::info!(profile = ?profile, "encoded video");
        Ok(cfg.out_path.clone())
    }

    fn run_ffmpeg(
        &self,
        profile: EncodeProfile,
        frames: &CapturedSequence,
        fps: u32,
        out: &Path,
    ) -> WovenResult<()> {
        let args = build_args(profile, &frames.input_pattern(), fps, out);
        let output = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                WovenError::encoding_unavailable(format!(
                    "failed to spawn '{}': {e}",
                    self.ffmpeg.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WovenError::encoding(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Compare the encoded frame count with the captured one when `ffprobe` is available.
    fn verify_frame_count(&self, video: &Path, expected: u64) -> WovenResult<()> {
        let Some(actual) = probe_frame_count(&self.ffprobe, video) else {
            tracing::debug!("ffprobe unavailable; skipping frame-count check");
            return Ok(());
        };
        if actual != expected {
            return Err(WovenError::encoding(format!(
                "encoded {actual} frames but captured {expected}"
            )));
        }
        Ok(())
    }
}

/// Encode `frames` with the encoder named by `settings`.
///
/// Alpha requested for frames without alpha is reported before looking for `ffmpeg`,
/// so that misconfiguration surfaces even on machines without an encoder.
pub fn encode_sequence(
    settings: &EncoderSettings,
    frames: &CapturedSequence,
    cfg: &EncodeConfig,
) -> WovenResult<PathBuf> {
    if cfg.alpha && frames.frame_count > 0 && !frames_have_alpha(frames)? {
        return Err(WovenError::config(
            Stage::Encode,
            "alpha=true but the captured frames have no alpha channel",
        ));
    }
    VideoAssembler::locate(settings)?.assemble(frames, cfg)
}

/// Number of video frames in `video` as decoded by `ffprobe`, if it can be run.
pub fn probe_frame_count(ffprobe: &Path, video: &Path) -> Option<u64> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-count_frames",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=nb_read_frames",
            "-of",
            "csv=p=0",
        ])
        .arg(video)
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}

pub(crate) fn parse_encoder_caps(listing: &str) -> EncoderCaps {
    let vp9 = listing
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(VP9_ENCODER));
    EncoderCaps { vp9 }
}

/// Whether the first captured frame carries an alpha channel.
fn frames_have_alpha(frames: &CapturedSequence) -> WovenResult<bool> {
    let first = frames.frame_path(FrameIndex(0));
    let decoder = image::ImageReader::open(&first)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| {
            WovenError::input(
                Stage::Encode,
                format!("cannot open frame '{}': {e}", first.display()),
            )
        })?
        .into_decoder()
        .map_err(|e| {
            WovenError::input(
                Stage::Encode,
                format!("cannot read frame '{}': {e}", first.display()),
            )
        })?;
    Ok(decoder.color_type().has_alpha())
}

/// Whether an `ffmpeg` on `PATH` runs.
pub fn is_ffmpeg_on_path() -> bool {
    is_runnable(Path::new("ffmpeg"))
}

fn is_runnable(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn partial_path(out: &Path) -> PathBuf {
    let mut name = out.file_name().map(OsString::from).unwrap_or_default();
    name.push(".partial");
    out.with_file_name(name)
}

fn remove_file_if_exists(path: &Path) -> WovenResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("remove '{}'", path.display()))
            .into()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
