use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    capture::{
        cpu::CpuHost,
        host::RenderHost,
        session::{FRAMES_DIR, STAGING_DIR, capture_frames, remove_dir_if_exists},
    },
    encode::{
        embed::write_embed,
        ffmpeg::{EncodeConfig, EncoderSettings, encode_sequence},
    },
    extract::{
        edges::{ExtractParams, extract_points_from_path},
        sample::sample_points,
    },
    foundation::config::RenderConfig,
    foundation::error::{Stage, WovenError, WovenResult},
    program::{
        data::{DATA_VERSION, EffectData},
        generator::EffectProgram,
        style::{STYLE_VERSION, StyleParams},
        template::EffectTemplate,
    },
    weave::builder::{WeaveParams, build_weave},
};

/// File names of the artifacts a run writes into its output directory.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArtifactNames {
    /// Data artifact (`precomputed_data.json`).
    pub data: String,
    /// Generated program (`woven_glow.html`).
    pub program: String,
    /// Encoded video (`woven_glow.webm`).
    pub video: String,
    /// Embed document (`woven_glow_embed.html`).
    pub embed: String,
    /// Run manifest (`manifest.json`).
    pub manifest: String,
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            data: "precomputed_data.json".to_string(),
            program: "woven_glow.html".to_string(),
            video: "woven_glow.webm".to_string(),
            embed: "woven_glow_embed.html".to_string(),
            manifest: "manifest.json".to_string(),
        }
    }
}

impl ArtifactNames {
    fn all(&self) -> [(&'static str, &str); 5] {
        [
            ("data", self.data.as_str()),
            ("program", self.program.as_str()),
            ("video", self.video.as_str()),
            ("embed", self.embed.as_str()),
            ("manifest", self.manifest.as_str()),
        ]
    }

    /// Every name must be a plain, distinct file name that does not collide with the
    /// frame directories.
    pub fn validate(&self) -> WovenResult<()> {
        let all = self.all();
        for (i, (field, name)) in all.iter().enumerate() {
            let plain = !name.is_empty()
                && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(*name)
                && *name != "."
                && *name != "..";
            if !plain {
                return Err(WovenError::config(
                    Stage::Config,
                    format!("artifacts.{field} must be a plain file name, got '{name}'"),
                ));
            }
            if *name == FRAMES_DIR || *name == STAGING_DIR {
                return Err(WovenError::config(
                    Stage::Config,
                    format!("artifacts.{field} '{name}' collides with the frame directory"),
                ));
            }
            if let Some((other, _)) = all[..i].iter().find(|(_, n)| n == name) {
                return Err(WovenError::config(
                    Stage::Config,
                    format!("artifacts.{field} and artifacts.{other} are both '{name}'"),
                ));
            }
        }
        Ok(())
    }
}

/// Everything one run needs.
///
/// Loadable from JSON; every field except `image` and `template_source` has a default.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input image.
    pub image: PathBuf,
    /// Template with the insertion markers.
    pub template_source: Option<PathBuf>,
    /// Directory every artifact is written to.
    pub output_dir: PathBuf,
    /// Edge extraction and sampling.
    pub extract: ExtractParams,
    /// Weave topology and timing.
    pub weave: WeaveParams,
    /// Visual style embedded into the program.
    pub style: StyleParams,
    /// Capture and encoding options.
    pub render: RenderConfig,
    /// Capture frames and encode; when false only the data and program are written.
    pub capture: bool,
    /// Artifact file names.
    pub artifacts: ArtifactNames,
    /// External encoder binaries.
    pub encoder: EncoderSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image: PathBuf::new(),
            template_source: None,
            output_dir: PathBuf::from("out_effect"),
            extract: ExtractParams::default(),
            weave: WeaveParams::default(),
            style: StyleParams::default(),
            render: RenderConfig::default(),
            capture: true,
            artifacts: ArtifactNames::default(),
            encoder: EncoderSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a config from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> WovenResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            WovenError::config(
                Stage::Config,
                format!("config '{}' cannot be read: {e}", path.display()),
            )
        })?;
        serde_json::from_str(&text).map_err(|e| {
            WovenError::config(
                Stage::Config,
                format!("config '{}' is invalid: {e}", path.display()),
            )
        })
    }

    /// Check every option before any work starts.
    pub fn validate(&self) -> WovenResult<()> {
        if self.image.as_os_str().is_empty() {
            return Err(WovenError::config(Stage::Config, "image path is required"));
        }
        if self.template_source.is_none() {
            return Err(WovenError::config(
                Stage::Config,
                "template_source is required",
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(WovenError::config(
                Stage::Config,
                "output_dir must not be empty",
            ));
        }
        self.extract.validate()?;
        self.weave.validate()?;
        self.style.validate()?;
        self.render.validate()?;
        self.artifacts.validate()
    }

    fn out(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

/// Summary of a finished run; also the body of the run manifest.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RunReport {
    /// Directory the run wrote to.
    pub output_dir: PathBuf,
    /// Seed used for sampling and weave timing.
    pub seed: u64,
    /// Edge candidates before sampling.
    pub candidates: usize,
    /// Points after sampling.
    pub points: usize,
    /// Weave segments.
    pub segments: usize,
    /// Natural length of the animation.
    pub duration_seconds: f64,
    /// Frames the natural length needs at the configured fps.
    pub natural_frames: u64,
    /// Frames written; capped by `max_frames`, 0 without capture.
    pub frames_captured: u64,
    /// Written data artifact.
    pub data: PathBuf,
    /// Written program.
    pub program: PathBuf,
    /// Frame directory, when frames were captured.
    pub frames_dir: Option<PathBuf>,
    /// Set when encoding succeeded.
    pub video: Option<PathBuf>,
    /// Set when the embed document was written.
    pub embed: Option<PathBuf>,
    /// Non-fatal problems, e.g. a missing encoder.
    pub warnings: Vec<String>,
}

#[derive(serde::Serialize)]
struct Manifest<'a> {
    tool: &'static str,
    tool_version: &'static str,
    data_version: u32,
    style_version: &'static str,
    template_version: Option<&'a str>,
    #[serde(flatten)]
    report: &'a RunReport,
}

/// Points and weave produced from the input image.
#[derive(Clone, Debug)]
pub struct BuiltData {
    /// Edge candidates before sampling.
    pub candidates: usize,
    /// Sampled points and their weave.
    pub data: EffectData,
}

/// One end-to-end run: image to data, program, frames, video and embed.
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// A pipeline for `config`; nothing is checked until it runs.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The run configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract, sample and weave.
    #[tracing::instrument(skip(self), fields(image = %self.config.image.display()))]
    pub fn build_data(&self) -> WovenResult<BuiltData> {
        let params = &self.config.extract;
        let candidates = extract_points_from_path(&self.config.image, params)?;
        let candidate_count = candidates.len();
        let points = sample_points(candidates, params.max_points, params.seed)?;
        let segments = build_weave(&points, &self.config.weave, params.seed)?;
        tracing::info!(
            candidates = candidate_count,
            points = points.len(),
            segments = segments.len(),
            "built weave"
        );
        Ok(BuiltData {
            candidates: candidate_count,
            data: EffectData::new(points, segments, params.seed)?,
        })
    }

    /// Run with the default [`CpuHost`].
    pub fn run(&self) -> WovenResult<RunReport> {
        self.run_with_host(&mut CpuHost::new())
    }

    /// Run, capturing through `host`.
    ///
    /// The manifest is written last; an output directory without one is an
    /// interrupted or failed run.
    #[tracing::instrument(skip(self, host), fields(out = %self.config.output_dir.display()))]
    pub fn run_with_host(&self, host: &mut dyn RenderHost) -> WovenResult<RunReport> {
        let cfg = &self.config;
        cfg.validate()?;
        let template = match &cfg.template_source {
            Some(path) => EffectTemplate::load(path)?,
            None => {
                return Err(WovenError::config(
                    Stage::Config,
                    "template_source is required",
                ));
            }
        };

        std::fs::create_dir_all(&cfg.output_dir).with_context(|| {
            format!("create output directory '{}'", cfg.output_dir.display())
        })?;
        self.clear_previous_run()?;

        let built = self.build_data()?;
        let program =
            EffectProgram::generate(&template, built.data, cfg.style.clone(), cfg.render.viewport())?;

        let data_path = cfg.out(&cfg.artifacts.data);
        let program_path = cfg.out(&cfg.artifacts.program);
        program.data().write(&data_path)?;
        program.write(&program_path)?;

        let timeline = program.timeline();
        let mut report = RunReport {
            output_dir: cfg.output_dir.clone(),
            seed: cfg.extract.seed,
            candidates: built.candidates,
            points: program.data().points().len(),
            segments: program.data().segments().len(),
            duration_seconds: timeline.duration_seconds,
            natural_frames: timeline.natural_frames(cfg.render.fps),
            frames_captured: 0,
            data: data_path,
            program: program_path,
            frames_dir: None,
            video: None,
            embed: None,
            warnings: Vec::new(),
        };

        if cfg.capture {
            let frames = capture_frames(host, &program, &cfg.render, &cfg.output_dir)?;
            report.frames_captured = frames.frame_count;
            report.frames_dir = Some(frames.dir.clone());

            let encode = EncodeConfig {
                fps: cfg.render.fps,
                lossless: cfg.render.lossless,
                alpha: cfg.render.alpha,
                out_path: cfg.out(&cfg.artifacts.video),
            };
            match encode_sequence(&cfg.encoder, &frames, &encode) {
                Ok(video) => {
                    let embed = cfg.out(&cfg.artifacts.embed);
                    write_embed(&video, &embed, cfg.render.alpha)?;
                    report.video = Some(video);
                    report.embed = Some(embed);
                }
                Err(e) if !e.is_fatal() => {
                    tracing::warn!("{e}; skipping video and embed");
                    report.warnings.push(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        self.write_manifest(&report, program.template_version())?;
        Ok(report)
    }

    fn clear_previous_run(&self) -> WovenResult<()> {
        let cfg = &self.config;
        let names = &cfg.artifacts;
        for name in [&names.manifest, &names.video, &names.embed] {
            let path = cfg.out(name);
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed stale artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("remove stale '{}'", path.display()))
                        .into());
                }
            }
        }
        remove_dir_if_exists(&cfg.output_dir.join(STAGING_DIR))?;
        remove_dir_if_exists(&cfg.output_dir.join(FRAMES_DIR))
    }

    fn write_manifest(&self, report: &RunReport, template_version: Option<&str>) -> WovenResult<()> {
        let manifest = Manifest {
            tool: env!("CARGO_PKG_NAME"),
            tool_version: env!("CARGO_PKG_VERSION"),
            data_version: DATA_VERSION,
            style_version: STYLE_VERSION,
            template_version,
            report,
        };
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| WovenError::serde(format!("encode manifest: {e}")))?;
        let path = self.config.out(&self.config.artifacts.manifest);
        std::fs::write(&path, json)
            .with_context(|| format!("write manifest '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
