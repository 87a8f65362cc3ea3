use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "wovenglow", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the data artifact and the standalone program only.
    Generate(RunArgs),
    /// Full run: data, program, frames, video and embed (video needs `ffmpeg`).
    Render(RunArgs),
    /// Replay a data artifact and write a single frame as PNG.
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Input image.
    #[arg(long = "in")]
    image: Option<PathBuf>,

    /// JSON config file; flags given on the command line override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Template with `/*@slot ...@*/` insertion markers.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_dim: Option<u32>,
    #[arg(long)]
    threshold: Option<f32>,
    #[arg(long)]
    sample_rate: Option<u32>,
    #[arg(long)]
    max_points: Option<usize>,

    #[command(flatten)]
    render: RenderFlags,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct RenderFlags {
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    fps: Option<u32>,
    #[arg(long)]
    max_frames: Option<u64>,
    #[arg(long)]
    dpr: Option<f64>,
    /// Lossless encoding profile (pixel-exact without alpha).
    #[arg(long, overrides_with = "no_lossless")]
    lossless: bool,
    /// Lossy profile even when the config file enables `lossless`.
    #[arg(long, overrides_with = "lossless")]
    no_lossless: bool,
    /// Transparent background and an alpha-capable encoding profile.
    #[arg(long, overrides_with = "no_alpha")]
    alpha: bool,
    /// Opaque background even when the config file enables `alpha`.
    #[arg(long, overrides_with = "alpha")]
    no_alpha: bool,
}

/// `--x` / `--no-x` pair: `None` leaves the config value alone.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

#[derive(Args, Debug)]
struct FrameArgs {
    /// Data artifact written by an earlier run.
    #[arg(long)]
    data: PathBuf,

    #[arg(long)]
    template: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// JSON config file for style and render options.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    render: RenderFlags,

    #[arg(long, value_enum, default_value_t = HostChoice::Cpu)]
    host: HostChoice,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HostChoice {
    Cpu,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_run(args, false),
        Command::Render(args) => cmd_run(args, true),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<wovenglow::PipelineConfig> {
    Ok(match path {
        Some(p) => wovenglow::PipelineConfig::from_json_file(p)?,
        None => wovenglow::PipelineConfig::default(),
    })
}

fn apply_render_flags(flags: &RenderFlags, render: &mut wovenglow::RenderConfig) {
    if let Some(v) = flags.width {
        render.width = v;
    }
    if let Some(v) = flags.height {
        render.height = v;
    }
    if let Some(v) = flags.fps {
        render.fps = v;
    }
    if let Some(v) = flags.max_frames {
        render.max_frames = v;
    }
    if let Some(v) = flags.dpr {
        render.dpr = v;
    }
    if let Some(v) = switch(flags.lossless, flags.no_lossless) {
        render.lossless = v;
    }
    if let Some(v) = switch(flags.alpha, flags.no_alpha) {
        render.alpha = v;
    }
}

fn cmd_run(args: RunArgs, capture: bool) -> anyhow::Result<()> {
    let mut cfg = load_config(args.config.as_ref())?;
    cfg.capture = capture;

    if let Some(v) = args.image {
        cfg.image = v;
    }
    if let Some(v) = args.template {
        cfg.template_source = Some(v);
    }
    if cfg.template_source.is_none() {
        cfg.template_source = Some(PathBuf::from("templates/woven_glow.html"));
    }
    if let Some(v) = args.out {
        cfg.output_dir = v;
    }
    if let Some(v) = args.seed {
        cfg.extract.seed = v;
    }
    if let Some(v) = args.max_dim {
        cfg.extract.max_dim = v;
    }
    if let Some(v) = args.threshold {
        cfg.extract.threshold = v;
    }
    if let Some(v) = args.sample_rate {
        cfg.extract.sample_rate = v;
    }
    if let Some(v) = args.max_points {
        cfg.extract.max_points = v;
    }
    apply_render_flags(&args.render, &mut cfg.render);

    let report = wovenglow::Pipeline::new(cfg).run()?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("encode run report")?;
        println!("{json}");
    }
    for w in &report.warnings {
        eprintln!("warning: {w}");
    }
    eprintln!(
        "wrote {} ({} points, {} segments, {} frames)",
        report.output_dir.display(),
        report.points,
        report.segments,
        report.frames_captured
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(args.config.as_ref())?;
    apply_render_flags(&args.render, &mut cfg.render);
    cfg.render.validate()?;

    let data = wovenglow::EffectData::read(&args.data)?;
    let template = wovenglow::EffectTemplate::load(&args.template)?;
    let program =
        wovenglow::EffectProgram::generate(&template, data, cfg.style, cfg.render.viewport())?;

    let mut host = match args.host {
        HostChoice::Cpu => wovenglow::CpuHost::new(),
    };
    wovenglow::capture_still(
        &mut host,
        &program,
        &cfg.render,
        wovenglow::FrameIndex(args.frame),
        &args.out,
    )?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
