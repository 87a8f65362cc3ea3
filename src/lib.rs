//! wovenglow turns a still image into a deterministic "woven glowing line" animation.
//!
//! # Pipeline overview
//!
//! 1. **Extract**: image -> Sobel edge candidates ([`extract_points`])
//! 2. **Sample**: candidates -> seeded, bounded [`PointSet`] ([`sample_points`])
//! 3. **Weave**: points -> [`WeaveSegments`] with phase, delay and weight ([`build_weave`])
//! 4. **Program**: data + style + viewport embedded into an [`EffectTemplate`] ([`EffectProgram`])
//! 5. **Capture**: program replayed frame by frame on a virtual clock ([`capture_frames`])
//! 6. **Encode** (optional): frames -> VP9/WebM through the system `ffmpeg` ([`encode_sequence`])
//! 7. **Embed**: video -> self-contained HTML ([`embed_document`])
//!
//! [`Pipeline`] runs all of it and writes a `manifest.json` once a run is complete.
//!
//! Every pseudo-random decision derives from the explicit `seed`; the same image, options
//! and template always produce the same data, program and frames.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod capture;
mod encode;
mod extract;
mod foundation;
mod pipeline;
mod program;
mod weave;

pub use capture::cpu::CpuHost;
pub use capture::host::{HostTimeline, PaintTicket, RenderHost};
pub use capture::session::{
    CapturedSequence, FRAMES_DIR, STAGING_DIR, capture_frames, capture_still, frame_file_name,
    pad_width, write_frame_png,
};
pub use encode::embed::{embed_document, write_embed};
pub use encode::ffmpeg::{
    EncodeConfig, EncodeProfile, EncoderCaps, EncoderSettings, FFMPEG_ENV, FFPROBE_ENV,
    VideoAssembler, build_args, encode_sequence, is_ffmpeg_on_path, plan_profile,
    probe_frame_count,
};
pub use extract::edges::{ExtractParams, extract_points, extract_points_from_path, load_image};
pub use extract::points::{FeaturePoint, PointSet};
pub use extract::sample::sample_points;
pub use foundation::config::{RenderConfig, Viewport};
pub use foundation::core::{Affine, FrameIndex, FrameRGBA, Point, Rgb8, Vec2, VirtualClock};
pub use foundation::error::{Stage, WovenError, WovenResult};
pub use pipeline::{ArtifactNames, BuiltData, Pipeline, PipelineConfig, RunReport};
pub use program::data::{DATA_VERSION, EffectData};
pub use program::generator::EffectProgram;
pub use program::style::{STYLE_VERSION, StyleParams, Timeline};
pub use program::template::{EffectTemplate, Slot};
pub use weave::builder::{WeaveParams, WeavePolicy, WeaveSegment, WeaveSegments, build_weave};
pub use weave::timing::TimingParams;
