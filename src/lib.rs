//! reelkit compiles a list of narrated segments into a vertical short-form video.
//!
//! The flow is linear:
//!
//! - Load and validate [`Segment`]s, then schedule them into a [`Timeline`]
//! - Build a per-segment [`RenderPlan`] (background, captions, Ken Burns, audio mix)
//! - Lower plans into [`EngineProgram`]s and run them through a [`Renderer`]
//! - Concatenate, optionally lay a continuous music bed over the whole timeline, and write
//!   the deliverable plus its JSON timeline sidecar
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod artifacts;
pub(crate) mod config;
pub(crate) mod engine;
pub(crate) mod pipeline;
pub(crate) mod plan;
pub(crate) mod timeline;

pub use crate::foundation::core::{Canvas, FPS, FRAME, Fps, SAMPLE_RATE};
pub use crate::foundation::error::{ReelError, ReelResult, Stage};

pub use crate::artifacts::{WorkLayout, concat_manifest};
pub use crate::config::{
    ArtifactOpts, CaptionMode, CaptionOpts, KenBurnsOpts, MusicMode, MusicOpts, ReelConfig,
    RenderThreading, TimingMode,
};
pub use crate::engine::backend::{RecordedCall, RecordingRenderer, Renderer};
pub use crate::engine::ffmpeg::{FfmpegRenderer, is_ffmpeg_on_path};
pub use crate::engine::program::{EngineProgram, Input};
pub use crate::pipeline::{
    CompiledReel, DEFAULT_NARRATION_PATTERN, ReelOutput, SegmentJob, compile_reel, render_reel,
    resolve_narration,
};
pub use crate::plan::audio::{AudioMixProgram, MusicProgram, SegmentAudio, SegmentMusic};
pub use crate::plan::builder::RenderPlan;
pub use crate::plan::visual::{Caption, VisualPlan, VisualSource, ZoomCurve};
pub use crate::timeline::schedule::Timeline;
pub use crate::timeline::segment::{
    Segment, load_segments, normalize_segments, validate_segments, word_count,
};
