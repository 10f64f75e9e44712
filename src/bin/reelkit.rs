use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

use reelkit::{
    CaptionMode, FfmpegRenderer, MusicMode, ReelConfig, Renderer, TimingMode, Timeline,
};

#[derive(Parser, Debug)]
#[command(name = "reelkit", version)]
struct Cli {
    /// Log verbosity written to stderr.
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the reel to MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Validate and plan without rendering; prints the engine programs as JSON.
    Plan(PlanArgs),
    /// Print the scheduled timeline as JSON.
    Schedule(ScheduleArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Segment list JSON.
    #[arg(long)]
    segments: PathBuf,

    /// Directory holding one narration clip per segment.
    #[arg(long)]
    audio_dir: PathBuf,

    /// Narration file name inside the audio directory; `{idx}` is the segment index.
    #[arg(long, default_value = reelkit::DEFAULT_NARRATION_PATTERN)]
    narration_pattern: String,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output MP4 path. The timeline sidecar is written next to it as `.json`.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    opts: ReelArgs,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output MP4 path the plan targets.
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    opts: ReelArgs,
}

#[derive(Parser, Debug)]
struct ScheduleArgs {
    /// Segment list JSON.
    #[arg(long)]
    segments: PathBuf,
}

/// Render options. Each flag overrides the `--config` file when given.
#[derive(Args, Debug, Default)]
struct ReelArgs {
    /// Base configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Background music bed.
    #[arg(long)]
    music: Option<PathBuf>,

    /// Intro stem played from the start of the reel (continuous mode).
    #[arg(long)]
    music_intro: Option<PathBuf>,

    /// Outro stem ending with the reel (continuous mode).
    #[arg(long)]
    music_outro: Option<PathBuf>,

    /// Linear music gain.
    #[arg(long)]
    music_volume: Option<f64>,

    /// Do not duck music under the narration.
    #[arg(long)]
    no_duck: bool,

    /// Mix the bed inside every segment instead of one pass over the whole reel.
    #[arg(long)]
    no_continuous_music: bool,

    /// Bed fade-in seconds (continuous mode).
    #[arg(long)]
    fade_in: Option<f64>,

    /// Bed fade-out seconds (continuous mode).
    #[arg(long)]
    fade_out: Option<f64>,

    #[arg(long)]
    no_captions: bool,

    #[arg(long, value_enum)]
    caption_mode: Option<CaptionModeArg>,

    /// Font file for captions.
    #[arg(long)]
    caption_font: Option<PathBuf>,

    #[arg(long)]
    caption_color: Option<String>,

    #[arg(long)]
    caption_box_color: Option<String>,

    #[arg(long)]
    no_caption_box: bool,

    /// Longest caption in characters, truncation marker included.
    #[arg(long)]
    caption_max_chars: Option<usize>,

    /// Slow zoom on still images.
    #[arg(long)]
    ken_burns: bool,

    /// Final Ken Burns zoom factor.
    #[arg(long)]
    ken_burns_zoom: Option<f64>,

    #[arg(long)]
    no_voice_normalize: bool,

    /// Time segments by their probed narration length instead of the word-count estimate.
    #[arg(long)]
    measured_timing: bool,

    /// Every segment must reference a still image.
    #[arg(long)]
    require_images: bool,

    /// Working directory for intermediate clips.
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Keep intermediate clips after the run.
    #[arg(long)]
    keep_temp: bool,

    /// Remove a stale working directory before starting.
    #[arg(long)]
    pre_cleanup: bool,

    /// Render segments on a worker pool of this size.
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CaptionModeArg {
    Title,
    Narration,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(cli.log_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Plan(args) => cmd_plan(args),
        Command::Schedule(args) => cmd_schedule(args),
    }
}

impl ReelArgs {
    fn to_config(&self, out: Option<&Path>) -> anyhow::Result<ReelConfig> {
        let mut cfg = match &self.config {
            Some(path) => ReelConfig::load_json(path)?,
            None => ReelConfig::default(),
        };
        if let Some(out) = out {
            cfg.output = out.to_path_buf();
        }

        let music = &mut cfg.music;
        if let Some(p) = &self.music {
            music.bed = Some(p.clone());
        }
        if let Some(p) = &self.music_intro {
            music.intro = Some(p.clone());
        }
        if let Some(p) = &self.music_outro {
            music.outro = Some(p.clone());
        }
        if let Some(v) = self.music_volume {
            music.volume = v;
        }
        if self.no_duck {
            music.duck = false;
        }
        if self.no_continuous_music {
            music.mode = MusicMode::PerSegment;
        }
        if let Some(v) = self.fade_in {
            music.fade_in = v;
        }
        if let Some(v) = self.fade_out {
            music.fade_out = v;
        }

        let captions = &mut cfg.captions;
        if self.no_captions {
            captions.enabled = false;
        }
        if let Some(mode) = self.caption_mode {
            captions.mode = match mode {
                CaptionModeArg::Title => CaptionMode::Title,
                CaptionModeArg::Narration => CaptionMode::Narration,
            };
        }
        if let Some(p) = &self.caption_font {
            captions.font = Some(p.clone());
        }
        if let Some(c) = &self.caption_color {
            captions.color = c.clone();
        }
        if let Some(c) = &self.caption_box_color {
            captions.box_color = c.clone();
        }
        if self.no_caption_box {
            captions.box_enabled = false;
        }
        if let Some(n) = self.caption_max_chars {
            captions.max_chars = n;
        }

        if self.ken_burns {
            cfg.ken_burns.enabled = true;
        }
        if let Some(z) = self.ken_burns_zoom {
            cfg.ken_burns.zoom_max = z;
        }
        if self.no_voice_normalize {
            cfg.normalize_voice = false;
        }
        if self.measured_timing {
            cfg.timing = TimingMode::Measured;
        }
        if self.require_images {
            cfg.require_images = true;
        }
        if let Some(dir) = &self.work_dir {
            cfg.artifacts.work_dir = dir.clone();
        }
        if self.keep_temp {
            cfg.artifacts.keep_temp = true;
        }
        if self.pre_cleanup {
            cfg.artifacts.pre_cleanup = true;
        }
        if let Some(n) = self.jobs {
            cfg.threading.parallel = n > 1;
            cfg.threading.threads = Some(n);
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn load_inputs(input: &InputArgs) -> anyhow::Result<(Vec<reelkit::Segment>, Vec<PathBuf>)> {
    let segments = reelkit::load_segments(&input.segments)?;
    let narration =
        reelkit::resolve_narration(&input.audio_dir, &input.narration_pattern, &segments)?;
    Ok((segments, narration))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = args.opts.to_config(Some(&args.out))?;
    let (segments, narration) = load_inputs(&args.input)?;
    let renderer = FfmpegRenderer::new()?;

    let out = reelkit::render_reel(segments, &narration, &cfg, &renderer)?;
    eprintln!(
        "wrote {} ({:.3}s, {} segments) and {}",
        out.video.display(),
        out.timeline.total_duration(),
        out.timeline.len(),
        out.sidecar.display()
    );
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let cfg = args.opts.to_config(args.out.as_deref())?;
    let (segments, narration) = load_inputs(&args.input)?;
    // Probing is optional for a dry run; a missing ffprobe just skips it.
    let renderer: &dyn Renderer = &FfmpegRenderer::unchecked();

    let compiled = reelkit::compile_reel(segments, &narration, &cfg, renderer)?;
    let json = serde_json::to_string_pretty(&compiled).context("serialize plan")?;
    println!("{json}");
    Ok(())
}

fn cmd_schedule(args: ScheduleArgs) -> anyhow::Result<()> {
    let segments = reelkit::normalize_segments(reelkit::load_segments(&args.segments)?);
    reelkit::validate_segments(&segments, false)?;
    let timeline = Timeline::schedule(segments)?;
    println!("{}", timeline.to_json_pretty()?);
    Ok(())
}
