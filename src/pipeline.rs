use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::artifacts::{WorkDir, WorkLayout, publish, write_sidecar};
use crate::config::{MusicMode, ReelConfig, RenderThreading, TimingMode};
use crate::engine::backend::Renderer;
use crate::engine::program::{EngineProgram, concat_program, remux_program, segment_program};
use crate::foundation::error::{ReelError, ReelResult};
use crate::plan::audio::MusicProgram;
use crate::plan::builder::{RenderPlan, build_plans, check_narration, check_stems};
use crate::timeline::schedule::Timeline;
use crate::timeline::segment::{Segment, normalize_segments, validate_segments};

/// Default narration file pattern inside an audio directory.
pub const DEFAULT_NARRATION_PATTERN: &str = "seg_{idx}.wav";

/// Locate one narration clip per segment by substituting `{idx}` in `pattern`.
pub fn resolve_narration(
    audio_dir: &Path,
    pattern: &str,
    segments: &[Segment],
) -> ReelResult<Vec<PathBuf>> {
    if !pattern.contains("{idx}") {
        return Err(ReelError::validation(format!(
            "narration pattern '{pattern}' must contain '{{idx}}'"
        )));
    }
    Ok(segments
        .iter()
        .map(|s| audio_dir.join(pattern.replace("{idx}", &s.index.to_string())))
        .collect())
}

/// One segment's compiled program and where its clip lands.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SegmentJob {
    pub plan: RenderPlan,
    pub program: EngineProgram,
}

/// Everything a run will do, computed without invoking the engine's render stages.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CompiledReel {
    pub timeline: Timeline,
    pub segments: Vec<SegmentJob>,
    pub concat: EngineProgram,
    /// Present only when the continuous music pass will run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music: Option<MusicProgram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remux: Option<EngineProgram>,
    pub output: PathBuf,
    pub sidecar: PathBuf,
}

impl CompiledReel {
    /// The artifact that becomes the deliverable.
    fn final_artifact(&self) -> &Path {
        self.remux
            .as_ref()
            .map(|p| p.output.as_path())
            .unwrap_or(self.concat.output.as_path())
    }
}

/// What a successful run produced.
#[derive(Clone, Debug, PartialEq)]
pub struct ReelOutput {
    pub video: PathBuf,
    pub sidecar: PathBuf,
    pub timeline: Timeline,
}

/// Validate, schedule and plan a reel, producing every engine program.
///
/// Nothing is written. The renderer is only asked to probe durations.
#[tracing::instrument(skip_all, fields(segments = segments.len()))]
pub fn compile_reel(
    segments: Vec<Segment>,
    narration: &[PathBuf],
    cfg: &ReelConfig,
    renderer: &dyn Renderer,
) -> ReelResult<CompiledReel> {
    cfg.validate()?;
    let segments = normalize_segments(segments);
    validate_segments(&segments, cfg.require_images)?;
    check_narration(&segments, narration)?;
    check_stems(cfg)?;

    let timeline = schedule(segments, narration, cfg.timing, renderer)?;
    let total = timeline.total_duration();
    tracing::info!(
        segments = timeline.len(),
        total = format_args!("{total:.3}s"),
        "timeline scheduled"
    );

    let plans = build_plans(&timeline, narration, cfg)?;

    if cfg.music.mode == MusicMode::PerSegment
        && (cfg.music.intro.is_some() || cfg.music.outro.is_some())
    {
        tracing::warn!("intro/outro stems only play in continuous music mode; ignoring them");
    }

    let music = if cfg.music.continuous_pass() {
        let outro_len = cfg.music.outro.as_deref().and_then(|path| {
            renderer
                .probe_duration(path)
                .inspect_err(|e| {
                    tracing::warn!(error = %e, "outro probe failed; using the default window")
                })
                .ok()
                .flatten()
        });
        Some(MusicProgram::new(
            total,
            &cfg.music,
            cfg.normalize_voice,
            outro_len,
        )?)
    } else {
        None
    };

    let layout = WorkLayout::new(cfg.artifacts.work_dir.clone());
    let jobs = plans
        .into_iter()
        .map(|plan| {
            let program = segment_program(&plan, &layout.clip_path(plan.index));
            SegmentJob { plan, program }
        })
        .collect();
    let concat = concat_program(&layout.manifest_path(), &layout.base_path());
    let remux = music
        .as_ref()
        .map(|m| remux_program(&layout.base_path(), m, &layout.mixed_path()));

    Ok(CompiledReel {
        timeline,
        segments: jobs,
        concat,
        music,
        remux,
        output: cfg.output.clone(),
        sidecar: cfg.sidecar_path(),
    })
}

fn schedule(
    segments: Vec<Segment>,
    narration: &[PathBuf],
    timing: TimingMode,
    renderer: &dyn Renderer,
) -> ReelResult<Timeline> {
    match timing {
        TimingMode::Estimated => {
            let timeline = Timeline::schedule(segments)?;
            for (seg, path) in timeline.segments().iter().zip(narration) {
                match renderer.probe_duration(path) {
                    Ok(Some(clip)) if clip > seg.duration() => tracing::warn!(
                        segment = seg.index,
                        clip = format_args!("{clip:.3}s"),
                        slot = format_args!("{:.3}s", seg.duration()),
                        "narration longer than its slot; it will be cut"
                    ),
                    Ok(_) => {}
                    Err(e) => tracing::debug!(segment = seg.index, error = %e, "narration probe skipped"),
                }
            }
            Ok(timeline)
        }
        TimingMode::Measured => {
            let mut lengths = Vec::with_capacity(narration.len());
            for (seg, path) in segments.iter().zip(narration) {
                let secs = renderer.probe_duration(path)?.ok_or_else(|| {
                    ReelError::validation(format!(
                        "measured timing needs the length of narration for segment {}, \
                         but the renderer cannot probe '{}'",
                        seg.index,
                        path.display()
                    ))
                })?;
                lengths.push(secs);
            }
            Timeline::schedule_measured(segments, &lengths)
        }
    }
}

/// Render a reel end to end: segment clips, concatenation, optional music pass,
/// then the deliverable and its timeline sidecar.
///
/// Either both the video and the sidecar exist afterwards, or neither was written
/// by this call.
#[tracing::instrument(skip_all, fields(output = %cfg.output.display()))]
pub fn render_reel(
    segments: Vec<Segment>,
    narration: &[PathBuf],
    cfg: &ReelConfig,
    renderer: &dyn Renderer,
) -> ReelResult<ReelOutput> {
    let compiled = compile_reel(segments, narration, cfg, renderer)?;

    let work = WorkDir::prepare(&cfg.artifacts)?;
    let result = execute(&compiled, &work, &cfg.threading, renderer);
    work.finish();
    result?;

    Ok(ReelOutput {
        video: compiled.output,
        sidecar: compiled.sidecar,
        timeline: compiled.timeline,
    })
}

fn execute(
    compiled: &CompiledReel,
    work: &WorkDir,
    threading: &RenderThreading,
    renderer: &dyn Renderer,
) -> ReelResult<()> {
    render_segments(&compiled.segments, threading, renderer)?;

    let indices: Vec<u32> = compiled.segments.iter().map(|j| j.plan.index).collect();
    work.write_manifest(&indices)?;
    tracing::info!(clips = indices.len(), "concatenating");
    tracing::debug!(args = %compiled.concat.display_args(), "concat program");
    renderer.concat(&compiled.concat)?;

    if let Some(remux) = &compiled.remux {
        tracing::info!("mixing continuous music");
        tracing::debug!(args = %remux.display_args(), "remux program");
        renderer.remux_audio(remux)?;
    }

    publish(compiled.final_artifact(), &compiled.output)?;
    if let Err(e) = write_sidecar(&compiled.sidecar, &compiled.timeline) {
        if let Err(rm) = std::fs::remove_file(&compiled.output) {
            tracing::warn!(path = %compiled.output.display(), error = %rm, "cleanup: remove deliverable failed");
        }
        return Err(e);
    }
    tracing::info!(
        video = %compiled.output.display(),
        sidecar = %compiled.sidecar.display(),
        "reel written"
    );
    Ok(())
}

fn render_one(job: &SegmentJob, renderer: &dyn Renderer) -> ReelResult<()> {
    tracing::info!(
        segment = job.plan.index,
        duration = format_args!("{:.3}s", job.plan.duration),
        "rendering segment"
    );
    tracing::debug!(segment = job.plan.index, args = %job.program.display_args(), "segment program");
    renderer.render_segment(job.plan.index, &job.program)
}

fn render_segments(
    jobs: &[SegmentJob],
    threading: &RenderThreading,
    renderer: &dyn Renderer,
) -> ReelResult<()> {
    if !threading.parallel {
        return jobs.iter().try_for_each(|job| render_one(job, renderer));
    }

    let pool = build_thread_pool(threading.threads)?;
    // Collect every outcome so running siblings finish before the first error is reported.
    let results: Vec<ReelResult<()>> =
        pool.install(|| jobs.par_iter().map(|job| render_one(job, renderer)).collect());
    results.into_iter().collect()
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ReelError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ReelError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}
