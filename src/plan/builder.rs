use std::path::{Path, PathBuf};

use crate::config::ReelConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::plan::audio::{SegmentAudio, SegmentMusic};
use crate::plan::visual::{Caption, VisualPlan, VisualSource, ZoomCurve, fallback_color};
use crate::timeline::schedule::Timeline;
use crate::timeline::segment::Segment;

/// Everything needed to render one segment clip.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RenderPlan {
    pub index: u32,
    pub duration: f64,
    pub visual: VisualPlan,
    pub audio: SegmentAudio,
}

/// Fail with the first segment whose narration clip is missing.
pub fn check_narration(segments: &[Segment], narration: &[PathBuf]) -> ReelResult<()> {
    if narration.len() != segments.len() {
        return Err(ReelError::validation(format!(
            "expected one narration clip per segment ({} segments, {} clips)",
            segments.len(),
            narration.len()
        )));
    }
    for (seg, path) in segments.iter().zip(narration) {
        if !path.is_file() {
            return Err(ReelError::asset(format!(
                "narration for segment {} not found: '{}'",
                seg.index,
                path.display()
            )));
        }
    }
    Ok(())
}

/// Fail with the first configured music stem that does not exist.
pub fn check_stems(cfg: &ReelConfig) -> ReelResult<()> {
    let m = &cfg.music;
    for (name, path) in [
        ("bed", m.bed.as_deref()),
        ("intro", m.intro.as_deref()),
        ("outro", m.outro.as_deref()),
    ] {
        if let Some(p) = path
            && !p.is_file()
        {
            return Err(ReelError::asset(format!(
                "music {name} stem not found: '{}'",
                p.display()
            )));
        }
    }
    Ok(())
}

fn probe_still(index: u32, path: &Path) -> ReelResult<VisualSource> {
    if !path.is_file() {
        return Err(ReelError::asset(format!(
            "image for segment {index} not found: '{}'",
            path.display()
        )));
    }
    let (width, height) = image::image_dimensions(path).map_err(|e| {
        ReelError::asset(format!(
            "image for segment {index} is unreadable: '{}': {e}",
            path.display()
        ))
    })?;
    if width == 0 || height == 0 {
        return Err(ReelError::asset(format!(
            "image for segment {index} has zero size: '{}'",
            path.display()
        )));
    }
    Ok(VisualSource::Image {
        path: path.to_path_buf(),
        width,
        height,
    })
}

/// Build the plan for a single scheduled segment.
pub fn build_plan(seg: &Segment, narration: &Path, cfg: &ReelConfig) -> ReelResult<RenderPlan> {
    if !narration.is_file() {
        return Err(ReelError::asset(format!(
            "narration for segment {} not found: '{}'",
            seg.index,
            narration.display()
        )));
    }

    let source = match &seg.image {
        Some(path) => probe_still(seg.index, path)?,
        None => VisualSource::Color {
            color: fallback_color(seg.index),
        },
    };
    let zoom = (cfg.ken_burns.enabled && matches!(source, VisualSource::Image { .. }))
        .then(|| ZoomCurve::new(seg.duration(), cfg.ken_burns.zoom_max));
    let caption = Caption::for_segment(seg, &cfg.captions);

    let music = cfg.music.per_segment_bed().map(|path| SegmentMusic {
        path: path.to_path_buf(),
        volume: cfg.music.volume,
        duck: cfg.music.duck,
    });

    Ok(RenderPlan {
        index: seg.index,
        duration: seg.duration(),
        visual: VisualPlan {
            source,
            zoom,
            caption,
        },
        audio: SegmentAudio {
            narration: narration.to_path_buf(),
            duration: seg.duration(),
            // The continuous pass normalizes the whole voice track; never do it twice.
            normalize_voice: cfg.normalize_voice && !cfg.music.continuous_pass(),
            music,
        },
    })
}

/// Build every segment's plan, in index order.
pub fn build_plans(
    timeline: &Timeline,
    narration: &[PathBuf],
    cfg: &ReelConfig,
) -> ReelResult<Vec<RenderPlan>> {
    check_narration(timeline.segments(), narration)?;
    timeline
        .segments()
        .iter()
        .zip(narration)
        .map(|(seg, path)| build_plan(seg, path, cfg))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/plan/builder.rs"]
mod tests;
