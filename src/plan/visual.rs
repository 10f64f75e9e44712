use std::path::{Path, PathBuf};

use crate::config::{CaptionMode, CaptionOpts};
use crate::foundation::core::{Canvas, FPS, Fps};
use crate::timeline::segment::Segment;

/// Solid backgrounds used when a segment has no still, rotated by segment index.
pub const FALLBACK_PALETTE: [&str; 4] = ["0x222222", "0x2d1f44", "0x123a2a", "0x443311"];

/// Appended to captions cut at `max_chars`.
pub const TRUNCATION_MARKER: char = '…';

const CAPTION_FONT_SIZE: u32 = 52;
const CAPTION_BOTTOM_MARGIN: u32 = 60;
const CAPTION_BOX_BORDER: u32 = 20;

pub fn fallback_color(index: u32) -> &'static str {
    FALLBACK_PALETTE[index as usize % FALLBACK_PALETTE.len()]
}

/// Scale-then-crop geometry that fills the frame without distorting the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct CoverFit {
    pub scaled_w: u32,
    pub scaled_h: u32,
    pub crop_x: u32,
    pub crop_y: u32,
}

/// Cover-fit a `src_w x src_h` image into `frame`, centered.
///
/// Both source dimensions must be non-zero.
pub fn cover_fit(src_w: u32, src_h: u32, frame: Canvas) -> CoverFit {
    let sx = f64::from(frame.width) / f64::from(src_w);
    let sy = f64::from(frame.height) / f64::from(src_h);
    let scale = sx.max(sy);

    // Rounding may land one pixel short; the crop needs the full frame.
    let scaled_w = ((f64::from(src_w) * scale).round() as u32).max(frame.width);
    let scaled_h = ((f64::from(src_h) * scale).round() as u32).max(frame.height);

    CoverFit {
        scaled_w,
        scaled_h,
        crop_x: (scaled_w - frame.width) / 2,
        crop_y: (scaled_h - frame.height) / 2,
    }
}

impl CoverFit {
    pub fn filter(&self, frame: Canvas) -> String {
        format!(
            "scale={}:{},crop={}:{}:{}:{}",
            self.scaled_w, self.scaled_h, frame.width, frame.height, self.crop_x, self.crop_y
        )
    }
}

/// Linear zoom from 1.0 toward `zoom_max`, clamped, over a segment's frames.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ZoomCurve {
    pub frames: u64,
    pub zoom_max: f64,
    pub fps: Fps,
}

impl ZoomCurve {
    pub fn new(duration: f64, zoom_max: f64) -> Self {
        Self {
            frames: FPS.secs_to_frames_floor(duration).max(1),
            zoom_max,
            fps: FPS,
        }
    }

    /// Zoom increment per output frame.
    pub fn step(&self) -> f64 {
        (self.zoom_max - 1.0) / self.frames as f64
    }

    pub fn zoom_at(&self, frame: u64) -> f64 {
        (1.0 + self.step() * frame as f64).min(self.zoom_max)
    }

    pub fn filter(&self, frame: Canvas) -> String {
        format!(
            "zoompan=z='min(1+{:.8}*on,{})':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d=1:s={}:fps={}",
            self.step(),
            self.zoom_max,
            frame.size_arg(),
            self.fps
        )
    }
}

/// Collapse newlines, trim, and cut to `max_chars` characters (marker included).
pub fn truncate_caption(text: &str, max_chars: usize) -> String {
    let flat = text.trim().replace(['\r', '\n'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    out.push(TRUNCATION_MARKER);
    out
}

fn escape_with(text: &str, reserved: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if reserved.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a filter option value so it survives both parsing levels of a filter graph:
/// the option list (`:` separated) and then the graph itself (`,` `;` `[` `]`).
///
/// The result is used unquoted.
pub fn escape_drawtext(text: &str) -> String {
    let option_level = escape_with(text, &['\\', '\'', ':']);
    escape_with(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

/// Bottom-anchored, horizontally centered caption overlay.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Caption {
    /// Truncated, unescaped caption text.
    pub text: String,
    pub color: String,
    pub font: Option<PathBuf>,
    pub box_color: Option<String>,
}

impl Caption {
    pub fn for_segment(seg: &Segment, opts: &CaptionOpts) -> Option<Self> {
        if !opts.enabled {
            return None;
        }
        let chosen = match opts.mode {
            CaptionMode::Title => seg.title.as_str(),
            CaptionMode::Narration => seg.narration.as_str(),
        };
        let source = if chosen.trim().is_empty() {
            seg.narration.as_str()
        } else {
            chosen
        };
        let text = truncate_caption(source, opts.max_chars);
        if text.is_empty() {
            return None;
        }

        Some(Self {
            text,
            color: opts.color.clone(),
            font: opts.font.clone(),
            box_color: opts.box_enabled.then(|| opts.box_color.clone()),
        })
    }

    pub fn filter(&self) -> String {
        let mut f = format!(
            "drawtext=text={}:expansion=none:x=(w-text_w)/2:y=h-(text_h*2)-{CAPTION_BOTTOM_MARGIN}:fontsize={CAPTION_FONT_SIZE}:fontcolor={}",
            escape_drawtext(&self.text),
            self.color
        );
        if let Some(font) = &self.font {
            f.push_str(":fontfile=");
            f.push_str(&escape_drawtext(&font.to_string_lossy()));
        }
        if let Some(box_color) = &self.box_color {
            f.push_str(&format!(
                ":box=1:boxcolor={box_color}:boxborderw={CAPTION_BOX_BORDER}"
            ));
        }
        f
    }
}

/// Resolved background of a segment.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisualSource {
    Image {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    Color {
        color: &'static str,
    },
}

/// Background plus the filter steps layered on it.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct VisualPlan {
    pub source: VisualSource,
    pub zoom: Option<ZoomCurve>,
    pub caption: Option<Caption>,
}

impl VisualPlan {
    pub fn image_path(&self) -> Option<&Path> {
        match &self.source {
            VisualSource::Image { path, .. } => Some(path),
            VisualSource::Color { .. } => None,
        }
    }

    /// Filter chain applied to the background input, in order.
    pub fn filter_chain(&self, frame: Canvas) -> Vec<String> {
        let mut chain = Vec::new();
        if let VisualSource::Image { width, height, .. } = &self.source {
            chain.push(cover_fit(*width, *height, frame).filter(frame));
            if let Some(zoom) = &self.zoom {
                chain.push(zoom.filter(frame));
            }
        }
        if let Some(caption) = &self.caption {
            chain.push(caption.filter());
        }
        chain.push("setsar=1".to_string());
        chain.push("format=yuv420p".to_string());
        chain
    }
}
