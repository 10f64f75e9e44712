use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};

/// Hard cap on narration length, in whitespace-separated words.
pub const MAX_NARRATION_WORDS: usize = 60;

/// One narrated unit of the reel.
///
/// Records are created unscheduled by the storyboard collaborator. `start` and `duration` stay
/// zero until a [`Timeline`](crate::Timeline) schedules them, and are read-only afterwards.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    #[serde(rename = "idx", alias = "index")]
    pub index: u32,
    pub title: String,
    pub narration: String,
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub image: Option<PathBuf>,
    #[serde(default)]
    start: f64,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Segment {
    pub fn new(index: u32, title: impl Into<String>, narration: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            narration: narration.into(),
            hint: String::new(),
            image: None,
            start: 0.0,
            duration: 0.0,
            meta: serde_json::Map::new(),
        }
    }

    pub fn with_image(mut self, image: impl Into<PathBuf>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    /// Timeline start in seconds (zero until scheduled).
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Scheduled duration in seconds (zero until scheduled).
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn word_count(&self) -> usize {
        word_count(&self.narration)
    }

    pub(crate) fn set_timing(&mut self, start: f64, duration: f64) {
        self.start = start;
        self.duration = duration;
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Apply the collaborator-facing field normalization: blank titles become `"Untitled"`.
pub fn normalize_segments(segments: Vec<Segment>) -> Vec<Segment> {
    segments
        .into_iter()
        .map(|mut s| {
            if s.title.trim().is_empty() {
                s.title = "Untitled".to_string();
            }
            s
        })
        .collect()
}

/// Reject anything the pipeline cannot render before a single engine call is made.
pub fn validate_segments(segments: &[Segment], require_images: bool) -> ReelResult<()> {
    if segments.is_empty() {
        return Err(ReelError::validation("no segments to render"));
    }

    let indices_ok = segments
        .iter()
        .enumerate()
        .all(|(pos, s)| s.index as usize == pos);
    if !indices_ok {
        let idxs: Vec<u32> = segments.iter().map(|s| s.index).collect();
        return Err(ReelError::validation(format!(
            "segment indices must be a contiguous 0-based sequence, got {idxs:?}"
        )));
    }

    for s in segments {
        if s.narration.trim().is_empty() {
            return Err(ReelError::validation(format!(
                "segment {} has empty narration",
                s.index
            )));
        }
        if s.title.trim().is_empty() {
            return Err(ReelError::validation(format!(
                "segment {} has empty title",
                s.index
            )));
        }
        let words = s.word_count();
        if words > MAX_NARRATION_WORDS {
            return Err(ReelError::validation(format!(
                "narration too long in segment {} ({words} words, max {MAX_NARRATION_WORDS})",
                s.index
            )));
        }
        if require_images && s.image.is_none() {
            return Err(ReelError::validation(format!(
                "segment {} has no image while images are required",
                s.index
            )));
        }
    }

    Ok(())
}

/// Read a JSON array of segment records.
pub fn load_segments(path: &Path) -> ReelResult<Vec<Segment>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read segments '{}'", path.display()))?;
    let segments: Vec<Segment> = serde_json::from_slice(&bytes)
        .map_err(|e| ReelError::serde(format!("parse segments '{}': {e}", path.display())))?;
    Ok(normalize_segments(segments))
}
