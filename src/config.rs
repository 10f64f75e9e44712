use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};

/// Which segment field feeds the caption overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionMode {
    #[default]
    Title,
    Narration,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CaptionOpts {
    pub enabled: bool,
    pub mode: CaptionMode,
    /// Maximum caption length in characters, truncation marker included.
    pub max_chars: usize,
    pub color: String,
    pub box_enabled: bool,
    pub box_color: String,
    pub font: Option<PathBuf>,
}

impl Default for CaptionOpts {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: CaptionMode::Title,
            max_chars: 80,
            color: "white".to_string(),
            box_enabled: true,
            box_color: "black@0.5".to_string(),
            font: None,
        }
    }
}

/// Slow zoom on still images.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct KenBurnsOpts {
    pub enabled: bool,
    pub zoom_max: f64,
}

impl Default for KenBurnsOpts {
    fn default() -> Self {
        Self {
            enabled: false,
            zoom_max: 1.08,
        }
    }
}

/// How the music bed is laid under the narration. A run uses exactly one strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicMode {
    /// One show-length bed mixed in a second pass over the concatenated video.
    #[default]
    Continuous,
    /// The bed is looped and trimmed inside every segment render.
    PerSegment,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MusicOpts {
    pub bed: Option<PathBuf>,
    pub intro: Option<PathBuf>,
    pub outro: Option<PathBuf>,
    /// Linear gain applied to every stem.
    pub volume: f64,
    pub duck: bool,
    pub mode: MusicMode,
    /// Bed fade-in in seconds (continuous mode).
    pub fade_in: f64,
    /// Bed fade-out in seconds (continuous mode).
    pub fade_out: f64,
}

impl Default for MusicOpts {
    fn default() -> Self {
        Self {
            bed: None,
            intro: None,
            outro: None,
            volume: 0.20,
            duck: true,
            mode: MusicMode::Continuous,
            fade_in: 1.5,
            fade_out: 1.5,
        }
    }
}

impl MusicOpts {
    pub fn has_stems(&self) -> bool {
        self.bed.is_some() || self.intro.is_some() || self.outro.is_some()
    }

    /// Whether the second, show-length mixing pass runs.
    pub fn continuous_pass(&self) -> bool {
        self.mode == MusicMode::Continuous && self.has_stems()
    }

    /// The bed used inside segment renders, if per-segment mode applies.
    pub fn per_segment_bed(&self) -> Option<&Path> {
        match self.mode {
            MusicMode::PerSegment => self.bed.as_deref(),
            MusicMode::Continuous => None,
        }
    }
}

/// Working directory policy.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArtifactOpts {
    pub work_dir: PathBuf,
    pub keep_temp: bool,
    pub pre_cleanup: bool,
}

impl Default for ArtifactOpts {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(".reel_tmp"),
            keep_temp: false,
            pre_cleanup: false,
        }
    }
}

/// Where segment durations come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    /// Word-count estimate clamped to 2..8 seconds.
    #[default]
    Estimated,
    /// Probed narration clip length (at least 2 seconds).
    Measured,
}

/// Segment render parallelism.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderThreading {
    pub parallel: bool,
    pub threads: Option<usize>,
}

/// Everything a render run can be told.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    pub output: PathBuf,
    pub captions: CaptionOpts,
    pub ken_burns: KenBurnsOpts,
    pub music: MusicOpts,
    pub artifacts: ArtifactOpts,
    pub threading: RenderThreading,
    pub timing: TimingMode,
    pub normalize_voice: bool,
    pub require_images: bool,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("reel.mp4"),
            captions: CaptionOpts::default(),
            ken_burns: KenBurnsOpts::default(),
            music: MusicOpts::default(),
            artifacts: ArtifactOpts::default(),
            threading: RenderThreading::default(),
            timing: TimingMode::Estimated,
            normalize_voice: true,
            require_images: false,
        }
    }
}

impl ReelConfig {
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn load_json(path: &Path) -> ReelResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read config '{}'", path.display()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ReelError::serde(format!("parse config '{}': {e}", path.display())))
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.output.as_os_str().is_empty() {
            return Err(ReelError::validation("output path must be set"));
        }
        if self.output.extension().is_some_and(|e| e == "json") {
            return Err(ReelError::validation(
                "output path must not end in .json (reserved for the sidecar)",
            ));
        }
        if self.captions.max_chars == 0 {
            return Err(ReelError::validation("caption max_chars must be >= 1"));
        }
        if !self.ken_burns.zoom_max.is_finite() || self.ken_burns.zoom_max < 1.0 {
            return Err(ReelError::validation(format!(
                "ken burns zoom_max must be a finite value >= 1.0, got {}",
                self.ken_burns.zoom_max
            )));
        }
        for (name, v) in [
            ("music volume", self.music.volume),
            ("fade_in", self.music.fade_in),
            ("fade_out", self.music.fade_out),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ReelError::validation(format!(
                    "{name} must be a finite value >= 0, got {v}"
                )));
            }
        }
        if let Some(n) = self.threading.threads
            && n == 0
        {
            return Err(ReelError::validation(
                "render threading 'threads' must be >= 1 when set",
            ));
        }
        if self.artifacts.work_dir.as_os_str().is_empty() {
            return Err(ReelError::validation("work_dir must be set"));
        }
        Ok(())
    }

    /// Sidecar path: the output's base name with a `.json` extension.
    pub fn sidecar_path(&self) -> PathBuf {
        self.output.with_extension("json")
    }
}
