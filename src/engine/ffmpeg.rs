use std::path::Path;
use std::process::{Command, Stdio};

use crate::engine::backend::Renderer;
use crate::engine::program::EngineProgram;
use crate::foundation::error::{ReelError, ReelResult, Stage};

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Renderer backed by the system `ffmpeg` and `ffprobe` binaries.
///
/// We shell out rather than link FFmpeg so no native dev headers are needed.
#[derive(Clone, Debug)]
pub struct FfmpegRenderer {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegRenderer {
    /// Create a renderer, failing early when `ffmpeg` is missing.
    pub fn new() -> ReelResult<Self> {
        if !is_ffmpeg_on_path() {
            return Err(ReelError::validation(
                "ffmpeg is required for rendering, but was not found on PATH",
            ));
        }
        Ok(Self::unchecked())
    }

    /// Create a renderer without checking `PATH` (dry runs only probe).
    pub fn unchecked() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }

    fn run(&self, stage: Stage, program: &EngineProgram) -> ReelResult<()> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-hide_banner", "-nostdin", "-loglevel", "error"])
            .args(program.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        tracing::debug!(%stage, args = %program.display_args(), "running ffmpeg");

        let output = cmd.output().map_err(|e| {
            ReelError::render(
                stage,
                format!("failed to spawn ffmpeg (is it installed and on PATH?): {e}"),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelError::render(
                stage,
                format!("ffmpeg exited with status {}: {}", output.status, stderr.trim()),
            ));
        }
        Ok(())
    }
}

impl Renderer for FfmpegRenderer {
    fn render_segment(&self, index: u32, program: &EngineProgram) -> ReelResult<()> {
        self.run(Stage::Segment(index), program)
    }

    fn concat(&self, program: &EngineProgram) -> ReelResult<()> {
        self.run(Stage::Concat, program)
    }

    fn remux_audio(&self, program: &EngineProgram) -> ReelResult<()> {
        self.run(Stage::Remux, program)
    }

    fn probe_duration(&self, path: &Path) -> ReelResult<Option<f64>> {
        #[derive(serde::Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeOut {
            format: Option<ProbeFormat>,
        }

        let out = match Command::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
        {
            Ok(out) => out,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("ffprobe not on PATH; skipping duration probe");
                return Ok(None);
            }
            Err(e) => {
                return Err(ReelError::render(
                    Stage::Probe,
                    format!("failed to run ffprobe: {e}"),
                ));
            }
        };
        if !out.status.success() {
            return Err(ReelError::render(
                Stage::Probe,
                format!(
                    "ffprobe failed for '{}': {}",
                    path.display(),
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            ));
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
            .map_err(|e| ReelError::serde(format!("ffprobe json parse failed: {e}")))?;
        Ok(parsed
            .format
            .and_then(|f| f.duration)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0))
    }
}
