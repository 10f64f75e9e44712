use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::engine::program::EngineProgram;
use crate::foundation::error::{ReelError, ReelResult, Stage};

/// Capability to run the external audio/video engine, one method per pipeline stage.
///
/// Implementations must be shareable across the segment worker pool.
pub trait Renderer: Sync {
    /// Render the intermediate clip of segment `index`.
    fn render_segment(&self, index: u32, program: &EngineProgram) -> ReelResult<()>;

    /// Join intermediate clips by stream copy.
    fn concat(&self, program: &EngineProgram) -> ReelResult<()>;

    /// Replace the base video's audio with the continuous mix.
    fn remux_audio(&self, program: &EngineProgram) -> ReelResult<()>;

    /// Length of a media file in seconds, `None` when the backend cannot probe.
    fn probe_duration(&self, _path: &Path) -> ReelResult<Option<f64>> {
        Ok(None)
    }
}

/// One call made to a [`RecordingRenderer`].
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedCall {
    Segment {
        index: u32,
        program: EngineProgram,
    },
    Concat(EngineProgram),
    Remux(EngineProgram),
}

impl RecordedCall {
    pub fn program(&self) -> &EngineProgram {
        match self {
            Self::Segment { program, .. } | Self::Concat(program) | Self::Remux(program) => {
                program
            }
        }
    }
}

/// Renderer for tests and dry runs: records every program and writes placeholder outputs.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<RecordedCall>>,
    durations: Vec<(PathBuf, f64)>,
    fail_segment: Option<u32>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `secs` when `path` is probed.
    pub fn with_duration(mut self, path: impl Into<PathBuf>, secs: f64) -> Self {
        self.durations.push((path.into(), secs));
        self
    }

    /// Make the render of segment `index` fail like an engine crash.
    pub fn failing_segment(mut self, index: u32) -> Self {
        self.fail_segment = Some(index);
        self
    }

    /// Calls in the order they were made.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|c| c.to_vec())
            .unwrap_or_else(|poisoned| poisoned.into_inner().to_vec())
    }

    fn record(&self, call: RecordedCall) -> ReelResult<()> {
        let out = call.program().output.clone();
        self.calls
            .lock()
            .map_err(|_| ReelError::Other(anyhow::anyhow!("recording renderer lock poisoned")))?
            .push(call);
        write_placeholder(&out)
    }
}

fn write_placeholder(path: &Path) -> ReelResult<()> {
    use anyhow::Context as _;
    std::fs::write(path, b"")
        .with_context(|| format!("write placeholder output '{}'", path.display()))?;
    Ok(())
}

impl Renderer for RecordingRenderer {
    fn render_segment(&self, index: u32, program: &EngineProgram) -> ReelResult<()> {
        if self.fail_segment == Some(index) {
            return Err(ReelError::render(
                Stage::Segment(index),
                "recording renderer: simulated engine failure",
            ));
        }
        self.record(RecordedCall::Segment {
            index,
            program: program.clone(),
        })
    }

    fn concat(&self, program: &EngineProgram) -> ReelResult<()> {
        self.record(RecordedCall::Concat(program.clone()))
    }

    fn remux_audio(&self, program: &EngineProgram) -> ReelResult<()> {
        self.record(RecordedCall::Remux(program.clone()))
    }

    fn probe_duration(&self, path: &Path) -> ReelResult<Option<f64>> {
        Ok(self
            .durations
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, secs)| *secs))
    }
}
