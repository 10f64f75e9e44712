pub type ReelResult<T> = Result<T, ReelError>;

/// Pipeline stage that invoked the external engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Rendering the intermediate clip of one segment.
    Segment(u32),
    /// Concatenating the intermediate clips.
    Concat,
    /// Replacing the base video's audio with the continuous music mix.
    Remux,
    /// Probing a media file's duration.
    Probe,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Segment(idx) => write!(f, "segment {idx}"),
            Stage::Concat => f.write_str("concat"),
            Stage::Remux => f.write_str("remux"),
            Stage::Probe => f.write_str("probe"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("asset error: {0}")]
    Asset(String),

    #[error("render error ({stage}): {diagnostic}")]
    Render { stage: Stage, diagnostic: String },

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    pub fn render(stage: Stage, diagnostic: impl Into<String>) -> Self {
        Self::Render {
            stage,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Stage that failed, for engine errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Render { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ReelError {
    fn from(e: serde_json::Error) -> Self {
        Self::serde(e.to_string())
    }
}
