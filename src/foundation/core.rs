use crate::foundation::error::{ReelError, ReelResult};

/// Frame rate of every rendered clip, including the Ken Burns zoom curve.
pub const FPS: Fps = Fps { num: 30, den: 1 };

/// Fixed vertical output frame.
pub const FRAME: Canvas = Canvas {
    width: 1080,
    height: 1920,
};

/// Audio sample rate shared by every intermediate clip so the concat stays lossless.
pub const SAMPLE_RATE: u32 = 48_000;

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> ReelResult<Self> {
        if den == 0 {
            return Err(ReelError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ReelError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Convert seconds to frame count using floor semantics.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }
}

impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Output frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// `WxH`, the size syntax of the engine's lavfi sources.
    pub fn size_arg(self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Format seconds for embedding in engine programs (millisecond precision).
pub fn fmt_secs(secs: f64) -> String {
    format!("{secs:.3}")
}
