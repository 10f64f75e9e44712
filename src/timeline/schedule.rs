use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::segment::Segment;

/// Assumed narration speaking rate, in words per minute.
pub const SPEAKING_RATE_WPM: f64 = 155.0;
/// Shortest slot a segment is given.
pub const MIN_SEGMENT_SECS: f64 = 2.0;
/// Longest slot an estimated segment is given.
pub const MAX_SEGMENT_SECS: f64 = 8.0;

/// Word-count estimate of how long a narration takes to speak.
pub fn estimate_duration(narration: &str) -> f64 {
    let words = crate::timeline::segment::word_count(narration) as f64;
    (words / SPEAKING_RATE_WPM * 60.0).clamp(MIN_SEGMENT_SECS, MAX_SEGMENT_SECS)
}

/// Slot length for a narration clip of known length. No upper clamp: a long clip gets a long slot.
pub fn measured_duration(clip_secs: f64) -> f64 {
    clip_secs.max(MIN_SEGMENT_SECS)
}

/// A scheduled, read-only segment sequence.
///
/// Construction is the single point where `start`/`duration` are written: segments are laid
/// end to end in index order starting at zero.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct Timeline {
    segments: Vec<Segment>,
}

impl Timeline {
    /// Schedule using the word-count estimate.
    pub fn schedule(segments: Vec<Segment>) -> ReelResult<Self> {
        Self::schedule_by(segments, |s| estimate_duration(&s.narration))
    }

    /// Schedule with caller-supplied slot lengths (one per segment, index order).
    pub fn schedule_measured(segments: Vec<Segment>, clip_secs: &[f64]) -> ReelResult<Self> {
        if clip_secs.len() != segments.len() {
            return Err(ReelError::validation(format!(
                "measured timing needs one clip length per segment ({} segments, {} lengths)",
                segments.len(),
                clip_secs.len()
            )));
        }
        let mut lengths = clip_secs.iter();
        Self::schedule_by(segments, |_| {
            lengths
                .next()
                .copied()
                .map(measured_duration)
                .unwrap_or(MIN_SEGMENT_SECS)
        })
    }

    fn schedule_by(
        mut segments: Vec<Segment>,
        mut slot: impl FnMut(&Segment) -> f64,
    ) -> ReelResult<Self> {
        if segments.is_empty() {
            return Err(ReelError::validation("cannot schedule an empty timeline"));
        }
        if let Some((pos, s)) = segments
            .iter()
            .enumerate()
            .find(|(pos, s)| s.index as usize != *pos)
        {
            return Err(ReelError::validation(format!(
                "segment at position {pos} has index {}; schedule expects index order",
                s.index
            )));
        }

        let mut t = 0.0;
        for seg in &mut segments {
            let d = slot(seg);
            if !d.is_finite() || d <= 0.0 {
                return Err(ReelError::validation(format!(
                    "segment {} got a non-positive duration {d}",
                    seg.index
                )));
            }
            seg.set_timing(t, d);
            t += d;
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total length `T` of the timeline, in seconds.
    pub fn total_duration(&self) -> f64 {
        self.segments.last().map(Segment::end).unwrap_or(0.0)
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Pretty JSON array of the scheduled records, the sidecar format.
    pub fn to_json_pretty(&self) -> ReelResult<String> {
        Ok(serde_json::to_string_pretty(&self.segments)?)
    }
}
