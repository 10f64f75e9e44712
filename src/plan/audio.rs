//! Audio mixing programs.
//!
//! Both mixing strategies, per-segment and continuous, are variants of [`AudioMixProgram`] and
//! are assembled from the same pure filter primitives (loop/trim, fades, sidechain duck,
//! additive mix). [`AudioMixProgram::graph`] lowers a program to filter-graph chains.

use std::path::PathBuf;

use crate::config::MusicOpts;
use crate::foundation::core::{SAMPLE_RATE, fmt_secs};
use crate::foundation::error::{ReelError, ReelResult};

/// Outro window assumed when a stem's length cannot be probed.
pub const DEFAULT_OUTRO_WINDOW_SECS: f64 = 5.0;
/// Upper bound for the intro fade-out and outro fade-in.
pub const STEM_FADE_MAX_SECS: f64 = 2.0;
/// How far before the end of the bed fade-in the intro starts to recede.
pub const INTRO_FADE_LEAD_SECS: f64 = 0.5;

/// Compressor settings for ducking music under speech.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct DuckParams {
    pub threshold: f64,
    pub ratio: f64,
    pub attack_ms: f64,
    pub release_ms: f64,
    pub makeup: f64,
}

pub const DUCK: DuckParams = DuckParams {
    threshold: 0.1,
    ratio: 8.0,
    attack_ms: 5.0,
    release_ms: 250.0,
    makeup: 4.0,
};

/// Loudness normalization target for the voice track.
pub const VOICE_LOUDNORM: &str = "loudnorm=I=-16:LRA=11:TP=-1.5";

// Filter primitives. Each returns one filter (or a labelled chain) in engine syntax.

pub fn loop_and_trim(duration: f64) -> String {
    format!(
        "aloop=loop=-1:size=2e9,atrim=0:{},asetpts=PTS-STARTPTS",
        fmt_secs(duration)
    )
}

pub fn pad_and_trim(duration: f64) -> String {
    let d = fmt_secs(duration);
    format!("apad=whole_dur={d},atrim=0:{d},asetpts=PTS-STARTPTS")
}

pub fn volume(gain: f64) -> String {
    format!("volume={gain}")
}

pub fn fade_in(start: f64, duration: f64) -> String {
    format!(
        "afade=t=in:st={}:d={}",
        fmt_secs(start),
        fmt_secs(duration)
    )
}

pub fn fade_out(start: f64, duration: f64) -> String {
    format!(
        "afade=t=out:st={}:d={}",
        fmt_secs(start),
        fmt_secs(duration)
    )
}

/// Common sample rate and layout so clips concat losslessly and mixes line up.
pub fn output_format() -> String {
    format!("aresample={SAMPLE_RATE},aformat=sample_fmts=fltp:channel_layouts=stereo")
}

/// Compress `music` with `key` as the control signal.
pub fn sidechain_duck(music: &str, key: &str, out: &str, p: DuckParams) -> String {
    format!(
        "[{music}][{key}]sidechaincompress=threshold={}:ratio={}:attack={}:release={}:makeup={}[{out}]",
        p.threshold, p.ratio, p.attack_ms, p.release_ms, p.makeup
    )
}

/// How long an additive mix runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MixLength {
    First,
    Longest,
}

/// Un-normalized additive mix of `inputs`.
pub fn additive_mix(inputs: &[&str], out: &str, length: MixLength) -> String {
    let pads: String = inputs.iter().map(|l| format!("[{l}]")).collect();
    let duration = match length {
        MixLength::First => "first",
        MixLength::Longest => "longest",
    };
    format!(
        "{pads}amix=inputs={}:duration={duration}:dropout_transition=0:normalize=0[{out}]",
        inputs.len()
    )
}

/// Fade durations clamped to `[0, total/2]` so they never cross the midpoint.
pub fn clamp_fades(total: f64, fade_in: f64, fade_out: f64) -> (f64, f64) {
    let half = (total / 2.0).max(0.0);
    (fade_in.clamp(0.0, half), fade_out.clamp(0.0, half))
}

/// A per-segment music excerpt.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SegmentMusic {
    pub path: PathBuf,
    pub volume: f64,
    pub duck: bool,
}

/// Narration for one segment, optionally over a music excerpt.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SegmentAudio {
    pub narration: PathBuf,
    pub duration: f64,
    pub normalize_voice: bool,
    pub music: Option<SegmentMusic>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct BedStem {
    pub path: PathBuf,
    pub fade_in: f64,
    pub fade_out: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct IntroStem {
    pub path: PathBuf,
    pub fade_out_start: f64,
    pub fade_out: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct OutroStem {
    pub path: PathBuf,
    /// Seconds of the stem that play, ending at the timeline end.
    pub window: f64,
    /// Timeline position where the stem starts.
    pub delay: f64,
    pub fade_in: f64,
}

/// Whole-timeline music description for the continuous second pass.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct MusicProgram {
    pub total: f64,
    pub volume: f64,
    pub duck: bool,
    pub normalize_voice: bool,
    pub bed: Option<BedStem>,
    pub intro: Option<IntroStem>,
    pub outro: Option<OutroStem>,
}

impl MusicProgram {
    /// Lay the configured stems over a timeline of length `total`.
    ///
    /// `outro_len` is the probed length of the outro stem, when known.
    pub fn new(
        total: f64,
        music: &MusicOpts,
        normalize_voice: bool,
        outro_len: Option<f64>,
    ) -> ReelResult<Self> {
        if !total.is_finite() || total <= 0.0 {
            return Err(ReelError::validation(format!(
                "continuous music needs a positive timeline duration, got {total}"
            )));
        }
        let (fade_in_eff, fade_out_eff) = clamp_fades(total, music.fade_in, music.fade_out);

        let bed = music.bed.as_ref().map(|path| BedStem {
            path: path.clone(),
            fade_in: fade_in_eff,
            fade_out: fade_out_eff,
        });

        let intro = music.intro.as_ref().map(|path| IntroStem {
            path: path.clone(),
            fade_out_start: (fade_in_eff - INTRO_FADE_LEAD_SECS).max(0.0),
            fade_out: short_fade(fade_out_eff),
        });

        let outro = music.outro.as_ref().map(|path| {
            let window = outro_len
                .filter(|l| l.is_finite() && *l > 0.0)
                .unwrap_or(DEFAULT_OUTRO_WINDOW_SECS)
                .min(total);
            OutroStem {
                path: path.clone(),
                window,
                delay: (total - window).max(0.0),
                fade_in: short_fade(fade_in_eff).min(window),
            }
        });

        Ok(Self {
            total,
            volume: music.volume,
            duck: music.duck,
            normalize_voice,
            bed,
            intro,
            outro,
        })
    }

    pub fn has_stems(&self) -> bool {
        self.bed.is_some() || self.intro.is_some() || self.outro.is_some()
    }

    /// Stem files in the order they are fed to the engine.
    pub fn stem_paths(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if let Some(s) = &self.bed {
            out.push(s.path.clone());
        }
        if let Some(s) = &self.intro {
            out.push(s.path.clone());
        }
        if let Some(s) = &self.outro {
            out.push(s.path.clone());
        }
        out
    }
}

/// Zero means "use the default", anything else is capped.
fn short_fade(configured: f64) -> f64 {
    if configured > 0.0 {
        configured.min(STEM_FADE_MAX_SECS)
    } else {
        STEM_FADE_MAX_SECS
    }
}

/// One of the two audio-bed strategies.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioMixProgram {
    PerSegment(SegmentAudio),
    Continuous(MusicProgram),
}

/// Lowered audio program: extra engine inputs and the filter chains reading them.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioGraph {
    /// Files to add as engine inputs, numbered from the `first_extra_input` given to `graph`.
    pub extra_inputs: Vec<PathBuf>,
    pub chains: Vec<String>,
    /// Label of the final audio pad.
    pub out_label: &'static str,
}

impl AudioMixProgram {
    /// Lower to filter chains. `voice_pad` is the engine stream carrying narration (e.g. `1:a`).
    pub fn graph(&self, voice_pad: &str, first_extra_input: usize) -> AudioGraph {
        match self {
            Self::PerSegment(a) => per_segment_graph(a, voice_pad, first_extra_input),
            Self::Continuous(m) => continuous_graph(m, voice_pad, first_extra_input),
        }
    }
}

const SEGMENT_OUT: &str = "aout";
const CONTINUOUS_OUT: &str = "mixed";

fn per_segment_graph(a: &SegmentAudio, voice_pad: &str, first_extra: usize) -> AudioGraph {
    let mut voice = Vec::new();
    if a.normalize_voice {
        voice.push(VOICE_LOUDNORM.to_string());
    }
    voice.push(output_format());
    voice.push(pad_and_trim(a.duration));

    let Some(music) = &a.music else {
        return AudioGraph {
            extra_inputs: Vec::new(),
            chains: vec![format!("[{voice_pad}]{}[{SEGMENT_OUT}]", voice.join(","))],
            out_label: SEGMENT_OUT,
        };
    };

    let mut chains = vec![
        format!("[{voice_pad}]{}[voice]", voice.join(",")),
        format!(
            "[{first_extra}:a]{},{},{}[music]",
            loop_and_trim(a.duration),
            volume(music.volume),
            output_format()
        ),
    ];
    if music.duck {
        chains.push("[voice]asplit=2[voice_mix][voice_key]".to_string());
        chains.push(sidechain_duck("music", "voice_key", "ducked", DUCK));
        chains.push(additive_mix(
            &["voice_mix", "ducked"],
            SEGMENT_OUT,
            MixLength::First,
        ));
    } else {
        chains.push(additive_mix(
            &["voice", "music"],
            SEGMENT_OUT,
            MixLength::First,
        ));
    }

    AudioGraph {
        extra_inputs: vec![music.path.clone()],
        chains,
        out_label: SEGMENT_OUT,
    }
}

fn continuous_graph(m: &MusicProgram, voice_pad: &str, first_extra: usize) -> AudioGraph {
    let mut chains = Vec::new();
    if m.normalize_voice {
        chains.push(format!(
            "[{voice_pad}]{VOICE_LOUDNORM},{}[voice]",
            output_format()
        ));
    } else {
        chains.push(format!("[{voice_pad}]anull[voice]"));
    }

    let mut next_input = first_extra;
    let mut stems: Vec<&str> = Vec::new();

    if let Some(bed) = &m.bed {
        let mut f = vec![loop_and_trim(m.total), volume(m.volume)];
        if bed.fade_in > 0.0 {
            f.push(fade_in(0.0, bed.fade_in));
        }
        if bed.fade_out > 0.0 {
            f.push(fade_out(m.total - bed.fade_out, bed.fade_out));
        }
        chains.push(format!("[{next_input}:a]{}[bed]", f.join(",")));
        stems.push("bed");
        next_input += 1;
    }

    if let Some(intro) = &m.intro {
        chains.push(format!(
            "[{next_input}:a]asetpts=PTS-STARTPTS,{},{}[intro]",
            volume(m.volume),
            fade_out(intro.fade_out_start, intro.fade_out)
        ));
        stems.push("intro");
        next_input += 1;
    }

    if let Some(outro) = &m.outro {
        let delay_ms = (outro.delay * 1000.0).round() as u64;
        chains.push(format!(
            "[{next_input}:a]atrim=0:{},asetpts=PTS-STARTPTS,{},{},adelay={delay_ms}|{delay_ms}[outro]",
            fmt_secs(outro.window),
            volume(m.volume),
            fade_in(0.0, outro.fade_in)
        ));
        stems.push("outro");
    }

    let trim = format!("atrim=0:{}", fmt_secs(m.total));
    match stems.as_slice() {
        [] => {
            chains.push(format!("[voice]anull[{CONTINUOUS_OUT}]"));
        }
        stems => {
            if let [only] = stems {
                chains.push(format!("[{only}]anull[music]"));
            } else {
                chains.push(additive_mix(stems, "music", MixLength::Longest));
            }

            if m.duck {
                chains.push("[voice]asplit=2[voice_mix][voice_key]".to_string());
                chains.push(sidechain_duck("music", "voice_key", "ducked", DUCK));
                chains.push(additive_mix(
                    &["voice_mix", "ducked"],
                    "premix",
                    MixLength::First,
                ));
            } else {
                chains.push(additive_mix(&["voice", "music"], "premix", MixLength::First));
            }
            chains.push(format!("[premix]{trim}[{CONTINUOUS_OUT}]"));
        }
    }

    AudioGraph {
        extra_inputs: m.stem_paths(),
        chains,
        out_label: CONTINUOUS_OUT,
    }
}
