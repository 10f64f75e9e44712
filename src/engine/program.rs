use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::foundation::core::{FPS, FRAME, SAMPLE_RATE, fmt_secs};
use crate::plan::audio::{AudioMixProgram, MusicProgram};
use crate::plan::builder::RenderPlan;
use crate::plan::visual::VisualSource;

/// One engine input.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Input {
    /// A media file read as-is.
    File { path: PathBuf },
    /// A still image repeated at the output frame rate.
    LoopedStill { path: PathBuf },
    /// A synthetic lavfi source.
    Lavfi { graph: String },
    /// A concat-demuxer manifest.
    ConcatList { path: PathBuf },
}

impl Input {
    fn push_args(&self, out: &mut Vec<OsString>) {
        match self {
            Input::File { path } => {
                out.push("-i".into());
                out.push(path.into());
            }
            Input::LoopedStill { path } => {
                out.extend(["-loop", "1", "-framerate"].map(OsString::from));
                out.push(FPS.to_string().into());
                out.push("-i".into());
                out.push(path.into());
            }
            Input::Lavfi { graph } => {
                out.extend(["-f", "lavfi", "-i"].map(OsString::from));
                out.push(graph.into());
            }
            Input::ConcatList { path } => {
                out.extend(["-f", "concat", "-safe", "0", "-i"].map(OsString::from));
                out.push(path.into());
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Input::File { path } | Input::LoopedStill { path } | Input::ConcatList { path } => {
                Some(path)
            }
            Input::Lavfi { .. } => None,
        }
    }
}

/// A complete engine invocation: inputs, filter graph, stream maps, encoder settings, output.
///
/// Programs are plain data so they can be logged, printed by a dry run, or recorded in tests.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct EngineProgram {
    pub inputs: Vec<Input>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_graph: Option<String>,
    pub maps: Vec<String>,
    pub output_args: Vec<String>,
    pub output: PathBuf,
}

impl EngineProgram {
    /// Arguments after the engine's global flags.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut out = Vec::new();
        for input in &self.inputs {
            input.push_args(&mut out);
        }
        if let Some(graph) = &self.filter_graph {
            out.push("-filter_complex".into());
            out.push(graph.into());
        }
        for map in &self.maps {
            out.push("-map".into());
            out.push(map.into());
        }
        out.extend(self.output_args.iter().map(OsString::from));
        out.push(self.output.as_os_str().to_owned());
        out
    }

    /// Space-joined argument list for logs.
    pub fn display_args(&self) -> String {
        self.to_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn video_encode_args() -> Vec<String> {
    [
        "-c:v",
        "libx264",
        "-preset",
        "veryfast",
        "-pix_fmt",
        "yuv420p",
        "-r",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain([FPS.to_string()])
    .collect()
}

fn audio_encode_args() -> Vec<String> {
    vec![
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-ar".to_string(),
        SAMPLE_RATE.to_string(),
        "-ac".to_string(),
        "2".to_string(),
    ]
}

/// Translate a segment plan into the program that renders its clip at `out`.
///
/// Input 0 is the background, input 1 the narration, inputs 2.. the music excerpt.
pub fn segment_program(plan: &RenderPlan, out: &Path) -> EngineProgram {
    let background = match &plan.visual.source {
        VisualSource::Image { path, .. } => Input::LoopedStill { path: path.clone() },
        VisualSource::Color { color } => Input::Lavfi {
            graph: format!(
                "color=c={color}:s={}:r={FPS}:d={}",
                FRAME.size_arg(),
                fmt_secs(plan.duration)
            ),
        },
    };

    let audio = AudioMixProgram::PerSegment(plan.audio.clone()).graph("1:a", 2);

    let mut inputs = vec![
        background,
        Input::File {
            path: plan.audio.narration.clone(),
        },
    ];
    inputs.extend(
        audio
            .extra_inputs
            .iter()
            .map(|p| Input::File { path: p.clone() }),
    );

    let mut chains = vec![format!(
        "[0:v]{}[v]",
        plan.visual.filter_chain(FRAME).join(",")
    )];
    chains.extend(audio.chains);

    let mut output_args = vec!["-t".to_string(), fmt_secs(plan.duration)];
    output_args.extend(video_encode_args());
    output_args.extend(audio_encode_args());

    EngineProgram {
        inputs,
        filter_graph: Some(chains.join(";")),
        maps: vec!["[v]".to_string(), format!("[{}]", audio.out_label)],
        output_args,
        output: out.to_path_buf(),
    }
}

/// Lossless concatenation of the clips listed in `manifest`.
pub fn concat_program(manifest: &Path, out: &Path) -> EngineProgram {
    EngineProgram {
        inputs: vec![Input::ConcatList {
            path: manifest.to_path_buf(),
        }],
        filter_graph: None,
        maps: Vec::new(),
        output_args: vec!["-c".to_string(), "copy".to_string()],
        output: out.to_path_buf(),
    }
}

/// Keep `base`'s picture stream and replace its audio with the continuous music mix.
pub fn remux_program(base: &Path, music: &MusicProgram, out: &Path) -> EngineProgram {
    let audio = AudioMixProgram::Continuous(music.clone()).graph("0:a", 1);

    let mut inputs = vec![Input::File {
        path: base.to_path_buf(),
    }];
    inputs.extend(
        audio
            .extra_inputs
            .iter()
            .map(|p| Input::File { path: p.clone() }),
    );

    let mut output_args = vec!["-c:v".to_string(), "copy".to_string()];
    output_args.extend(audio_encode_args());
    output_args.extend([
        "-t".to_string(),
        fmt_secs(music.total),
        "-movflags".to_string(),
        "+faststart".to_string(),
    ]);

    EngineProgram {
        inputs,
        filter_graph: Some(audio.chains.join(";")),
        maps: vec!["0:v".to_string(), format!("[{}]", audio.out_label)],
        output_args,
        output: out.to_path_buf(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/program.rs"]
mod tests;
