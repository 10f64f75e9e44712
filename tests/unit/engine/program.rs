use std::path::PathBuf;

use super::*;
use crate::config::MusicOpts;
use crate::plan::audio::{SegmentAudio, SegmentMusic};
use crate::plan::visual::{Caption, VisualPlan, ZoomCurve, fallback_color};

fn args(p: &EngineProgram) -> Vec<String> {
    p.to_args()
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

fn color_plan(index: u32, duration: f64) -> RenderPlan {
    RenderPlan {
        index,
        duration,
        visual: VisualPlan {
            source: VisualSource::Color {
                color: fallback_color(index),
            },
            zoom: None,
            caption: Some(Caption {
                text: "Intro".to_string(),
                color: "white".to_string(),
                font: None,
                box_color: Some("black@0.5".to_string()),
            }),
        },
        audio: SegmentAudio {
            narration: PathBuf::from("audio/seg_1.wav"),
            duration,
            normalize_voice: true,
            music: None,
        },
    }
}

#[test]
fn color_segment_uses_lavfi_background_and_trims_to_slot() {
    let p = segment_program(&color_plan(1, 2.5), Path::new("work/part_0001.mp4"));
    let a = args(&p);

    assert_eq!(&a[..3], ["-f", "lavfi", "-i"]);
    assert_eq!(a[3], "color=c=0x2d1f44:s=1080x1920:r=30:d=2.500");
    assert_eq!(&a[4..6], ["-i", "audio/seg_1.wav"]);

    let graph = p.filter_graph.as_deref().unwrap();
    assert!(graph.starts_with("[0:v]drawtext=text=Intro:expansion=none:"));
    assert!(graph.contains("format=yuv420p[v];[1:a]loudnorm"));
    assert!(graph.ends_with("[aout]"));

    let t = a.iter().position(|s| s == "-t").unwrap();
    assert_eq!(a[t + 1], "2.500");
    assert_eq!(p.maps, vec!["[v]", "[aout]"]);
    assert!(a.windows(2).any(|w| w == ["-c:v", "libx264"]));
    assert!(a.windows(2).any(|w| w == ["-ar", "48000"]));
    assert_eq!(a.last().unwrap(), "work/part_0001.mp4");
}

#[test]
fn image_segment_loops_the_still_and_adds_music_input() {
    let mut plan = color_plan(0, 3.0);
    plan.visual.source = VisualSource::Image {
        path: PathBuf::from("img/a.jpg"),
        width: 1920,
        height: 1080,
    };
    plan.visual.zoom = Some(ZoomCurve::new(3.0, 1.08));
    plan.audio.music = Some(SegmentMusic {
        path: PathBuf::from("bed.mp3"),
        volume: 0.2,
        duck: true,
    });

    let p = segment_program(&plan, Path::new("part_0000.mp4"));
    let a = args(&p);
    assert_eq!(&a[..6], ["-loop", "1", "-framerate", "30", "-i", "img/a.jpg"]);
    assert_eq!(&a[8..10], ["-i", "bed.mp3"]);

    let graph = p.filter_graph.as_deref().unwrap();
    assert!(graph.starts_with("[0:v]scale=3413:1920,crop=1080:1920:1166:0,zoompan="));
    assert!(graph.contains("[2:a]aloop=loop=-1"));
    assert!(graph.contains("sidechaincompress"));
}

#[test]
fn concat_is_a_stream_copy() {
    let p = concat_program(Path::new("work/concat.txt"), Path::new("work/base.mp4"));
    assert_eq!(
        args(&p),
        vec![
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
            "work/concat.txt",
            "-c",
            "copy",
            "work/base.mp4"
        ]
    );
    assert_eq!(p.inputs[0].path(), Some(Path::new("work/concat.txt")));
}

#[test]
fn remux_copies_video_and_maps_the_mix() {
    let music = MusicOpts {
        bed: Some(PathBuf::from("bed.mp3")),
        ..MusicOpts::default()
    };
    let m = MusicProgram::new(9.0, &music, true, None).unwrap();
    let p = remux_program(Path::new("work/base.mp4"), &m, Path::new("work/mixed.mp4"));
    let a = args(&p);

    assert_eq!(&a[..4], ["-i", "work/base.mp4", "-i", "bed.mp3"]);
    assert_eq!(p.maps, vec!["0:v", "[mixed]"]);
    assert!(a.windows(2).any(|w| w == ["-c:v", "copy"]));
    assert!(a.windows(2).any(|w| w == ["-t", "9.000"]));
    assert!(
        p.filter_graph
            .as_deref()
            .unwrap()
            .starts_with("[0:a]loudnorm=I=-16:LRA=11:TP=-1.5")
    );
}

#[test]
fn programs_serialize_for_dry_runs() {
    let p = segment_program(&color_plan(0, 2.0), Path::new("part_0000.mp4"));
    let v = serde_json::to_value(&p).unwrap();
    assert_eq!(v["inputs"][0]["kind"], "lavfi");
    assert_eq!(v["inputs"][1]["kind"], "file");

    let c = serde_json::to_value(concat_program(Path::new("a"), Path::new("b"))).unwrap();
    assert!(c.get("filter_graph").is_none());
}
