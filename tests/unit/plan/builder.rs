use std::path::PathBuf;

use super::*;
use crate::config::{MusicMode, ReelConfig};
use crate::plan::visual::FALLBACK_PALETTE;

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_builder").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn touch(path: &std::path::Path) {
    std::fs::write(path, b"RIFF").unwrap();
}

fn timeline(n: u32) -> Timeline {
    let segs = (0..n)
        .map(|i| Segment::new(i, format!("Title {i}"), "one two three four five"))
        .collect();
    Timeline::schedule(segs).unwrap()
}

fn narration(dir: &std::path::Path, n: u32) -> Vec<PathBuf> {
    (0..n)
        .map(|i| {
            let p = dir.join(format!("seg_{i}.wav"));
            touch(&p);
            p
        })
        .collect()
}

#[test]
fn color_fallback_and_voice_only_audio_by_default() {
    let dir = scratch("defaults");
    let tl = timeline(5);
    let plans = build_plans(&tl, &narration(&dir, 5), &ReelConfig::default()).unwrap();

    assert_eq!(plans.len(), 5);
    assert_eq!(
        plans[4].visual.source,
        VisualSource::Color {
            color: FALLBACK_PALETTE[0]
        }
    );
    for (plan, seg) in plans.iter().zip(tl.segments()) {
        assert_eq!(plan.index, seg.index);
        assert_eq!(plan.duration, seg.duration());
        assert_eq!(plan.visual.caption.as_ref().unwrap().text, seg.title);
        let audio = &plan.audio;
        assert!(audio.music.is_none());
        assert!(audio.normalize_voice);
    }
}

#[test]
fn missing_narration_names_the_segment() {
    let dir = scratch("missing_narration");
    let mut clips = narration(&dir, 3);
    clips[1] = dir.join("does_not_exist.wav");
    let err = build_plans(&timeline(3), &clips, &ReelConfig::default()).unwrap_err();
    assert!(matches!(err, ReelError::Asset(_)));
    assert!(err.to_string().contains("segment 1"));
}

#[test]
fn narration_count_must_match() {
    let dir = scratch("count");
    let err = build_plans(&timeline(3), &narration(&dir, 2), &ReelConfig::default()).unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[test]
fn still_image_is_probed_and_zoomed() {
    let dir = scratch("still");
    let img = dir.join("still.png");
    image::RgbImage::new(40, 80).save(&img).unwrap();

    let segs = vec![Segment::new(0, "t", "a b c").with_image(&img)];
    let tl = Timeline::schedule(segs).unwrap();
    let mut cfg = ReelConfig::default();
    cfg.ken_burns.enabled = true;

    let plans = build_plans(&tl, &narration(&dir, 1), &cfg).unwrap();
    assert_eq!(
        plans[0].visual.source,
        VisualSource::Image {
            path: img.clone(),
            width: 40,
            height: 80
        }
    );
    let zoom = plans[0].visual.zoom.unwrap();
    assert_eq!(zoom.frames, 60);
    assert_eq!(zoom.zoom_max, 1.08);
}

#[test]
fn unreadable_image_is_an_asset_error() {
    let dir = scratch("bad_still");
    let img = dir.join("broken.png");
    std::fs::write(&img, b"not a png").unwrap();

    let tl = Timeline::schedule(vec![Segment::new(0, "t", "a b c").with_image(&img)]).unwrap();
    let err = build_plans(&tl, &narration(&dir, 1), &ReelConfig::default()).unwrap_err();
    assert!(matches!(err, ReelError::Asset(_)));
    assert!(err.to_string().contains("segment 0"));
}

#[test]
fn per_segment_mode_attaches_the_bed() {
    let dir = scratch("per_segment");
    let bed = dir.join("bed.mp3");
    touch(&bed);

    let mut cfg = ReelConfig::default();
    cfg.music.bed = Some(bed.clone());
    cfg.music.mode = MusicMode::PerSegment;
    cfg.music.duck = false;

    let plans = build_plans(&timeline(2), &narration(&dir, 2), &cfg).unwrap();
    let audio = &plans[1].audio;
    let music = audio.music.as_ref().unwrap();
    assert_eq!(music.path, bed);
    assert!(!music.duck);
    assert!(audio.normalize_voice);
}

#[test]
fn continuous_mode_leaves_segments_voice_only_and_unnormalized() {
    let dir = scratch("continuous");
    let bed = dir.join("bed.mp3");
    touch(&bed);

    let mut cfg = ReelConfig::default();
    cfg.music.bed = Some(bed);

    let plans = build_plans(&timeline(2), &narration(&dir, 2), &cfg).unwrap();
    let audio = &plans[0].audio;
    assert!(audio.music.is_none());
    assert!(!audio.normalize_voice);
}

#[test]
fn missing_stem_is_reported_by_name() {
    let mut cfg = ReelConfig::default();
    cfg.music.outro = Some(PathBuf::from("target/unit_builder/nope/outro.mp3"));
    let err = check_stems(&cfg).unwrap_err();
    assert!(err.to_string().contains("outro"));
}
