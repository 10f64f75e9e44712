#[cfg(feature = "media-ffmpeg")]
mod media_pipeline {
    use std::{
        path::{Path, PathBuf},
        process::Command,
    };

    use reelkit::{FfmpegRenderer, MusicMode, ReelConfig, Renderer, Segment, render_reel};

    fn ffmpeg_tools_available() -> bool {
        let ok = |bin: &str| {
            Command::new(bin)
                .arg("-version")
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        };
        ok("ffmpeg") && ok("ffprobe")
    }

    fn synth_tone(path: &Path, freq: u32, secs: f64) -> anyhow::Result<()> {
        let status = Command::new("ffmpeg")
            .args(["-v", "error", "-y", "-f", "lavfi", "-i"])
            .arg(format!("sine=frequency={freq}:sample_rate=48000"))
            .args(["-t", format!("{secs}").as_str(), "-c:a", "pcm_s16le"])
            .arg(path)
            .status()?;
        anyhow::ensure!(status.success(), "ffmpeg failed creating {}", path.display());
        Ok(())
    }

    fn setup(name: &str) -> anyhow::Result<(PathBuf, Vec<PathBuf>, PathBuf)> {
        let root = PathBuf::from("target").join("media_pipeline").join(name);
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root)?;

        let mut voices = Vec::new();
        for i in 0..3u32 {
            let p = root.join(format!("seg_{i}.wav"));
            synth_tone(&p, 300 + 100 * i, 2.5)?;
            voices.push(p);
        }
        let bed = root.join("bed.wav");
        synth_tone(&bed, 110, 4.0)?;

        let still = root.join("still.png");
        image::RgbImage::from_pixel(160, 90, image::Rgb([40, 90, 160])).save(&still)?;
        Ok((root, voices, bed))
    }

    fn segments(root: &Path) -> Vec<Segment> {
        let words = |n: usize| vec!["word"; n].join(" ");
        vec![
            Segment::new(0, "Opening", words(10)).with_image(root.join("still.png")),
            Segment::new(1, "Middle", words(20)),
            Segment::new(2, "What's next: 50% off, [today]", words(30)),
        ]
    }

    fn config(root: &Path) -> ReelConfig {
        let mut cfg = ReelConfig::default().with_output(root.join("reel.mp4"));
        cfg.artifacts.work_dir = root.join("work");
        cfg.ken_burns.enabled = true;
        cfg
    }

    fn has_audio_stream(path: &Path) -> anyhow::Result<bool> {
        let out = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "a",
                "-show_entries",
                "stream=codec_type",
                "-of",
                "json",
            ])
            .arg(path)
            .output()?;
        anyhow::ensure!(out.status.success(), "ffprobe failed on {}", path.display());
        let v: serde_json::Value = serde_json::from_slice(&out.stdout)?;
        Ok(v["streams"].as_array().is_some_and(|s| !s.is_empty()))
    }

    /// Mean level in dBFS of one second of audio, read from the start or the end of `path`.
    fn mean_volume_db(path: &Path, from_end: bool) -> anyhow::Result<f64> {
        let seek = if from_end { "-sseof" } else { "-ss" };
        let at = if from_end { "-1" } else { "0" };
        let out = Command::new("ffmpeg")
            .args(["-hide_banner", "-nostdin", seek, at, "-t", "1", "-i"])
            .arg(path)
            .args(["-vn", "-af", "volumedetect", "-f", "null", "-"])
            .output()?;
        anyhow::ensure!(out.status.success(), "volumedetect failed on {}", path.display());
        let stderr = String::from_utf8_lossy(&out.stderr);
        let db = stderr
            .lines()
            .find_map(|l| l.split("mean_volume:").nth(1))
            .and_then(|v| v.trim().trim_end_matches("dB").trim().parse::<f64>().ok());
        db.ok_or_else(|| anyhow::anyhow!("no mean_volume in volumedetect output"))
    }

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected:.3}s +/- {tol}, got {actual:.3}s"
        );
    }

    #[test]
    fn voice_only_reel_matches_scheduled_length() {
        if !ffmpeg_tools_available() {
            return;
        }
        let (root, voices, _) = setup("voice_only").unwrap();
        let cfg = config(&root);
        let renderer = FfmpegRenderer::new().unwrap();

        let out = render_reel(segments(&root), &voices, &cfg, &renderer).unwrap();
        let probed = renderer.probe_duration(&out.video).unwrap().unwrap();
        assert_close(probed, out.timeline.total_duration(), 0.2);
        assert!(out.sidecar.is_file());
        assert!(!cfg.artifacts.work_dir.exists());
    }

    #[test]
    fn continuous_bed_covers_whole_timeline() {
        if !ffmpeg_tools_available() {
            return;
        }
        let (root, voices, bed) = setup("continuous").unwrap();
        let mut cfg = config(&root);
        cfg.music.bed = Some(bed.clone());
        cfg.music.outro = Some(bed);
        let renderer = FfmpegRenderer::new().unwrap();

        let out = render_reel(segments(&root), &voices, &cfg, &renderer).unwrap();
        let probed = renderer.probe_duration(&out.video).unwrap().unwrap();
        assert_close(probed, out.timeline.total_duration(), 0.2);

        assert!(has_audio_stream(&out.video).unwrap());
        for from_end in [false, true] {
            let db = mean_volume_db(&out.video, from_end).unwrap();
            assert!(db > -60.0, "audio is silent (from_end={from_end}): {db} dB");
        }
    }

    #[test]
    fn per_segment_bed_renders() {
        if !ffmpeg_tools_available() {
            return;
        }
        let (root, voices, bed) = setup("per_segment").unwrap();
        let mut cfg = config(&root);
        cfg.music.bed = Some(bed);
        cfg.music.mode = MusicMode::PerSegment;
        cfg.threading.parallel = true;
        let renderer = FfmpegRenderer::new().unwrap();

        let out = render_reel(segments(&root), &voices, &cfg, &renderer).unwrap();
        let probed = renderer.probe_duration(&out.video).unwrap().unwrap();
        assert_close(probed, out.timeline.total_duration(), 0.2);
    }
}
