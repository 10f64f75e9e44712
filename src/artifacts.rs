use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::config::ArtifactOpts;
use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::schedule::Timeline;

const MANIFEST_NAME: &str = "concat.txt";
const BASE_NAME: &str = "base.mp4";
const MIXED_NAME: &str = "mixed.mp4";

/// Deterministic names of every intermediate artifact inside the working directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkLayout {
    root: PathBuf,
}

impl WorkLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clip_file_name(index: u32) -> String {
        format!("part_{index:04}.mp4")
    }

    pub fn clip_path(&self, index: u32) -> PathBuf {
        self.root.join(Self::clip_file_name(index))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }

    /// Concatenated video before any audio replacement.
    pub fn base_path(&self) -> PathBuf {
        self.root.join(BASE_NAME)
    }

    /// Remux output of the continuous music pass.
    pub fn mixed_path(&self) -> PathBuf {
        self.root.join(MIXED_NAME)
    }

    fn is_artifact_name(name: &str) -> bool {
        matches!(name, MANIFEST_NAME | BASE_NAME | MIXED_NAME)
            || name
                .strip_prefix("part_")
                .and_then(|rest| rest.strip_suffix(".mp4"))
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }
}

/// Concat-demuxer manifest listing clips by ascending segment index.
///
/// Paths are written relative to the manifest's own directory.
pub fn concat_manifest(indices: &[u32]) -> String {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .map(|i| format!("file '{}'\n", WorkLayout::clip_file_name(*i)))
        .collect()
}

/// The pipeline's working directory; owns cleanup of intermediates.
#[derive(Debug)]
pub struct WorkDir {
    layout: WorkLayout,
    keep: bool,
}

impl WorkDir {
    /// Create the directory, first removing a stale one when `pre_cleanup` is set.
    pub fn prepare(opts: &ArtifactOpts) -> ReelResult<Self> {
        let root = &opts.work_dir;
        if opts.pre_cleanup && root.exists() {
            guard_pre_cleanup(root)?;
            tracing::info!(dir = %root.display(), "removing stale working directory");
            if let Err(e) = std::fs::remove_dir_all(root) {
                tracing::warn!(dir = %root.display(), error = %e, "pre-cleanup failed");
            }
        }
        std::fs::create_dir_all(root)
            .with_context(|| format!("create working directory '{}'", root.display()))?;

        Ok(Self {
            layout: WorkLayout::new(root.clone()),
            keep: opts.keep_temp,
        })
    }

    #[cfg(test)]
    pub fn layout(&self) -> &WorkLayout {
        &self.layout
    }

    /// Write the ordered manifest after checking every clip exists.
    pub fn write_manifest(&self, indices: &[u32]) -> ReelResult<PathBuf> {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        for i in &sorted {
            let clip = self.layout.clip_path(*i);
            if !clip.is_file() {
                return Err(ReelError::asset(format!(
                    "intermediate clip for segment {i} is missing: '{}'",
                    clip.display()
                )));
            }
        }
        let path = self.layout.manifest_path();
        std::fs::write(&path, concat_manifest(&sorted))
            .with_context(|| format!("write concat manifest '{}'", path.display()))?;
        Ok(path)
    }

    /// Remove intermediates unless keep-temp is set. Failures are logged, never returned.
    pub fn finish(self) {
        if self.keep {
            tracing::info!(dir = %self.layout.root.display(), "keeping intermediate files");
            return;
        }

        let root = &self.layout.root;
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %root.display(), error = %e, "cleanup: cannot list working directory");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_str().is_some_and(WorkLayout::is_artifact_name) {
                continue;
            }
            if let Err(e) = std::fs::remove_file(entry.path()) {
                tracing::warn!(path = %entry.path().display(), error = %e, "cleanup: remove failed");
            }
        }
        // Only succeeds once empty; foreign files keep the directory alive.
        if let Err(e) = std::fs::remove_dir(root) {
            tracing::debug!(dir = %root.display(), error = %e, "working directory left in place");
        }
    }
}

/// Refuse to recursively delete the current directory or one of its ancestors.
fn guard_pre_cleanup(root: &Path) -> ReelResult<()> {
    let target = root
        .canonicalize()
        .with_context(|| format!("resolve working directory '{}'", root.display()))?;
    let cwd = std::env::current_dir().context("resolve current directory")?;
    if cwd.starts_with(&target) {
        return Err(ReelError::validation(format!(
            "refusing to pre-clean '{}': it contains the current directory",
            root.display()
        )));
    }
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Move a finished artifact to its final path.
///
/// When a rename is impossible (e.g. across filesystems) the file is copied to a sibling
/// `.partial` name first, so `dst` only ever appears complete.
pub fn publish(src: &Path, dst: &Path) -> ReelResult<()> {
    ensure_parent_dir(dst)?;
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    publish_by_copy(src, dst)
}

fn partial_path(dst: &Path) -> PathBuf {
    let mut name = dst.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    dst.with_file_name(name)
}

fn publish_by_copy(src: &Path, dst: &Path) -> ReelResult<()> {
    let partial = partial_path(dst);
    let copied = std::fs::copy(src, &partial)
        .with_context(|| format!("copy '{}' to '{}'", src.display(), partial.display()))
        .and_then(|_| {
            std::fs::rename(&partial, dst).with_context(|| {
                format!("move '{}' to '{}'", partial.display(), dst.display())
            })
        });
    if let Err(e) = copied {
        if partial.exists()
            && let Err(rm) = std::fs::remove_file(&partial)
        {
            tracing::warn!(path = %partial.display(), error = %rm, "cleanup: remove partial copy failed");
        }
        return Err(e.into());
    }

    if let Err(e) = std::fs::remove_file(src) {
        tracing::warn!(path = %src.display(), error = %e, "cleanup: remove after copy failed");
    }
    Ok(())
}

/// Write the scheduled timeline next to the deliverable.
pub fn write_sidecar(path: &Path, timeline: &Timeline) -> ReelResult<()> {
    ensure_parent_dir(path)?;
    let json = timeline.to_json_pretty()?;
    std::fs::write(path, json).with_context(|| format!("write sidecar '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = PathBuf::from("target").join("unit_artifacts").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn clip_names_are_deterministic() {
        let l = WorkLayout::new("w");
        assert_eq!(l.clip_path(7), PathBuf::from("w/part_0007.mp4"));
        assert!(WorkLayout::is_artifact_name("part_0007.mp4"));
        assert!(WorkLayout::is_artifact_name("concat.txt"));
        assert!(!WorkLayout::is_artifact_name("part_.mp4"));
        assert!(!WorkLayout::is_artifact_name("notes.txt"));
    }

    #[test]
    fn manifest_orders_by_index_regardless_of_input_order() {
        let m = concat_manifest(&[2, 0, 1]);
        assert_eq!(
            m,
            "file 'part_0000.mp4'\nfile 'part_0001.mp4'\nfile 'part_0002.mp4'\n"
        );
    }

    #[test]
    fn missing_clip_is_named_by_index() {
        let opts = ArtifactOpts {
            work_dir: scratch("missing_clip"),
            ..ArtifactOpts::default()
        };
        let work = WorkDir::prepare(&opts).unwrap();
        std::fs::write(work.layout().clip_path(0), b"").unwrap();
        let err = work.write_manifest(&[0, 1]).unwrap_err();
        assert!(err.to_string().contains("segment 1"));
        work.finish();
    }

    #[test]
    fn finish_removes_only_known_artifacts() {
        let opts = ArtifactOpts {
            work_dir: scratch("finish"),
            ..ArtifactOpts::default()
        };
        let work = WorkDir::prepare(&opts).unwrap();
        let root = work.layout().root().to_path_buf();
        std::fs::write(work.layout().clip_path(0), b"").unwrap();
        std::fs::write(work.layout().base_path(), b"").unwrap();
        std::fs::write(root.join("keep.me"), b"").unwrap();

        work.finish();
        assert!(!root.join("part_0000.mp4").exists());
        assert!(!root.join("base.mp4").exists());
        assert!(root.join("keep.me").exists());
    }

    #[test]
    fn keep_temp_leaves_everything() {
        let opts = ArtifactOpts {
            work_dir: scratch("keep"),
            keep_temp: true,
            ..ArtifactOpts::default()
        };
        let work = WorkDir::prepare(&opts).unwrap();
        let clip = work.layout().clip_path(3);
        std::fs::write(&clip, b"").unwrap();
        work.finish();
        assert!(clip.exists());
    }

    #[test]
    fn pre_cleanup_removes_stale_directory() {
        let dir = scratch("pre_cleanup");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("stale.bin"), b"x").unwrap();

        let opts = ArtifactOpts {
            work_dir: dir.clone(),
            pre_cleanup: true,
            ..ArtifactOpts::default()
        };
        let work = WorkDir::prepare(&opts).unwrap();
        assert!(dir.is_dir());
        assert!(!dir.join("stale.bin").exists());
        work.finish();
    }

    #[test]
    fn pre_cleanup_refuses_current_directory() {
        let opts = ArtifactOpts {
            work_dir: PathBuf::from("."),
            pre_cleanup: true,
            ..ArtifactOpts::default()
        };
        assert!(matches!(
            WorkDir::prepare(&opts),
            Err(ReelError::Validation(_))
        ));
    }

    #[test]
    fn publish_moves_file() {
        let dir = scratch("publish");
        std::fs::create_dir_all(&dir).unwrap();
        let src = dir.join("a.mp4");
        std::fs::write(&src, b"data").unwrap();
        let dst = dir.join("out").join("b.mp4");
        publish(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(std::fs::read(&dst).unwrap(), b"data");
    }

    #[test]
    fn copy_fallback_lands_complete_file() {
        let dir = scratch("publish_copy");
        std::fs::create_dir_all(&dir).unwrap();
        let src = dir.join("mixed.mp4");
        std::fs::write(&src, b"frames").unwrap();
        let dst = dir.join("reel.mp4");

        publish_by_copy(&src, &dst).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"frames");
        assert!(!src.exists());
        assert!(!partial_path(&dst).exists());
    }

    #[test]
    fn failed_copy_leaves_no_deliverable() {
        let dir = scratch("publish_copy_fail");
        // A directory is not a copyable source.
        let src = dir.join("not_a_file");
        std::fs::create_dir_all(&src).unwrap();
        let dst = dir.join("reel.mp4");

        assert!(publish_by_copy(&src, &dst).is_err());
        assert!(!dst.exists());
        assert!(!partial_path(&dst).exists());
    }

    #[test]
    fn failed_publish_keeps_previous_deliverable() {
        let dir = scratch("publish_keep_old");
        std::fs::create_dir_all(&dir).unwrap();
        let dst = dir.join("reel.mp4");
        std::fs::write(&dst, b"old").unwrap();

        assert!(publish(&dir.join("missing.mp4"), &dst).is_err());
        assert_eq!(std::fs::read(&dst).unwrap(), b"old");
        assert!(!partial_path(&dst).exists());
    }
}
