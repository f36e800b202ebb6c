use std::path::{Path, PathBuf};

use anyhow::Context as _;
use uuid::Uuid;

use crate::foundation::error::{AudiogramError, AudiogramResult};

/// Source of submitted audio and sink of finished videos.
pub trait ArtifactStorage: Send + Sync {
    /// Copy the submitted audio named by `key` to `dest`.
    fn fetch_audio(&self, key: &str, dest: &Path) -> AudiogramResult<()>;

    /// Publish the finished video for job `id`. Returns its URL.
    fn store_video(&self, id: Uuid, video: &Path) -> AudiogramResult<String>;
}

/// Storage rooted in a local directory. Videos land in `<root>/video/<id>.mp4`.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute keys are used as-is; relative keys resolve under the root.
    pub fn resolve(&self, key: &str) -> PathBuf {
        let p = Path::new(key);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    pub fn video_path(&self, id: Uuid) -> PathBuf {
        self.root.join("video").join(format!("{id}.mp4"))
    }
}

impl ArtifactStorage for LocalStorage {
    fn fetch_audio(&self, key: &str, dest: &Path) -> AudiogramResult<()> {
        let src = self.resolve(key);
        if !src.is_file() {
            return Err(AudiogramError::decode(format!(
                "audio '{}' not found in storage",
                src.display()
            )));
        }
        std::fs::copy(&src, dest).with_context(|| {
            format!("failed to copy '{}' to '{}'", src.display(), dest.display())
        })?;
        Ok(())
    }

    fn store_video(&self, id: Uuid, video: &Path) -> AudiogramResult<String> {
        let dest = self.video_path(id);
        crate::encode::ffmpeg::ensure_parent_dir(&dest)?;
        std::fs::copy(video, &dest).with_context(|| {
            format!("failed to store video '{}'", dest.display())
        })?;
        Ok(format!("/video/{id}.mp4"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/storage.rs"]
mod tests;
