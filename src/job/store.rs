use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use anyhow::Context as _;
use uuid::Uuid;

use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::job::state::{JobStage, RenderJob};

/// Where job state lives so that polls can read it while a worker writes it.
pub trait JobStore: Send + Sync {
    fn insert(&self, job: RenderJob) -> AudiogramResult<()>;

    fn get(&self, id: Uuid) -> AudiogramResult<Option<RenderJob>>;

    /// Apply `f` to the stored job atomically with respect to other updates.
    fn update(
        &self,
        id: Uuid,
        f: &mut dyn FnMut(&mut RenderJob) -> AudiogramResult<()>,
    ) -> AudiogramResult<RenderJob>;

    fn advance(&self, id: Uuid, stage: JobStage) -> AudiogramResult<()> {
        self.update(id, &mut |job| job.advance(stage)).map(drop)
    }

    /// Record a terminal failure. Returns `false` when the job had already finished.
    fn fail(&self, id: Uuid, message: &str) -> AudiogramResult<bool> {
        let mut changed = false;
        self.update(id, &mut |job| {
            changed = job.fail(message);
            Ok(())
        })?;
        Ok(changed)
    }

    fn record_frames(&self, id: Uuid, complete: u64) -> AudiogramResult<()> {
        self.update(id, &mut |job| {
            job.record_frames(complete);
            Ok(())
        })
        .map(drop)
    }
}

fn unknown(id: Uuid) -> AudiogramError {
    AudiogramError::validation(format!("unknown job {id}"))
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, RenderJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn insert(&self, job: RenderJob) -> AudiogramResult<()> {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job.id, job);
        Ok(())
    }

    fn get(&self, id: Uuid) -> AudiogramResult<Option<RenderJob>> {
        Ok(self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    fn update(
        &self,
        id: Uuid,
        f: &mut dyn FnMut(&mut RenderJob) -> AudiogramResult<()>,
    ) -> AudiogramResult<RenderJob> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let job = jobs.get_mut(&id).ok_or_else(|| unknown(id))?;
        // Mutate a copy so a failed update leaves the stored job untouched.
        let mut next = job.clone();
        f(&mut next)?;
        *job = next.clone();
        Ok(next)
    }
}

/// One `<id>.json` per job in a directory, replaced atomically on every update.
#[derive(Debug)]
pub struct FileJobStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileJobStore {
    pub fn open(dir: impl Into<PathBuf>) -> AudiogramResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create job store '{}'", dir.display()))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read(&self, id: Uuid) -> AudiogramResult<Option<RenderJob>> {
        let path = self.path_for(id);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("failed to read job '{}'", path.display()))
                    .into());
            }
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn write(&self, job: &RenderJob) -> AudiogramResult<()> {
        let path = self.path_for(job.id);
        let tmp = self.dir.join(format!(".{}.json.tmp", job.id));
        std::fs::write(&tmp, serde_json::to_vec_pretty(job)?)
            .with_context(|| format!("failed to write '{}'", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace '{}'", path.display()))?;
        Ok(())
    }
}

impl JobStore for FileJobStore {
    fn insert(&self, job: RenderJob) -> AudiogramResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write(&job)
    }

    fn get(&self, id: Uuid) -> AudiogramResult<Option<RenderJob>> {
        self.read(id)
    }

    fn update(
        &self,
        id: Uuid,
        f: &mut dyn FnMut(&mut RenderJob) -> AudiogramResult<()>,
    ) -> AudiogramResult<RenderJob> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut job = self.read(id)?.ok_or_else(|| unknown(id))?;
        f(&mut job)?;
        self.write(&job)?;
        Ok(job)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/store.rs"]
mod tests;
