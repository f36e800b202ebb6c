use std::collections::{HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use uuid::Uuid;

use crate::foundation::core::CancelToken;
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::job::pipeline::{EncoderPermits, PipelineContext, report_failure, run_job};
use crate::job::state::{JobStatusReport, RenderJob};
use crate::job::storage::ArtifactStorage;
use crate::job::store::JobStore;
use crate::scene::submission::JobSubmission;
use crate::settings::Settings;

/// Executes one job. Returns the published video URL.
pub type JobRunner = dyn Fn(&PipelineContext) -> AudiogramResult<String> + Send + Sync;

struct QueuedJob {
    id: Uuid,
    submission: JobSubmission,
}

#[derive(Default)]
struct Queue {
    pending: VecDeque<QueuedJob>,
    /// Cancel tokens of queued and running jobs.
    cancels: HashMap<Uuid, CancelToken>,
    shutdown: bool,
}

struct Shared {
    settings: Arc<Settings>,
    store: Arc<dyn JobStore>,
    storage: Arc<dyn ArtifactStorage>,
    encoders: Arc<EncoderPermits>,
    runner: Arc<JobRunner>,
    queue: Mutex<Queue>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Long-lived worker pool that runs submitted jobs one stage at a time.
///
/// Submission validates synchronously and returns immediately; jobs are picked up in FIFO
/// order by `workerCount` threads. Encoder invocations are capped across all workers by
/// `maxConcurrentEncoders`.
pub struct Orchestrator {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn start(
        settings: Settings,
        store: Arc<dyn JobStore>,
        storage: Arc<dyn ArtifactStorage>,
    ) -> AudiogramResult<Self> {
        Self::with_runner(settings, store, storage, Arc::new(run_job))
    }

    /// Start with a custom job runner in place of the full pipeline.
    pub fn with_runner(
        settings: Settings,
        store: Arc<dyn JobStore>,
        storage: Arc<dyn ArtifactStorage>,
        runner: Arc<JobRunner>,
    ) -> AudiogramResult<Self> {
        settings.validate()?;
        let shared = Arc::new(Shared {
            encoders: Arc::new(EncoderPermits::new(settings.max_concurrent_encoders)),
            settings: Arc::new(settings),
            store,
            storage,
            runner,
            queue: Mutex::new(Queue::default()),
            available: Condvar::new(),
        });

        let workers = (0..shared.settings.worker_count)
            .map(|i| {
                let shared = shared.clone();
                std::thread::Builder::new()
                    .name(format!("audiogram-worker-{i}"))
                    .spawn(move || worker_loop(&shared))
                    .map_err(|e| AudiogramError::Other(anyhow::anyhow!("spawn worker {i}: {e}")))
            })
            .collect::<AudiogramResult<Vec<_>>>()?;
        tracing::info!(workers = workers.len(), "orchestrator started");

        Ok(Self { shared, workers })
    }

    /// Validate and queue a job.
    #[tracing::instrument(skip_all, fields(audio = %submission.audio_file))]
    pub fn submit(&self, submission: JobSubmission) -> AudiogramResult<Uuid> {
        submission.validate()?;

        let job = RenderJob::new(Uuid::new_v4());
        let id = job.id;
        let mut queue = self.shared.lock();
        if queue.shutdown {
            return Err(AudiogramError::Other(anyhow::anyhow!(
                "orchestrator is shutting down"
            )));
        }
        self.shared.store.insert(job)?;
        queue.cancels.insert(id, CancelToken::new());
        queue.pending.push_back(QueuedJob { id, submission });
        drop(queue);

        self.shared.available.notify_one();
        tracing::info!(job = %id, "job queued");
        Ok(id)
    }

    /// Current state of `id`, with its 1-based queue rank while queued.
    pub fn status(&self, id: Uuid) -> AudiogramResult<Option<JobStatusReport>> {
        let position = self
            .shared
            .lock()
            .pending
            .iter()
            .position(|j| j.id == id)
            .map(|p| p + 1);
        Ok(self
            .shared
            .store
            .get(id)?
            .map(|job| JobStatusReport::from_job(&job, position)))
    }

    /// Cancel a queued or running job. Returns `false` when the job is unknown or finished.
    pub fn cancel(&self, id: Uuid) -> AudiogramResult<bool> {
        let mut queue = self.shared.lock();
        if let Some(idx) = queue.pending.iter().position(|j| j.id == id) {
            queue.pending.remove(idx);
            queue.cancels.remove(&id);
            drop(queue);
            report_failure(self.shared.store.as_ref(), id, &AudiogramError::Cancelled);
            return Ok(true);
        }
        let finished = self
            .shared
            .store
            .get(id)?
            .is_none_or(|j| j.status.is_terminal());
        match queue.cancels.get(&id) {
            Some(_) if finished => Ok(false),
            Some(token) => {
                token.cancel();
                tracing::info!(job = %id, "cancel requested");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Block until `id` reaches a terminal state, calling `observe` on every poll.
    pub fn wait(
        &self,
        id: Uuid,
        poll: Duration,
        mut observe: impl FnMut(&JobStatusReport),
    ) -> AudiogramResult<JobStatusReport> {
        loop {
            let report = self
                .status(id)?
                .ok_or_else(|| AudiogramError::validation(format!("unknown job {id}")))?;
            observe(&report);
            if report.status.is_terminal() {
                return Ok(report);
            }
            std::thread::sleep(poll);
        }
    }

    /// Stop accepting work. Queued jobs fail; running jobs are cancelled and their workers joined.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let abandoned: Vec<Uuid> = {
            let mut queue = self.shared.lock();
            queue.shutdown = true;
            let ids = queue.pending.drain(..).map(|j| j.id).collect::<Vec<_>>();
            for id in &ids {
                queue.cancels.remove(id);
            }
            for token in queue.cancels.values() {
                token.cancel();
            }
            ids
        };
        self.shared.available.notify_all();
        for id in abandoned {
            if let Err(e) = self.shared.store.fail(id, "Server shutting down") {
                tracing::error!(job = %id, error = %e, "failed to record abandoned job");
            }
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("worker thread panicked outside a job");
            }
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop();
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let (job, cancel) = {
            let mut queue = shared.lock();
            loop {
                if queue.shutdown {
                    return;
                }
                if let Some(job) = queue.pending.pop_front() {
                    let cancel = queue.cancels.entry(job.id).or_default().clone();
                    break (job, cancel);
                }
                queue = shared
                    .available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let ctx = PipelineContext {
            job_id: job.id,
            work_dir: shared.settings.working_directory.join(job.id.to_string()),
            submission: job.submission,
            settings: shared.settings.clone(),
            cancel,
            store: shared.store.clone(),
            storage: shared.storage.clone(),
            encoders: shared.encoders.clone(),
        };
        run_supervised(shared, &ctx);
        shared.lock().cancels.remove(&ctx.job_id);
    }
}

fn run_supervised(shared: &Shared, ctx: &PipelineContext) {
    match catch_unwind(AssertUnwindSafe(|| (shared.runner)(ctx))) {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => {
            // The pipeline records its own failures; this covers runners that do not.
            let finished = shared
                .store
                .get(ctx.job_id)
                .ok()
                .flatten()
                .is_some_and(|j| j.status.is_terminal());
            if !finished {
                report_failure(shared.store.as_ref(), ctx.job_id, &err);
            }
        }
        Err(panic) => {
            let message = format!("worker crashed: {}", panic_message(panic.as_ref()));
            tracing::error!(job = %ctx.job_id, error = %message, "job panicked");
            if let Err(e) = shared.store.fail(ctx.job_id, &message) {
                tracing::error!(job = %ctx.job_id, error = %e, "failed to record crash");
            }
            if !shared.settings.keep_work_dir {
                let _ = std::fs::remove_dir_all(&ctx.work_dir);
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/orchestrator.rs"]
mod tests;
