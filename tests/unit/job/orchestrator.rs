use std::path::Path;

use super::*;
use crate::job::state::JobStage;
use crate::job::storage::LocalStorage;
use crate::job::store::MemoryJobStore;

const POLL: Duration = Duration::from_millis(10);

fn orchestrator(root: &Path, workers: usize, runner: Arc<JobRunner>) -> Orchestrator {
    let settings = Settings {
        working_directory: root.join("work"),
        worker_count: workers,
        ..Settings::default()
    };
    Orchestrator::with_runner(
        settings,
        Arc::new(MemoryJobStore::new()),
        Arc::new(LocalStorage::new(root.join("media"))),
        runner,
    )
    .unwrap()
}

/// Blocks until the job is cancelled.
fn blocking_runner() -> Arc<JobRunner> {
    Arc::new(|ctx: &PipelineContext| -> AudiogramResult<String> {
        ctx.store.advance(ctx.job_id, JobStage::AudioDownload)?;
        while !ctx.cancel.is_cancelled() {
            std::thread::sleep(POLL);
        }
        Err(AudiogramError::Cancelled)
    })
}

fn wait_for_stage(orc: &Orchestrator, id: Uuid, stage: JobStage) {
    for _ in 0..500 {
        if orc.status(id).unwrap().unwrap().status == stage {
            return;
        }
        std::thread::sleep(POLL);
    }
    panic!("job {id} never reached {stage}");
}

#[test]
fn invalid_submissions_are_rejected_before_queueing() {
    let root = tempfile::tempdir().unwrap();
    let orc = orchestrator(root.path(), 1, blocking_runner());
    let mut sub = JobSubmission::new("a.wav");
    sub.start = Some(5.0);
    sub.end = Some(1.0);
    let err = orc.submit(sub).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn successful_runs_end_ready() {
    let root = tempfile::tempdir().unwrap();
    let runner: Arc<JobRunner> = Arc::new(|ctx: &PipelineContext| -> AudiogramResult<String> {
        let url = format!("/video/{}.mp4", ctx.job_id);
        ctx.store.update(ctx.job_id, &mut |job| {
            job.url = Some(url.clone());
            job.advance(JobStage::Ready)
        })?;
        Ok(url)
    });
    let orc = orchestrator(root.path(), 2, runner);
    let id = orc.submit(JobSubmission::new("a.wav")).unwrap();

    let report = orc.wait(id, POLL, |_| {}).unwrap();
    assert_eq!(report.status, JobStage::Ready);
    assert_eq!(report.url, Some(format!("/video/{id}.mp4")));
}

#[test]
fn panics_are_reported_and_the_worker_survives() {
    let root = tempfile::tempdir().unwrap();
    let runner: Arc<JobRunner> = Arc::new(|ctx: &PipelineContext| -> AudiogramResult<String> {
        if ctx.submission.audio_file == "boom.wav" {
            panic!("boom");
        }
        ctx.store.advance(ctx.job_id, JobStage::Ready)?;
        Ok(String::new())
    });
    let orc = orchestrator(root.path(), 1, runner);

    let bad = orc.submit(JobSubmission::new("boom.wav")).unwrap();
    let report = orc.wait(bad, POLL, |_| {}).unwrap();
    assert_eq!(report.status, JobStage::Error);
    assert_eq!(report.error.as_deref(), Some("worker crashed: boom"));

    let good = orc.submit(JobSubmission::new("fine.wav")).unwrap();
    assert_eq!(orc.wait(good, POLL, |_| {}).unwrap().status, JobStage::Ready);
}

#[test]
fn queued_jobs_report_position_and_can_be_cancelled() {
    let root = tempfile::tempdir().unwrap();
    let orc = orchestrator(root.path(), 1, blocking_runner());

    let a = orc.submit(JobSubmission::new("a.wav")).unwrap();
    wait_for_stage(&orc, a, JobStage::AudioDownload);
    let b = orc.submit(JobSubmission::new("b.wav")).unwrap();
    let c = orc.submit(JobSubmission::new("c.wav")).unwrap();

    assert_eq!(orc.status(b).unwrap().unwrap().position, Some(1));
    assert_eq!(orc.status(c).unwrap().unwrap().position, Some(2));
    assert_eq!(orc.status(a).unwrap().unwrap().position, None);

    assert!(orc.cancel(b).unwrap());
    let report = orc.status(b).unwrap().unwrap();
    assert_eq!(report.status, JobStage::Error);
    assert_eq!(orc.status(c).unwrap().unwrap().position, Some(1));

    // Cancelling the running job frees the worker for the next one.
    assert!(orc.cancel(a).unwrap());
    let report = orc.wait(a, POLL, |_| {}).unwrap();
    assert_eq!(report.status, JobStage::Error);
    assert_eq!(report.error.as_deref(), Some("Render cancelled"));
    wait_for_stage(&orc, c, JobStage::AudioDownload);

    assert!(orc.cancel(c).unwrap());
    orc.wait(c, POLL, |_| {}).unwrap();
    assert!(!orc.cancel(c).unwrap());
    assert!(!orc.cancel(Uuid::new_v4()).unwrap());
}

#[test]
fn shutdown_fails_queued_and_cancels_running_jobs() {
    let root = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryJobStore::new());
    let settings = Settings {
        working_directory: root.path().join("work"),
        ..Settings::default()
    };
    let orc = Orchestrator::with_runner(
        settings,
        store.clone(),
        Arc::new(LocalStorage::new(root.path())),
        blocking_runner(),
    )
    .unwrap();

    let running = orc.submit(JobSubmission::new("a.wav")).unwrap();
    wait_for_stage(&orc, running, JobStage::AudioDownload);
    let queued = orc.submit(JobSubmission::new("b.wav")).unwrap();

    orc.shutdown();

    let job = store.get(queued).unwrap().unwrap();
    assert_eq!(job.status, JobStage::Error);
    assert_eq!(store.get(running).unwrap().unwrap().status, JobStage::Error);
}
