use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context as _;
use uuid::Uuid;

use crate::audio::decode::FfmpegPcmStream;
use crate::audio::probe::{AudioInfo, probe_audio};
use crate::audio::trim::trim_audio;
use crate::audio::waveform::{WaveformOpts, WaveformSummary, analyze};
use crate::encode::ffmpeg::{AssembleConfig, assemble};
use crate::foundation::core::{CancelToken, Fps};
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::job::state::JobStage;
use crate::job::storage::ArtifactStorage;
use crate::job::store::JobStore;
use crate::layout::{FontRole, FrameScene};
use crate::render::{RenderAssets, SceneFrameRenderer, ScheduleOpts, render_frames};
use crate::scene::captions::CaptionSource;
use crate::scene::submission::JobSubmission;
use crate::settings::Settings;

/// Counting semaphore bounding concurrent `ffmpeg` encodes across jobs.
#[derive(Debug)]
pub struct EncoderPermits {
    free: Mutex<usize>,
    released: Condvar,
}

impl EncoderPermits {
    pub fn new(permits: usize) -> Self {
        Self {
            free: Mutex::new(permits.max(1)),
            released: Condvar::new(),
        }
    }

    /// Wait for a permit, giving up with `Cancelled` if `cancel` fires while waiting.
    pub fn acquire(&self, cancel: &CancelToken) -> AudiogramResult<EncoderPermit<'_>> {
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            cancel.check()?;
            if *free > 0 {
                *free -= 1;
                return Ok(EncoderPermit { permits: self });
            }
            free = self
                .released
                .wait_timeout(free, Duration::from_millis(100))
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub fn available(&self) -> usize {
        *self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held for the duration of one encode.
#[derive(Debug)]
pub struct EncoderPermit<'a> {
    permits: &'a EncoderPermits,
}

impl Drop for EncoderPermit<'_> {
    fn drop(&mut self) {
        *self
            .permits
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;
        self.permits.released.notify_one();
    }
}

/// Everything one job run needs, owned by the worker executing it.
#[derive(Clone)]
pub struct PipelineContext {
    pub job_id: Uuid,
    pub submission: JobSubmission,
    pub settings: Arc<Settings>,
    pub work_dir: PathBuf,
    pub cancel: CancelToken,
    pub store: Arc<dyn JobStore>,
    pub storage: Arc<dyn ArtifactStorage>,
    pub encoders: Arc<EncoderPermits>,
}

impl PipelineContext {
    fn enter(&self, stage: JobStage) -> AudiogramResult<()> {
        self.cancel.check()?;
        self.store.advance(self.job_id, stage)?;
        tracing::info!(job = %self.job_id, stage = %stage, "stage started");
        Ok(())
    }

    fn fps(&self) -> AudiogramResult<Fps> {
        Fps::whole(
            self.submission
                .theme
                .frames_per_second
                .unwrap_or(self.settings.default_fps),
        )
    }

    fn samples_per_frame(&self) -> usize {
        self.submission
            .theme
            .samples_per_frame
            .unwrap_or(self.settings.default_samples_per_frame)
    }
}

/// Run every stage of one job and mark it failed on the first error.
///
/// The working directory is removed afterwards unless `keepWorkDir` is set.
#[tracing::instrument(skip(ctx), fields(job = %ctx.job_id))]
pub fn run_job(ctx: &PipelineContext) -> AudiogramResult<String> {
    let result = std::fs::create_dir_all(&ctx.work_dir)
        .with_context(|| format!("failed to create work dir '{}'", ctx.work_dir.display()))
        .map_err(AudiogramError::from)
        .and_then(|()| run_stages(ctx));

    if let Err(err) = &result {
        report_failure(ctx.store.as_ref(), ctx.job_id, err);
    }
    if !ctx.settings.keep_work_dir
        && let Err(e) = std::fs::remove_dir_all(&ctx.work_dir)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(job = %ctx.job_id, error = %e, "failed to remove work dir");
    }
    result
}

/// Record `err` as the job's terminal error.
pub fn report_failure(store: &dyn JobStore, id: Uuid, err: &AudiogramError) {
    let message = match err {
        AudiogramError::Cancelled => "Render cancelled".to_owned(),
        other => other.to_string(),
    };
    tracing::error!(job = %id, error = %message, "job failed");
    if let Err(e) = store.fail(id, &message) {
        tracing::error!(job = %id, error = %e, "failed to record job failure");
    }
}

fn run_stages(ctx: &PipelineContext) -> AudiogramResult<String> {
    let audio = download_stage(ctx)?;
    let audio = trim_stage(ctx, audio)?;
    let (info, num_frames) = probe_stage(ctx, &audio)?;
    let summary = waveform_stage(ctx, &audio, &info, num_frames)?;
    let renderer = renderer_stage(ctx, summary)?;
    let frames_dir = frames_stage(ctx, &renderer, num_frames)?;
    let video = combine_stage(ctx, &frames_dir, &audio)?;

    ctx.cancel.check()?;
    let url = ctx.storage.store_video(ctx.job_id, &video)?;
    ctx.store.update(ctx.job_id, &mut |job| {
        job.url = Some(url.clone());
        job.advance(JobStage::Ready)
    })?;
    tracing::info!(job = %ctx.job_id, %url, "job ready");
    Ok(url)
}

fn download_stage(ctx: &PipelineContext) -> AudiogramResult<PathBuf> {
    ctx.enter(JobStage::AudioDownload)?;
    let ext = Path::new(&ctx.submission.audio_file)
        .extension()
        .map(|e| format!("audio.{}", e.to_string_lossy()))
        .unwrap_or_else(|| "audio".to_owned());
    let dest = ctx.work_dir.join(ext);
    ctx.storage.fetch_audio(&ctx.submission.audio_file, &dest)?;
    Ok(dest)
}

fn trim_stage(ctx: &PipelineContext, audio: PathBuf) -> AudiogramResult<PathBuf> {
    let window = ctx.submission.trim_window();
    if window.is_empty() {
        return Ok(audio);
    }
    ctx.enter(JobStage::Trim)?;
    let out = ctx.work_dir.join("trimmed.wav");
    trim_audio(&ctx.settings.ffmpeg_path, &audio, window, &out)?;
    Ok(out)
}

fn probe_stage(ctx: &PipelineContext, audio: &Path) -> AudiogramResult<(AudioInfo, u64)> {
    ctx.enter(JobStage::Probing)?;
    let info = probe_audio(&ctx.settings.ffprobe_path, audio)?;
    let num_frames = ctx.fps()?.secs_to_frames_floor(info.duration_secs);
    if num_frames == 0 {
        return Err(AudiogramError::validation(format!(
            "audio is too short to render ({:.3}s)",
            info.duration_secs
        )));
    }
    ctx.store.update(ctx.job_id, &mut |job| {
        job.num_frames = Some(num_frames);
        Ok(())
    })?;
    tracing::info!(
        duration = info.duration_secs,
        channels = info.channels,
        num_frames,
        "audio probed"
    );
    Ok((info, num_frames))
}

fn waveform_stage(
    ctx: &PipelineContext,
    audio: &Path,
    info: &AudioInfo,
    num_frames: u64,
) -> AudiogramResult<WaveformSummary> {
    ctx.enter(JobStage::Waveform)?;
    let num_frames = usize::try_from(num_frames)
        .map_err(|_| AudiogramError::validation("frame count exceeds platform limits"))?;
    let opts = WaveformOpts {
        max_samples: ctx.settings.max_waveform_samples,
        oversampling: ctx.settings.waveform_oversampling,
        ..WaveformOpts::new(num_frames, ctx.samples_per_frame())
    };
    let mut stream = FfmpegPcmStream::spawn(&ctx.settings.ffmpeg_path, audio, info.channels)?;
    analyze(&mut stream, opts)
}

fn renderer_stage(
    ctx: &PipelineContext,
    summary: WaveformSummary,
) -> AudiogramResult<SceneFrameRenderer> {
    ctx.enter(JobStage::Renderer)?;
    let mut submission = ctx.submission.clone();
    submission
        .theme
        .resolve_paths(&ctx.settings.theme_asset_root);
    let scene = FrameScene::from_submission(&submission)?;
    let assets = RenderAssets::load(&scene.theme)?;
    if scene.captions != CaptionSource::None && assets.font_bytes(FontRole::Caption).is_none() {
        return Err(AudiogramError::validation(
            "captions need a captionFont or subtitleFont in the theme",
        ));
    }
    Ok(SceneFrameRenderer::new(
        Arc::new(scene),
        Arc::new(summary),
        Arc::new(assets),
        ctx.fps()?,
    ))
}

fn frames_stage(
    ctx: &PipelineContext,
    renderer: &SceneFrameRenderer,
    num_frames: u64,
) -> AudiogramResult<PathBuf> {
    ctx.enter(JobStage::Frames)?;
    let frames_dir = ctx.work_dir.join("frames");
    let step = (num_frames / 100).max(1);
    let tick = |done: u64| {
        if (done.is_multiple_of(step) || done == num_frames)
            && let Err(e) = ctx.store.record_frames(ctx.job_id, done)
        {
            tracing::warn!(job = %ctx.job_id, error = %e, "failed to record frame progress");
        }
    };
    render_frames(
        renderer,
        renderer.canvas(),
        ScheduleOpts {
            num_frames,
            pool_width: ctx.settings.render_pool_width,
        },
        &frames_dir,
        &ctx.cancel,
        &tick,
    )?;
    Ok(frames_dir)
}

fn combine_stage(ctx: &PipelineContext, frames_dir: &Path, audio: &Path) -> AudiogramResult<PathBuf> {
    ctx.enter(JobStage::Combine)?;
    let out = ctx.work_dir.join("video.mp4");
    let cfg = AssembleConfig {
        ffmpeg: ctx.settings.ffmpeg_path.clone(),
        frame_pattern: AssembleConfig::frame_pattern_in(frames_dir),
        fps: ctx.fps()?,
        audio: audio.to_path_buf(),
        out_path: out.clone(),
    };
    let _permit = ctx.encoders.acquire(&ctx.cancel)?;
    assemble(&cfg, &ctx.cancel)?;
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/job/pipeline.rs"]
mod tests;
