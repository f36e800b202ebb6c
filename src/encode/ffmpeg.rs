use std::ffi::OsString;
use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::foundation::core::{CancelToken, FRAME_FILE_PATTERN, Fps};
use crate::foundation::error::{AudiogramError, AudiogramResult};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One `ffmpeg` mux of a numbered PNG sequence with an audio track.
#[derive(Clone, Debug)]
pub struct AssembleConfig {
    pub ffmpeg: PathBuf,
    /// printf-style frame pattern, e.g. `<dir>/frame-%06d.png`.
    pub frame_pattern: PathBuf,
    pub fps: Fps,
    pub audio: PathBuf,
    pub out_path: PathBuf,
}

impl AssembleConfig {
    /// Pattern matching [`FrameIndex::file_name`](crate::foundation::core::FrameIndex::file_name)
    /// inside `frames_dir`.
    pub fn frame_pattern_in(frames_dir: &Path) -> PathBuf {
        frames_dir.join(FRAME_FILE_PATTERN)
    }

    fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-framerate"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(self.fps.ffmpeg_rate().into());
        args.extend(["-start_number", "1", "-i"].map(OsString::from));
        args.push(self.frame_pattern.clone().into_os_string());
        args.push("-i".into());
        args.push(self.audio.clone().into_os_string());
        args.extend(
            [
                "-c:v", "libx264", "-c:a", "aac", "-pix_fmt", "yuv420p", "-shortest",
            ]
            .map(OsString::from),
        );
        args.push(self.out_path.clone().into_os_string());
        args
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> AudiogramResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Mux the frame sequence and audio into `cfg.out_path`.
///
/// Success requires both a zero exit status and a non-empty output file. Cancellation kills the
/// child and returns [`AudiogramError::Cancelled`].
#[tracing::instrument(skip(cfg, cancel), fields(out = %cfg.out_path.display()))]
pub fn assemble(cfg: &AssembleConfig, cancel: &CancelToken) -> AudiogramResult<()> {
    ensure_parent_dir(&cfg.out_path)?;
    cancel.check()?;

    let mut cmd = Command::new(&cfg.ffmpeg);
    cmd.args(cfg.args())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    tracing::debug!(?cmd, "assembling video");

    let mut child = cmd.spawn().map_err(|e| {
        AudiogramError::assembly(format!(
            "failed to spawn '{}' (is it installed and on PATH?): {e}",
            cfg.ffmpeg.display()
        ))
    })?;
    let stderr = spawn_stderr_drain(&mut child)?;

    let status = loop {
        if cancel.is_cancelled() {
            kill_and_reap(&mut child, stderr);
            tracing::info!("assembly cancelled, encoder killed");
            return Err(AudiogramError::Cancelled);
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                kill_and_reap(&mut child, stderr);
                return Err(AudiogramError::assembly(format!(
                    "failed to wait for ffmpeg: {e}"
                )));
            }
        }
    };

    let stderr = stderr
        .join()
        .map_err(|_| AudiogramError::assembly("ffmpeg stderr drain thread panicked"))?
        .unwrap_or_default();
    let stderr = String::from_utf8_lossy(&stderr);

    if !status.success() {
        return Err(AudiogramError::assembly(format!(
            "ffmpeg exited with status {status}: {}",
            stderr.trim()
        )));
    }
    verify_output(&cfg.out_path, stderr.trim())
}

/// Kill the encoder, wait for it to exit and join its stderr drain.
fn kill_and_reap(child: &mut Child, stderr: JoinHandle<std::io::Result<Vec<u8>>>) {
    // The child may have exited between the last poll and the kill.
    let _ = child.kill();
    if let Err(e) = child.wait() {
        tracing::warn!(error = %e, "failed to reap ffmpeg");
    }
    let _ = stderr.join();
}

fn spawn_stderr_drain(child: &mut Child) -> AudiogramResult<JoinHandle<std::io::Result<Vec<u8>>>> {
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| AudiogramError::assembly("failed to open ffmpeg stderr (unexpected)"))?;
    Ok(std::thread::spawn(move || {
        let mut bytes = Vec::new();
        stderr.read_to_end(&mut bytes)?;
        Ok(bytes)
    }))
}

/// A zero exit status is not enough: the output must exist and be non-empty.
pub fn verify_output(path: &Path, stderr: &str) -> AudiogramResult<()> {
    match std::fs::metadata(path) {
        Ok(m) if m.is_file() && m.len() > 0 => Ok(()),
        Ok(_) => Err(AudiogramError::assembly(format!(
            "ffmpeg produced an empty output '{}': {stderr}",
            path.display()
        ))),
        Err(e) => Err(AudiogramError::assembly(format!(
            "ffmpeg output '{}' is missing ({e}): {stderr}",
            path.display()
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
