use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::error::{AudiogramError, AudiogramResult};

/// Source of channel-interleaved `f32` PCM, consumed in chunks.
///
/// Implementations must keep channel alignment across chunks: a chunk may end in the middle of
/// an interleaved frame and the next chunk continues from the following channel.
pub trait SampleStream {
    /// Number of interleaved channels (>= 1).
    fn channels(&self) -> u16;

    /// Append the next chunk of samples to `out`. Returns `false` at end of stream.
    fn read_chunk(&mut self, out: &mut Vec<f32>) -> AudiogramResult<bool>;

    /// Stop decoding early. Later calls to `read_chunk` report end of stream.
    fn stop(&mut self);
}

/// In-memory stream over already decoded samples.
pub struct SliceSampleStream<'a> {
    samples: &'a [f32],
    channels: u16,
    chunk_len: usize,
    pos: usize,
}

impl<'a> SliceSampleStream<'a> {
    pub fn new(samples: &'a [f32], channels: u16) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            chunk_len: 4096,
            pos: 0,
        }
    }

    /// Override the chunk size (mostly useful to exercise chunk boundaries).
    pub fn with_chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = chunk_len.max(1);
        self
    }
}

impl SampleStream for SliceSampleStream<'_> {
    fn channels(&self) -> u16 {
        self.channels
    }

    fn read_chunk(&mut self, out: &mut Vec<f32>) -> AudiogramResult<bool> {
        if self.pos >= self.samples.len() {
            return Ok(false);
        }
        let end = (self.pos + self.chunk_len).min(self.samples.len());
        out.extend_from_slice(&self.samples[self.pos..end]);
        self.pos = end;
        Ok(true)
    }

    fn stop(&mut self) {
        self.pos = self.samples.len();
    }
}

const READ_BUF_BYTES: usize = 64 * 1024;

/// Streams `f32le` PCM from an `ffmpeg` child process.
pub struct FfmpegPcmStream {
    source: PathBuf,
    channels: u16,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    buf: Vec<u8>,
    // Bytes of an incomplete trailing sample carried into the next read.
    carry: Vec<u8>,
}

impl FfmpegPcmStream {
    /// Spawn `ffmpeg` decoding `source` to interleaved `f32le` with its native channel layout.
    pub fn spawn(ffmpeg: &Path, source: &Path, channels: u16) -> AudiogramResult<Self> {
        if channels == 0 {
            return Err(AudiogramError::decode(format!(
                "'{}' reports zero audio channels",
                source.display()
            )));
        }

        let mut cmd = Command::new(ffmpeg);
        cmd.args(["-v", "error", "-i"])
            .arg(source)
            .args([
                "-vn",
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "-ac",
                &channels.to_string(),
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        tracing::debug!(?cmd, "spawning pcm decoder");

        let mut child = cmd.spawn().map_err(|e| {
            AudiogramError::decode(format!(
                "failed to spawn '{}' for audio decode: {e}",
                ffmpeg.display()
            ))
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AudiogramError::decode("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AudiogramError::decode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        Ok(Self {
            source: source.to_path_buf(),
            channels,
            child: Some(child),
            stdout: Some(stdout),
            stderr_drain: Some(stderr_drain),
            buf: vec![0u8; READ_BUF_BYTES],
            carry: Vec::with_capacity(4),
        })
    }

    fn finish(&mut self) -> AudiogramResult<()> {
        drop(self.stdout.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().map_err(|e| {
            AudiogramError::decode(format!("failed to wait for ffmpeg audio decode: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| AudiogramError::decode("ffmpeg stderr drain thread panicked"))?
                .unwrap_or_default(),
            None => Vec::new(),
        };
        if !status.success() {
            return Err(AudiogramError::decode(format!(
                "ffmpeg audio decode of '{}' exited with status {}: {}",
                self.source.display(),
                status,
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        Ok(())
    }
}

impl SampleStream for FfmpegPcmStream {
    fn channels(&self) -> u16 {
        self.channels
    }

    fn read_chunk(&mut self, out: &mut Vec<f32>) -> AudiogramResult<bool> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(false);
        };
        let n = stdout.read(&mut self.buf).map_err(|e| {
            AudiogramError::decode(format!(
                "failed to read decoded audio for '{}': {e}",
                self.source.display()
            ))
        })?;
        if n == 0 {
            self.finish()?;
            return Ok(false);
        }

        let mut bytes = &self.buf[..n];
        if !self.carry.is_empty() {
            let need = 4 - self.carry.len();
            let take = need.min(bytes.len());
            self.carry.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            if self.carry.len() == 4 {
                let b = [self.carry[0], self.carry[1], self.carry[2], self.carry[3]];
                out.push(f32::from_le_bytes(b));
                self.carry.clear();
            }
        }
        let mut chunks = bytes.chunks_exact(4);
        out.extend(
            chunks
                .by_ref()
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])),
        );
        self.carry.extend_from_slice(chunks.remainder());
        Ok(true)
    }

    fn stop(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FfmpegPcmStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/decode.rs"]
mod tests;
