//! Streaming waveform analysis.
//!
//! Reduces an arbitrarily long PCM stream to `num_frames` display frames of
//! `samples_per_frame` `(energy, midpoint)` points each. Memory is bounded by
//! [`WaveformOpts::max_samples`]: long inputs are decimated up front and, if the estimate was
//! too low, decoding stops once the cap is reached and the collected prefix is summarized.

use crate::audio::decode::SampleStream;
use crate::foundation::error::{AudiogramError, AudiogramResult};

/// One display sub-point: normalized RMS energy in `[0, 1]` and normalized midpoint sample in
/// `[-1, 1]`. Serialized as a two-element array `[energy, midpoint]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "(f32, f32)", into = "(f32, f32)")]
pub struct WaveformPoint {
    pub energy: f32,
    pub midpoint: f32,
}

impl From<(f32, f32)> for WaveformPoint {
    fn from((energy, midpoint): (f32, f32)) -> Self {
        Self { energy, midpoint }
    }
}

impl From<WaveformPoint> for (f32, f32) {
    fn from(p: WaveformPoint) -> Self {
        (p.energy, p.midpoint)
    }
}

/// Per-frame amplitude summary shared read-only by every frame render.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct WaveformSummary {
    frames: Vec<Vec<WaveformPoint>>,
}

impl WaveformSummary {
    pub fn from_frames(frames: Vec<Vec<WaveformPoint>>) -> Self {
        Self { frames }
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Points for frame `i`, or an empty slice past the end.
    pub fn frame(&self, i: usize) -> &[WaveformPoint] {
        self.frames.get(i).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn frames(&self) -> &[Vec<WaveformPoint>] {
        &self.frames
    }

    /// Largest energy across every frame.
    pub fn max_energy(&self) -> f32 {
        self.frames
            .iter()
            .flatten()
            .map(|p| p.energy)
            .fold(0.0, f32::max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveformOpts {
    pub num_frames: usize,
    pub samples_per_frame: usize,
    /// Hard cap on retained mono samples.
    pub max_samples: usize,
    /// Factor applied to `num_frames * samples_per_frame` to estimate the input length.
    pub oversampling: usize,
}

impl WaveformOpts {
    pub fn new(num_frames: usize, samples_per_frame: usize) -> Self {
        Self {
            num_frames,
            samples_per_frame,
            max_samples: 5_000_000,
            oversampling: 100,
        }
    }

    pub fn validate(&self) -> AudiogramResult<()> {
        if self.num_frames == 0 {
            return Err(AudiogramError::validation("waveform num_frames must be > 0"));
        }
        if self.samples_per_frame == 0 {
            return Err(AudiogramError::validation(
                "waveform samples_per_frame must be > 0",
            ));
        }
        if self.max_samples == 0 {
            return Err(AudiogramError::validation("waveform max_samples must be > 0"));
        }
        Ok(())
    }

    /// Keep every `k`-th interleaved frame, derived from the estimated input length.
    pub fn skip_stride(&self) -> usize {
        let estimate = self
            .num_frames
            .saturating_mul(self.samples_per_frame)
            .saturating_mul(self.oversampling.max(1));
        if estimate > self.max_samples {
            estimate.div_ceil(self.max_samples)
        } else {
            1
        }
    }
}

/// Folds interleaved multi-channel samples into decimated mono samples.
struct MonoAccumulator {
    channels: usize,
    stride: usize,
    cap: usize,
    channel: usize,
    frame_counter: u64,
    avg: f32,
    out: Vec<f32>,
}

impl MonoAccumulator {
    fn new(channels: u16, stride: usize, cap: usize) -> Self {
        Self {
            channels: usize::from(channels.max(1)),
            stride: stride.max(1),
            cap,
            channel: 0,
            frame_counter: 0,
            avg: 0.0,
            out: Vec::new(),
        }
    }

    /// Returns `false` once the retained-sample cap is reached.
    fn push(&mut self, chunk: &[f32]) -> bool {
        for &s in chunk {
            let ch = self.channel;
            self.avg = if ch == 0 {
                s
            } else {
                (self.avg * ch as f32 + s) / (ch as f32 + 1.0)
            };

            self.channel += 1;
            if self.channel < self.channels {
                continue;
            }
            self.channel = 0;

            let keep = self.frame_counter.is_multiple_of(self.stride as u64);
            self.frame_counter += 1;
            if !keep {
                continue;
            }
            self.out.push(self.avg);
            if self.out.len() >= self.cap {
                return false;
            }
        }
        true
    }
}

/// Pull `stream` to completion (or to the sample cap) and summarize it.
#[tracing::instrument(skip(stream), fields(channels = stream.channels()))]
pub fn analyze(
    stream: &mut dyn SampleStream,
    opts: WaveformOpts,
) -> AudiogramResult<WaveformSummary> {
    opts.validate()?;
    let stride = opts.skip_stride();
    if stride > 1 {
        tracing::info!(stride, "long input, decimating waveform samples");
    }

    let mut acc = MonoAccumulator::new(stream.channels(), stride, opts.max_samples);
    let mut chunk = Vec::new();
    loop {
        chunk.clear();
        if !stream.read_chunk(&mut chunk)? {
            break;
        }
        if !acc.push(&chunk) {
            tracing::warn!(
                retained = acc.out.len(),
                "input too long for full waveform analysis, summarizing the collected prefix"
            );
            stream.stop();
            break;
        }
    }

    tracing::debug!(retained = acc.out.len(), "waveform samples collected");
    Ok(summarize(&acc.out, opts.num_frames, opts.samples_per_frame))
}

/// Summarize mono samples into `num_frames` frames of `samples_per_frame` points.
///
/// Blocks use proportional boundaries so every sample lands in exactly one frame. Empty blocks
/// (fewer samples than points) yield `(0, 0)`. Energies are normalized by the global maximum
/// RMS and midpoints by the global maximum absolute midpoint; a zero maximum leaves the values
/// at zero. The first and last frames are replaced by the frame holding the peak RMS.
pub fn summarize(samples: &[f32], num_frames: usize, samples_per_frame: usize) -> WaveformSummary {
    if num_frames == 0 || samples_per_frame == 0 {
        return WaveformSummary::default();
    }

    let mut max_rms = 0.0f32;
    let mut max_mid = 0.0f32;
    let mut peak_frame = 0usize;

    let mut frames: Vec<Vec<WaveformPoint>> = (0..num_frames)
        .map(|f| {
            let block = &samples
                [bound(samples.len(), f, num_frames)..bound(samples.len(), f + 1, num_frames)];
            (0..samples_per_frame)
                .map(|p| {
                    let sub = &block[bound(block.len(), p, samples_per_frame)
                        ..bound(block.len(), p + 1, samples_per_frame)];
                    let point = rms_and_midpoint(sub);
                    if point.energy > max_rms {
                        max_rms = point.energy;
                        peak_frame = f;
                    }
                    max_mid = max_mid.max(point.midpoint.abs());
                    point
                })
                .collect()
        })
        .collect();

    for p in frames.iter_mut().flatten() {
        if max_rms > 0.0 {
            p.energy /= max_rms;
        }
        if max_mid > 0.0 {
            p.midpoint /= max_mid;
        }
    }

    let peak = frames[peak_frame].clone();
    let last = num_frames - 1;
    frames[0] = peak.clone();
    frames[last] = peak;

    WaveformSummary { frames }
}

fn bound(len: usize, i: usize, n: usize) -> usize {
    ((len as u128 * i as u128) / n as u128) as usize
}

fn rms_and_midpoint(sub: &[f32]) -> WaveformPoint {
    if sub.is_empty() {
        return WaveformPoint::default();
    }
    let sum_sq: f64 = sub.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    WaveformPoint {
        energy: (sum_sq / sub.len() as f64).sqrt() as f32,
        midpoint: sub[sub.len() / 2],
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/waveform.rs"]
mod tests;
