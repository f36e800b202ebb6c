use super::*;
use crate::audio::decode::SliceSampleStream;

fn sine(len: usize, period: usize, amp: f32) -> Vec<f32> {
    (0..len)
        .map(|i| amp * (i as f32 / period as f32 * std::f32::consts::TAU).sin())
        .collect()
}

#[test]
fn summary_has_exact_length_and_peak_bookends() {
    // Quiet first half, loud burst near three quarters.
    let mut samples = sine(10_000, 50, 0.1);
    for s in &mut samples[7_000..7_500] {
        *s *= 8.0;
    }
    let summary = summarize(&samples, 20, 8);
    assert_eq!(summary.num_frames(), 20);
    assert!(summary.frames().iter().all(|f| f.len() == 8));
    assert_eq!(summary.frame(0), summary.frame(19));
    assert_eq!(summary.frame(0), summary.frame(14));
    assert!((summary.max_energy() - 1.0).abs() < 1e-6);
}

#[test]
fn normalizes_midpoints_into_unit_range() {
    let samples = sine(4_000, 37, 0.4);
    let summary = summarize(&samples, 10, 4);
    let max_mid = summary
        .frames()
        .iter()
        .flatten()
        .map(|p| p.midpoint.abs())
        .fold(0.0f32, f32::max);
    assert!((max_mid - 1.0).abs() < 1e-6);
    assert!(
        summary
            .frames()
            .iter()
            .flatten()
            .all(|p| (0.0..=1.0).contains(&p.energy) && (-1.0..=1.0).contains(&p.midpoint))
    );
}

#[test]
fn silence_yields_all_zero_summary() {
    let samples = vec![0.0f32; 441_000];
    let mut stream = SliceSampleStream::new(&samples, 1);
    let summary = analyze(&mut stream, WaveformOpts::new(100, 128)).unwrap();
    assert_eq!(summary.num_frames(), 100);
    assert!(
        summary
            .frames()
            .iter()
            .flatten()
            .all(|p| p.energy == 0.0 && p.midpoint == 0.0)
    );
}

#[test]
fn fewer_samples_than_points_still_produces_every_frame() {
    let summary = summarize(&[0.5, -0.5, 0.25], 10, 16);
    assert_eq!(summary.num_frames(), 10);
    assert!(summary.frames().iter().all(|f| f.len() == 16));
}

#[test]
fn stereo_channels_are_averaged() {
    // Left = 1.0, right = 0.0 -> mono 0.5 everywhere.
    let samples: Vec<f32> = (0..2_000).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
    let mut stream = SliceSampleStream::new(&samples, 2).with_chunk_len(333);
    let mut acc = MonoAccumulator::new(stream.channels(), 1, usize::MAX);
    let mut chunk = Vec::new();
    while stream.read_chunk(&mut chunk).unwrap() {
        assert!(acc.push(&chunk));
        chunk.clear();
    }
    assert_eq!(acc.out.len(), 1_000);
    assert!(acc.out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
}

#[test]
fn long_inputs_are_decimated_and_still_complete() {
    let opts = WaveformOpts {
        num_frames: 50,
        samples_per_frame: 4,
        max_samples: 1_000,
        oversampling: 100,
    };
    // estimate 20_000 > 1_000 -> every 20th frame kept
    assert_eq!(opts.skip_stride(), 20);

    let samples = sine(20_000, 400, 0.8);
    let mut stream = SliceSampleStream::new(&samples, 1);
    let summary = analyze(&mut stream, opts).unwrap();
    assert_eq!(summary.num_frames(), 50);
    assert!((summary.max_energy() - 1.0).abs() < 1e-6);
}

#[test]
fn hitting_the_cap_summarizes_the_prefix() {
    let opts = WaveformOpts {
        num_frames: 10,
        samples_per_frame: 2,
        max_samples: 500,
        oversampling: 1,
    };
    assert_eq!(opts.skip_stride(), 1);
    let samples = sine(100_000, 20, 0.5);
    let mut stream = SliceSampleStream::new(&samples, 1).with_chunk_len(64);
    let summary = analyze(&mut stream, opts).unwrap();
    assert_eq!(summary.num_frames(), 10);
    // The stream was told to stop.
    let mut rest = Vec::new();
    assert!(!stream.read_chunk(&mut rest).unwrap());
}

#[test]
fn zero_frames_is_invalid() {
    let samples = vec![0.1f32; 10];
    let mut stream = SliceSampleStream::new(&samples, 1);
    assert!(analyze(&mut stream, WaveformOpts::new(0, 8)).is_err());
}

#[test]
fn serializes_as_nested_pairs() {
    let summary = WaveformSummary::from_frames(vec![vec![WaveformPoint {
        energy: 1.0,
        midpoint: -0.5,
    }]]);
    let json = serde_json::to_string(&summary).unwrap();
    assert_eq!(json, "[[[1.0,-0.5]]]");
    let back: WaveformSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(back, summary);
}
