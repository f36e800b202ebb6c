use super::*;

#[test]
fn slice_stream_yields_all_samples_in_chunks() {
    let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();
    let mut stream = SliceSampleStream::new(&samples, 2).with_chunk_len(3);
    let mut out = Vec::new();
    let mut reads = 0;
    while stream.read_chunk(&mut out).unwrap() {
        reads += 1;
    }
    assert_eq!(reads, 4);
    assert_eq!(out, samples);
    assert_eq!(stream.channels(), 2);
}

#[test]
fn slice_stream_stop_ends_the_stream() {
    let samples = vec![0.5f32; 100];
    let mut stream = SliceSampleStream::new(&samples, 1).with_chunk_len(10);
    let mut out = Vec::new();
    assert!(stream.read_chunk(&mut out).unwrap());
    stream.stop();
    assert!(!stream.read_chunk(&mut out).unwrap());
    assert_eq!(out.len(), 10);
}

#[test]
fn ffmpeg_stream_rejects_zero_channels() {
    let err = FfmpegPcmStream::spawn(Path::new("ffmpeg"), Path::new("x.wav"), 0)
        .err()
        .unwrap();
    assert!(err.to_string().contains("zero audio channels"));
}

#[test]
fn ffmpeg_stream_reports_missing_binary() {
    let err = FfmpegPcmStream::spawn(
        Path::new("/nonexistent/ffmpeg-binary"),
        Path::new("x.wav"),
        1,
    )
    .err()
    .unwrap();
    assert!(matches!(err, AudiogramError::Decode(_)));
}
