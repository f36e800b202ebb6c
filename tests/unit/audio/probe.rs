use super::*;

#[test]
fn parses_stream_and_format_fields() {
    let json = br#"{
        "streams": [
            {"codec_type": "video", "width": 10, "height": 10},
            {"codec_type": "audio", "channels": 2, "sample_rate": "44100", "duration": "9.9"}
        ],
        "format": {"duration": "10.000000"}
    }"#;
    let info = parse_probe_json(json).unwrap();
    assert_eq!(info.channels, 2);
    assert_eq!(info.sample_rate, 44_100);
    assert!((info.duration_secs - 10.0).abs() < 1e-9);
}

#[test]
fn falls_back_to_stream_duration() {
    let json = br#"{"streams": [{"codec_type": "audio", "channels": 1, "duration": "3.5"}]}"#;
    let info = parse_probe_json(json).unwrap();
    assert!((info.duration_secs - 3.5).abs() < 1e-9);
    assert_eq!(info.sample_rate, 0);
}

#[test]
fn missing_audio_stream_is_a_decode_error() {
    let json = br#"{"streams": [{"codec_type": "video"}], "format": {"duration": "1"}}"#;
    let err = parse_probe_json(json).unwrap_err();
    assert!(matches!(err, AudiogramError::Decode(_)));
    assert!(err.to_string().contains("no audio stream"));
}

#[test]
fn garbage_is_rejected() {
    assert!(parse_probe_json(b"not json").is_err());
}
