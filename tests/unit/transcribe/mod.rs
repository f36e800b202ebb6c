use super::*;

fn word(start: u64, end: u64, text: &str, speaker: Option<&str>) -> TranscriptWord {
    TranscriptWord {
        start,
        end,
        text: text.to_owned(),
        speaker: speaker.map(str::to_owned),
    }
}

fn transcript(words: Vec<TranscriptWord>) -> Transcript {
    Transcript {
        text: None,
        words: Some(words),
    }
}

#[test]
fn words_split_on_duration_and_speaker() {
    let t = transcript(vec![
        word(0, 400, "hello", Some("A")),
        word(500, 900, "there", Some("A")),
        word(3100, 3500, "later", Some("A")),
        word(3600, 4004, "hi", Some("B")),
    ]);
    let segs = group_words(&t, true, 3.0);
    assert_eq!(segs.len(), 3);
    assert_eq!(segs[0].text, "hello there");
    assert_eq!((segs[0].start, segs[0].end), (0.0, 0.9));
    assert_eq!(segs[1].text, "later");
    assert_eq!(segs[2].speaker.as_deref(), Some("B"));
    assert_eq!(segs[2].end, 4.0);
}

#[test]
fn speakers_are_ignored_without_diarization() {
    let t = transcript(vec![
        word(0, 400, "a", Some("A")),
        word(500, 900, "b", Some("B")),
    ]);
    let segs = group_words(&t, false, 3.0);
    assert_eq!(segs.len(), 1);
    assert_eq!(segs[0].speaker, None);
    assert_eq!(segs[0].text, "a b");
}

#[test]
fn unlabeled_words_default_to_speaker_a() {
    let t = transcript(vec![word(0, 100, "x", None)]);
    assert_eq!(
        group_words(&t, true, 3.0)[0].speaker.as_deref(),
        Some(DEFAULT_SPEAKER)
    );
}

#[test]
fn text_without_words_becomes_one_block() {
    let t = Transcript {
        text: Some("full text".to_owned()),
        words: None,
    };
    let segs = group_words(&t, true, 3.0);
    assert_eq!(segs, vec![CaptionSegment::new(0.0, 10.0, "full text")]);
    assert!(group_words(&Transcript::default(), true, 3.0).is_empty());
}

#[test]
fn speaker_hints_follow_count_type() {
    let mut req = TranscriptionRequest::new("a.wav");
    assert_eq!(req.speaker_hint(), None);
    req.speaker_count_type = SpeakerCountType::Exact;
    req.speaker_count_value = 3;
    assert_eq!(req.speaker_hint(), Some(SpeakerHint::Exact(3)));
    req.speaker_count_type = SpeakerCountType::Minimum;
    assert_eq!(req.speaker_hint(), Some(SpeakerHint::Minimum(3)));
    req.speaker_recognition_enabled = false;
    assert_eq!(req.speaker_hint(), None);
}

#[test]
fn request_json_is_camel_case_with_defaults() {
    let req: TranscriptionRequest =
        serde_json::from_str(r#"{"audioPath":"a.wav","speakerCountType":"minimum"}"#).unwrap();
    assert!(req.speaker_recognition_enabled);
    assert_eq!(req.speaker_count_type, SpeakerCountType::Minimum);
    assert_eq!(req.speaker_count_value, 2);
    assert_eq!(req.speech_model, "best");
}

#[test]
fn missing_credential_is_unavailable() {
    assert!(matches!(
        credential_from(None),
        Err(TranscriptionError::Unavailable(_))
    ));
    assert!(credential_from(Some("  ".to_owned())).is_err());
    assert_eq!(credential_from(Some("key".to_owned())).unwrap(), "key");
}

struct Canned(Result<Transcript, TranscriptionError>);

impl TranscriptionProvider for Canned {
    fn name(&self) -> &str {
        "canned"
    }

    fn transcribe(&self, _: &TranscriptionRequest) -> Result<Transcript, TranscriptionError> {
        self.0.clone()
    }
}

#[test]
fn provider_errors_surface_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("a.wav");
    std::fs::write(&audio, b"RIFF").unwrap();

    let failing = Canned(Err(TranscriptionError::Provider("Audio too short".to_owned())));
    let err = transcribe(&failing, &TranscriptionRequest::new(&audio)).unwrap_err();
    assert!(matches!(
        err,
        AudiogramError::Transcription(TranscriptionError::Provider(ref m)) if m == "Audio too short"
    ));

    let ok = Canned(Ok(transcript(vec![word(0, 500, "hey", Some("A"))])));
    let segs = transcribe(&ok, &TranscriptionRequest::new(&audio)).unwrap();
    assert_eq!(segs.len(), 1);
}

#[test]
fn missing_audio_is_rejected() {
    let ok = Canned(Ok(Transcript::default()));
    let err = transcribe(&ok, &TranscriptionRequest::new("/no/such/file.wav")).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn short_and_inverted_words_still_form_valid_segments() {
    let t = transcript(vec![
        word(1001, 1004, "blip", Some("A")),
        word(5000, 5000, "zero", Some("B")),
        word(9000, 8000, "backwards", Some("A")),
        word(12_000, 12_400, "fine", Some("A")),
        word(12_500, 12_100, "tail", Some("A")),
    ]);
    let segs = group_words(&t, true, 3.0);
    assert_eq!(segs.len(), 4);
    for seg in &segs {
        seg.validate().unwrap();
    }
    assert_eq!((segs[0].start, segs[0].end), (1.0, 1.01));
    assert_eq!((segs[1].start, segs[1].end), (5.0, 5.01));
    assert_eq!(segs[3].text, "fine tail");
    assert_eq!(segs[3].end, 12.4);
}
