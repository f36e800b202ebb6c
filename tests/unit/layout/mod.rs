use super::*;
use crate::scene::captions::{CaptionSegment, TimedCaptions};
use crate::scene::submission::CaptionMode;

fn points() -> Vec<WaveformPoint> {
    [0.2f32, 0.8, 0.5]
        .into_iter()
        .map(|energy| WaveformPoint {
            energy,
            midpoint: 0.0,
        })
        .collect()
}

#[test]
fn paint_order_is_background_waveform_captions() {
    let mut sub = JobSubmission::new("clip.wav");
    sub.caption = Some("static text".to_string());
    sub.theme.background_image = Some("bg.png".into());
    let scene = FrameScene::from_submission(&sub).unwrap();

    let list = layout_frame(&scene, &points(), 0.0, &mut ApproxTextMeasure::default());
    assert!(matches!(list.ops[0], DrawOp::Clear { .. }));
    assert!(matches!(list.ops[1], DrawOp::BackgroundImage));
    assert!(matches!(list.ops[2], DrawOp::Path { .. }));
    assert!(matches!(list.ops.last(), Some(DrawOp::Text(_))));
    assert_eq!(list.canvas, sub.theme.canvas());
}

#[test]
fn static_and_timed_never_mix() {
    let mut sub = JobSubmission::new("clip.wav");
    sub.caption = Some("ignored in auto mode".to_string());
    sub.caption_mode = CaptionMode::Auto;
    sub.timed_captions = Some(vec![CaptionSegment::new(0.0, 1.0, "timed")]);
    let scene = FrameScene::from_submission(&sub).unwrap();

    let list = layout_frame(&scene, &points(), 0.5, &mut ApproxTextMeasure::default());
    let texts: Vec<&str> = list
        .text_blocks()
        .flat_map(|b| b.lines.iter())
        .flat_map(|l| l.spans.iter())
        .map(|s| s.text.as_str())
        .collect();
    assert_eq!(texts, vec!["timed"]);
}

#[test]
fn layout_is_idempotent() {
    let scene = FrameScene {
        theme: Theme::default(),
        captions: CaptionSource::Timed(TimedCaptions {
            segments: vec![
                CaptionSegment::new(0.0, 2.0, "first speaker talking").with_speaker("A"),
                CaptionSegment::new(1.0, 3.0, "second").with_speaker("B"),
            ],
            speaker_recognition: true,
            ..TimedCaptions::default()
        }),
        formatting: FormattingOverrides::default(),
        positioning: WaveformPositioning::default(),
        waveform: WaveformConfig::default(),
        show_zone_boundaries: true,
    };
    let a = layout_frame(&scene, &points(), 1.5, &mut ApproxTextMeasure::default());
    let b = layout_frame(&scene, &points(), 1.5, &mut ApproxTextMeasure::default());
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn invalid_submission_is_rejected() {
    let mut sub = JobSubmission::new("clip.wav");
    sub.caption_mode = CaptionMode::Auto;
    let err = FrameScene::from_submission(&sub).unwrap_err();
    assert!(err.is_validation());
}
