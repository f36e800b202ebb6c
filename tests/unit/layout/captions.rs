use super::*;
use crate::layout::text::ApproxTextMeasure;
use crate::scene::captions::CaptionSegment;
use crate::scene::formatting::CaptionFormatting;

/// 10px per character regardless of size.
struct Fixed;

impl TextMeasure for Fixed {
    fn width(&mut self, _font: FontRole, text: &str, _size_px: f32) -> f64 {
        text.chars().count() as f64 * 10.0
    }
}

fn zone(max_speakers: usize, speakers: &[&str]) -> CaptionZone {
    CaptionZone {
        max_speakers,
        speakers: speakers.iter().map(|s| s.to_string()).collect(),
        ..CaptionZone::default()
    }
}

fn text_of(block: &TextBlock) -> Vec<String> {
    block
        .lines
        .iter()
        .map(|l| l.spans.iter().map(|s| s.text.as_str()).collect::<String>())
        .collect()
}

fn only_text(ops: &[DrawOp]) -> &TextBlock {
    let mut blocks = ops.iter().filter_map(|op| match op {
        DrawOp::Text(t) => Some(t),
        _ => None,
    });
    let block = blocks.next().expect("a text block");
    assert!(blocks.next().is_none(), "expected exactly one text block");
    block
}

#[test]
fn static_caption_is_bottom_anchored_by_default() {
    let theme = Theme::default();
    let op = static_caption_ops(&theme, "hello world", &mut Fixed).expect("caption op");
    let DrawOp::Text(block) = op else {
        panic!("static caption is text");
    };
    assert_eq!(block.font, FontRole::Caption);
    assert_eq!(block.lines.len(), 1);
    let line = &block.lines[0];
    assert_eq!(line.top, theme.caption_bottom - f64::from(theme.caption_line_height));
    assert_eq!(line.spans[0].x, theme.caption_left);
    assert_eq!(line.spans[0].color, Rgba8::BLACK);
}

#[test]
fn static_caption_wraps_and_aligns() {
    let theme = Theme {
        caption_left: 0.0,
        caption_right: 100.0,
        caption_top: Some(10.0),
        caption_align: TextAlign::Right,
        ..Theme::default()
    };
    let op = static_caption_ops(&theme, "aaaa bbbb cc", &mut Fixed).expect("caption op");
    let DrawOp::Text(block) = op else {
        panic!("static caption is text");
    };
    assert_eq!(text_of(&block), vec!["aaaa bbbb", "cc"]);
    assert_eq!(block.lines[0].top, 10.0);
    assert_eq!(block.lines[1].top, 10.0 + 42.0 + 5.0);
    assert_eq!(block.lines[0].spans[0].x, 10.0);
    assert_eq!(block.lines[1].spans[0].x, 80.0);
}

#[test]
fn blank_static_caption_draws_nothing() {
    assert!(static_caption_ops(&Theme::default(), "   ", &mut Fixed).is_none());
}

#[test]
fn zone_assignment_prefers_listed_speakers() {
    let mut zones = BTreeMap::new();
    zones.insert("a_top".to_string(), zone(1, &["host"]));
    zones.insert("b_bottom".to_string(), zone(1, &["guest"]));

    let slots = assign_zones(&zones, &[Some("guest"), Some("host")]);
    assert_eq!(slots[0].zone_name, "b_bottom");
    assert_eq!(slots[1].zone_name, "a_top");
    assert!(slots.iter().all(|s| s.slot == 0 && s.slots == 1));
}

#[test]
fn zone_assignment_fills_in_order_then_overflows_least_loaded() {
    let mut zones = BTreeMap::new();
    zones.insert("a".to_string(), zone(2, &[]));
    zones.insert("b".to_string(), zone(1, &[]));

    let slots = assign_zones(&zones, &[None, None, None, None]);
    let placed: Vec<(&str, usize)> = slots.iter().map(|s| (s.zone_name, s.slot)).collect();
    assert_eq!(placed, vec![("a", 0), ("a", 1), ("b", 0), ("b", 1)]);
    // Overfull zone "b" is split into two slots for this frame.
    assert_eq!(slots[3].slots, 2);
    assert_eq!(slots[0].slots, 2);
}

#[test]
fn slots_split_zone_height_with_spacing() {
    let canvas = Canvas {
        width: 1000,
        height: 1000,
    };
    let z = CaptionZone {
        x: 10.0,
        y: 50.0,
        width: 80.0,
        height: 30.0,
        spacing: 10.0,
        ..CaptionZone::default()
    };
    let first = slot_rect(canvas, &z, 0, 2);
    let second = slot_rect(canvas, &z, 1, 2);
    assert_eq!(first, Rect::new(100.0, 500.0, 900.0, 645.0));
    assert_eq!(second, Rect::new(100.0, 655.0, 900.0, 800.0));
}

#[test]
fn overlapping_segments_render_independently_in_zones() {
    let mut theme = Theme::default();
    theme.caption_zones.insert("a".to_string(), zone(2, &[]));
    let captions = TimedCaptions {
        segments: vec![
            CaptionSegment::new(0.0, 2.0, "a"),
            CaptionSegment::new(1.0, 3.0, "b").with_speaker("speakerX"),
        ],
        ..TimedCaptions::default()
    };
    let overrides = FormattingOverrides::default();

    let both = timed_caption_ops(&theme, &captions, &overrides, 1.5, &mut Fixed);
    let blocks: Vec<&TextBlock> = both
        .iter()
        .filter_map(|op| match op {
            DrawOp::Text(t) => Some(t),
            _ => None,
        })
        .collect();
    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].lines[0].top < blocks[1].lines[0].top);

    let second = timed_caption_ops(&theme, &captions, &overrides, 2.5, &mut Fixed);
    assert_eq!(text_of(only_text(&second)), vec!["b"]);

    assert!(timed_caption_ops(&theme, &captions, &overrides, 4.0, &mut Fixed).is_empty());
}

#[test]
fn zone_font_shrinks_to_fit_but_not_below_floor() {
    let mut theme = Theme::default();
    theme.caption_zones.insert("z".to_string(), CaptionZone::default());
    let long = "words ".repeat(300);
    let captions = TimedCaptions {
        segments: vec![
            CaptionSegment::new(0.0, 1.0, "short"),
            CaptionSegment::new(1.0, 2.0, long.trim()),
        ],
        ..TimedCaptions::default()
    };
    let overrides = FormattingOverrides::default();
    let mut m = ApproxTextMeasure::default();

    let short = timed_caption_ops(&theme, &captions, &overrides, 0.5, &mut m);
    assert_eq!(only_text(&short).size, 48.0);

    let long = timed_caption_ops(&theme, &captions, &overrides, 1.5, &mut m);
    assert_eq!(only_text(&long).size, 16.0);
}

#[test]
fn speaker_prefix_gets_its_own_color() {
    let mut theme = Theme::default();
    theme.caption_zones.insert("z".to_string(), CaptionZone::default());
    theme
        .speaker_colors
        .insert("Alice".to_string(), Rgba8::rgb(255, 0, 0));
    let captions = TimedCaptions {
        segments: vec![CaptionSegment::new(0.0, 1.0, "hi there").with_speaker("A")],
        speaker_names: BTreeMap::from([("A".to_string(), "Alice".to_string())]),
        speaker_recognition: true,
    };

    let ops = timed_caption_ops(&theme, &captions, &FormattingOverrides::default(), 0.5, &mut Fixed);
    let line = &only_text(&ops).lines[0];
    assert_eq!(line.spans.len(), 2);
    assert_eq!(line.spans[0].text, "Alice: ");
    assert_eq!(line.spans[0].color, Rgba8::rgb(255, 0, 0));
    assert_eq!(line.spans[1].text, "hi there");
    assert_eq!(line.spans[1].x - line.spans[0].x, 70.0);
}

#[test]
fn wrapped_speaker_name_keeps_its_color_on_every_line() {
    let red = Rgba8::rgb(255, 0, 0);
    let mut theme = Theme {
        width: 200,
        ..Theme::default()
    };
    theme.caption_zones.insert("z".to_string(), CaptionZone::default());
    theme
        .speaker_colors
        .insert("Doctor Alice Longname".to_string(), red);
    let captions = TimedCaptions {
        segments: vec![CaptionSegment::new(0.0, 1.0, "hi there").with_speaker("A")],
        speaker_names: BTreeMap::from([("A".to_string(), "Doctor Alice Longname".to_string())]),
        speaker_recognition: true,
    };

    // 164px of text width: "Doctor Alice" / "Longname: hi" / "there".
    let ops = timed_caption_ops(&theme, &captions, &FormattingOverrides::default(), 0.5, &mut Fixed);
    let block = only_text(&ops);
    assert_eq!(text_of(block), vec!["Doctor Alice", "Longname: hi", "there"]);

    let first = &block.lines[0].spans;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].color, red);

    let second = &block.lines[1].spans;
    assert_eq!(second.len(), 2);
    assert_eq!((second[0].text.as_str(), second[0].color), ("Longname: ", red));
    assert_eq!(second[1].text, "hi");
    assert_ne!(second[1].color, red);

    let third = &block.lines[2].spans;
    assert_eq!(third.len(), 1);
    assert_ne!(third[0].color, red);
}

#[test]
fn leading_words_cover_trailing_space() {
    assert_eq!(leading_words_len("Longname: hi", 1), (10, 1));
    assert_eq!(leading_words_len("Doctor Alice", 5), (12, 2));
    assert_eq!(leading_words_len("there", 0), (0, 0));
}

#[test]
fn free_layout_uses_speaker_position_and_stroke() {
    let theme = Theme::default();
    let captions = TimedCaptions {
        segments: vec![CaptionSegment::new(0.0, 1.0, "abcd").with_speaker("A")],
        ..TimedCaptions::default()
    };
    let overrides = FormattingOverrides {
        global: None,
        speakers: BTreeMap::from([(
            "A".to_string(),
            CaptionFormatting {
                x: Some(25.0),
                y: Some(50.0),
                stroke_width: Some(2.0),
                ..CaptionFormatting::default()
            },
        )]),
    };

    let ops = timed_caption_ops(&theme, &captions, &overrides, 0.5, &mut Fixed);
    // Backdrop from the theme subtitle defaults, then the text.
    assert!(matches!(ops[0], DrawOp::Rect { .. }));
    let block = only_text(&ops);
    let span = &block.lines[0].spans[0];
    assert_eq!(span.x, 320.0 - 20.0);
    assert_eq!(block.stroke.map(|s| s.width), Some(4.0));
    let mid = block.lines[0].top + block.lines[0].height / 2.0;
    assert!((mid - 360.0).abs() < 1e-9);
}

#[test]
fn free_layout_puts_colored_name_above_text() {
    let theme = Theme::default();
    let captions = TimedCaptions {
        segments: vec![CaptionSegment::new(0.0, 1.0, "hello").with_speaker("A")],
        speaker_recognition: true,
        ..TimedCaptions::default()
    };
    let overrides = FormattingOverrides {
        global: Some(CaptionFormatting {
            speaker_color: Some(Rgba8::rgb(0, 0, 255)),
            ..CaptionFormatting::default()
        }),
        ..FormattingOverrides::default()
    };

    let ops = timed_caption_ops(&theme, &captions, &overrides, 0.5, &mut Fixed);
    let block = only_text(&ops);
    assert_eq!(text_of(block), vec!["A:", "hello"]);
    assert_eq!(block.lines[0].spans[0].color, Rgba8::rgb(0, 0, 255));
    assert!(block.lines[0].top + block.lines[0].height < block.lines[1].top);
}

#[test]
fn prefix_length_covers_name_and_whitespace() {
    assert_eq!(speaker_prefix_len("Bob: hi"), Some(5));
    assert_eq!(speaker_prefix_len("Bob:hi"), Some(4));
    assert_eq!(speaker_prefix_len(": hi"), None);
    assert_eq!(speaker_prefix_len("no colon"), None);
}

#[test]
fn overlay_outlines_each_zone() {
    let mut theme = Theme::default();
    theme.caption_zones.insert("a".to_string(), CaptionZone::default());
    theme.caption_zones.insert("b".to_string(), CaptionZone::default());
    let ops = zone_boundary_ops(&theme);
    assert_eq!(ops.len(), 4);
    let DrawOp::Text(label) = &ops[1] else {
        panic!("label follows outline");
    };
    assert_eq!(text_of(label), vec!["a", "Max: 1 speakers"]);
}
