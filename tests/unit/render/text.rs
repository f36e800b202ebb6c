use super::*;

#[test]
fn brush_copies_channels() {
    let b = TextBrushRgba8::from(Rgba8 {
        r: 1,
        g: 2,
        b: 3,
        a: 4,
    });
    assert_eq!(
        b,
        TextBrushRgba8 {
            r: 1,
            g: 2,
            b: 3,
            a: 4
        }
    );
}

#[test]
fn measures_with_estimate_when_no_font_is_configured() {
    let mut engine = TextLayoutEngine::new(Arc::new(RenderAssets::default()));
    assert!(!engine.has_font(FontRole::Subtitle));
    let w = engine.width(FontRole::Subtitle, "abcd", 20.0);
    assert!((w - 4.0 * 0.55 * 20.0).abs() < 1e-9);
}

#[test]
fn shaping_without_a_font_is_a_render_error() {
    let mut engine = TextLayoutEngine::new(Arc::new(RenderAssets::default()));
    let err = engine
        .layout_line(FontRole::Caption, "x", 12.0, TextBrushRgba8::default())
        .err()
        .expect("expected layout_line to fail");
    assert!(matches!(err, AudiogramError::Render(_)));
}

#[test]
fn garbage_font_bytes_fall_back_to_estimate() {
    let mut engine =
        TextLayoutEngine::new(Arc::new(RenderAssets::with_font(b"not a font".to_vec())));
    let w = engine.width(FontRole::Caption, "ab", 10.0);
    assert!((w - 2.0 * 0.55 * 10.0).abs() < 1e-9);
}
