use super::*;

/// 10px per character regardless of size, to keep expectations obvious.
struct Fixed;

impl TextMeasure for Fixed {
    fn width(&mut self, _font: FontRole, text: &str, _size_px: f32) -> f64 {
        text.chars().count() as f64 * 10.0
    }
}

#[test]
fn wraps_greedily_at_word_boundaries() {
    let lines = wrap_words(&mut Fixed, FontRole::Caption, "aa bb cc dd", 42.0, 50.0);
    assert_eq!(lines, vec!["aa bb", "cc dd"]);
}

#[test]
fn newline_forces_a_break_and_long_words_stand_alone() {
    let lines = wrap_words(
        &mut Fixed,
        FontRole::Caption,
        "a\nsupercalifragilistic b",
        42.0,
        50.0,
    );
    assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
}

#[test]
fn collapses_whitespace_runs() {
    let lines = wrap_words(&mut Fixed, FontRole::Caption, "  a    b  ", 42.0, 500.0);
    assert_eq!(lines, vec!["a b"]);
    assert!(wrap_words(&mut Fixed, FontRole::Caption, "   ", 42.0, 500.0).is_empty());
}

#[test]
fn fit_shrinks_until_text_fits() {
    let mut m = ApproxTextMeasure { em_ratio: 0.5 };
    let text = "the quick brown fox jumps over the lazy dog again and again";
    let fitted = fit_font_size(
        &mut m,
        FontRole::Subtitle,
        text,
        400.0,
        80.0,
        16.0,
        48.0,
        2.0,
        1.2,
    );
    assert!(fitted.size < 48.0);
    assert!(fitted.size >= 16.0);
    let h = fitted.lines.len() as f64 * f64::from(fitted.size * 1.2);
    assert!(h <= 80.0, "height {h} at size {}", fitted.size);
}

#[test]
fn fit_keeps_max_when_text_already_fits() {
    let mut m = ApproxTextMeasure::default();
    let fitted = fit_font_size(&mut m, FontRole::Subtitle, "hi", 400.0, 100.0, 16.0, 48.0, 2.0, 1.2);
    assert_eq!(fitted.size, 48.0);
    assert_eq!(fitted.lines, vec!["hi"]);
}

#[test]
fn fit_never_goes_below_min() {
    let mut m = ApproxTextMeasure::default();
    let text = "word ".repeat(200);
    let fitted = fit_font_size(&mut m, FontRole::Subtitle, &text, 100.0, 20.0, 16.0, 48.0, 5.0, 1.2);
    assert_eq!(fitted.size, 16.0);
}

#[test]
fn fit_terminates_with_a_step_below_float_precision() {
    let mut m = ApproxTextMeasure::default();
    let text = "word ".repeat(200);
    let fitted = fit_font_size(&mut m, FontRole::Subtitle, &text, 100.0, 20.0, 16.0, 48.0, 1e-6, 1.2);
    assert_eq!(fitted.size, 16.0);

    let fitted = fit_font_size(&mut m, FontRole::Subtitle, "hi", 400.0, 100.0, 16.0, 48.0, 0.0, 1.2);
    assert_eq!(fitted.size, 48.0);
}

#[test]
fn fit_visits_sizes_on_the_step_grid() {
    // 10px per char: "abcd" is 40px wide, so only sizes with one 1.0x line of <= 30px fit.
    let fitted = fit_font_size(&mut Fixed, FontRole::Subtitle, "abcd", 100.0, 30.0, 10.0, 47.0, 3.0, 1.0);
    assert_eq!(fitted.size, 29.0);
    assert_eq!(fitted.lines, vec!["abcd"]);
}
