use crate::layout::display_list::FontRole;
use crate::scene::theme::MIN_FONT_SIZE_STEP;

/// Measures rendered text width. The rasterizer's text engine implements this so that layout
/// decisions (wrapping, centering, font fitting) match the glyphs that are eventually drawn.
pub trait TextMeasure {
    fn width(&mut self, font: FontRole, text: &str, size_px: f32) -> f64;
}

/// Font-independent estimate: every character advances `em_ratio * size`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ApproxTextMeasure {
    pub em_ratio: f64,
}

impl Default for ApproxTextMeasure {
    fn default() -> Self {
        Self { em_ratio: 0.55 }
    }
}

impl TextMeasure for ApproxTextMeasure {
    fn width(&mut self, _font: FontRole, text: &str, size_px: f32) -> f64 {
        text.chars().count() as f64 * self.em_ratio * f64::from(size_px)
    }
}

/// Greedy word wrap. Explicit `\n` always breaks; a single word wider than `max_width` gets a
/// line of its own.
pub fn wrap_words(
    measure: &mut dyn TextMeasure,
    font: FontRole,
    text: &str,
    size_px: f32,
    max_width: f64,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measure.width(font, &candidate, size_px) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_owned()));
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Outcome of shrinking text into a box.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedText {
    pub size: f32,
    pub lines: Vec<String>,
}

/// Largest size from `max` down to `min` in `step` decrements whose wrapped text fits
/// `max_height` at `line_spacing * size` per line. Never goes below `min`; text that does not
/// fit at `min` is returned at `min`. Steps below [`MIN_FONT_SIZE_STEP`] are raised to it.
#[allow(clippy::too_many_arguments)]
pub fn fit_font_size(
    measure: &mut dyn TextMeasure,
    font: FontRole,
    text: &str,
    max_width: f64,
    max_height: f64,
    min: f32,
    max: f32,
    step: f32,
    line_spacing: f32,
) -> FittedText {
    let fits = |lines: &[String], size: f32| {
        lines.len() as f64 * f64::from(size * line_spacing) <= max_height
    };
    // Sizes come from an integer step count; `size - step` can equal `size` for tiny steps.
    let step = if step.is_finite() {
        step.max(MIN_FONT_SIZE_STEP)
    } else {
        MIN_FONT_SIZE_STEP
    };
    let steps = if max > min {
        ((max - min) / step).floor() as u32
    } else {
        0
    };
    for i in 0..=steps {
        let size = (max - i as f32 * step).max(min);
        let lines = wrap_words(measure, font, text, size, max_width);
        if fits(&lines, size) {
            return FittedText { size, lines };
        }
    }
    let lines = wrap_words(measure, font, text, min, max_width);
    FittedText { size: min, lines }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/text.rs"]
mod tests;
