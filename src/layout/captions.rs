//! Caption placement.
//!
//! Static captions are a single wrapped block inside the theme caption box. Timed captions are
//! laid out per active segment, either into named caption zones (stacked slots, font fitted to
//! the slot) or, when the theme has no zones, centered at the resolved percentage position.

use std::collections::BTreeMap;

use crate::foundation::color::Rgba8;
use crate::foundation::core::{BezPath, Canvas, Point, Rect};
use crate::layout::display_list::{
    DrawOp, FontRole, PathPaint, TextBlock, TextLine, TextSpan, TextStroke,
};
use crate::layout::text::{TextMeasure, fit_font_size, wrap_words};
use crate::scene::captions::{TimedCaptions, active_segments};
use crate::scene::formatting::{
    CaptionLayoutMode, FontSize, FormattingOverrides, ResolvedFormatting,
};
use crate::scene::theme::{CaptionZone, TextAlign, Theme};

const NAME_LINE_GAP: f64 = 5.0;
const OVERLAY_COLOR: Rgba8 = Rgba8::rgb(0, 255, 0);
const OVERLAY_STROKE: f64 = 2.0;
const OVERLAY_DASH: f64 = 5.0;
const OVERLAY_LABEL_SIZE: f32 = 12.0;

/// The theme's static caption, wrapped to `captionLeft..captionRight`.
pub fn static_caption_ops(theme: &Theme, text: &str, measure: &mut dyn TextMeasure) -> Option<DrawOp> {
    let size = theme.caption_font_size;
    let box_w = theme.caption_right - theme.caption_left;
    let lines = wrap_words(measure, FontRole::Caption, text, size, box_w);
    if lines.is_empty() {
        return None;
    }

    let line_h = f64::from(theme.caption_line_height);
    let step = line_h + f64::from(theme.caption_line_spacing);
    let total = lines.len() as f64 * line_h + (lines.len() - 1) as f64 * f64::from(theme.caption_line_spacing);
    let top = theme.caption_top.unwrap_or(theme.caption_bottom - total);
    let color = theme.static_caption_color();

    let lines = lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let w = measure.width(FontRole::Caption, &line, size);
            let x = match theme.caption_align {
                TextAlign::Left => theme.caption_left,
                TextAlign::Center => theme.caption_left + (box_w - w) / 2.0,
                TextAlign::Right => theme.caption_right - w,
            };
            TextLine {
                top: top + i as f64 * step,
                height: line_h,
                spans: vec![TextSpan { text: line, color, x }],
            }
        })
        .collect();

    Some(DrawOp::Text(TextBlock {
        font: FontRole::Caption,
        size,
        lines,
        stroke: None,
    }))
}

/// Where one caption lands inside the zone layout.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneSlot<'a> {
    pub zone_name: &'a str,
    pub zone: &'a CaptionZone,
    /// 0-based slot from the top of the zone.
    pub slot: usize,
    /// Slot count the zone is divided into for this frame.
    pub slots: usize,
}

/// Assign captions (given by speaker label, in input order) to zones.
///
/// Each caption goes to the first zone listing its speaker that still has a free slot, else the
/// first zone (by name) with a free slot, else the least-loaded zone. An overfull zone grows its
/// slot count so nothing is dropped.
pub fn assign_zones<'a>(
    zones: &'a BTreeMap<String, CaptionZone>,
    speakers: &[Option<&str>],
) -> Vec<ZoneSlot<'a>> {
    let entries: Vec<(&'a String, &'a CaptionZone)> = zones.iter().collect();
    if entries.is_empty() {
        return Vec::new();
    }
    let mut load = vec![0usize; entries.len()];
    let mut picks = Vec::with_capacity(speakers.len());

    for speaker in speakers {
        let has_room = |i: usize| load[i] < entries[i].1.max_speakers;
        let preferred = speaker.and_then(|s| {
            (0..entries.len()).find(|&i| has_room(i) && entries[i].1.speakers.iter().any(|z| z == s))
        });
        let idx = preferred
            .or_else(|| (0..entries.len()).find(|&i| has_room(i)))
            .unwrap_or_else(|| {
                (0..entries.len())
                    .min_by_key(|&i| load[i])
                    .unwrap_or(0)
            });
        picks.push((idx, load[idx]));
        load[idx] += 1;
    }

    picks
        .into_iter()
        .map(|(idx, slot)| {
            let (name, zone) = entries[idx];
            ZoneSlot {
                zone_name: name.as_str(),
                zone,
                slot,
                slots: zone.max_speakers.max(load[idx]).max(1),
            }
        })
        .collect()
}

/// Pixel rectangle of `slot` inside its zone. Slots share the zone height equally, separated by
/// the zone spacing.
pub fn slot_rect(canvas: Canvas, zone: &CaptionZone, slot: usize, slots: usize) -> Rect {
    let x = canvas.pct_x(zone.x);
    let y = canvas.pct_y(zone.y);
    let w = canvas.pct_x(zone.width);
    let h = canvas.pct_y(zone.height);
    let slots = slots.max(1);
    let seg_h = ((h - zone.spacing * (slots - 1) as f64) / slots as f64).max(0.0);
    let top = y + slot as f64 * (seg_h + zone.spacing);
    Rect::new(x, top, x + w, top + seg_h)
}

/// Ops for every timed caption active at `t`.
pub fn timed_caption_ops(
    theme: &Theme,
    captions: &TimedCaptions,
    overrides: &FormattingOverrides,
    t: f64,
    measure: &mut dyn TextMeasure,
) -> Vec<DrawOp> {
    let active = active_segments(&captions.segments, t);
    if active.is_empty() {
        return Vec::new();
    }
    let canvas = theme.canvas();
    let mode = if theme.caption_zones.is_empty() {
        CaptionLayoutMode::Free
    } else {
        CaptionLayoutMode::Zone
    };

    let prepared: Vec<PreparedCaption> = active
        .iter()
        .map(|seg| {
            let label = seg.speaker.as_deref();
            let display_name = label.map(|l| captions.display_name(l));
            PreparedCaption {
                text: captions.display_text(seg),
                prefixed: captions.speaker_recognition && label.is_some(),
                fmt: overrides.resolve(theme, label, display_name, mode),
            }
        })
        .collect();

    let mut ops = Vec::new();
    match mode {
        CaptionLayoutMode::Zone => {
            let speakers: Vec<Option<&str>> = active.iter().map(|s| s.speaker.as_deref()).collect();
            let slots = assign_zones(&theme.caption_zones, &speakers);
            for (cap, slot) in prepared.iter().zip(slots) {
                let rect = slot_rect(canvas, slot.zone, slot.slot, slot.slots);
                ops.extend(zone_caption_ops(theme, cap, rect, measure));
            }
        }
        CaptionLayoutMode::Free => {
            for cap in &prepared {
                ops.extend(free_caption_ops(theme, cap, measure));
            }
        }
    }
    ops
}

struct PreparedCaption {
    text: String,
    prefixed: bool,
    fmt: ResolvedFormatting,
}

impl PreparedCaption {
    fn name_split(&self) -> Option<(Rgba8, usize)> {
        if !self.prefixed {
            return None;
        }
        let color = self.fmt.name_color?;
        speaker_prefix_len(&self.text).map(|n| (color, n))
    }

    fn stroke(&self) -> Option<TextStroke> {
        (self.fmt.stroke_width > 0.0).then(|| TextStroke {
            color: self.fmt.stroke_color,
            width: self.fmt.stroke_width * 2.0,
        })
    }
}

/// Byte length of a leading `"Name: "` prefix, including the trailing whitespace.
pub fn speaker_prefix_len(text: &str) -> Option<usize> {
    let colon = text.find(':')?;
    if colon == 0 {
        return None;
    }
    let rest = &text[colon + 1..];
    let body = rest.trim_start();
    Some(colon + 1 + (rest.len() - body.len()))
}

fn zone_caption_ops(
    theme: &Theme,
    cap: &PreparedCaption,
    rect: Rect,
    measure: &mut dyn TextMeasure,
) -> Vec<DrawOp> {
    let d = &theme.caption_defaults;
    let pad = cap.fmt.padding;
    let ceiling = match cap.fmt.font_size {
        FontSize::Auto => d.max_font_size,
        FontSize::Px(v) => v.min(d.max_font_size),
    };
    let floor = d.min_font_size.min(ceiling);
    let fitted = fit_font_size(
        measure,
        FontRole::Subtitle,
        &cap.text,
        rect.width() - 2.0 * pad,
        rect.height() - 2.0 * pad,
        floor,
        ceiling,
        d.font_size_step,
        d.line_spacing,
    );

    let mut ops = Vec::new();
    if !cap.fmt.background.is_transparent() {
        ops.push(DrawOp::Rect {
            rect: Rect::new(rect.x0 + pad, rect.y0 + pad, rect.x1 - pad, rect.y1 - pad),
            color: cap.fmt.background,
        });
    }
    if fitted.lines.is_empty() {
        return ops;
    }

    let line_h = f64::from(fitted.size * d.line_spacing);
    let top = rect.center().y - fitted.lines.len() as f64 * line_h / 2.0;
    // The name may wrap across lines; it is colored word by word.
    let mut name_words = cap
        .name_split()
        .map(|(color, n)| (color, cap.text[..n].split_whitespace().count()));
    let lines = fitted
        .lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let split = name_words.as_mut().and_then(|(color, left)| {
                if *left == 0 {
                    return None;
                }
                let (bytes, taken) = leading_words_len(&line, *left);
                *left -= taken;
                Some((*color, bytes))
            });
            centered_line(
                measure,
                line,
                fitted.size,
                rect.center().x,
                top + i as f64 * line_h,
                line_h,
                cap.fmt.color,
                split,
            )
        })
        .collect();

    ops.push(DrawOp::Text(TextBlock {
        font: FontRole::Subtitle,
        size: fitted.size,
        lines,
        stroke: cap.stroke(),
    }));
    ops
}

fn free_caption_ops(theme: &Theme, cap: &PreparedCaption, measure: &mut dyn TextMeasure) -> Vec<DrawOp> {
    let canvas = theme.canvas();
    let size = match cap.fmt.font_size {
        FontSize::Px(v) => v,
        FontSize::Auto => theme.subtitle_font_size,
    };
    let cx = canvas.pct_x(cap.fmt.x_pct);
    let cy = canvas.pct_y(cap.fmt.y_pct);
    let max_w = canvas.pct_x(theme.subtitle_max_width);

    let (name, body) = match cap.name_split() {
        Some((color, n)) => (Some((color, cap.text[..n].trim_end())), &cap.text[n..]),
        None => (None, cap.text.as_str()),
    };
    let body_lines = wrap_words(measure, FontRole::Subtitle, body, size, max_w);
    if body_lines.is_empty() && name.is_none() {
        return Vec::new();
    }

    let line_h = f64::from(size * theme.caption_defaults.line_spacing);
    let block_h = body_lines.len() as f64 * line_h;
    let top = cy - block_h / 2.0;

    let mut lines = Vec::with_capacity(body_lines.len() + 1);
    if let Some((color, name)) = name {
        lines.push(centered_line(
            measure,
            name.to_owned(),
            size,
            cx,
            top - NAME_LINE_GAP - line_h,
            line_h,
            color,
            None,
        ));
    }
    let mut widest = 0.0f64;
    for (i, line) in body_lines.into_iter().enumerate() {
        widest = widest.max(measure.width(FontRole::Subtitle, &line, size));
        lines.push(centered_line(
            measure,
            line,
            size,
            cx,
            top + i as f64 * line_h,
            line_h,
            cap.fmt.color,
            None,
        ));
    }

    let mut ops = Vec::new();
    let pad = cap.fmt.padding;
    if !cap.fmt.background.is_transparent() && block_h > 0.0 {
        ops.push(DrawOp::Rect {
            rect: Rect::new(
                cx - widest / 2.0 - pad,
                top - pad,
                cx + widest / 2.0 + pad,
                top + block_h + pad,
            ),
            color: cap.fmt.background,
        });
    }
    ops.push(DrawOp::Text(TextBlock {
        font: FontRole::Subtitle,
        size,
        lines,
        stroke: cap.stroke(),
    }));
    ops
}

/// Byte length of the first `words` words of a wrapped line, with their trailing space, and how
/// many words that covered.
fn leading_words_len(line: &str, words: usize) -> (usize, usize) {
    let mut len = 0;
    let mut taken = 0;
    for word in line.split(' ').filter(|w| !w.is_empty()).take(words) {
        len = line[len..].find(word).map_or(len, |at| len + at) + word.len();
        taken += 1;
    }
    let rest = &line[len..];
    (len + (rest.len() - rest.trim_start().len()), taken)
}

/// A line centered on `cx`. With `split`, the first `split.1` bytes are drawn in `split.0`; a
/// split covering the whole line draws it entirely in `split.0`.
#[allow(clippy::too_many_arguments)]
fn centered_line(
    measure: &mut dyn TextMeasure,
    text: String,
    size: f32,
    cx: f64,
    top: f64,
    height: f64,
    color: Rgba8,
    split: Option<(Rgba8, usize)>,
) -> TextLine {
    let w = measure.width(FontRole::Subtitle, &text, size);
    let x0 = cx - w / 2.0;
    let spans = match split {
        Some((name_color, n)) if n >= text.len() => vec![TextSpan {
            text,
            color: name_color,
            x: x0,
        }],
        Some((name_color, n)) if n < text.len() && text.is_char_boundary(n) => {
            let (name, body) = text.split_at(n);
            let body_x = x0 + measure.width(FontRole::Subtitle, name, size);
            vec![
                TextSpan {
                    text: name.to_owned(),
                    color: name_color,
                    x: x0,
                },
                TextSpan {
                    text: body.to_owned(),
                    color,
                    x: body_x,
                },
            ]
        }
        _ => vec![TextSpan { text, color, x: x0 }],
    };
    TextLine { top, height, spans }
}

/// Debug overlay: dashed outline and name/capacity label for every caption zone.
pub fn zone_boundary_ops(theme: &Theme) -> Vec<DrawOp> {
    let canvas = theme.canvas();
    let mut ops = Vec::new();
    for (name, zone) in &theme.caption_zones {
        let rect = slot_rect(canvas, zone, 0, 1);
        ops.push(DrawOp::Path {
            path: dashed_rect(rect, OVERLAY_DASH),
            paint: PathPaint::Stroke {
                color: OVERLAY_COLOR,
                width: OVERLAY_STROKE,
            },
        });
        let label = |text: String, top: f64| TextLine {
            top,
            height: f64::from(OVERLAY_LABEL_SIZE) * 1.2,
            spans: vec![TextSpan {
                text,
                color: OVERLAY_COLOR,
                x: rect.x0 + 5.0,
            }],
        };
        ops.push(DrawOp::Text(TextBlock {
            font: FontRole::Caption,
            size: OVERLAY_LABEL_SIZE,
            lines: vec![
                label(name.clone(), rect.y0 + 5.0),
                label(format!("Max: {} speakers", zone.max_speakers), rect.y0 + 20.0),
            ],
            stroke: None,
        }));
    }
    ops
}

fn dashed_rect(rect: Rect, dash: f64) -> BezPath {
    let corners = [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ];
    let mut path = BezPath::new();
    for i in 0..4 {
        let (a, b) = (corners[i], corners[(i + 1) % 4]);
        let len = a.distance(b);
        let mut d = 0.0;
        while d < len {
            let end = (d + dash).min(len);
            path.move_to(a.lerp(b, d / len));
            path.line_to(a.lerp(b, end / len));
            d += 2.0 * dash;
        }
    }
    path
}

#[cfg(test)]
#[path = "../../tests/unit/layout/captions.rs"]
mod tests;
