//! Caption formatting overrides and their resolution.
//!
//! Formatting is layered, lowest to highest precedence:
//!
//! 1. built-in defaults
//! 2. theme subtitle defaults (`subtitle*` fields)
//! 3. theme `captionDefaults` (zone layout only)
//! 4. job-level global overrides
//! 5. job-level per-speaker overrides
//!
//! [`FormattingOverrides::resolve`] flattens the chain into one [`ResolvedFormatting`] per
//! caption before any drawing happens.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::foundation::color::Rgba8;
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::scene::theme::Theme;

/// Caption font size: explicit pixels or fitted to the available box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FontSize {
    Px(f32),
    Auto,
}

impl Serialize for FontSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Px(v) => serializer.serialize_f32(*v),
            Self::Auto => serializer.serialize_str("auto"),
        }
    }
}

impl<'de> Deserialize<'de> for FontSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(f32),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(v) => Ok(Self::Px(v)),
            Repr::Text(s) if s.eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            Repr::Text(s) => s
                .trim()
                .trim_end_matches("px")
                .parse::<f32>()
                .map(Self::Px)
                .map_err(|_| serde::de::Error::custom(format!("invalid font size \"{s}\""))),
        }
    }
}

/// One level of caption formatting. Unset fields inherit from the level below.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionFormatting {
    /// Horizontal center in percent of the canvas (zone-less layout).
    pub x: Option<f64>,
    /// Vertical center in percent of the canvas (zone-less layout).
    pub y: Option<f64>,
    pub font_size: Option<FontSize>,
    pub color: Option<Rgba8>,
    /// Color of the `"Name:"` prefix.
    pub speaker_color: Option<Rgba8>,
    pub background_color: Option<Rgba8>,
    /// `0..=100`.
    pub background_opacity: Option<f64>,
    pub stroke_width: Option<f32>,
    pub stroke_color: Option<Rgba8>,
}

impl CaptionFormatting {
    pub fn validate(&self) -> AudiogramResult<()> {
        for (name, v) in [("x", self.x), ("y", self.y)] {
            if let Some(v) = v
                && !v.is_finite()
            {
                return Err(AudiogramError::validation(format!(
                    "caption formatting {name} must be finite"
                )));
            }
        }
        if let Some(FontSize::Px(v)) = self.font_size
            && (!v.is_finite() || v <= 0.0)
        {
            return Err(AudiogramError::validation(
                "caption formatting fontSize must be > 0 or \"auto\"",
            ));
        }
        if let Some(v) = self.background_opacity
            && (!v.is_finite() || !(0.0..=100.0).contains(&v))
        {
            return Err(AudiogramError::validation(
                "caption formatting backgroundOpacity must be in 0..=100",
            ));
        }
        if let Some(v) = self.stroke_width
            && (!v.is_finite() || v < 0.0)
        {
            return Err(AudiogramError::validation(
                "caption formatting strokeWidth must be >= 0",
            ));
        }
        Ok(())
    }
}

/// Job-level overrides: a global level plus per-speaker levels keyed by speaker label.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormattingOverrides {
    pub global: Option<CaptionFormatting>,
    pub speakers: BTreeMap<String, CaptionFormatting>,
}

/// Which caption layout the formatting is resolved for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptionLayoutMode {
    Zone,
    Free,
}

/// Flat formatting for one caption. Every field is decided.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedFormatting {
    pub x_pct: f64,
    pub y_pct: f64,
    pub font_size: FontSize,
    pub color: Rgba8,
    /// Distinct color for the speaker-name prefix, if any.
    pub name_color: Option<Rgba8>,
    /// Background with opacity already applied. Fully transparent means no box.
    pub background: Rgba8,
    pub padding: f64,
    pub stroke_width: f32,
    pub stroke_color: Rgba8,
}

struct Accum {
    x_pct: f64,
    y_pct: f64,
    font_size: FontSize,
    color: Rgba8,
    name_color: Option<Rgba8>,
    bg_color: Rgba8,
    bg_opacity: f64,
    padding: f64,
    stroke_width: f32,
    stroke_color: Rgba8,
}

impl Accum {
    fn apply(&mut self, f: &CaptionFormatting) {
        if let Some(v) = f.x {
            self.x_pct = v;
        }
        if let Some(v) = f.y {
            self.y_pct = v;
        }
        if let Some(v) = f.font_size {
            self.font_size = v;
        }
        if let Some(v) = f.color {
            self.color = v;
        }
        if let Some(v) = f.speaker_color {
            self.name_color = Some(v);
        }
        if let Some(v) = f.background_color {
            self.bg_color = v;
        }
        if let Some(v) = f.background_opacity {
            self.bg_opacity = v;
        }
        if let Some(v) = f.stroke_width {
            self.stroke_width = v;
        }
        if let Some(v) = f.stroke_color {
            self.stroke_color = v;
        }
    }
}

impl FormattingOverrides {
    pub fn validate(&self) -> AudiogramResult<()> {
        if let Some(g) = &self.global {
            g.validate()?;
        }
        for (speaker, f) in &self.speakers {
            f.validate().map_err(|e| {
                AudiogramError::validation(format!("formatting for speaker '{speaker}': {e}"))
            })?;
        }
        Ok(())
    }

    /// Flatten the override chain for one caption.
    ///
    /// `speaker` is the segment's speaker label; `display_name` is the name shown in the caption
    /// prefix (used for theme speaker-color matching).
    pub fn resolve(
        &self,
        theme: &Theme,
        speaker: Option<&str>,
        display_name: Option<&str>,
        mode: CaptionLayoutMode,
    ) -> ResolvedFormatting {
        let mut acc = Accum {
            x_pct: 50.0,
            y_pct: 85.0,
            font_size: FontSize::Px(42.0),
            color: Rgba8::WHITE,
            name_color: None,
            bg_color: Rgba8::BLACK,
            bg_opacity: 70.0,
            padding: 10.0,
            stroke_width: 0.0,
            stroke_color: Rgba8::BLACK,
        };

        acc.font_size = FontSize::Px(theme.subtitle_font_size);
        acc.color = theme.subtitle_color;
        acc.bg_color = theme.subtitle_background_color;
        acc.bg_opacity = theme.subtitle_background_opacity;
        acc.padding = theme.subtitle_padding;

        if mode == CaptionLayoutMode::Zone {
            let d = &theme.caption_defaults;
            if let Some(c) = d.color {
                acc.color = c;
            }
            acc.font_size = FontSize::Px(d.max_font_size);
            acc.bg_color = d.background_color;
            acc.bg_opacity = d.background_opacity;
            acc.padding = d.padding;
            acc.stroke_width = d.stroke_width;
            acc.stroke_color = d.stroke_color;
        }

        if let Some(g) = &self.global {
            acc.apply(g);
        }
        if let Some(s) = speaker.and_then(|s| self.speakers.get(s)) {
            acc.apply(s);
        }
        if acc.name_color.is_none() {
            acc.name_color = theme.speaker_color(speaker, display_name);
        }

        ResolvedFormatting {
            x_pct: acc.x_pct,
            y_pct: acc.y_pct,
            font_size: acc.font_size,
            color: acc.color,
            name_color: acc.name_color,
            background: acc.bg_color.with_opacity_pct(acc.bg_opacity),
            padding: acc.padding,
            stroke_width: acc.stroke_width,
            stroke_color: acc.stroke_color,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/formatting.rs"]
mod tests;
