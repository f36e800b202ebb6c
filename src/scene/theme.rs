use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::foundation::color::Rgba8;
use crate::foundation::core::Canvas;
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::scene::waveform::{WaveformConfig, WaveformPositioning};

/// Smallest accepted `captionDefaults.fontSizeStep`, in px.
pub const MIN_FONT_SIZE_STEP: f32 = 0.5;

/// Horizontal alignment of static caption lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Named canvas rectangle reserved for timed captions. Geometry is in percent of the canvas.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionZone {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Stacked caption slots in this zone.
    pub max_speakers: usize,
    /// Vertical gap between slots in pixels.
    pub spacing: f64,
    /// Speaker labels preferentially routed to this zone.
    pub speakers: Vec<String>,
}

impl Default for CaptionZone {
    fn default() -> Self {
        Self {
            x: 5.0,
            y: 75.0,
            width: 90.0,
            height: 20.0,
            max_speakers: 1,
            spacing: 5.0,
            speakers: Vec::new(),
        }
    }
}

/// Zone-mode caption defaults and font-fitting constants.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionDefaults {
    pub color: Option<Rgba8>,
    pub background_color: Rgba8,
    /// `0..=100`.
    pub background_opacity: f64,
    pub padding: f64,
    pub max_font_size: f32,
    pub min_font_size: f32,
    /// Decrement applied while shrinking text to fit its slot.
    pub font_size_step: f32,
    /// Line height as a multiple of the font size.
    pub line_spacing: f32,
    pub stroke_width: f32,
    pub stroke_color: Rgba8,
}

impl Default for CaptionDefaults {
    fn default() -> Self {
        Self {
            color: None,
            background_color: Rgba8::TRANSPARENT,
            background_opacity: 0.0,
            padding: 8.0,
            max_font_size: 48.0,
            min_font_size: 16.0,
            font_size_step: 2.0,
            line_spacing: 1.2,
            stroke_width: 0.0,
            stroke_color: Rgba8::BLACK,
        }
    }
}

/// Visual configuration for one job. Resolved once, read-only while rendering.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    pub width: u32,
    pub height: u32,
    pub frames_per_second: Option<u32>,
    pub samples_per_frame: Option<usize>,

    pub background_color: Rgba8,
    /// PNG/JPEG/SVG stretched over the canvas.
    pub background_image: Option<PathBuf>,
    pub foreground_color: Option<Rgba8>,

    pub wave_color: Option<Rgba8>,
    pub waveform_color: Option<Rgba8>,
    /// Defaults for jobs that do not send their own positioning/config.
    pub waveform_positioning: WaveformPositioning,
    pub waveform_config: WaveformConfig,

    /// Font file used for static captions.
    pub caption_font: Option<PathBuf>,
    pub caption_color: Option<Rgba8>,
    pub caption_font_size: f32,
    pub caption_line_height: f32,
    pub caption_line_spacing: f32,
    pub caption_left: f64,
    pub caption_right: f64,
    pub caption_top: Option<f64>,
    pub caption_bottom: f64,
    pub caption_align: TextAlign,

    /// Font file used for timed captions; falls back to `caption_font`.
    pub subtitle_font: Option<PathBuf>,
    pub subtitle_color: Rgba8,
    pub subtitle_font_size: f32,
    pub subtitle_background_color: Rgba8,
    /// `0..=100`.
    pub subtitle_background_opacity: f64,
    pub subtitle_padding: f64,
    /// Wrap width of zone-less timed captions, in percent of the canvas width.
    pub subtitle_max_width: f64,

    pub caption_zones: BTreeMap<String, CaptionZone>,
    pub caption_defaults: CaptionDefaults,
    pub speaker_colors: BTreeMap<String, Rgba8>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frames_per_second: None,
            samples_per_frame: None,
            background_color: Rgba8::WHITE,
            background_image: None,
            foreground_color: None,
            wave_color: None,
            waveform_color: None,
            waveform_positioning: WaveformPositioning::default(),
            waveform_config: WaveformConfig::default(),
            caption_font: None,
            caption_color: None,
            caption_font_size: 42.0,
            caption_line_height: 42.0,
            caption_line_spacing: 5.0,
            caption_left: 100.0,
            caption_right: 1180.0,
            caption_top: None,
            caption_bottom: 680.0,
            caption_align: TextAlign::Left,
            subtitle_font: None,
            subtitle_color: Rgba8::WHITE,
            subtitle_font_size: 42.0,
            subtitle_background_color: Rgba8::BLACK,
            subtitle_background_opacity: 70.0,
            subtitle_padding: 10.0,
            subtitle_max_width: 90.0,
            caption_zones: BTreeMap::new(),
            caption_defaults: CaptionDefaults::default(),
            speaker_colors: BTreeMap::new(),
        }
    }
}

impl Theme {
    /// Parse a theme from a JSON object.
    pub fn from_json_str(s: &str) -> AudiogramResult<Self> {
        serde_json::from_str(s).map_err(|e| AudiogramError::validation(format!("theme: {e}")))
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Waveform color: `waveformColor`, then `waveColor`, then `foregroundColor`.
    pub fn wave_color(&self) -> Rgba8 {
        self.waveform_color
            .or(self.wave_color)
            .or(self.foreground_color)
            .unwrap_or(Rgba8::WHITE)
    }

    pub fn static_caption_color(&self) -> Rgba8 {
        self.caption_color
            .or(self.foreground_color)
            .unwrap_or(Rgba8::BLACK)
    }

    pub fn subtitle_font_path(&self) -> Option<&Path> {
        self.subtitle_font
            .as_deref()
            .or(self.caption_font.as_deref())
    }

    /// Theme speaker color for a caption: exact key match on the label or display name first,
    /// then the first key contained in the display name.
    pub fn speaker_color(&self, label: Option<&str>, display_name: Option<&str>) -> Option<Rgba8> {
        for key in [label, display_name].into_iter().flatten() {
            if let Some(c) = self.speaker_colors.get(key) {
                return Some(*c);
            }
        }
        let name = display_name?;
        self.speaker_colors
            .iter()
            .find(|(k, _)| !k.is_empty() && name.contains(k.as_str()))
            .map(|(_, c)| *c)
    }

    /// Resolve relative asset paths against `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        for p in [
            &mut self.background_image,
            &mut self.caption_font,
            &mut self.subtitle_font,
        ]
        .into_iter()
        .flatten()
        {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        }
    }

    pub fn validate(&self) -> AudiogramResult<()> {
        self.canvas().validate()?;
        if self.frames_per_second == Some(0) {
            return Err(AudiogramError::validation("theme framesPerSecond must be > 0"));
        }
        if self.samples_per_frame == Some(0) {
            return Err(AudiogramError::validation("theme samplesPerFrame must be > 0"));
        }
        if self.caption_left >= self.caption_right {
            return Err(AudiogramError::validation(
                "theme captionLeft must be less than captionRight",
            ));
        }
        if !positive(self.caption_line_height) || !positive(self.caption_font_size) {
            return Err(AudiogramError::validation(
                "theme caption font size and line height must be > 0",
            ));
        }
        if !positive(self.subtitle_font_size) {
            return Err(AudiogramError::validation("theme subtitleFontSize must be > 0"));
        }

        let d = &self.caption_defaults;
        if !positive(d.min_font_size) || d.min_font_size > d.max_font_size {
            return Err(AudiogramError::validation(
                "captionDefaults requires 0 < minFontSize <= maxFontSize",
            ));
        }
        if !positive(d.line_spacing) {
            return Err(AudiogramError::validation(
                "captionDefaults lineSpacing must be > 0",
            ));
        }
        if !(d.font_size_step.is_finite() && d.font_size_step >= MIN_FONT_SIZE_STEP) {
            return Err(AudiogramError::validation(format!(
                "captionDefaults fontSizeStep must be >= {MIN_FONT_SIZE_STEP}"
            )));
        }

        for (name, z) in &self.caption_zones {
            let in_pct = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
            if !in_pct(z.x) || !in_pct(z.y) || !in_pct(z.width) || !in_pct(z.height) {
                return Err(AudiogramError::validation(format!(
                    "caption zone '{name}' geometry must be percentages in 0..=100"
                )));
            }
            if z.width <= 0.0 || z.height <= 0.0 {
                return Err(AudiogramError::validation(format!(
                    "caption zone '{name}' must have a non-zero size"
                )));
            }
            if z.max_speakers == 0 {
                return Err(AudiogramError::validation(format!(
                    "caption zone '{name}' maxSpeakers must be >= 1"
                )));
            }
        }

        self.waveform_positioning.validate()?;
        self.waveform_config.validate()?;
        Ok(())
    }
}

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

#[cfg(test)]
#[path = "../../tests/unit/scene/theme.rs"]
mod tests;
