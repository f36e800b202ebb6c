use crate::foundation::color::Rgba8;
use crate::foundation::error::{AudiogramError, AudiogramResult};

/// Waveform box, centered on `(x, y)`. All values are percent of the canvas.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaveformPositioning {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for WaveformPositioning {
    fn default() -> Self {
        Self {
            x: 50.0,
            y: 50.0,
            width: 80.0,
            height: 20.0,
        }
    }
}

impl WaveformPositioning {
    pub fn validate(&self) -> AudiogramResult<()> {
        let vals = [self.x, self.y, self.width, self.height];
        if vals.iter().any(|v| !v.is_finite()) || self.width < 0.0 || self.height < 0.0 {
            return Err(AudiogramError::validation(
                "waveformPositioning values must be finite and width/height non-negative",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveformStyle {
    #[default]
    Bars,
    Line,
    Area,
    Dots,
    Wave,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaveformConfig {
    #[serde(rename = "type")]
    pub style: WaveformStyle,
    /// Overrides the theme waveform color.
    pub color: Option<Rgba8>,
    /// Top outline of the `area` style.
    pub color_secondary: Rgba8,
    /// Gap between bars in pixels.
    pub spacing: f64,
    pub line_width: f64,
    pub dot_size: f64,
    /// Moving-average strength, `0..=100`.
    pub smoothing: f64,
    pub background_color: Rgba8,
    /// `0..=100`; zero disables the backdrop.
    pub background_opacity: f64,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            style: WaveformStyle::Bars,
            color: None,
            color_secondary: Rgba8::rgb(0xcc, 0xcc, 0xcc),
            spacing: 1.0,
            line_width: 2.0,
            dot_size: 3.0,
            smoothing: 0.0,
            background_color: Rgba8::BLACK,
            background_opacity: 0.0,
        }
    }
}

impl WaveformConfig {
    pub fn validate(&self) -> AudiogramResult<()> {
        let non_neg = |v: f64| v.is_finite() && v >= 0.0;
        if !non_neg(self.spacing)
            || !non_neg(self.line_width)
            || !non_neg(self.dot_size)
            || !non_neg(self.smoothing)
            || !non_neg(self.background_opacity)
        {
            return Err(AudiogramError::validation(
                "waveformConfig numeric values must be finite and non-negative",
            ));
        }
        if self.smoothing > 100.0 || self.background_opacity > 100.0 {
            return Err(AudiogramError::validation(
                "waveformConfig smoothing and backgroundOpacity must be in 0..=100",
            ));
        }
        Ok(())
    }

    /// Moving-average radius in points: `ceil(smoothing / 100 * 5)`.
    pub fn smoothing_radius(&self) -> usize {
        if self.smoothing <= 0.0 {
            0
        } else {
            (self.smoothing * 5.0 / 100.0).ceil() as usize
        }
    }
}
