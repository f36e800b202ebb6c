//! Layout Engine: turns one frame's inputs into a [`DisplayList`].
//!
//! Layout is a pure function of the job's [`FrameScene`], the frame's waveform points and the
//! frame timestamp. Text measurement is injected through [`TextMeasure`] so the rasterizer's
//! font engine decides line breaks.

/// Draw instruction types.
pub mod display_list;
/// Caption placement.
pub mod captions;
/// Word wrapping and font fitting.
pub mod text;
/// Waveform geometry.
pub mod waveform;

use crate::audio::waveform::WaveformPoint;
use crate::foundation::error::AudiogramResult;
use crate::scene::captions::CaptionSource;
use crate::scene::formatting::FormattingOverrides;
use crate::scene::submission::JobSubmission;
use crate::scene::theme::Theme;
use crate::scene::waveform::{WaveformConfig, WaveformPositioning};

pub use display_list::{DisplayList, DrawOp, FontRole};
pub use text::{ApproxTextMeasure, TextMeasure};

/// Everything about a job that stays fixed across its frames.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameScene {
    pub theme: Theme,
    pub captions: CaptionSource,
    pub formatting: FormattingOverrides,
    pub positioning: WaveformPositioning,
    pub waveform: WaveformConfig,
    /// Outline caption zones (preview/debug aid).
    pub show_zone_boundaries: bool,
}

impl FrameScene {
    pub fn from_submission(sub: &JobSubmission) -> AudiogramResult<Self> {
        sub.validate()?;
        Ok(Self {
            theme: sub.theme.clone(),
            captions: sub.caption_source(),
            formatting: sub.formatting(),
            positioning: sub.waveform_positioning(),
            waveform: sub.waveform_config(),
            show_zone_boundaries: false,
        })
    }
}

/// Display list for the frame at `t` seconds.
///
/// Paint order: background color, background image, waveform, zone overlay, captions.
pub fn layout_frame(
    scene: &FrameScene,
    points: &[WaveformPoint],
    t: f64,
    measure: &mut dyn TextMeasure,
) -> DisplayList {
    let theme = &scene.theme;
    let canvas = theme.canvas();
    let mut list = DisplayList::new(canvas);

    list.push(DrawOp::Clear {
        color: theme.background_color,
    });
    if theme.background_image.is_some() {
        list.push(DrawOp::BackgroundImage);
    }
    list.extend(waveform::waveform_ops(
        points,
        canvas,
        &scene.positioning,
        &scene.waveform,
        theme.wave_color(),
    ));
    if scene.show_zone_boundaries {
        list.extend(captions::zone_boundary_ops(theme));
    }

    match &scene.captions {
        CaptionSource::None => {}
        CaptionSource::Static(text) => {
            list.extend(captions::static_caption_ops(theme, text, measure));
        }
        CaptionSource::Timed(timed) => {
            list.extend(captions::timed_caption_ops(
                theme,
                timed,
                &scene.formatting,
                t,
                measure,
            ));
        }
    }
    list
}

#[cfg(test)]
#[path = "../../tests/unit/layout/mod.rs"]
mod tests;
