use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::color::Rgba8;
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::layout::display_list::FontRole;
use crate::layout::text::{ApproxTextMeasure, TextMeasure};
use crate::render::assets::RenderAssets;

/// RGBA8 brush color carried through Parley layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Rgba8> for TextBrushRgba8 {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Parley shaping over the job's theme fonts.
///
/// One engine lives per render worker. Font bytes are registered once per role on first use.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    assets: Arc<RenderAssets>,
    families: HashMap<FontRole, String>,
    fallback: ApproxTextMeasure,
}

impl TextLayoutEngine {
    pub fn new(assets: Arc<RenderAssets>) -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            assets,
            families: HashMap::new(),
            fallback: ApproxTextMeasure::default(),
        }
    }

    pub fn has_font(&self, role: FontRole) -> bool {
        self.assets.font_bytes(role).is_some()
    }

    fn family_for(&mut self, role: FontRole) -> AudiogramResult<String> {
        if let Some(name) = self.families.get(&role) {
            return Ok(name.clone());
        }
        let bytes = self
            .assets
            .font_bytes(role)
            .ok_or_else(|| AudiogramError::render("no font configured for caption text"))?;
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.as_ref().clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            AudiogramError::render("no font families registered from font bytes")
        })?;
        let name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| AudiogramError::render("registered font family has no name"))?
            .to_string();
        self.families.insert(role, name.clone());
        Ok(name)
    }

    /// Shape one unwrapped line of text.
    pub fn layout_line(
        &mut self,
        role: FontRole,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> AudiogramResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(AudiogramError::render("text size must be finite and > 0"));
        }
        let family = self.family_for(role)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

impl TextMeasure for TextLayoutEngine {
    fn width(&mut self, font: FontRole, text: &str, size_px: f32) -> f64 {
        if !self.has_font(font) {
            return self.fallback.width(font, text, size_px);
        }
        match self.layout_line(font, text, size_px, TextBrushRgba8::default()) {
            Ok(layout) => f64::from(layout.full_width()),
            Err(e) => {
                tracing::debug!(error = %e, "text shaping failed; using estimate");
                self.fallback.width(font, text, size_px)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
