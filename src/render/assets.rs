use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::core::Canvas;
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::layout::display_list::FontRole;
use crate::scene::theme::Theme;

/// Per-job read-only render inputs: the background stretched to the canvas and font bytes.
///
/// Loaded once during the renderer stage and shared by every frame worker.
#[derive(Clone, Default)]
pub struct RenderAssets {
    background: Option<vello_cpu::Image>,
    caption_font: Option<Arc<Vec<u8>>>,
    subtitle_font: Option<Arc<Vec<u8>>>,
}

impl std::fmt::Debug for RenderAssets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderAssets")
            .field("background", &self.background.is_some())
            .field("caption_font", &self.caption_font.as_ref().map(|b| b.len()))
            .field("subtitle_font", &self.subtitle_font.as_ref().map(|b| b.len()))
            .finish()
    }
}

impl RenderAssets {
    /// Read the theme's background image and fonts. Paths must already be resolved.
    #[tracing::instrument(skip(theme), fields(w = theme.width, h = theme.height))]
    pub fn load(theme: &Theme) -> AudiogramResult<Self> {
        let canvas = theme.canvas();
        canvas.validate()?;

        let background = match &theme.background_image {
            Some(p) => Some(load_background(p, canvas)?),
            None => None,
        };
        let caption_font = theme.caption_font.as_deref().map(read_font).transpose()?;
        let subtitle_font = match &theme.subtitle_font {
            Some(p) => Some(read_font(p)?),
            None => caption_font.clone(),
        };
        tracing::debug!(
            background = background.is_some(),
            caption_font = caption_font.is_some(),
            subtitle_font = subtitle_font.is_some(),
            "render assets loaded"
        );
        Ok(Self {
            background,
            caption_font,
            subtitle_font,
        })
    }

    /// Assets built from in-memory font bytes, with no background.
    pub fn with_font(font: Vec<u8>) -> Self {
        let font = Arc::new(font);
        Self {
            background: None,
            caption_font: Some(font.clone()),
            subtitle_font: Some(font),
        }
    }

    pub fn background(&self) -> Option<&vello_cpu::Image> {
        self.background.as_ref()
    }

    pub fn font_bytes(&self, role: FontRole) -> Option<&Arc<Vec<u8>>> {
        match role {
            FontRole::Caption => self.caption_font.as_ref().or(self.subtitle_font.as_ref()),
            FontRole::Subtitle => self.subtitle_font.as_ref().or(self.caption_font.as_ref()),
        }
    }
}

fn read_font(path: &Path) -> AudiogramResult<Arc<Vec<u8>>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
    if bytes.is_empty() {
        return Err(AudiogramError::render(format!(
            "font '{}' is empty",
            path.display()
        )));
    }
    Ok(Arc::new(bytes))
}

fn load_background(path: &Path, canvas: Canvas) -> AudiogramResult<vello_cpu::Image> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read background image '{}'", path.display()))?;
    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));

    let premul = if is_svg {
        rasterize_svg(&bytes, canvas)?
    } else {
        decode_stretched(&bytes, canvas)?
    };
    let pixmap = pixmap_from_premul_bytes(&premul, canvas.width, canvas.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

/// Decode a raster image and stretch it to the canvas. Returns premultiplied RGBA8.
pub(crate) fn decode_stretched(bytes: &[u8], canvas: Canvas) -> AudiogramResult<Vec<u8>> {
    let img = image::load_from_memory(bytes).context("decode background image")?;
    let rgba = image::imageops::resize(
        &img.to_rgba8(),
        canvas.width,
        canvas.height,
        image::imageops::FilterType::Triangle,
    );
    let mut data = rgba.into_raw();
    premultiply_rgba8_in_place(&mut data);
    Ok(data)
}

/// Rasterize an SVG stretched to the canvas. Returns premultiplied RGBA8.
pub(crate) fn rasterize_svg(bytes: &[u8], canvas: Canvas) -> AudiogramResult<Vec<u8>> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
    let size = tree.size();
    if !(size.width() > 0.0 && size.height() > 0.0) {
        return Err(AudiogramError::render("svg has invalid width/height"));
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(canvas.width, canvas.height)
        .ok_or_else(|| AudiogramError::render("failed to allocate svg pixmap"))?;
    let sx = canvas.width as f32 / size.width();
    let sy = canvas.height as f32 / size.height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap.data().to_vec())
}

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> AudiogramResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| AudiogramError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| AudiogramError::render("pixmap height exceeds u16"))?;
    if bytes.len() != (width as usize) * (height as usize) * 4 {
        return Err(AudiogramError::render("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

#[cfg(test)]
#[path = "../../tests/unit/render/assets.rs"]
mod tests;
