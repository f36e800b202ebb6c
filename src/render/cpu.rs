use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::color::Rgba8;
use crate::foundation::core::{BezPath, Point, Rect};
use crate::foundation::error::{AudiogramError, AudiogramResult};
use crate::layout::display_list::{DisplayList, DrawOp, FontRole, PathPaint, TextBlock};
use crate::render::assets::RenderAssets;
use crate::render::text::{TextBrushRgba8, TextLayoutEngine};

/// CPU rasterizer for display lists, built on `vello_cpu`.
///
/// Holds per-worker state (render context, shaping contexts, font handles), so each frame worker
/// owns one instance.
pub struct CpuRasterizer {
    assets: Arc<RenderAssets>,
    text: TextLayoutEngine,
    fonts: HashMap<FontRole, vello_cpu::peniko::FontData>,
    ctx: Option<vello_cpu::RenderContext>,
}

impl CpuRasterizer {
    pub fn new(assets: Arc<RenderAssets>) -> Self {
        Self {
            text: TextLayoutEngine::new(assets.clone()),
            assets,
            fonts: HashMap::new(),
            ctx: None,
        }
    }

    /// Text measurement backed by the same shaping engine used for drawing.
    pub fn text_engine(&mut self) -> &mut TextLayoutEngine {
        &mut self.text
    }

    /// Paint `list` into `pixmap`. The pixmap must match the list's canvas size.
    pub fn rasterize(
        &mut self,
        list: &DisplayList,
        pixmap: &mut vello_cpu::Pixmap,
    ) -> AudiogramResult<()> {
        let width: u16 = list
            .canvas
            .width
            .try_into()
            .map_err(|_| AudiogramError::render("canvas width exceeds u16"))?;
        let height: u16 = list
            .canvas
            .height
            .try_into()
            .map_err(|_| AudiogramError::render("canvas height exceeds u16"))?;
        if pixmap.width() != width || pixmap.height() != height {
            return Err(AudiogramError::render(format!(
                "surface is {}x{}, frame needs {width}x{height}",
                pixmap.width(),
                pixmap.height()
            )));
        }

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            _ => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();

        let canvas_rect = rect_to_cpu(list.canvas.rect());
        let result = list
            .ops
            .iter()
            .try_for_each(|op| self.draw_op(&mut ctx, op, canvas_rect));
        if result.is_ok() {
            ctx.flush();
            ctx.render_to_pixmap(pixmap);
        }
        self.ctx = Some(ctx);
        result
    }

    fn draw_op(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        op: &DrawOp,
        canvas_rect: vello_cpu::kurbo::Rect,
    ) -> AudiogramResult<()> {
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        match op {
            DrawOp::Clear { color } => {
                ctx.set_paint(paint_color(*color));
                ctx.fill_rect(&canvas_rect);
            }
            DrawOp::BackgroundImage => {
                // Nothing to draw when the theme image was not loaded (e.g. single-frame preview).
                if let Some(image) = self.assets.background() {
                    ctx.set_paint(image.clone());
                    ctx.fill_rect(&canvas_rect);
                }
            }
            DrawOp::Rect { rect, color } => {
                ctx.set_paint(paint_color(*color));
                ctx.fill_rect(&rect_to_cpu(*rect));
            }
            DrawOp::Path { path, paint } => {
                let cpu_path = bezpath_to_cpu(path);
                match *paint {
                    PathPaint::Fill { color } => {
                        ctx.set_paint(paint_color(color));
                        ctx.fill_path(&cpu_path);
                    }
                    PathPaint::Stroke { color, width } => {
                        ctx.set_stroke(round_stroke(width));
                        ctx.set_paint(paint_color(color));
                        ctx.stroke_path(&cpu_path);
                    }
                }
            }
            DrawOp::Circle {
                center,
                radius,
                color,
            } => {
                use vello_cpu::kurbo::Shape;
                let circle = vello_cpu::kurbo::Circle::new(point_to_cpu(*center), *radius);
                ctx.set_paint(paint_color(*color));
                ctx.fill_path(&circle.to_path(0.1));
            }
            DrawOp::Text(block) => self.draw_text(ctx, block)?,
        }
        Ok(())
    }

    fn draw_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        block: &TextBlock,
    ) -> AudiogramResult<()> {
        let font = self.font_for(block.font)?;

        for line in &block.lines {
            for span in &line.spans {
                if span.text.trim().is_empty() {
                    continue;
                }
                let layout =
                    self.text
                        .layout_line(block.font, &span.text, block.size, span.color.into())?;
                let dy = line.top + (line.height - f64::from(layout.height())) / 2.0;
                ctx.set_transform(vello_cpu::kurbo::Affine::translate((span.x, dy)));

                if let Some(stroke) = block.stroke {
                    ctx.set_stroke(round_stroke(f64::from(stroke.width)));
                    ctx.set_paint(paint_color(stroke.color));
                    for_each_glyph_run(&layout, |_, size, glyphs| {
                        ctx.glyph_run(&font).font_size(size).stroke_glyphs(glyphs);
                    });
                }
                for_each_glyph_run(&layout, |brush, size, glyphs| {
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        brush.r, brush.g, brush.b, brush.a,
                    ));
                    ctx.glyph_run(&font).font_size(size).fill_glyphs(glyphs);
                });
            }
        }
        Ok(())
    }

    fn font_for(&mut self, role: FontRole) -> AudiogramResult<vello_cpu::peniko::FontData> {
        if let Some(font) = self.fonts.get(&role) {
            return Ok(font.clone());
        }
        let bytes = self
            .assets
            .font_bytes(role)
            .ok_or_else(|| AudiogramError::render("no font configured for caption text"))?;
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
            0,
        );
        self.fonts.insert(role, font.clone());
        Ok(font)
    }
}

fn for_each_glyph_run(
    layout: &parley::Layout<TextBrushRgba8>,
    mut f: impl FnMut(TextBrushRgba8, f32, &mut dyn Iterator<Item = vello_cpu::Glyph>),
) {
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let mut glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            f(run.style().brush, run.run().font_size(), &mut glyphs);
        }
    }
}

fn paint_color(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn round_stroke(width: f64) -> vello_cpu::kurbo::Stroke {
    vello_cpu::kurbo::Stroke::new(width)
        .with_caps(vello_cpu::kurbo::Cap::Round)
        .with_join(vello_cpu::kurbo::Join::Round)
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
