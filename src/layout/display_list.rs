use crate::foundation::color::Rgba8;
use crate::foundation::core::{BezPath, Canvas, Point, Rect};

/// Which theme font a text block is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontRole {
    /// Static caption font (`captionFont`).
    Caption,
    /// Timed caption font (`subtitleFont`, falling back to `captionFont`).
    Subtitle,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PathPaint {
    Fill { color: Rgba8 },
    Stroke { color: Rgba8, width: f64 },
}

/// A run of same-colored text starting at absolute `x`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub color: Rgba8,
    pub x: f64,
}

/// One line of text; glyphs are vertically centered in `[top, top + height)`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextLine {
    pub top: f64,
    pub height: f64,
    pub spans: Vec<TextSpan>,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextStroke {
    pub color: Rgba8,
    /// Full outline width in pixels (drawn centered on the glyph edge, under the fill).
    pub width: f32,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub font: FontRole,
    pub size: f32,
    pub lines: Vec<TextLine>,
    pub stroke: Option<TextStroke>,
}

/// One draw instruction, painted in list order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", tag = "op")]
pub enum DrawOp {
    /// Fill the whole canvas.
    Clear { color: Rgba8 },
    /// Theme background image stretched over the canvas.
    BackgroundImage,
    Rect { rect: Rect, color: Rgba8 },
    Path { path: BezPath, paint: PathPaint },
    Circle { center: Point, radius: f64, color: Rgba8 },
    Text(TextBlock),
}

/// Complete draw instructions for one frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DisplayList {
    pub canvas: Canvas,
    pub ops: Vec<DrawOp>,
}

impl DisplayList {
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            ops: Vec::new(),
        }
    }

    pub fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    pub fn extend(&mut self, ops: impl IntoIterator<Item = DrawOp>) {
        self.ops.extend(ops);
    }

    /// Every text block in paint order.
    pub fn text_blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(t) => Some(t),
            _ => None,
        })
    }
}
