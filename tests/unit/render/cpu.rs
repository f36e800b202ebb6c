use super::*;
use crate::foundation::core::Canvas;
use crate::layout::display_list::{TextLine, TextSpan};

fn canvas() -> Canvas {
    Canvas {
        width: 8,
        height: 4,
    }
}

fn pixel(pixmap: &vello_cpu::Pixmap, x: usize, y: usize) -> [u8; 4] {
    let i = (y * usize::from(pixmap.width()) + x) * 4;
    let d = pixmap.data_as_u8_slice();
    [d[i], d[i + 1], d[i + 2], d[i + 3]]
}

#[test]
fn clear_then_rect_paints_expected_pixels() {
    let mut list = DisplayList::new(canvas());
    list.push(DrawOp::Clear {
        color: Rgba8::rgb(255, 0, 0),
    });
    list.push(DrawOp::Rect {
        rect: Rect::new(4.0, 0.0, 8.0, 4.0),
        color: Rgba8::rgb(0, 0, 255),
    });

    let mut r = CpuRasterizer::new(Arc::new(RenderAssets::default()));
    let mut pixmap = vello_cpu::Pixmap::new(8, 4);
    r.rasterize(&list, &mut pixmap).unwrap();

    assert_eq!(pixel(&pixmap, 1, 1), [255, 0, 0, 255]);
    assert_eq!(pixel(&pixmap, 6, 2), [0, 0, 255, 255]);
}

#[test]
fn rasterizing_twice_is_byte_identical() {
    let mut list = DisplayList::new(canvas());
    list.push(DrawOp::Clear {
        color: Rgba8::WHITE,
    });
    let mut path = BezPath::new();
    path.move_to((0.0, 4.0));
    path.line_to((4.0, 0.0));
    path.line_to((8.0, 4.0));
    list.push(DrawOp::Path {
        path,
        paint: PathPaint::Stroke {
            color: Rgba8::BLACK,
            width: 1.5,
        },
    });
    list.push(DrawOp::Circle {
        center: Point::new(4.0, 2.0),
        radius: 1.0,
        color: Rgba8::rgb(0, 128, 0).with_opacity_pct(50.0),
    });

    let mut r = CpuRasterizer::new(Arc::new(RenderAssets::default()));
    let mut a = vello_cpu::Pixmap::new(8, 4);
    let mut b = vello_cpu::Pixmap::new(8, 4);
    r.rasterize(&list, &mut a).unwrap();
    r.rasterize(&list, &mut b).unwrap();
    assert_eq!(a.data_as_u8_slice(), b.data_as_u8_slice());
}

#[test]
fn surface_size_must_match_canvas() {
    let list = DisplayList::new(canvas());
    let mut r = CpuRasterizer::new(Arc::new(RenderAssets::default()));
    let mut pixmap = vello_cpu::Pixmap::new(4, 4);
    assert!(matches!(
        r.rasterize(&list, &mut pixmap),
        Err(AudiogramError::Render(_))
    ));
}

#[test]
fn text_without_a_font_fails_the_frame() {
    let mut list = DisplayList::new(canvas());
    list.push(DrawOp::Text(TextBlock {
        font: FontRole::Subtitle,
        size: 12.0,
        lines: vec![TextLine {
            top: 0.0,
            height: 4.0,
            spans: vec![TextSpan {
                text: "hi".to_string(),
                color: Rgba8::BLACK,
                x: 0.0,
            }],
        }],
        stroke: None,
    }));
    let mut r = CpuRasterizer::new(Arc::new(RenderAssets::default()));
    let mut pixmap = vello_cpu::Pixmap::new(8, 4);
    let err = r.rasterize(&list, &mut pixmap).unwrap_err();
    assert!(err.to_string().contains("no font configured"));
}

#[test]
fn missing_background_image_is_skipped() {
    let mut list = DisplayList::new(canvas());
    list.push(DrawOp::Clear {
        color: Rgba8::BLACK,
    });
    list.push(DrawOp::BackgroundImage);
    let mut r = CpuRasterizer::new(Arc::new(RenderAssets::default()));
    let mut pixmap = vello_cpu::Pixmap::new(8, 4);
    r.rasterize(&list, &mut pixmap).unwrap();
    assert_eq!(pixel(&pixmap, 0, 0), [0, 0, 0, 255]);
}
