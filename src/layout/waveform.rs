use crate::audio::waveform::WaveformPoint;
use crate::foundation::color::Rgba8;
use crate::foundation::core::{BezPath, Canvas, Point, Rect};
use crate::layout::display_list::{DrawOp, PathPaint};
use crate::scene::waveform::{WaveformConfig, WaveformPositioning, WaveformStyle};

const WAVE_COUNT: usize = 3;
const WAVE_AMPLITUDE: f64 = 0.3;
const AREA_OUTLINE_WIDTH: f64 = 2.0;

/// Pixel box of the waveform, centered on the positioning point.
pub fn waveform_rect(canvas: Canvas, pos: &WaveformPositioning) -> Rect {
    let w = canvas.pct_x(pos.width);
    let h = canvas.pct_y(pos.height);
    let x0 = canvas.pct_x(pos.x) - w / 2.0;
    let y0 = canvas.pct_y(pos.y) - h / 2.0;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

/// Symmetric moving average over `radius` neighbours on each side, truncated at the ends.
pub fn smooth_energies(energies: &[f64], radius: usize) -> Vec<f64> {
    if radius == 0 {
        return energies.to_vec();
    }
    (0..energies.len())
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = i.saturating_add(radius).min(energies.len() - 1);
            let window = &energies[lo..=hi];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Draw ops for one frame's waveform.
pub fn waveform_ops(
    points: &[WaveformPoint],
    canvas: Canvas,
    pos: &WaveformPositioning,
    config: &WaveformConfig,
    theme_color: Rgba8,
) -> Vec<DrawOp> {
    let mut ops = Vec::new();
    let rect = waveform_rect(canvas, pos);

    if config.background_opacity > 0.0 {
        let color = config
            .background_color
            .with_opacity_pct(config.background_opacity);
        ops.push(DrawOp::Rect { rect, color });
    }
    if points.is_empty() {
        return ops;
    }

    let raw: Vec<f64> = points
        .iter()
        .map(|p| f64::from(p.energy).clamp(0.0, 1.0))
        .collect();
    let energies = smooth_energies(&raw, config.smoothing_radius());
    let color = config.color.unwrap_or(theme_color);

    match config.style {
        WaveformStyle::Bars => ops.extend(bars(&energies, rect, config.spacing, color)),
        WaveformStyle::Line => {
            ops.push(DrawOp::Path {
                path: polyline(&energies, rect),
                paint: PathPaint::Stroke {
                    color,
                    width: config.line_width,
                },
            });
        }
        WaveformStyle::Area => {
            let mut fill = BezPath::new();
            fill.move_to((rect.x0, rect.y1));
            for (i, &e) in energies.iter().enumerate() {
                fill.line_to(curve_point(i, energies.len(), e, rect));
            }
            fill.line_to((rect.x1, rect.y1));
            fill.close_path();
            ops.push(DrawOp::Path {
                path: fill,
                paint: PathPaint::Fill { color },
            });
            ops.push(DrawOp::Path {
                path: polyline(&energies, rect),
                paint: PathPaint::Stroke {
                    color: config.color_secondary,
                    width: AREA_OUTLINE_WIDTH,
                },
            });
        }
        WaveformStyle::Dots => {
            for (i, &e) in energies.iter().enumerate() {
                ops.push(DrawOp::Circle {
                    center: curve_point(i, energies.len(), e, rect),
                    radius: config.dot_size,
                    color,
                });
            }
        }
        WaveformStyle::Wave => ops.extend(waves(&energies, rect, config.line_width, color)),
    }
    ops
}

fn x_at(i: usize, n: usize, rect: Rect) -> f64 {
    if n <= 1 {
        return rect.x0 + rect.width() / 2.0;
    }
    rect.x0 + (i as f64 / (n - 1) as f64) * rect.width()
}

fn curve_point(i: usize, n: usize, energy: f64, rect: Rect) -> Point {
    Point::new(x_at(i, n, rect), rect.y1 - energy * rect.height())
}

fn polyline(energies: &[f64], rect: Rect) -> BezPath {
    let mut path = BezPath::new();
    for (i, &e) in energies.iter().enumerate() {
        let p = curve_point(i, energies.len(), e, rect);
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    path
}

fn bars(energies: &[f64], rect: Rect, spacing: f64, color: Rgba8) -> Option<DrawOp> {
    let n = energies.len() as f64;
    let mut spacing = spacing;
    let mut bar_w = (rect.width() - (n - 1.0) * spacing) / n;
    if bar_w <= 0.0 {
        spacing = 0.0;
        bar_w = rect.width() / n;
    }
    if bar_w <= 0.0 || rect.height() <= 0.0 {
        return None;
    }

    let mut path = BezPath::new();
    for (i, &e) in energies.iter().enumerate() {
        let bar_h = (e * rect.height()).max(1.0);
        let x = rect.x0 + i as f64 * (bar_w + spacing);
        let y = rect.y1 - bar_h;
        path.move_to((x, y));
        path.line_to((x + bar_w, y));
        path.line_to((x + bar_w, rect.y1));
        path.line_to((x, rect.y1));
        path.close_path();
    }
    Some(DrawOp::Path {
        path,
        paint: PathPaint::Fill { color },
    })
}

fn waves(energies: &[f64], rect: Rect, line_width: f64, color: Rgba8) -> Vec<DrawOp> {
    let n = energies.len();
    let base_y = rect.y0 + rect.height() / 2.0;
    let amplitude = rect.height() * WAVE_AMPLITUDE;

    (0..WAVE_COUNT)
        .map(|wave| {
            let mut path = BezPath::new();
            for (i, &e) in energies.iter().enumerate() {
                let influence = e * 0.5 + 0.5;
                let phase = (i as f64 / n as f64) * std::f64::consts::TAU * (wave + 1) as f64;
                let p = Point::new(x_at(i, n, rect), base_y + phase.sin() * amplitude * influence);
                if i == 0 {
                    path.move_to(p);
                } else {
                    path.line_to(p);
                }
            }
            let color = if wave == 0 {
                color
            } else {
                color.with_alpha_factor(0.7 - wave as f64 * 0.2)
            };
            DrawOp::Path {
                path,
                paint: PathPaint::Stroke {
                    color,
                    width: line_width,
                },
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/layout/waveform.rs"]
mod tests;
