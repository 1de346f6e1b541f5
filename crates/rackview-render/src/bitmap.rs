//! Raster backend over plotters' `BitMapBackend`.
//!
//! A dumb mapper from the normalized draw plan to pixels: x scales by the
//! image width, y flips (plans are bottom-left origin, rasters top-left),
//! and point sizes convert at 100 dpi. All drawing failures collapse into
//! `RenderError::Backend` and abort the cycle before anything is kept.

use std::path::{Path, PathBuf};

use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::drawing::{DrawingArea, IntoDrawingArea};
use plotters::element::{Circle, PathElement, Rectangle, Text};
use plotters::prelude::BitMapBackend;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{IntoFont, RGBAColor, ShapeStyle, TextStyle};

use crate::error::{RenderError, RenderResult};
use crate::plan::{Color, DrawItem, DrawPlan, HAlign, TextBlock, VAlign};

/// Points to pixels at the output's 100 dpi.
const PT_TO_PX: f64 = 100.0 / 72.0;

/// Writes one PNG per cycle at a fixed path, overwriting the previous
/// image. No history is retained.
pub struct BitmapCanvas {
    path: PathBuf,
}

impl BitmapCanvas {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rasterize the plan and save it.
    pub fn render(&self, plan: &DrawPlan) -> RenderResult<()> {
        let root =
            BitMapBackend::new(&self.path, (plan.width, plan.height)).into_drawing_area();
        root.fill(&rgba(plan.background)).map_err(backend_err)?;

        for item in &plan.items {
            match item {
                DrawItem::Line {
                    x0,
                    y0,
                    x1,
                    y1,
                    width_px,
                    color,
                } => {
                    let style = ShapeStyle {
                        color: rgba(*color),
                        filled: false,
                        stroke_width: width_px.round().max(1.0) as u32,
                    };
                    root.draw(&PathElement::new(
                        vec![pixel(plan, *x0, *y0), pixel(plan, *x1, *y1)],
                        style,
                    ))
                    .map_err(backend_err)?;
                }
                DrawItem::Marker {
                    x,
                    y,
                    radius_px,
                    color,
                } => {
                    let style = ShapeStyle {
                        color: rgba(*color),
                        filled: true,
                        stroke_width: 1,
                    };
                    root.draw(&Circle::new(
                        pixel(plan, *x, *y),
                        radius_px.round().max(1.0) as i32,
                        style,
                    ))
                    .map_err(backend_err)?;
                }
                DrawItem::Rect {
                    x0,
                    y0,
                    x1,
                    y1,
                    color,
                } => {
                    let style = ShapeStyle {
                        color: rgba(*color),
                        filled: true,
                        stroke_width: 1,
                    };
                    root.draw(&Rectangle::new(corners(plan, *x0, *y0, *x1, *y1), style))
                        .map_err(backend_err)?;
                }
                DrawItem::Text(block) => draw_text(&root, plan, block)?,
            }
        }

        root.present().map_err(backend_err)
    }
}

fn draw_text<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    plan: &DrawPlan,
    block: &TextBlock,
) -> RenderResult<()> {
    let size_px = block.size_pt * PT_TO_PX;
    let line_height = size_px * block.line_spacing;
    let lines: Vec<&str> = block.text.lines().collect();
    let block_height = line_height * lines.len() as f64;

    let (anchor_x, anchor_y) = pixel(plan, block.x, block.y);
    let first_top = match block.valign {
        VAlign::Top => f64::from(anchor_y),
        VAlign::Center => f64::from(anchor_y) - block_height / 2.0,
        VAlign::Bottom => f64::from(anchor_y) - block_height,
    };

    if block.boxed {
        draw_text_box(root, block, size_px, first_top, block_height, anchor_x)?;
    }

    let hpos = match block.halign {
        HAlign::Left => HPos::Left,
        HAlign::Center => HPos::Center,
        HAlign::Right => HPos::Right,
    };

    for (index, line) in lines.iter().enumerate() {
        let color = rgba(block.color);
        let style = TextStyle::from(("sans-serif", size_px).into_font())
            .color(&color)
            .pos(Pos::new(hpos, VPos::Top));
        let y = (first_top + index as f64 * line_height).round() as i32;
        root.draw(&Text::new((*line).to_string(), (anchor_x, y), style))
            .map_err(backend_err)?;
    }
    Ok(())
}

/// Translucent white backing box. Text extents are estimated from the
/// character count; the panels only need a legibility wash, not exact
/// bounds.
fn draw_text_box<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    block: &TextBlock,
    size_px: f64,
    first_top: f64,
    block_height: f64,
    anchor_x: i32,
) -> RenderResult<()> {
    let widest = block
        .text
        .lines()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0) as f64;
    let est_width = widest * size_px * 0.55;

    let (x0, x1) = match block.halign {
        HAlign::Left => (f64::from(anchor_x), f64::from(anchor_x) + est_width),
        HAlign::Right => (f64::from(anchor_x) - est_width, f64::from(anchor_x)),
        HAlign::Center => (
            f64::from(anchor_x) - est_width / 2.0,
            f64::from(anchor_x) + est_width / 2.0,
        ),
    };

    let pad = 2.0;
    let style = ShapeStyle {
        color: rgba(Color::WHITE.with_alpha(0.75)),
        filled: true,
        stroke_width: 1,
    };
    root.draw(&Rectangle::new(
        [
            ((x0 - pad).round() as i32, (first_top - pad).round() as i32),
            (
                (x1 + pad).round() as i32,
                (first_top + block_height + pad).round() as i32,
            ),
        ],
        style,
    ))
    .map_err(backend_err)
}

fn pixel(plan: &DrawPlan, x: f64, y: f64) -> (i32, i32) {
    (
        (x * f64::from(plan.width)).round() as i32,
        ((1.0 - y) * f64::from(plan.height)).round() as i32,
    )
}

/// Pixel-space corner pair ordered (upper-left, lower-right); the y flip
/// reverses vertical order.
fn corners(plan: &DrawPlan, x0: f64, y0: f64, x1: f64, y1: f64) -> [(i32, i32); 2] {
    let (px0, py0) = pixel(plan, x0, y0);
    let (px1, py1) = pixel(plan, x1, y1);
    [
        (px0.min(px1), py0.min(py1)),
        (px0.max(px1), py0.max(py1)),
    ]
}

fn rgba(color: Color) -> RGBAColor {
    RGBAColor(color.r, color.g, color.b, color.alpha)
}

fn backend_err<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Backend(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape_plan() -> DrawPlan {
        let mut plan = DrawPlan::new(200, 100);
        plan.items.push(DrawItem::Line {
            x0: 0.1,
            y0: 0.1,
            x1: 0.9,
            y1: 0.1,
            width_px: 2.0,
            color: Color::BLACK,
        });
        plan.items.push(DrawItem::Marker {
            x: 0.5,
            y: 0.5,
            radius_px: 5.0,
            color: Color::RED,
        });
        plan.items.push(DrawItem::Rect {
            x0: 0.2,
            y0: 0.2,
            x1: 0.4,
            y1: 0.6,
            color: Color::GREEN.with_alpha(0.3),
        });
        plan
    }

    #[test]
    fn writes_and_overwrites_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.png");
        let canvas = BitmapCanvas::new(&path);

        canvas.render(&shape_plan()).unwrap();
        let first = std::fs::metadata(&path).unwrap().len();
        assert!(first > 0);

        // Second cycle overwrites in place.
        canvas.render(&shape_plan()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unwritable_path_is_backend_error() {
        let canvas = BitmapCanvas::new("/nonexistent-dir/status.png");
        let err = canvas.render(&shape_plan()).unwrap_err();
        assert!(matches!(err, RenderError::Backend(_)));
    }

    #[test]
    fn pixel_mapping_flips_y() {
        let plan = DrawPlan::new(200, 100);
        assert_eq!(pixel(&plan, 0.0, 0.0), (0, 100));
        assert_eq!(pixel(&plan, 1.0, 1.0), (200, 0));
        assert_eq!(pixel(&plan, 0.5, 0.5), (100, 50));
    }

    #[test]
    fn corners_are_ordered_upper_left_first() {
        let plan = DrawPlan::new(100, 100);
        let [ul, lr] = corners(&plan, 0.2, 0.2, 0.4, 0.6);
        assert!(ul.0 < lr.0);
        assert!(ul.1 < lr.1);
    }
}
