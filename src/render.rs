//! Raster rendering of polylines and classified shapes.
//!
//! Strokes kurbo paths via tiny-skia, either to a grayscale image that
//! feeds raster detection, or to an RGBA overlay PNG for inspection.

use std::path::Path;

use image::{GrayImage, Luma};
use kurbo::{BezPath, PathEl};
use log::info;

use crate::error::RegularizeError;
use crate::shape::{Polyline, PrimitiveShape};
use crate::symmetry::SymmetryReport;

const STROKE_WIDTH: f32 = 2.0;

/// Convert a kurbo `BezPath` to a `tiny_skia::Path`.
fn kurbo_to_tinyskia(bezpath: &BezPath, scale: f64) -> Option<tiny_skia::Path> {
    let mut pb = tiny_skia::PathBuilder::new();
    let s = |v: f64| (v * scale) as f32;
    for el in bezpath.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(s(p.x), s(p.y)),
            PathEl::LineTo(p) => pb.line_to(s(p.x), s(p.y)),
            PathEl::QuadTo(c, p) => pb.quad_to(s(c.x), s(c.y), s(p.x), s(p.y)),
            PathEl::CurveTo(c1, c2, p) => {
                pb.cubic_to(s(c1.x), s(c1.y), s(c2.x), s(c2.y), s(p.x), s(p.y))
            }
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

/// Outline of a classified shape, closed where the shape is a loop.
pub fn shape_path(shape: &PrimitiveShape) -> BezPath {
    let outline = shape.outline();
    let mut path = BezPath::new();
    let Some((&first, rest)) = outline.split_first() else {
        return path;
    };
    path.move_to(first);
    for &p in rest {
        path.line_to(p);
    }
    if shape.is_closed() {
        path.close_path();
    }
    path
}

fn blank(width: u32, height: u32, color: tiny_skia::Color) -> Result<tiny_skia::Pixmap, RegularizeError> {
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| RegularizeError::Export(format!("invalid canvas size {}x{}", width, height)))?;
    pixmap.fill(color);
    Ok(pixmap)
}

fn stroke(pixmap: &mut tiny_skia::Pixmap, path: &BezPath, scale: f64, paint: &tiny_skia::Paint) {
    let stroke = tiny_skia::Stroke {
        width: STROKE_WIDTH,
        ..tiny_skia::Stroke::default()
    };
    if let Some(sk_path) = kurbo_to_tinyskia(path, scale) {
        pixmap.stroke_path(&sk_path, paint, &stroke, tiny_skia::Transform::identity(), None);
    }
}

/// Stroke polylines black on white into a `width`×`height` grayscale image.
///
/// Coordinates are multiplied by `scale` first.
pub fn rasterize(
    polylines: &[Polyline],
    scale: f64,
    (width, height): (u32, u32),
) -> Result<GrayImage, RegularizeError> {
    let mut pixmap = blank(width, height, tiny_skia::Color::WHITE)?;
    let mut paint = tiny_skia::Paint::default();
    paint.set_color(tiny_skia::Color::BLACK);
    paint.anti_alias = true;
    for polyline in polylines {
        stroke(&mut pixmap, &polyline.to_bez_path(), scale, &paint);
    }

    // Opaque canvas: premultiplied red equals luma.
    let pixels = pixmap.pixels();
    Ok(GrayImage::from_fn(width, height, |x, y| {
        Luma([pixels[(y * width + x) as usize].red()])
    }))
}

/// Draw shapes over a grayscale background and write a PNG.
///
/// Shapes whose report shows any symmetry are drawn red, the rest blue.
pub fn overlay_png(
    background: &GrayImage,
    shapes: &[(PrimitiveShape, Option<SymmetryReport>)],
    scale: f64,
    output: &Path,
) -> Result<(), RegularizeError> {
    let (width, height) = background.dimensions();
    let mut pixmap = blank(width, height, tiny_skia::Color::WHITE)?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(background.pixels()) {
        let luma = src.0[0];
        if let Some(color) = tiny_skia::PremultipliedColorU8::from_rgba(luma, luma, luma, 255) {
            *dst = color;
        }
    }

    let mut plain = tiny_skia::Paint::default();
    plain.set_color_rgba8(0, 0, 255, 255);
    plain.anti_alias = true;
    let mut highlight = tiny_skia::Paint::default();
    highlight.set_color_rgba8(255, 0, 0, 255);
    highlight.anti_alias = true;

    let mut symmetric = 0;
    for (shape, report) in shapes {
        let is_symmetric = report.is_some_and(|r| r.has_reflectional || r.has_rotational);
        if is_symmetric {
            symmetric += 1;
        }
        let paint = if is_symmetric { &highlight } else { &plain };
        stroke(&mut pixmap, &shape_path(shape), scale, paint);
    }

    std::fs::write(output, encode_png(&pixmap)?)?;
    info!(
        "wrote {} ({} shapes, {} symmetric)",
        output.display(),
        shapes.len(),
        symmetric
    );
    Ok(())
}

/// Encode a pixmap to PNG bytes.
fn encode_png(pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>, RegularizeError> {
    let mut buf = Vec::new();
    let mut encoder = png::Encoder::new(&mut buf, pixmap.width(), pixmap.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .map_err(|e| RegularizeError::Export(e.to_string()))?;
    writer
        .write_image_data(pixmap.data())
        .map_err(|e| RegularizeError::Export(e.to_string()))?;
    drop(writer);
    Ok(buf)
}
