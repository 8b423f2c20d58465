//! Collect-all shape detection over a raster image.
//!
//! Unlike the per-curve cascade, every enabled test runs independently on
//! every contour and all matches are kept, keyed by kind:
//!
//! 1. Gaussian blur, Canny edges, contour tracing on the edge map
//! 2. One global Hough pass over the edge map, split into line segments
//! 3. Per-contour polygon approximation and area/circularity/angle tests

use std::collections::BTreeMap;
use std::f64::consts::PI;

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use kurbo::{Point, Vec2};
use log::{debug, info};

use super::ellipse::fit_ellipse;
use super::fit::{approx_polygon, hull_fill_ratio, min_enclosing_circle};
use crate::config::DetectionConfig;
use crate::contour::{self, RawContour};
use crate::error::FitError;
use crate::geom::{closed_perimeter, interior_angles, EPSILON};
use crate::shape::{circle_samples, PrimitiveShape, ShapeKind};

/// Every match found in one image, grouped by kind.
pub type DetectedShapes = BTreeMap<ShapeKind, Vec<PrimitiveShape>>;

/// Run every enabled shape test over a grayscale image.
pub fn detect_shapes(image: &GrayImage, config: &DetectionConfig) -> DetectedShapes {
    let mut shapes: DetectedShapes = config.kinds.iter().map(|&kind| (kind, Vec::new())).collect();

    let blurred = if config.blur_sigma > 0.0 {
        gaussian_blur_f32(image, config.blur_sigma)
    } else {
        image.clone()
    };
    let edges = canny(&blurred, config.canny_low, config.canny_high);

    if let Some(lines) = shapes.get_mut(&ShapeKind::Line) {
        *lines = line_segments(&edges, config);
    }

    for contour in contour::extract(&edges, config.min_contour_area) {
        test_contour(&contour, config, &mut shapes);
    }

    for (kind, found) in &shapes {
        if !found.is_empty() {
            info!("{:?}: {} detected", kind, found.len());
        }
    }
    shapes
}

fn test_contour(contour: &RawContour, config: &DetectionConfig, shapes: &mut DetectedShapes) {
    let points = &contour.points;
    let perimeter = closed_perimeter(points);
    if perimeter < EPSILON {
        debug!("skipping contour with zero perimeter");
        return;
    }
    let area = contour.area();
    let approx = approx_polygon(points, config.approx_epsilon_ratio * perimeter);
    let wants = |kind: ShapeKind| config.kinds.contains(&kind);
    let mut push = |kind: ShapeKind, shape: PrimitiveShape| {
        if let Some(list) = shapes.get_mut(&kind) {
            list.push(shape);
        }
    };

    if approx.len() == 4 {
        let corners = [approx[0], approx[1], approx[2], approx[3]];
        if wants(ShapeKind::Rectangle) {
            push(ShapeKind::Rectangle, PrimitiveShape::Rectangle { corners });
        }
        if wants(ShapeKind::RoundedRectangle) {
            match hull_fill_ratio(points, &approx) {
                Ok(ratio) if ratio < config.rounded_area_ratio => push(
                    ShapeKind::RoundedRectangle,
                    PrimitiveShape::RoundedRectangle {
                        corners,
                        corner_radius: 0.0,
                    },
                ),
                Ok(_) => {}
                Err(reason) => debug!("rounded rectangle test skipped: {}", reason),
            }
        }
    }

    if wants(ShapeKind::Star) && approx.len() >= 5 {
        match hull_fill_ratio(points, &approx) {
            Ok(ratio) if ratio < config.star_area_ratio => push(
                ShapeKind::Star,
                PrimitiveShape::Star {
                    vertices: approx.clone(),
                },
            ),
            Ok(_) => {}
            Err(reason) => debug!("star test skipped: {}", reason),
        }
    }

    if wants(ShapeKind::Circle) && area >= config.circle_min_area {
        let circularity = 4.0 * PI * area / (perimeter * perimeter);
        let (lo, hi) = config.circularity_range;
        if circularity > lo && circularity < hi {
            if let Some((center, radius)) = min_enclosing_circle(points) {
                push(
                    ShapeKind::Circle,
                    PrimitiveShape::Circle {
                        center,
                        radius,
                        samples: circle_samples(center, radius, points.len()),
                    },
                );
            }
        }
    }

    if wants(ShapeKind::Ellipse) {
        match fit_ellipse(points) {
            Ok(ellipse) => push(
                ShapeKind::Ellipse,
                PrimitiveShape::Ellipse {
                    center: ellipse.center,
                    semi_major: ellipse.semi_major,
                    semi_minor: ellipse.semi_minor,
                    rotation: ellipse.rotation,
                },
            ),
            Err(reason) => debug!("ellipse test skipped: {}", reason),
        }
    }

    if wants(ShapeKind::RegularPolygon) && approx.len() >= 5 {
        match has_equal_angles(&approx, config.polygon_angle_tolerance) {
            Ok(true) => push(
                ShapeKind::RegularPolygon,
                PrimitiveShape::RegularPolygon { vertices: approx },
            ),
            Ok(false) => {}
            Err(reason) => debug!("polygon test skipped: {}", reason),
        }
    }
}

/// Every interior angle within `tolerance` of the mean. Raster contours
/// are not checked for convexity.
fn has_equal_angles(vertices: &[Point], tolerance: f64) -> Result<bool, FitError> {
    let angles =
        interior_angles(vertices).ok_or(FitError::Degenerate("repeated polygon vertex"))?;
    let mean = angles.iter().sum::<f64>() / angles.len() as f64;
    Ok(angles.iter().all(|a| (a - mean).abs() <= tolerance))
}

// ── Line segments ────────────────────────────────────────

/// Hough lines over the whole edge map, cut into segments at gaps longer
/// than `max_line_gap` and kept when at least `min_line_length` long.
fn line_segments(edges: &GrayImage, config: &DetectionConfig) -> Vec<PrimitiveShape> {
    let options = LineDetectionOptions {
        vote_threshold: config.hough_vote_threshold,
        suppression_radius: config.hough_suppression_radius,
    };
    detect_lines(edges, options)
        .iter()
        .flat_map(|line| segments_on_line(edges, line, config.min_line_length, config.max_line_gap))
        .map(|(start, end)| PrimitiveShape::Line { start, end })
        .collect()
}

/// Walk a polar line across the image and collect runs of edge pixels.
fn segments_on_line(
    edges: &GrayImage,
    line: &PolarLine,
    min_length: f64,
    max_gap: f64,
) -> Vec<(Point, Point)> {
    let (w, h) = edges.dimensions();
    let theta = (line.angle_in_degrees as f64).to_radians();
    let (sin_t, cos_t) = theta.sin_cos();
    let r = line.r as f64;
    let foot = Point::new(r * cos_t, r * sin_t);
    let dir = Vec2::new(-sin_t, cos_t);
    let reach = ((w as f64).powi(2) + (h as f64).powi(2)).sqrt();

    let is_edge = |p: Point| {
        let (x, y) = (p.x.round(), p.y.round());
        x >= 0.0 && y >= 0.0 && x < w as f64 && y < h as f64 && edges.get_pixel(x as u32, y as u32).0[0] > 0
    };

    let mut segments = Vec::new();
    let mut run: Option<(Point, Point)> = None;
    let mut gap = 0.0;
    let mut t = -reach;
    while t <= reach {
        let p = foot + dir * t;
        if is_edge(p) {
            run = Some(match run {
                Some((start, _)) => (start, p),
                None => (p, p),
            });
            gap = 0.0;
        } else if let Some(current) = run {
            gap += 1.0;
            if gap > max_gap {
                push_segment(&mut segments, current, min_length);
                run = None;
            }
        }
        t += 1.0;
    }
    if let Some(current) = run {
        push_segment(&mut segments, current, min_length);
    }
    segments
}

fn push_segment(segments: &mut Vec<(Point, Point)>, (start, end): (Point, Point), min_length: f64) {
    if start.distance(end) >= min_length {
        segments.push((start, end));
    }
}
