//! Occlusion completion.
//!
//! Two independent strategies:
//!
//! 1. [`complete_mask`]: staged morphology on a binary raster mask
//! 2. [`curve::complete_curve`]: convex-hull completion of a sparse point set

pub mod curve;

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_polygon_mut;
use imageproc::morphology::{close, dilate, erode};
use imageproc::point::Point as PixelPoint;
use log::{debug, info};

use crate::bitmap::RasterMask;
use crate::config::{MorphStage, MorphologyConfig};
use crate::contour;
use crate::error::RegularizeError;
use crate::geom::convex_hull;

pub use curve::{complete_curve, complete_curves};

/// Every intermediate mask of the completion pipeline.
#[derive(Debug, Clone)]
pub struct MaskStages {
    /// After noise removal.
    pub eroded: RasterMask,
    /// After regrowth.
    pub dilated: RasterMask,
    /// After gap bridging.
    pub closed: RasterMask,
    /// Final silhouette (including the hull union when enabled).
    pub completed: RasterMask,
}

/// Repair gaps in a binary mask. Same dimensions as the input.
pub fn complete_mask(mask: &RasterMask, config: &MorphologyConfig) -> RasterMask {
    complete_mask_staged(mask, config).completed
}

/// [`complete_mask`], keeping every stage.
///
/// Stage order is fixed: erode, dilate, close, dilate again.
pub fn complete_mask_staged(mask: &RasterMask, config: &MorphologyConfig) -> MaskStages {
    let eroded = repeat(mask.as_image(), config.erode, erode);
    let dilated = repeat(&eroded, config.dilate, dilate);
    let closed = repeat(&dilated, config.close, close);
    let mut completed = repeat(&closed, config.final_dilate, dilate);

    if config.hull_union {
        union_contour_hulls(&mut completed);
    }

    let stages = MaskStages {
        eroded: RasterMask::from_binary(eroded),
        dilated: RasterMask::from_binary(dilated),
        closed: RasterMask::from_binary(closed),
        completed: RasterMask::from_binary(completed),
    };
    info!(
        "mask completion: {} -> {} foreground px (eroded {}, dilated {}, closed {})",
        mask.foreground_count(),
        stages.completed.foreground_count(),
        stages.eroded.foreground_count(),
        stages.dilated.foreground_count(),
        stages.closed.foreground_count(),
    );
    stages
}

/// Keep source intensities inside the mask, zero elsewhere.
pub fn recover_intensity(gray: &GrayImage, mask: &RasterMask) -> Result<GrayImage, RegularizeError> {
    if gray.dimensions() != mask.dimensions() {
        return Err(RegularizeError::DimensionMismatch {
            expected: mask.dimensions(),
            got: gray.dimensions(),
        });
    }
    let mut out = gray.clone();
    for (pixel, m) in out.pixels_mut().zip(mask.as_image().pixels()) {
        if m.0[0] == 0 {
            pixel.0[0] = 0;
        }
    }
    Ok(out)
}

fn repeat(image: &GrayImage, stage: MorphStage, op: fn(&GrayImage, Norm, u8) -> GrayImage) -> GrayImage {
    let radius = stage.radius();
    if radius == 0 || stage.iterations == 0 {
        return image.clone();
    }
    let mut out = op(image, Norm::LInf, radius);
    for _ in 1..stage.iterations {
        out = op(&out, Norm::LInf, radius);
    }
    out
}

/// OR the filled convex hull of every external contour into the mask.
fn union_contour_hulls(mask: &mut GrayImage) {
    let contours = contour::extract(mask, 0.0);
    let mut filled = 0;
    for raw in contours.iter().filter(|c| c.is_external()) {
        let hull: Vec<PixelPoint<i32>> = convex_hull(&raw.points)
            .iter()
            .map(|p| PixelPoint::new(p.x.round() as i32, p.y.round() as i32))
            .collect();
        if hull.len() < 3 || hull.first() == hull.last() {
            debug!("skipping degenerate hull with {} vertices", hull.len());
            continue;
        }
        draw_polygon_mut(mask, &hull, Luma([255]));
        filled += 1;
    }
    debug!("hull union filled {} contours", filled);
}
