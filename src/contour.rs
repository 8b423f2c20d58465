use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use kurbo::Point;

use crate::geom::signed_area;

/// A contour extracted from a binary image, in pixel coordinates.
#[derive(Debug, Clone)]
pub struct RawContour {
    /// Border pixels in tracing order (y=0 is top of image).
    pub points: Vec<Point>,
    /// Whether this is an outer border or a hole border.
    pub is_outer: bool,
    /// Index of the enclosing contour, `None` for top-level borders.
    pub parent: Option<usize>,
}

impl RawContour {
    /// Absolute enclosed area (px²).
    pub fn area(&self) -> f64 {
        signed_area(&self.points).abs()
    }

    /// Outer border with no enclosing contour.
    pub fn is_external(&self) -> bool {
        self.is_outer && self.parent.is_none()
    }
}

/// Extract contours from a binary image (non-zero = foreground).
///
/// Contours with fewer than 3 points or enclosing no more than
/// `min_area` px² are dropped. Parent indices refer to the unfiltered
/// contour list.
pub fn extract(image: &GrayImage, min_area: f64) -> Vec<RawContour> {
    find_contours::<i32>(image)
        .into_iter()
        .filter(|contour| contour.points.len() >= 3)
        .map(|contour| RawContour {
            points: contour
                .points
                .iter()
                .map(|p| Point::new(p.x as f64, p.y as f64))
                .collect(),
            is_outer: contour.border_type == BorderType::Outer,
            parent: contour.parent,
        })
        .filter(|contour| contour.area() > min_area)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn filled_block_yields_one_external_contour() {
        let mut image = GrayImage::new(20, 20);
        for y in 5..15 {
            for x in 4..12 {
                image.put_pixel(x, y, Luma([255]));
            }
        }
        let contours = extract(&image, 10.0);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].is_external());
        // Border pixels trace a 7×9 rectangle.
        assert!((contours[0].area() - 63.0).abs() < 1e-9);
    }

    #[test]
    fn small_specks_are_filtered() {
        let mut image = GrayImage::new(10, 10);
        image.put_pixel(2, 2, Luma([255]));
        image.put_pixel(3, 2, Luma([255]));
        assert!(extract(&image, 1.0).is_empty());
    }
}
