use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::shape::ShapeKind;

/// All regularization parameters in one struct.
/// Serializable so presets can be saved and reloaded as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegularizeConfig {
    // -- Shape classifier --
    /// Residual bound for fit verification. Relative for circles and the
    /// strict ellipse/rectangle checks, absolute (coordinate units) for lines.
    /// Also scales the polygon-approximation epsilon (`tolerance * perimeter`).
    pub geometric_tolerance: f64,
    /// Residual checks for stages that accept unconditionally by default.
    pub strict: StrictChecks,
    /// Minimum polygon-area / rectangle-area ratio for a rounded rectangle
    /// when `strict.rectangle` is on.
    pub rounded_min_fill: f64,
    /// Maximum deviation (radians) of any interior angle from the mean
    /// when `strict.polygon` is on.
    pub polygon_angle_tolerance: f64,
    /// A star's polygon area must be below this fraction of its hull area.
    pub star_area_ratio: f64,

    // -- Symmetry analyzer --
    pub symmetry: SymmetryConfig,

    // -- Occlusion completion --
    pub morphology: MorphologyConfig,

    // -- Broad raster detection --
    pub detection: DetectionConfig,
}

impl RegularizeConfig {
    /// Default configuration with a different geometric tolerance.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            geometric_tolerance: tolerance.max(0.0),
            ..Self::default()
        }
    }

    /// Default configuration with every strict check enabled.
    pub fn strict() -> Self {
        Self {
            strict: StrictChecks {
                ellipse: true,
                rectangle: true,
                polygon: true,
            },
            ..Self::default()
        }
    }
}

impl Default for RegularizeConfig {
    fn default() -> Self {
        Self {
            geometric_tolerance: 0.01,
            strict: StrictChecks::default(),
            rounded_min_fill: 0.85,
            polygon_angle_tolerance: 0.1,
            star_area_ratio: 0.8,
            symmetry: SymmetryConfig::default(),
            morphology: MorphologyConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

/// Opt-in residual verification for the ellipse, rectangle and polygon stages.
///
/// With everything off, ellipses (≥5 points) and rectangles are accepted as
/// soon as a fit exists, so later stages are only reached by inputs those
/// fits cannot handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrictChecks {
    /// Max Sampson distance / semi-minor axis must stay below tolerance.
    pub ellipse: bool,
    /// Max point-to-boundary distance / shorter side must stay below tolerance.
    pub rectangle: bool,
    /// Polygon must be convex with near-equal interior angles.
    pub polygon: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SymmetryConfig {
    /// Absolute per-coordinate match bound. Not scale-invariant.
    pub tolerance: f64,
    /// Inputs longer than this skip the O(n²) rotational test.
    pub max_points: usize,
    /// Whether offset 0 counts as a rotational match.
    pub include_trivial_rotation: bool,
}

impl Default for SymmetryConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-2,
            max_points: 4096,
            include_trivial_rotation: true,
        }
    }
}

/// One morphological stage: square structuring element of side
/// `kernel_size` applied `iterations` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphStage {
    pub kernel_size: u8,
    pub iterations: u32,
}

impl MorphStage {
    pub const fn new(kernel_size: u8, iterations: u32) -> Self {
        Self {
            kernel_size,
            iterations,
        }
    }

    /// Chebyshev radius of the element. Even sizes round up to the next odd side.
    pub fn radius(&self) -> u8 {
        self.kernel_size / 2
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    /// Pixels brighter than this are foreground.
    pub threshold: u8,
    /// Noise removal.
    pub erode: MorphStage,
    /// Regrowth.
    pub dilate: MorphStage,
    /// Gap bridging.
    pub close: MorphStage,
    /// Boundary absorption.
    pub final_dilate: MorphStage,
    /// Union the result with the filled convex hull of its contours.
    pub hull_union: bool,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            threshold: 127,
            erode: MorphStage::new(5, 1),
            dilate: MorphStage::new(5, 3),
            close: MorphStage::new(15, 1),
            final_dilate: MorphStage::new(5, 2),
            hull_union: false,
        }
    }
}

/// Parameters of the collect-all raster detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Shape kinds to look for.
    pub kinds: BTreeSet<ShapeKind>,
    /// Gaussian blur sigma applied before edge detection (0 = off).
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Contours enclosing less area (px²) are ignored.
    pub min_contour_area: f64,
    /// Polygon approximation epsilon as a fraction of contour perimeter.
    pub approx_epsilon_ratio: f64,
    /// Rounded rectangles fill less than this fraction of their hull.
    pub rounded_area_ratio: f64,
    /// Stars fill less than this fraction of their hull.
    pub star_area_ratio: f64,
    /// Circles must enclose at least this area (px²).
    pub circle_min_area: f64,
    /// Open interval of accepted circularity `4π·area/perimeter²`.
    pub circularity_range: (f64, f64),
    /// Max deviation (radians) of any polygon angle from the mean.
    pub polygon_angle_tolerance: f64,
    /// Hough accumulator votes needed for a line.
    pub hough_vote_threshold: u32,
    /// Non-maximum suppression radius in Hough space.
    pub hough_suppression_radius: u32,
    /// Shortest line segment reported (px).
    pub min_line_length: f64,
    /// Longest run of missing edge pixels bridged inside a segment (px).
    pub max_line_gap: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            kinds: ShapeKind::ALL.iter().copied().collect(),
            blur_sigma: 1.1,
            canny_low: 50.0,
            canny_high: 150.0,
            min_contour_area: 100.0,
            approx_epsilon_ratio: 0.02,
            rounded_area_ratio: 0.9,
            star_area_ratio: 0.8,
            circle_min_area: 350_000.0,
            circularity_range: (0.7, 1.2),
            polygon_angle_tolerance: 0.1,
            hough_vote_threshold: 50,
            hough_suppression_radius: 8,
            min_line_length: 100.0,
            max_line_gap: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn morph_radius_matches_kernel_side() {
        assert_eq!(MorphStage::new(5, 1).radius(), 2);
        assert_eq!(MorphStage::new(15, 1).radius(), 7);
        assert_eq!(MorphStage::new(20, 1).radius(), 10);
    }

    #[test]
    fn partial_preset_fills_defaults() {
        let config: RegularizeConfig =
            serde_json::from_str(r#"{ "geometric_tolerance": 0.5, "symmetry": { "tolerance": 2.0 } }"#)
                .unwrap();
        assert_eq!(config.geometric_tolerance, 0.5);
        assert_eq!(config.symmetry.tolerance, 2.0);
        assert_eq!(config.symmetry.max_points, 4096);
        assert_eq!(config.morphology.close, MorphStage::new(15, 1));
        assert!(!config.strict.ellipse);
    }
}
