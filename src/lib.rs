//! doodlefit: freehand curves and scanned masks → canonical geometry.
//!
//! Classifies hand-drawn polylines into lines, circles, ellipses,
//! rectangles, polygons and stars, reports their symmetry, and completes
//! partially occluded silhouettes.
//!
//! # Example
//!
//! ```
//! use doodlefit::{analyze_shape, classify, Polyline, PrimitiveShape, RegularizeConfig};
//!
//! let config = RegularizeConfig::default();
//! let stroke = Polyline::from_xy(&[(0.0, 0.0), (5.0, 0.001), (10.0, 0.0)])?;
//! let shape = classify(&stroke, &config);
//! assert!(matches!(shape, PrimitiveShape::Line { .. }));
//! // Lines carry no symmetry verdict.
//! assert!(analyze_shape(&shape, &config.symmetry).is_none());
//! # Ok::<(), doodlefit::RegularizeError>(())
//! ```

#![forbid(unsafe_code)]

mod bitmap;
mod contour;
mod geom;

pub mod classify;
pub mod completion;
pub mod config;
pub mod error;
pub mod io;
pub mod render;
pub mod shape;
pub mod symmetry;

// Re-export kurbo so downstream users get the same `Point` type.
pub use kurbo;

pub use bitmap::{load_gray, RasterMask};
pub use classify::detect::{detect_shapes, DetectedShapes};
pub use classify::{classify, classify_batch, classify_with_tolerance};
pub use completion::{
    complete_curve, complete_curves, complete_mask, complete_mask_staged, recover_intensity,
    MaskStages,
};
pub use config::{
    DetectionConfig, MorphStage, MorphologyConfig, RegularizeConfig, StrictChecks, SymmetryConfig,
};
pub use error::{FitError, RegularizeError};
pub use shape::{Polyline, PrimitiveShape, ShapeKind};
pub use symmetry::{
    analyze_batch, analyze_shape, analyze_symmetry, OrderedSymmetry, SymmetryReport,
    SymmetryTester,
};
