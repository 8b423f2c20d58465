use thiserror::Error;

/// Errors surfaced to callers of the library and the binary.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RegularizeError {
    #[error("failed to load image: {0}")]
    ImageLoad(String),

    #[error("image is {got:?} but mask is {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },

    #[error("polyline must contain at least one point")]
    EmptyPolyline,

    #[error("point {index} has a non-finite coordinate")]
    NonFinite { index: usize },

    #[error("malformed point file at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("export failed: {0}")]
    Export(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single fit-then-verify stage declined its input.
///
/// Never returned by [`crate::classify`]: the cascade logs the reason and
/// moves on to the next stage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("need at least {needed} points, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("degenerate geometry: {0}")]
    Degenerate(&'static str),

    #[error("residual {residual:.5} exceeds tolerance {tolerance:.5}")]
    Rejected { residual: f64, tolerance: f64 },

    #[error("no match: {0}")]
    NoMatch(&'static str),
}

impl FitError {
    /// Guard used at the top of every stage.
    pub(crate) fn require(needed: usize, got: usize) -> Result<(), FitError> {
        if got < needed {
            Err(FitError::TooFewPoints { needed, got })
        } else {
            Ok(())
        }
    }
}
