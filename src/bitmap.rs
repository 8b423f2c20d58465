use std::path::Path;

use image::{GrayImage, ImageReader};
use imageproc::contrast::{threshold, ThresholdType};

use crate::error::RegularizeError;

/// Binary raster mask: foreground pixels are 255, background 0.
///
/// Dimensions are fixed at construction; every operation that changes
/// pixels returns a new mask.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMask {
    pixels: GrayImage,
}

impl RasterMask {
    /// Threshold a grayscale image: pixels brighter than `level` are foreground.
    pub fn from_gray(image: &GrayImage, level: u8) -> Self {
        Self {
            pixels: threshold(image, level, ThresholdType::Binary),
        }
    }

    /// Load any supported image file and threshold its luma channel.
    pub fn load(path: &Path, level: u8) -> Result<Self, RegularizeError> {
        let image = load_gray(path)?;
        Ok(Self::from_gray(&image, level))
    }

    /// Wrap an image that is already binary (0 / 255).
    pub(crate) fn from_binary(pixels: GrayImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y).0[0] > 0
    }

    pub fn foreground_count(&self) -> usize {
        self.pixels.pixels().filter(|p| p.0[0] > 0).count()
    }

    /// Every foreground pixel of `self` is also foreground in `other`.
    pub fn is_subset_of(&self, other: &RasterMask) -> bool {
        self.dimensions() == other.dimensions()
            && self
                .pixels
                .pixels()
                .zip(other.pixels.pixels())
                .all(|(a, b)| a.0[0] == 0 || b.0[0] > 0)
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn into_image(self) -> GrayImage {
        self.pixels
    }
}

/// Decode an image file to 8-bit grayscale.
pub fn load_gray(path: &Path) -> Result<GrayImage, RegularizeError> {
    let image = ImageReader::open(path)
        .map_err(|e| RegularizeError::ImageLoad(format!("{}: {}", path.display(), e)))?
        .decode()
        .map_err(|e| RegularizeError::ImageLoad(format!("{}: {}", path.display(), e)))?
        .into_luma8();
    Ok(image)
}
