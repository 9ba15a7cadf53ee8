//! Pixel source: decode to grayscale, resample.

use super::fast_decode::FastDecoder;
use super::fast_resize;
use crate::error::{HashError, InputError};
use image::GrayImage;
use std::path::Path;

/// Supplies grayscale samples to the fingerprint engine.
///
/// Implementations must be deterministic: the same file (or the same
/// samples) must always produce the same output, otherwise cached
/// fingerprints stop being comparable across runs.
pub trait PixelSource: Send + Sync {
    /// Decode a file to 8-bit grayscale samples
    fn decode(&self, path: &Path) -> Result<GrayImage, InputError>;

    /// Resample grayscale samples to exactly `width` x `height`
    fn resample(&self, samples: &GrayImage, width: u32, height: u32)
        -> Result<GrayImage, HashError>;
}

/// Default pixel source backed by zune-jpeg, the image crate and
/// fast_image_resize
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageSource;

impl ImageSource {
    pub fn new() -> Self {
        Self
    }
}

impl PixelSource for ImageSource {
    fn decode(&self, path: &Path) -> Result<GrayImage, InputError> {
        FastDecoder::decode(path)
    }

    fn resample(
        &self,
        samples: &GrayImage,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, HashError> {
        fast_resize::resample(samples, width, height)
    }
}
