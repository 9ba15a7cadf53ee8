//! Fast SIMD-accelerated grayscale resampling.
//!
//! Uses the fast_image_resize crate, which picks AVX2/NEON when available.
//! Output is deterministic for identical input, which fingerprint
//! reproducibility depends on.

use crate::error::HashError;
use fast_image_resize::{images::Image, PixelType, ResizeOptions, Resizer};
use image::{GrayImage, ImageBuffer, Luma};

/// Grayscale resampler using SIMD acceleration
pub struct FastResizer {
    resizer: Resizer,
}

impl FastResizer {
    /// Create a new fast resizer
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Resample grayscale samples to exactly `width` x `height`.
    pub fn resample(
        &mut self,
        samples: &GrayImage,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, HashError> {
        let (src_width, src_height) = samples.dimensions();

        if src_width == 0 || src_height == 0 {
            return Err(HashError::InvalidDimensions {
                width: src_width,
                height: src_height,
            });
        }

        if width == 0 || height == 0 {
            return Err(HashError::InvalidDimensions { width, height });
        }

        if (src_width, src_height) == (width, height) {
            return Ok(samples.clone());
        }

        let src_image =
            Image::from_vec_u8(src_width, src_height, samples.as_raw().clone(), PixelType::U8)
                .map_err(|e| {
                    HashError::ResampleFailed(format!("Failed to create source image: {}", e))
                })?;

        let mut dst_image = Image::new(width, height, PixelType::U8);

        // Bilinear is a good balance of speed and quality for fingerprints
        let options = ResizeOptions::new().resize_alg(fast_image_resize::ResizeAlg::Convolution(
            fast_image_resize::FilterType::Bilinear,
        ));

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| HashError::ResampleFailed(format!("Resize failed: {}", e)))?;

        let result_buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width, height, dst_image.into_vec()).ok_or_else(|| {
                HashError::ResampleFailed("Failed to create result buffer".to_string())
            })?;

        Ok(result_buffer)
    }
}

impl Default for FastResizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function for one-off resampling
pub fn resample(samples: &GrayImage, width: u32, height: u32) -> Result<GrayImage, HashError> {
    let mut resizer = FastResizer::new();
    resizer.resample(samples, width, height)
}
