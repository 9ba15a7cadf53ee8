//! Fast grayscale decoding with format-specific optimizations.
//!
//! Uses zune-jpeg for JPEG files, decoding straight to luma,
//! and falls back to the image crate for other formats.

use crate::error::InputError;
use image::{GrayImage, ImageBuffer, Luma};
use std::fs;
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Formats with a dedicated decode path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFormat {
    Jpeg,
    Other,
}

impl DecodeFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("jpg" | "jpeg") => Self::Jpeg,
            _ => Self::Other,
        }
    }
}

/// Grayscale decoder that picks the fastest decoder per format
pub struct FastDecoder;

impl FastDecoder {
    /// Decode an image file to 8-bit grayscale samples.
    pub fn decode(path: &Path) -> Result<GrayImage, InputError> {
        if !path.exists() {
            return Err(InputError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let image = match DecodeFormat::from_path(path) {
            DecodeFormat::Jpeg => {
                Self::decode_jpeg(path).or_else(|_| Self::decode_fallback(path))?
            }
            DecodeFormat::Other => Self::decode_fallback(path)?,
        };

        if image.width() == 0 || image.height() == 0 {
            return Err(InputError::EmptyImage {
                path: path.to_path_buf(),
            });
        }

        Ok(image)
    }

    /// JPEG decoding using zune-jpeg with luma output
    fn decode_jpeg(path: &Path) -> Result<GrayImage, InputError> {
        let file_bytes = fs::read(path).map_err(|e| InputError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;

        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::Luma);
        let mut decoder = JpegDecoder::new_with_options(&file_bytes, options);

        let pixels = decoder.decode().map_err(|e| InputError::Decode {
            path: path.to_path_buf(),
            reason: format!("zune-jpeg decode failed: {:?}", e),
        })?;

        let info = decoder.info().ok_or_else(|| InputError::Decode {
            path: path.to_path_buf(),
            reason: "Failed to get image info".to_string(),
        })?;

        // Anything but single-channel output goes through the image crate
        if decoder.get_output_colorspace() != Some(ColorSpace::Luma) {
            return Self::decode_fallback(path);
        }

        let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_raw(info.width as u32, info.height as u32, pixels).ok_or_else(
                || InputError::Decode {
                    path: path.to_path_buf(),
                    reason: "Failed to create Luma buffer".to_string(),
                },
            )?;

        Ok(buffer)
    }

    /// Fallback to the image crate for everything else
    fn decode_fallback(path: &Path) -> Result<GrayImage, InputError> {
        let image = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(source) => InputError::Unreadable {
                path: path.to_path_buf(),
                source,
            },
            other => InputError::Decode {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;

        Ok(image.to_luma8())
    }
}
