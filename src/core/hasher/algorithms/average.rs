//! Average Hash (aHash) implementation.
//!
//! aHash works by:
//! 1. Resampling the image to size_factor x size_factor
//! 2. Computing the mean brightness over all samples
//! 3. For each sample: 1 if at or above the mean, else 0
//!
//! This is the fastest fingerprint but the least robust to edits.

use super::super::traits::{check_dimensions, Fingerprint, FingerprintMethod, HashAlgorithm};
use crate::error::HashError;
use image::GrayImage;

/// Average Hash (aHash) implementation
pub struct AverageHasher {
    /// Side of the resample grid
    size_factor: u32,
}

impl AverageHasher {
    /// Create a new aHash hasher
    pub fn new(size_factor: u32) -> Self {
        Self { size_factor }
    }
}

impl HashAlgorithm for AverageHasher {
    fn kind(&self) -> FingerprintMethod {
        FingerprintMethod::Average
    }

    fn sample_dimensions(&self) -> (u32, u32) {
        (self.size_factor, self.size_factor)
    }

    fn hash_samples(&self, samples: &GrayImage) -> Result<Fingerprint, HashError> {
        check_dimensions(samples, self.sample_dimensions())?;

        let raw = samples.as_raw();
        let total: u64 = raw.iter().map(|&s| s as u64).sum();
        let mean = total as f64 / raw.len() as f64;

        Ok(Fingerprint::from_bits(raw.iter().map(|&s| s as f64 >= mean)))
    }
}
