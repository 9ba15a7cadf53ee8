//! Perceptual Hash (pHash) implementation.
//!
//! pHash uses a Discrete Cosine Transform to extract frequency information
//! from the image, which makes it robust to:
//! - Scaling
//! - Brightness/contrast changes
//! - Compression artifacts
//!
//! The image is resampled to M x M samples (M = 4 x size_factor) and only
//! the low-frequency size_factor x size_factor block of the 2D DCT-II is
//! computed. Each coefficient is compared to the mean of the block with the
//! DC term left out of the mean (but kept in the output bits).
//!
//! The transform is evaluated separably, down the columns and then along
//! the rows, against a precomputed cosine table. That is O(n·M² + n²·M) instead of the
//! O(n²·M²) direct double sum, with the same result up to rounding.

use super::super::traits::{check_dimensions, Fingerprint, FingerprintMethod, HashAlgorithm};
use crate::error::HashError;
use image::GrayImage;
use std::f64::consts::PI;

/// Perceptual Hash (pHash) implementation using a truncated DCT
pub struct PerceptualHasher {
    /// Side of the retained low-frequency block
    size_factor: u32,
    /// Side of the resample grid
    resolution: u32,
    /// `cos((2k+1)·i·π / 2M)` indexed `[i * M + k]`, i < size_factor
    cosines: Vec<f64>,
}

impl PerceptualHasher {
    /// Create a new pHash hasher
    pub fn new(size_factor: u32) -> Self {
        let resolution = size_factor * 4;
        let m = resolution as usize;
        let n = size_factor as usize;

        let mut cosines = Vec::with_capacity(n * m);
        for i in 0..n {
            for k in 0..m {
                let angle = ((2 * k + 1) * i) as f64 * PI / (2 * m) as f64;
                cosines.push(angle.cos());
            }
        }

        Self {
            size_factor,
            resolution,
            cosines,
        }
    }

    /// Low-frequency DCT coefficients, row-major, size_factor² of them
    pub fn coefficients(&self, samples: &GrayImage) -> Result<Vec<f64>, HashError> {
        check_dimensions(samples, self.sample_dimensions())?;

        let m = self.resolution as usize;
        let n = self.size_factor as usize;
        let raw = samples.as_raw();

        // partial[i][l] = Σ_k sample[k][l] · cos_i(k)
        let mut partial = vec![0.0f64; n * m];
        for i in 0..n {
            let cos_i = &self.cosines[i * m..(i + 1) * m];
            let row = &mut partial[i * m..(i + 1) * m];
            for (k, &weight) in cos_i.iter().enumerate() {
                let samples_k = &raw[k * m..(k + 1) * m];
                for (acc, &sample) in row.iter_mut().zip(samples_k) {
                    *acc += sample as f64 * weight;
                }
            }
        }

        let scale = |index: usize| {
            if index == 0 {
                1.0 / (m as f64).sqrt()
            } else {
                2f64.sqrt() / (m as f64).sqrt()
            }
        };

        let mut output = Vec::with_capacity(n * n);
        for i in 0..n {
            let row = &partial[i * m..(i + 1) * m];
            for j in 0..n {
                let cos_j = &self.cosines[j * m..(j + 1) * m];
                let sum: f64 = row.iter().zip(cos_j).map(|(p, c)| p * c).sum();
                output.push(scale(i) * scale(j) * sum);
            }
        }

        Ok(output)
    }
}

impl HashAlgorithm for PerceptualHasher {
    fn kind(&self) -> FingerprintMethod {
        FingerprintMethod::Perceptual
    }

    fn sample_dimensions(&self) -> (u32, u32) {
        (self.resolution, self.resolution)
    }

    fn hash_samples(&self, samples: &GrayImage) -> Result<Fingerprint, HashError> {
        let coefficients = self.coefficients(samples)?;

        // DC at index 0 is left out of the mean only
        let ac_count = coefficients.len().saturating_sub(1).max(1);
        let mean = coefficients.iter().skip(1).sum::<f64>() / ac_count as f64;

        Ok(Fingerprint::from_bits(coefficients.iter().map(|&c| c >= mean)))
    }
}
