//! Difference Hash (dHash) implementation.
//!
//! dHash works by:
//! 1. Resampling the image to (size_factor + 1) x size_factor
//! 2. Comparing each sample to the one on its left
//! 3. If the sample is brighter than its left neighbour, set bit to 1
//!
//! This captures the relative gradient of brightness changes. The grid is
//! tied to the base size factor, giving size_factor² bits like the other
//! methods.

use super::super::traits::{check_dimensions, Fingerprint, FingerprintMethod, HashAlgorithm};
use crate::error::HashError;
use image::GrayImage;

/// Difference Hash (dHash) implementation
pub struct DifferenceHasher {
    /// Rows of the comparison grid (columns are one wider)
    size_factor: u32,
}

impl DifferenceHasher {
    /// Create a new dHash hasher
    pub fn new(size_factor: u32) -> Self {
        Self { size_factor }
    }
}

impl HashAlgorithm for DifferenceHasher {
    fn kind(&self) -> FingerprintMethod {
        FingerprintMethod::Difference
    }

    fn sample_dimensions(&self) -> (u32, u32) {
        // One extra column so every row yields size_factor comparisons
        (self.size_factor + 1, self.size_factor)
    }

    fn hash_samples(&self, samples: &GrayImage) -> Result<Fingerprint, HashError> {
        check_dimensions(samples, self.sample_dimensions())?;

        let width = self.size_factor + 1;
        let bits = (0..self.size_factor).flat_map(move |y| {
            (1..width).map(move |x| samples.get_pixel(x, y)[0] > samples.get_pixel(x - 1, y)[0])
        });

        Ok(Fingerprint::from_bits(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn rising_rows_set_every_bit() {
        let hasher = DifferenceHasher::new(8);
        let samples = GrayImage::from_fn(9, 8, |x, _| Luma([(x * 20) as u8]));

        let fp = hasher.hash_samples(&samples).unwrap();

        assert_eq!(fp.bit_len(), 64);
        assert_eq!(fp.to_hex(), "ffffffffffffffff");
    }

    #[test]
    fn falling_rows_clear_every_bit() {
        let hasher = DifferenceHasher::new(8);
        let samples = GrayImage::from_fn(9, 8, |x, _| Luma([200 - (x * 20) as u8]));

        let fp = hasher.hash_samples(&samples).unwrap();

        assert_eq!(fp.to_hex(), "0000000000000000");
    }

    #[test]
    fn equal_neighbours_do_not_set_bits() {
        let hasher = DifferenceHasher::new(4);
        let samples = GrayImage::from_pixel(5, 4, Luma([77]));

        let fp = hasher.hash_samples(&samples).unwrap();

        assert_eq!(fp.to_hex(), "0000");
    }

    #[test]
    fn one_bit_per_adjacent_pair_in_row_order() {
        let hasher = DifferenceHasher::new(2);
        // row 0: 1 < 5 > 3 -> bits 1, 0 ; row 1: 9 > 2 < 4 -> bits 0, 1
        let rows = [[1u8, 5, 3], [9, 2, 4]];
        let samples = GrayImage::from_fn(3, 2, |x, y| Luma([rows[y as usize][x as usize]]));

        let fp = hasher.hash_samples(&samples).unwrap();

        assert!(fp.bit(0));
        assert!(!fp.bit(1));
        assert!(!fp.bit(2));
        assert!(fp.bit(3));
    }

    #[test]
    fn width_tracks_size_factor() {
        assert_eq!(DifferenceHasher::new(8).sample_dimensions(), (9, 8));
        assert_eq!(DifferenceHasher::new(16).sample_dimensions(), (17, 16));
    }
}
