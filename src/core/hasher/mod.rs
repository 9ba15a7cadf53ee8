//! # Hasher Module
//!
//! Computes perceptual fingerprints for images.
//!
//! ## Supported Methods
//! - **aHash (Average Hash)** - Fastest, good for exact duplicates
//! - **dHash (Difference Hash)** - Compares brightness gradients
//! - **pHash (Perceptual Hash)** - DCT-based, most robust to edits
//!
//! ## How It Works
//! 1. Decode to grayscale (`PixelSource::decode`)
//! 2. Resample to a small grid sized by the size factor
//! 3. Compute bits from sample relationships
//! 4. Compare fingerprints using Hamming distance
//!
//! Every method yields size_factor² bits, so fingerprints computed with the
//! same method and size factor are always comparable.
//!
//! ## Example
//! ```rust,ignore
//! use image_sorter::core::hasher::{FingerprintEngine, FingerprintMethod, ImageSource};
//!
//! let engine = FingerprintEngine::new(8);
//! let source = ImageSource::new();
//! let samples = source.decode(&path)?;
//! let fingerprint = engine.compute(FingerprintMethod::Perceptual, &samples, &source)?;
//! ```

mod algorithms;
pub mod fast_decode;
pub mod fast_resize;
mod source;
mod traits;

pub use algorithms::{AverageHasher, DifferenceHasher, PerceptualHasher};
pub use source::{ImageSource, PixelSource};
pub use traits::{
    hamming_distance, Fingerprint, FingerprintMethod, HashAlgorithm,
    MISSING_FINGERPRINT_DISTANCE,
};

use crate::core::record::FingerprintSet;
use crate::error::HashError;
use image::GrayImage;

/// One hasher per method, all sharing a size factor
pub struct FingerprintEngine {
    size_factor: u32,
    average: AverageHasher,
    difference: DifferenceHasher,
    perceptual: PerceptualHasher,
}

impl FingerprintEngine {
    /// Create an engine for the given size factor
    pub fn new(size_factor: u32) -> Self {
        Self {
            size_factor,
            average: AverageHasher::new(size_factor),
            difference: DifferenceHasher::new(size_factor),
            perceptual: PerceptualHasher::new(size_factor),
        }
    }

    pub fn size_factor(&self) -> u32 {
        self.size_factor
    }

    /// Bit width of every fingerprint this engine produces
    pub fn bit_len(&self) -> u32 {
        self.size_factor * self.size_factor
    }

    /// The hasher implementing `method`
    pub fn hasher(&self, method: FingerprintMethod) -> &dyn HashAlgorithm {
        match method {
            FingerprintMethod::Average => &self.average,
            FingerprintMethod::Difference => &self.difference,
            FingerprintMethod::Perceptual => &self.perceptual,
        }
    }

    /// Compute one method's fingerprint from decoded samples
    pub fn compute(
        &self,
        method: FingerprintMethod,
        image: &GrayImage,
        source: &dyn PixelSource,
    ) -> Result<Fingerprint, HashError> {
        self.hasher(method).hash_image(image, source)
    }

    /// Fill in every method missing from `set`.
    ///
    /// Returns how many fingerprints were computed.
    pub fn complete(
        &self,
        set: &mut FingerprintSet,
        image: &GrayImage,
        source: &dyn PixelSource,
    ) -> Result<usize, HashError> {
        let mut computed = 0;
        for method in FingerprintMethod::ALL {
            if set.get(method).is_none() {
                set.insert(method, self.compute(method, image, source)?);
                computed += 1;
            }
        }
        Ok(computed)
    }
}
