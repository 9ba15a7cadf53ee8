//! Fingerprint values, methods and the hashing trait.

use super::source::PixelSource;
use crate::error::HashError;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Distance reported when either side has no fingerprint for the method.
///
/// Never treated as a match, whatever the precision.
pub const MISSING_FINGERPRINT_DISTANCE: u32 = u32::MAX;

/// Available fingerprint methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FingerprintMethod {
    /// Average Hash (aHash) - samples compared to the mean brightness
    Average,
    /// Difference Hash (dHash) - horizontal brightness gradients
    Difference,
    /// Perceptual Hash (pHash) - low-frequency cosine coefficients
    Perceptual,
}

impl FingerprintMethod {
    /// Every method, in storage column order
    pub const ALL: [FingerprintMethod; 3] = [
        FingerprintMethod::Average,
        FingerprintMethod::Perceptual,
        FingerprintMethod::Difference,
    ];

    /// Get a human-readable description of the method
    pub fn description(&self) -> &'static str {
        match self {
            FingerprintMethod::Average => {
                "Average Hash (aHash) - Fast comparison based on average brightness"
            }
            FingerprintMethod::Difference => {
                "Difference Hash (dHash) - Compares brightness gradients between pixels"
            }
            FingerprintMethod::Perceptual => {
                "Perceptual Hash (pHash) - DCT-based, robust to edits and transformations"
            }
        }
    }
}

impl std::fmt::Display for FingerprintMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FingerprintMethod::Average => write!(f, "aHash"),
            FingerprintMethod::Difference => write!(f, "dHash"),
            FingerprintMethod::Perceptual => write!(f, "pHash"),
        }
    }
}

/// A fixed-width bit vector.
///
/// Bit `i` carries weight `2^i` in the packed integer; bytes are stored
/// least significant first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    bytes: Vec<u8>,
    bits: u32,
}

impl Fingerprint {
    /// Pack bits in order: the first bit yielded becomes bit 0.
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        let mut bytes = Vec::new();
        let mut count: u32 = 0;

        for bit in bits {
            let index = (count / 8) as usize;
            if index == bytes.len() {
                bytes.push(0u8);
            }
            if bit {
                bytes[index] |= 1 << (count % 8);
            }
            count += 1;
        }

        Self { bytes, bits: count }
    }

    /// Parse the canonical hex form for a fingerprint of `bits` bits.
    ///
    /// Accepts an optional `0x` prefix and missing leading zeros.
    pub fn from_hex(text: &str, bits: u32) -> Result<Self, HashError> {
        let invalid = || HashError::InvalidHex {
            text: text.to_string(),
            bits,
        };

        let digits = text.strip_prefix("0x").unwrap_or(text);
        if digits.len() > bits.div_ceil(4) as usize
            || !digits.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(invalid());
        }

        let byte_count = bits.div_ceil(8) as usize;
        let padded = format!("{:0>width$}", digits, width = byte_count * 2);

        let mut bytes = Vec::with_capacity(byte_count);
        for pair in padded.as_bytes().rchunks(2) {
            let pair = std::str::from_utf8(pair).map_err(|_| invalid())?;
            bytes.push(u8::from_str_radix(pair, 16).map_err(|_| invalid())?);
        }

        // No bit at or beyond `bits` may be set
        let tail = bits % 8;
        if tail != 0 {
            if let Some(last) = bytes.last() {
                if last >> tail != 0 {
                    return Err(invalid());
                }
            }
        }

        Ok(Self { bytes, bits })
    }

    /// Number of bits in this fingerprint
    pub fn bit_len(&self) -> u32 {
        self.bits
    }

    /// Value of bit `index` (false when out of range)
    pub fn bit(&self, index: u32) -> bool {
        if index >= self.bits {
            return false;
        }
        self.bytes[(index / 8) as usize] & (1 << (index % 8)) != 0
    }

    /// Raw packed bytes, least significant first
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Canonical lowercase hex, zero-padded to `ceil(bits / 4)` digits
    pub fn to_hex(&self) -> String {
        let digits = self.bits.div_ceil(4) as usize;
        let full: String = self
            .bytes
            .iter()
            .rev()
            .map(|b| format!("{:02x}", b))
            .collect();
        full[full.len() - digits..].to_string()
    }

    /// Hamming distance to a fingerprint of the same width
    pub fn distance(&self, other: &Self) -> Result<u32, HashError> {
        if self.bits != other.bits {
            return Err(HashError::LengthMismatch {
                left: self.bits,
                right: other.bits,
            });
        }

        Ok(self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// Distance between two possibly-absent fingerprints.
///
/// Absent on either side yields [`MISSING_FINGERPRINT_DISTANCE`]; present on
/// both sides with different widths is an error.
pub fn hamming_distance(
    a: Option<&Fingerprint>,
    b: Option<&Fingerprint>,
) -> Result<u32, HashError> {
    match (a, b) {
        (Some(a), Some(b)) => a.distance(b),
        _ => Ok(MISSING_FINGERPRINT_DISTANCE),
    }
}

/// Trait for fingerprint algorithm implementations
pub trait HashAlgorithm: Send + Sync {
    /// Get the method this algorithm implements
    fn kind(&self) -> FingerprintMethod;

    /// Width and height the samples are resampled to before hashing
    fn sample_dimensions(&self) -> (u32, u32);

    /// Hash samples that are already at [`HashAlgorithm::sample_dimensions`]
    fn hash_samples(&self, samples: &GrayImage) -> Result<Fingerprint, HashError>;

    /// Resample a decoded grayscale image and hash it
    fn hash_image(
        &self,
        image: &GrayImage,
        source: &dyn PixelSource,
    ) -> Result<Fingerprint, HashError> {
        let (width, height) = self.sample_dimensions();
        let samples = source.resample(image, width, height)?;
        self.hash_samples(&samples)
    }
}

/// Reject samples that do not match the algorithm's resample grid
pub(crate) fn check_dimensions(
    samples: &GrayImage,
    expected: (u32, u32),
) -> Result<(), HashError> {
    if samples.dimensions() != expected {
        let (width, height) = samples.dimensions();
        return Err(HashError::InvalidDimensions { width, height });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(bits: &[u8]) -> Fingerprint {
        Fingerprint::from_bits(bits.iter().map(|&b| b == 1))
    }

    #[test]
    fn distance_to_self_is_zero() {
        let fp = fingerprint(&[1, 0, 1, 1, 0, 0, 1, 0, 1, 1]);
        assert_eq!(fp.distance(&fp).unwrap(), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = fingerprint(&[1, 1, 0, 0, 1, 0, 1, 0]);
        let b = fingerprint(&[0, 1, 1, 0, 1, 1, 1, 0]);
        assert_eq!(a.distance(&b).unwrap(), b.distance(&a).unwrap());
        assert_eq!(a.distance(&b).unwrap(), 3);
    }

    #[test]
    fn distance_rejects_different_widths() {
        let a = fingerprint(&[1, 0, 1, 0]);
        let b = fingerprint(&[1, 0, 1, 0, 1]);
        let err = a.distance(&b).unwrap_err();
        assert!(matches!(err, HashError::LengthMismatch { left: 4, right: 5 }));
    }

    #[test]
    fn absent_fingerprint_yields_sentinel() {
        let a = fingerprint(&[1, 1, 1, 1]);
        assert_eq!(
            hamming_distance(Some(&a), None).unwrap(),
            MISSING_FINGERPRINT_DISTANCE
        );
        assert_eq!(
            hamming_distance(None, Some(&a)).unwrap(),
            MISSING_FINGERPRINT_DISTANCE
        );
        assert_eq!(
            hamming_distance(None, None).unwrap(),
            MISSING_FINGERPRINT_DISTANCE
        );
    }

    #[test]
    fn bit_i_has_weight_two_to_the_i() {
        // bits 0 and 4 set -> 0x11
        let fp = fingerprint(&[1, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(fp.to_hex(), "11");
        assert!(fp.bit(0));
        assert!(fp.bit(4));
        assert!(!fp.bit(7));
    }

    #[test]
    fn hex_is_zero_padded_to_width() {
        let fp = Fingerprint::from_bits(std::iter::repeat(false).take(64));
        assert_eq!(fp.to_hex(), "0000000000000000");

        let mut bits = vec![false; 10];
        bits[9] = true;
        // 2^9 = 0x200, three digits for ten bits
        assert_eq!(Fingerprint::from_bits(bits).to_hex(), "200");
    }

    #[test]
    fn hex_parses_back_bit_identical() {
        let fp = fingerprint(&[1, 0, 1, 1, 0, 0, 1, 0, 1, 1, 1, 0, 0, 1]);
        let parsed = Fingerprint::from_hex(&fp.to_hex(), fp.bit_len()).unwrap();
        assert_eq!(parsed, fp);

        let prefixed = Fingerprint::from_hex("0x2", 4).unwrap();
        assert!(prefixed.bit(1));
    }

    #[test]
    fn hex_rejects_bits_beyond_width() {
        assert!(Fingerprint::from_hex("1f", 4).is_err());
        assert!(Fingerprint::from_hex("10", 4).is_err());
        assert!(Fingerprint::from_hex("zz", 8).is_err());
    }

    #[test]
    fn method_display() {
        assert_eq!(FingerprintMethod::Average.to_string(), "aHash");
        assert_eq!(FingerprintMethod::Difference.to_string(), "dHash");
        assert_eq!(FingerprintMethod::Perceptual.to_string(), "pHash");
    }
}
