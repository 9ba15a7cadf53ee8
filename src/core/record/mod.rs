//! # Record Module
//!
//! Per-image state carried through a batch.
//!
//! - `ContentId` - digest of the decoded grayscale samples
//! - `FingerprintSet` - fingerprints for one size factor
//! - `ExclusionPair` - canonical pair of identities that never group
//! - `ImageRecord` - everything known about one input file

use crate::core::hasher::{Fingerprint, FingerprintMethod};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::Xxh3;

/// Content identity of an image.
///
/// A 128-bit XXH3 digest over the decoded grayscale image (dimensions and
/// samples), as 32 lowercase hex digits. The file name plays no part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Digest decoded grayscale samples
    pub fn from_samples(samples: &GrayImage) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(&samples.width().to_le_bytes());
        hasher.update(&samples.height().to_le_bytes());
        hasher.update(samples.as_raw());
        Self(format!("{:032x}", hasher.digest128()))
    }

    /// Wrap an identity read back from a store
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` hex digits, for directory names and logs
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprints computed at a single size factor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintSet {
    pub size_factor: u32,
    pub average: Option<Fingerprint>,
    pub perceptual: Option<Fingerprint>,
    pub difference: Option<Fingerprint>,
}

impl FingerprintSet {
    /// An empty set for `size_factor`
    pub fn new(size_factor: u32) -> Self {
        Self {
            size_factor,
            average: None,
            perceptual: None,
            difference: None,
        }
    }

    pub fn get(&self, method: FingerprintMethod) -> Option<&Fingerprint> {
        match method {
            FingerprintMethod::Average => self.average.as_ref(),
            FingerprintMethod::Perceptual => self.perceptual.as_ref(),
            FingerprintMethod::Difference => self.difference.as_ref(),
        }
    }

    pub fn insert(&mut self, method: FingerprintMethod, fingerprint: Fingerprint) {
        let slot = match method {
            FingerprintMethod::Average => &mut self.average,
            FingerprintMethod::Perceptual => &mut self.perceptual,
            FingerprintMethod::Difference => &mut self.difference,
        };
        *slot = Some(fingerprint);
    }

    /// True when every method is present
    pub fn is_complete(&self) -> bool {
        FingerprintMethod::ALL.iter().all(|&m| self.get(m).is_some())
    }

    pub fn is_empty(&self) -> bool {
        FingerprintMethod::ALL.iter().all(|&m| self.get(m).is_none())
    }
}

/// An unordered pair of identities, smaller identity first
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExclusionPair {
    first: ContentId,
    second: ContentId,
}

impl ExclusionPair {
    /// Canonicalize `a` and `b` into lexicographic order
    pub fn new(a: ContentId, b: ContentId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> &ContentId {
        &self.first
    }

    pub fn second(&self) -> &ContentId {
        &self.second
    }

    /// The other side of the pair, if `id` is one side
    pub fn partner(&self, id: &ContentId) -> Option<&ContentId> {
        if &self.first == id {
            Some(&self.second)
        } else if &self.second == id {
            Some(&self.first)
        } else {
            None
        }
    }
}

/// Everything known about one input file during a batch
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Content identity of the decoded pixels
    pub id: ContentId,
    /// File name within the working directory
    pub name: String,
    /// Current location on disk
    pub path: PathBuf,
    /// Decoded dimensions
    pub width: u32,
    pub height: u32,
    /// Fingerprints at the batch's size factor
    pub fingerprints: FingerprintSet,
    /// Already known to the store
    pub exists: bool,
    /// Known to the store under a different name
    pub copy: bool,
    /// Fingerprints for this size factor came from the store
    pub cache_hit: bool,
    /// Arena indices of records with the same identity
    pub exact_duplicates: Vec<usize>,
    /// Identities this record must never be grouped with
    pub ignore: HashSet<ContentId>,
    /// Written to the store during this batch
    pub persisted: bool,
}

impl ImageRecord {
    /// Create a record for freshly decoded samples
    pub fn new(path: &Path, samples: &GrayImage, size_factor: u32) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            id: ContentId::from_samples(samples),
            name,
            path: path.to_path_buf(),
            width: samples.width(),
            height: samples.height(),
            fingerprints: FingerprintSet::new(size_factor),
            exists: false,
            copy: false,
            cache_hit: false,
            exact_duplicates: Vec::new(),
            ignore: HashSet::new(),
            persisted: false,
        }
    }

    pub fn size_factor(&self) -> u32 {
        self.fingerprints.size_factor
    }

    /// Fingerprint for `method`, if computed or loaded
    pub fn fingerprint(&self, method: FingerprintMethod) -> Option<&Fingerprint> {
        self.fingerprints.get(method)
    }

    /// True if `other` is in this record's ignore set, or vice versa
    pub fn excludes(&self, other: &ImageRecord) -> bool {
        self.ignore.contains(&other.id) || other.ignore.contains(&self.id)
    }

    /// Nothing to write: known to the store with fingerprints at this size factor
    pub fn needs_persisting(&self) -> bool {
        !(self.exists && self.cache_hit)
    }
}
