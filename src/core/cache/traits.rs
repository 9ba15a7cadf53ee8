//! Store backend trait definition.

use super::{StoreStats, StoredImage};
use crate::core::record::{ContentId, FingerprintSet};
use crate::error::StoreError;
use std::collections::{HashMap, HashSet};

/// Trait for fingerprint/exclusion stores.
///
/// Implementations must be safe for concurrent callers: fingerprint tasks
/// query the store in parallel, and persistence writes records in parallel.
pub trait FingerprintStore: Send + Sync {
    /// Look up an image by identity
    fn find(&self, id: &ContentId) -> Result<Option<StoredImage>, StoreError>;

    /// All fingerprint sets stored for an identity, keyed by size factor
    fn find_fingerprints(&self, id: &ContentId) -> Result<HashMap<u32, FingerprintSet>, StoreError>;

    /// Identities that must never be grouped with `id`
    fn find_exclusions(&self, id: &ContentId) -> Result<HashSet<ContentId>, StoreError>;

    /// Remember an image; an existing row for the identity is left as is
    fn save_image(
        &self,
        id: &ContentId,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<(), StoreError>;

    /// Store (or replace) the fingerprint set for `(id, size_factor)`
    fn save_fingerprints(
        &self,
        id: &ContentId,
        size_factor: u32,
        fingerprints: &FingerprintSet,
    ) -> Result<(), StoreError>;

    /// Record that `a` and `b` never group.
    ///
    /// Stored in canonical order; saving the same pair twice is a no-op.
    fn save_exclusion(&self, a: &ContentId, b: &ContentId) -> Result<(), StoreError>;

    /// Get store statistics
    fn stats(&self) -> Result<StoreStats, StoreError>;

    /// Remove every image, fingerprint and exclusion
    fn clear(&self) -> Result<(), StoreError>;
}
