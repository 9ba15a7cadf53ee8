//! In-memory store backend for testing.

use super::{FingerprintStore, StoreStats, StoredImage};
use crate::core::record::{ContentId, ExclusionPair, FingerprintSet};
use crate::error::StoreError;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    images: HashMap<ContentId, StoredImage>,
    fingerprints: HashMap<(ContentId, u32), FingerprintSet>,
    exclusions: HashSet<ExclusionPair>,
}

/// In-memory store backend
///
/// Useful for testing and for runs that share a store without touching disk.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintStore for InMemoryStore {
    fn find(&self, id: &ContentId) -> Result<Option<StoredImage>, StoreError> {
        Ok(self.read()?.images.get(id).cloned())
    }

    fn find_fingerprints(&self, id: &ContentId) -> Result<HashMap<u32, FingerprintSet>, StoreError> {
        let tables = self.read()?;

        Ok(tables
            .fingerprints
            .iter()
            .filter(|((identity, _), _)| identity == id)
            .map(|((_, size_factor), set)| (*size_factor, set.clone()))
            .collect())
    }

    fn find_exclusions(&self, id: &ContentId) -> Result<HashSet<ContentId>, StoreError> {
        let tables = self.read()?;

        Ok(tables
            .exclusions
            .iter()
            .filter_map(|pair| pair.partner(id).cloned())
            .collect())
    }

    fn save_image(
        &self,
        id: &ContentId,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<(), StoreError> {
        self.write()?
            .images
            .entry(id.clone())
            .or_insert_with(|| StoredImage {
                name: name.to_string(),
                width,
                height,
            });
        Ok(())
    }

    fn save_fingerprints(
        &self,
        id: &ContentId,
        size_factor: u32,
        fingerprints: &FingerprintSet,
    ) -> Result<(), StoreError> {
        self.write()?
            .fingerprints
            .insert((id.clone(), size_factor), fingerprints.clone());
        Ok(())
    }

    fn save_exclusion(&self, a: &ContentId, b: &ContentId) -> Result<(), StoreError> {
        self.write()?
            .exclusions
            .insert(ExclusionPair::new(a.clone(), b.clone()));
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let tables = self.read()?;

        Ok(StoreStats {
            images: tables.images.len(),
            fingerprint_sets: tables.fingerprints.len(),
            exclusions: tables.exclusions.len(),
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.write()? = Tables::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::Fingerprint;

    fn id(value: &str) -> ContentId {
        ContentId::from_stored(value)
    }

    #[test]
    fn miss_returns_none() {
        let store = InMemoryStore::new();

        assert!(store.find(&id("abc")).unwrap().is_none());
        assert!(store.find_fingerprints(&id("abc")).unwrap().is_empty());
    }

    #[test]
    fn saved_image_is_found() {
        let store = InMemoryStore::new();

        store.save_image(&id("abc"), "a.png", 3, 4).unwrap();
        store.save_image(&id("abc"), "renamed.png", 3, 4).unwrap();

        let found = store.find(&id("abc")).unwrap().unwrap();
        assert_eq!(found.name, "a.png");
    }

    #[test]
    fn fingerprints_are_keyed_by_size_factor() {
        let store = InMemoryStore::new();
        let mut set = FingerprintSet::new(2);
        set.average = Some(Fingerprint::from_bits([true, false, true, true]));

        store.save_fingerprints(&id("abc"), 2, &set).unwrap();
        store.save_fingerprints(&id("abc"), 3, &FingerprintSet::new(3)).unwrap();
        store.save_fingerprints(&id("def"), 2, &FingerprintSet::new(2)).unwrap();

        let sets = store.find_fingerprints(&id("abc")).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[&2], set);
    }

    #[test]
    fn exclusion_pairs_are_unordered() {
        let store = InMemoryStore::new();

        store.save_exclusion(&id("b"), &id("a")).unwrap();
        store.save_exclusion(&id("a"), &id("b")).unwrap();
        store.save_exclusion(&id("a"), &id("c")).unwrap();

        let partners = store.find_exclusions(&id("a")).unwrap();
        assert_eq!(partners.len(), 2);
        assert!(store.find_exclusions(&id("b")).unwrap().contains(&id("a")));
        assert_eq!(store.stats().unwrap().exclusions, 2);
    }

    #[test]
    fn clear_removes_everything() {
        let store = InMemoryStore::new();

        store.save_image(&id("a"), "a.png", 1, 1).unwrap();
        store.save_exclusion(&id("a"), &id("b")).unwrap();
        store.clear().unwrap();

        assert_eq!(store.stats().unwrap(), StoreStats::default());
    }
}
