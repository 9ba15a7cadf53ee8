//! # Comparator Module
//!
//! Clusters image records into alike groups.
//!
//! ## How It Works
//! 1. A record whose identity was already seen becomes an exact duplicate
//!    of the first record and is never compared.
//! 2. Every other record is compared against all earlier distinct records
//!    with the batch's single method, skipping excluded pairs.
//! 3. A distance within the precision merges both alike groups
//!    (transitive grouping through a disjoint-set).
//!
//! Comparisons are O(N²) in the number of distinct records.

mod grouper;

pub use grouper::DisjointSet;

use crate::core::hasher::{hamming_distance, FingerprintMethod, MISSING_FINGERPRINT_DISTANCE};
use crate::core::record::{ContentId, ImageRecord};
use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// A finished group of alike records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlikeGroup {
    /// Unique identifier for this group
    pub id: Uuid,
    /// Arena indices of the distinct members, in registration order
    pub members: Vec<usize>,
}

impl AlikeGroup {
    /// Files covered by the group, counting exact duplicates
    pub fn file_count(&self, records: &[ImageRecord]) -> usize {
        self.members
            .iter()
            .map(|&m| 1 + records[m].exact_duplicates.len())
            .sum()
    }
}

/// Incremental clustering over one batch
pub struct ClusteringEngine {
    method: FingerprintMethod,
    precision: u32,
    records: Vec<ImageRecord>,
    first_seen: HashMap<ContentId, usize>,
    distinct: Vec<usize>,
    sets: DisjointSet,
    comparisons: usize,
}

impl ClusteringEngine {
    /// Create an engine comparing `method` fingerprints within `precision` bits
    pub fn new(method: FingerprintMethod, precision: u32) -> Self {
        Self {
            method,
            precision,
            records: Vec::new(),
            first_seen: HashMap::new(),
            distinct: Vec::new(),
            sets: DisjointSet::new(),
            comparisons: 0,
        }
    }

    /// Register a record and merge it into matching groups.
    ///
    /// Returns the record's arena index. Fails only if two fingerprints of
    /// the active method have different widths.
    pub fn add(&mut self, record: ImageRecord) -> Result<usize, HashError> {
        let index = self.records.len();
        self.sets.push();

        if let Some(&first) = self.first_seen.get(&record.id) {
            tracing::debug!(
                name = %record.name,
                original = %self.records[first].name,
                "Exact duplicate"
            );
            self.records.push(record);
            self.records[first].exact_duplicates.push(index);
            return Ok(index);
        }

        self.first_seen.insert(record.id.clone(), index);
        self.records.push(record);

        for position in 0..self.distinct.len() {
            let other = self.distinct[position];
            let current = &self.records[index];
            let previous = &self.records[other];

            if current.excludes(previous) {
                tracing::debug!(a = %current.name, b = %previous.name, "Excluded pair skipped");
                continue;
            }

            self.comparisons += 1;
            let distance = hamming_distance(
                current.fingerprint(self.method),
                previous.fingerprint(self.method),
            )?;

            tracing::debug!(a = %current.name, b = %previous.name, distance, "Compared");

            if distance != MISSING_FINGERPRINT_DISTANCE && distance <= self.precision {
                self.merge(index, other);
            }
        }

        self.distinct.push(index);
        Ok(index)
    }

    /// Merge the groups of `a` and `b` unless that would join an excluded pair
    fn merge(&mut self, a: usize, b: usize) -> bool {
        if self.sets.same_set(a, b) {
            return true;
        }

        let records = &self.records;
        let left = self.sets.members(a);
        let right = self.sets.members(b);
        let conflict = left
            .iter()
            .any(|&x| right.iter().any(|&y| records[x].excludes(&records[y])));

        if conflict {
            tracing::debug!(
                a = %records[a].name,
                b = %records[b].name,
                "Merge refused: groups hold an excluded pair"
            );
            return false;
        }

        self.sets.union(a, b);
        true
    }

    /// Finished groups, in registration order of their first member.
    ///
    /// A group is emitted when it covers more than one file, so a lone
    /// record with exact duplicates forms a group of its own.
    pub fn groups(&self) -> Vec<AlikeGroup> {
        let mut visited = HashSet::new();
        let mut groups = Vec::new();

        for &index in &self.distinct {
            if visited.contains(&index) {
                continue;
            }

            let members = self.sets.members(index).to_vec();
            visited.extend(members.iter().copied());

            let group = AlikeGroup {
                id: Uuid::new_v4(),
                members,
            };
            if group.file_count(&self.records) > 1 {
                groups.push(group);
            }
        }

        groups
    }

    /// Every record, in insertion order
    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    /// Arena indices of records with a first-seen identity
    pub fn distinct(&self) -> &[usize] {
        &self.distinct
    }

    /// Pairwise comparisons performed so far
    pub fn comparisons(&self) -> usize {
        self.comparisons
    }

    /// Take the records back, e.g. for relocation and persistence
    pub fn into_records(self) -> Vec<ImageRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::Fingerprint;
    use image::{GrayImage, Luma};
    use std::path::Path;

    fn record(name: &str, seed: u8, bits: &str) -> ImageRecord {
        let samples = GrayImage::from_pixel(2, 2, Luma([seed]));
        let mut record = ImageRecord::new(Path::new(name), &samples, 2);
        record.fingerprints.average = Some(Fingerprint::from_bits(bits.chars().map(|c| c == '1')));
        record
    }

    fn names(engine: &ClusteringEngine, group: &AlikeGroup) -> Vec<String> {
        group
            .members
            .iter()
            .map(|&m| engine.records()[m].name.clone())
            .collect()
    }

    fn engine(precision: u32) -> ClusteringEngine {
        ClusteringEngine::new(FingerprintMethod::Average, precision)
    }

    #[test]
    fn pairwise_close_images_form_one_group() {
        let mut engine = engine(1);
        engine.add(record("a.png", 1, "0000")).unwrap();
        engine.add(record("b.png", 2, "1000")).unwrap();
        engine.add(record("c.png", 3, "1000")).unwrap();

        let groups = engine.groups();

        assert_eq!(groups.len(), 1);
        assert_eq!(names(&engine, &groups[0]), ["a.png", "b.png", "c.png"]);
        assert_eq!(engine.comparisons(), 3);
    }

    #[test]
    fn identical_pixels_are_exact_duplicates_without_comparison() {
        let mut engine = engine(2);
        engine.add(record("a.png", 7, "1010")).unwrap();
        engine.add(record("copy.png", 7, "1010")).unwrap();

        let groups = engine.groups();

        assert_eq!(engine.comparisons(), 0);
        assert_eq!(groups.len(), 1);
        assert_eq!(names(&engine, &groups[0]), ["a.png"]);
        assert_eq!(engine.records()[0].exact_duplicates, vec![1]);
        assert_eq!(groups[0].file_count(engine.records()), 2);
    }

    #[test]
    fn distance_beyond_precision_forms_no_group() {
        let mut engine = engine(2);
        engine.add(record("a.png", 1, "00000000")).unwrap();
        engine.add(record("b.png", 2, "11111000")).unwrap();

        assert!(engine.groups().is_empty());
        assert_eq!(engine.comparisons(), 1);
    }

    #[test]
    fn excluded_pair_is_never_grouped() {
        let mut x = record("x.png", 1, "1111");
        let y = record("y.png", 2, "1111");
        x.ignore.insert(y.id.clone());

        for (first, second) in [(x.clone(), y.clone()), (y, x)] {
            let mut engine = engine(0);
            engine.add(first).unwrap();
            engine.add(second).unwrap();

            assert!(engine.groups().is_empty());
            assert_eq!(engine.comparisons(), 0);
        }
    }

    #[test]
    fn grouping_is_transitive_in_any_order() {
        let a = record("a.png", 1, "0000");
        let b = record("b.png", 2, "1100");
        let c = record("c.png", 3, "1111");
        let orders = [
            [&a, &b, &c],
            [&a, &c, &b],
            [&b, &a, &c],
            [&b, &c, &a],
            [&c, &a, &b],
            [&c, &b, &a],
        ];

        for order in orders {
            let mut engine = engine(2);
            for r in order {
                engine.add(r.clone()).unwrap();
            }

            let groups = engine.groups();
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0].members.len(), 3);
        }
    }

    #[test]
    fn merge_that_would_join_excluded_pair_is_refused() {
        let mut a = record("a.png", 1, "0000");
        let b = record("b.png", 2, "1100");
        let c = record("c.png", 3, "1111");
        a.ignore.insert(c.id.clone());

        let mut engine = engine(2);
        engine.add(a).unwrap();
        engine.add(c).unwrap();
        engine.add(b).unwrap();

        let groups = engine.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(names(&engine, &groups[0]), ["a.png", "b.png"]);
    }

    #[test]
    fn missing_fingerprint_never_matches() {
        let mut engine = engine(u32::MAX);
        let mut blank = record("blank.png", 1, "0000");
        blank.fingerprints.average = None;

        engine.add(blank).unwrap();
        engine.add(record("b.png", 2, "0000")).unwrap();

        assert!(engine.groups().is_empty());
        assert_eq!(engine.comparisons(), 1);
    }

    #[test]
    fn width_mismatch_is_an_error() {
        let mut engine = engine(2);
        engine.add(record("a.png", 1, "0000")).unwrap();

        let result = engine.add(record("b.png", 2, "00000000"));

        assert!(matches!(
            result,
            Err(HashError::LengthMismatch { left: 8, right: 4 })
        ));
    }

    #[test]
    fn groups_have_unique_ids() {
        let mut engine = engine(0);
        engine.add(record("a.png", 1, "0000")).unwrap();
        engine.add(record("b.png", 2, "0000")).unwrap();
        engine.add(record("c.png", 3, "1111")).unwrap();
        engine.add(record("d.png", 4, "1111")).unwrap();

        let groups = engine.groups();

        assert_eq!(groups.len(), 2);
        assert_ne!(groups[0].id, groups[1].id);
        assert_eq!(engine.distinct(), &[0, 1, 2, 3]);
    }
}
