//! Integration tests for the batch pipeline.
//!
//! These tests verify end-to-end batch behavior including:
//! - Grouping of near and exact duplicates
//! - Relocation layout
//! - Store round-trips and exclusions
//! - Fail-fast on undecodable input

use assert_fs::prelude::*;
use assert_fs::TempDir;
use image::{GrayImage, Luma};
use image_sorter::core::cache::{FingerprintStore, InMemoryStore};
use image_sorter::core::hasher::FingerprintMethod;
use image_sorter::core::pipeline::{Batch, BatchReport};
use image_sorter::core::record::ContentId;
use image_sorter::SorterError;
use predicates::prelude::*;
use std::sync::Arc;

/// Left half dark, right half bright
fn halves() -> GrayImage {
    GrayImage::from_fn(64, 64, |x, _| Luma([if x < 32 { 40 } else { 200 }]))
}

/// Same as `halves` with one pixel nudged
fn nudged() -> GrayImage {
    let mut image = halves();
    image.put_pixel(0, 0, Luma([41]));
    image
}

/// Top half dark, bottom half bright
fn transposed() -> GrayImage {
    GrayImage::from_fn(64, 64, |_, y| Luma([if y < 32 { 40 } else { 200 }]))
}

/// a-copy.png and a.png are identical, b.png is a near copy, c.png differs
fn populate(dir: &TempDir) {
    halves().save(dir.child("a.png").path()).unwrap();
    halves().save(dir.child("a-copy.png").path()).unwrap();
    nudged().save(dir.child("b.png").path()).unwrap();
    transposed().save(dir.child("c.png").path()).unwrap();
}

fn batch(dir: &TempDir, store: Option<Arc<InMemoryStore>>, relocate: bool) -> Batch {
    let mut builder = Batch::builder()
        .working_dir(dir.path())
        .method(FingerprintMethod::Average)
        .precision(2)
        .size_factor(8)
        .relocate(relocate);
    if let Some(store) = store {
        builder = builder.store(store);
    }
    builder.build()
}

fn member_names(report: &BatchReport) -> Vec<Vec<String>> {
    report
        .groups
        .iter()
        .map(|g| g.members.iter().map(|m| m.name.clone()).collect())
        .collect()
}

#[test]
fn batch_groups_near_and_exact_duplicates() {
    let temp = TempDir::new().unwrap();
    populate(&temp);

    let report = batch(&temp, None, false).run().unwrap();

    assert_eq!(report.total_files, 4);
    assert_eq!(report.distinct, 3);
    assert_eq!(report.comparisons, 3);
    assert_eq!(member_names(&report), vec![vec!["a-copy.png", "b.png"]]);
    assert_eq!(report.groups[0].members[0].exact_duplicates, vec!["a.png"]);
    assert_eq!(report.grouped_files(), 3);
    assert!(report.errors.is_empty());
}

#[test]
fn grouped_files_are_relocated() {
    let temp = TempDir::new().unwrap();
    populate(&temp);

    let report = batch(&temp, None, true).run().unwrap();

    let group = &report.groups[0];
    let group_dir = format!("alike-{}", group.id);
    assert_eq!(
        group.directory.as_deref(),
        Some(temp.child(&group_dir).path())
    );

    let exact_dir = format!("exact-{}", group.members[0].identity.short(16));
    temp.child(&group_dir)
        .child(&exact_dir)
        .child("a-copy.png")
        .assert(predicate::path::exists());
    temp.child(&group_dir)
        .child(&exact_dir)
        .child("a.png")
        .assert(predicate::path::exists());
    temp.child(&group_dir)
        .child("b.png")
        .assert(predicate::path::exists());

    temp.child("c.png").assert(predicate::path::exists());
    temp.child("a.png").assert(predicate::path::missing());
    temp.child("b.png").assert(predicate::path::missing());
}

#[test]
fn keep_in_place_moves_nothing() {
    let temp = TempDir::new().unwrap();
    populate(&temp);

    let report = batch(&temp, None, false).run().unwrap();

    assert_eq!(report.groups.len(), 1);
    assert!(report.groups[0].directory.is_none());
    for name in ["a.png", "a-copy.png", "b.png", "c.png"] {
        temp.child(name).assert(predicate::path::exists());
    }
}

#[test]
fn second_run_loads_fingerprints_from_store() {
    let temp = TempDir::new().unwrap();
    populate(&temp);
    let store = Arc::new(InMemoryStore::new());

    let first = batch(&temp, Some(store.clone()), false).run().unwrap();

    assert_eq!(first.cache_hits, 0);
    assert_eq!(first.persisted, 3);
    let stats = store.stats().unwrap();
    assert_eq!(stats.images, 3);
    assert_eq!(stats.fingerprint_sets, 3);

    let second = batch(&temp, Some(store.clone()), false).run().unwrap();

    assert_eq!(second.cache_hits, 4);
    assert_eq!(second.persisted, 0);
    assert_eq!(member_names(&second), member_names(&first));
}

#[test]
fn persisted_sets_hold_every_method() {
    let temp = TempDir::new().unwrap();
    halves().save(temp.child("a.png").path()).unwrap();
    let store = Arc::new(InMemoryStore::new());

    batch(&temp, Some(store.clone()), false).run().unwrap();

    let id = ContentId::from_samples(&halves());
    let sets = store.find_fingerprints(&id).unwrap();
    assert!(sets[&8].is_complete());
    assert_eq!(store.find(&id).unwrap().unwrap().name, "a.png");
}

#[test]
fn skip_persist_writes_nothing() {
    let temp = TempDir::new().unwrap();
    populate(&temp);
    let store = Arc::new(InMemoryStore::new());

    let report = Batch::builder()
        .working_dir(temp.path())
        .method(FingerprintMethod::Average)
        .relocate(false)
        .persist(false)
        .store(store.clone())
        .build()
        .run()
        .unwrap();

    assert_eq!(report.persisted, 0);
    assert_eq!(store.stats().unwrap().images, 0);
}

#[test]
fn other_size_factor_is_not_a_cache_hit() {
    let temp = TempDir::new().unwrap();
    populate(&temp);
    let store = Arc::new(InMemoryStore::new());

    batch(&temp, Some(store.clone()), false).run().unwrap();
    let report = Batch::builder()
        .working_dir(temp.path())
        .method(FingerprintMethod::Average)
        .size_factor(16)
        .relocate(false)
        .store(store.clone())
        .build()
        .run()
        .unwrap();

    assert_eq!(report.cache_hits, 0);
    assert_eq!(report.persisted, 3);
    let stats = store.stats().unwrap();
    assert_eq!(stats.images, 3);
    assert_eq!(stats.fingerprint_sets, 6);
}

#[test]
fn excluded_images_are_not_grouped() {
    let temp = TempDir::new().unwrap();
    populate(&temp);
    let store = Arc::new(InMemoryStore::new());
    let batch = batch(&temp, Some(store.clone()), false);

    batch.exclude("a.png", "b.png").unwrap();
    let report = batch.run().unwrap();

    // a.png and a-copy.png share an identity, so the exclusion covers both
    assert_eq!(member_names(&report), vec![vec!["a-copy.png"]]);
    assert_eq!(report.groups[0].members[0].exact_duplicates, vec!["a.png"]);
    assert_eq!(report.comparisons, 2);
}

#[test]
fn undecodable_file_aborts_before_any_side_effect() {
    let temp = TempDir::new().unwrap();
    populate(&temp);
    temp.child("broken.png")
        .write_binary(b"this is not a valid image file")
        .unwrap();
    let store = Arc::new(InMemoryStore::new());

    let result = batch(&temp, Some(store.clone()), true).run();

    assert!(matches!(result, Err(SorterError::Input(_))));
    assert_eq!(store.stats().unwrap().images, 0);
    for name in ["a.png", "a-copy.png", "b.png", "c.png"] {
        temp.child(name).assert(predicate::path::exists());
    }
    let entries = std::fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(entries, 5);
}

#[test]
fn non_image_files_are_ignored() {
    let temp = TempDir::new().unwrap();
    populate(&temp);
    temp.child("notes.txt").write_str("not an image").unwrap();
    temp.child(".hidden.png").write_str("not an image").unwrap();

    let report = batch(&temp, None, false).run().unwrap();

    assert_eq!(report.total_files, 4);
}
