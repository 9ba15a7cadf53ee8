//! Integration tests for the SQLite store behind a batch.
//!
//! These tests verify that fingerprints and exclusions survive closing and
//! reopening the database file.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use image::{GrayImage, Luma};
use image_sorter::core::cache::{FingerprintStore, SqliteStore, StoreOptions, SCHEMA_VERSION};
use image_sorter::core::hasher::FingerprintMethod;
use image_sorter::core::pipeline::Batch;
use image_sorter::core::record::ContentId;
use predicates::prelude::*;
use std::sync::Arc;

fn stripes(period: u32) -> GrayImage {
    GrayImage::from_fn(48, 48, |x, _| Luma([if (x / period) % 2 == 0 { 30 } else { 220 }]))
}

fn run(dir: &TempDir, db: &std::path::Path) -> image_sorter::core::pipeline::BatchReport {
    let store = Arc::new(SqliteStore::open(db).unwrap());
    Batch::builder()
        .working_dir(dir.path())
        .method(FingerprintMethod::Difference)
        .precision(1)
        .relocate(false)
        .store(store)
        .build()
        .run()
        .unwrap()
}

#[test]
fn fingerprints_survive_reopening_the_store() {
    let images = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let db = state.child("store").child("image_store.db");
    stripes(6).save(images.child("a.png").path()).unwrap();
    stripes(24).save(images.child("b.png").path()).unwrap();

    let first = run(&images, db.path());
    db.assert(predicate::path::exists());
    assert_eq!(first.cache_hits, 0);
    assert_eq!(first.persisted, 2);

    let second = run(&images, db.path());
    assert_eq!(second.cache_hits, 2);
    assert_eq!(second.persisted, 0);
}

#[test]
fn renamed_file_is_found_by_content() {
    let images = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let db = state.child("image_store.db");
    stripes(6).save(images.child("original.png").path()).unwrap();

    run(&images, db.path());
    std::fs::rename(
        images.child("original.png").path(),
        images.child("renamed.png").path(),
    )
    .unwrap();
    let report = run(&images, db.path());

    assert_eq!(report.cache_hits, 1);

    let store = SqliteStore::open(db.path()).unwrap();
    let stored = store
        .find(&ContentId::from_samples(&stripes(6)))
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "original.png");
}

#[test]
fn exclusions_survive_reopening_the_store() {
    let images = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    let db = state.child("image_store.db");
    stripes(8).save(images.child("a.png").path()).unwrap();
    stripes(8).save(images.child("b.png").path()).unwrap();
    stripes(12).save(images.child("c.png").path()).unwrap();

    {
        let store = Arc::new(SqliteStore::open(db.path()).unwrap());
        let batch = Batch::builder()
            .working_dir(images.path())
            .store(store)
            .build();
        batch.exclude("c.png", "a.png").unwrap();
    }

    let store = SqliteStore::open(db.path()).unwrap();
    let a = ContentId::from_samples(&stripes(8));
    let c = ContentId::from_samples(&stripes(12));
    assert!(store.find_exclusions(&a).unwrap().contains(&c));
    assert!(store.find_exclusions(&c).unwrap().contains(&a));
    assert_eq!(store.stats().unwrap().exclusions, 1);
}

#[test]
fn skipped_migration_keeps_outdated_store() {
    let state = TempDir::new().unwrap();
    let db = state.child("image_store.db");

    {
        let store = SqliteStore::open(db.path()).unwrap();
        store
            .save_image(&ContentId::from_stored("abc"), "a.png", 1, 1)
            .unwrap();
    }

    let options = StoreOptions {
        migrate: false,
        ..StoreOptions::default()
    };
    let store = SqliteStore::open_with(db.path(), &options).unwrap();

    assert_eq!(store.schema_version().unwrap(), Some(SCHEMA_VERSION));
    assert_eq!(store.stats().unwrap().images, 1);

    store.reset().unwrap();
    assert_eq!(store.stats().unwrap().images, 0);
}
