//! # Cache Module
//!
//! Persists fingerprints and exclusions so repeat runs skip recomputation.
//!
//! ## Contents
//! - one image row per content identity (name, dimensions)
//! - one fingerprint set per (identity, size factor)
//! - one row per canonical exclusion pair
//!
//! ## Backends
//! - `SqliteStore` - Persistent storage using SQLite
//! - `InMemoryStore` - For testing and `--no-store` style runs

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryStore;
pub use sqlite::{SqliteStore, StoreOptions, SCHEMA_VERSION};
pub use traits::FingerprintStore;

use serde::{Deserialize, Serialize};

/// What the store remembers about an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    /// File name the image was first saved under
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of known images
    pub images: usize,
    /// Number of (identity, size factor) fingerprint sets
    pub fingerprint_sets: usize,
    /// Number of exclusion pairs
    pub exclusions: usize,
}
