//! # Core Module
//!
//! The sorting engine.
//!
//! ## Modules
//! - `scanner` - Lists image files in the working directory
//! - `hasher` - Decodes images and computes fingerprints
//! - `record` - Per-image state and content identity
//! - `comparator` - Clusters records into alike groups
//! - `cache` - Persists fingerprints and exclusions
//! - `pipeline` - Orchestrates a batch

pub mod cache;
pub mod comparator;
pub mod hasher;
pub mod pipeline;
pub mod record;
pub mod scanner;

// Re-export commonly used types
pub use comparator::{AlikeGroup, ClusteringEngine};
pub use hasher::{Fingerprint, FingerprintMethod};
pub use pipeline::{Batch, BatchReport};
pub use record::{ContentId, ImageRecord};
