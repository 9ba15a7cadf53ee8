//! # Image Sorter
//!
//! Groups exact and near-duplicate images by perceptual fingerprint.
//!
//! ## How It Works
//! - Every image gets a content identity (a digest of its decoded pixels)
//!   and a fingerprint (average, difference or perceptual hash)
//! - Images with equal identity are exact duplicates
//! - Images whose fingerprints differ in at most `precision` bits are alike,
//!   transitively, unless the pair was excluded
//! - Fingerprints and exclusions are stored so later runs skip recomputation
//!
//! ## Architecture
//! - `core` - Fingerprinting, clustering, storage and the batch pipeline
//! - `events` - Progress events over a channel
//! - `error` - Error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, SorterError};

/// Initialize tracing for the library
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` over `warn`.
/// Calling this twice is harmless.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
