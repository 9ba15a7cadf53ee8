//! # Pipeline Module
//!
//! Runs one sorting batch over a working directory.
//!
//! ## Batch Stages
//! 1. **Init** - Validate configuration, list eligible files
//! 2. **Fingerprint** - Decode and fingerprint every file (store-checked)
//! 3. **Compare** - Feed records to the clustering engine in listing order
//! 4. **Group** - Emit alike groups
//! 5. **Relocate** - Move grouped files into group directories
//! 6. **Persist** - Save new fingerprints to the store
//!
//! ## Parallelism
//! Fingerprinting, relocation and persistence run on rayon's pool.
//! Comparison is single-threaded. The first fingerprint failure aborts the
//! batch before anything is moved or saved.

mod executor;
mod relocate;

pub use executor::{
    Batch, BatchBuilder, BatchConfig, BatchReport, GroupMember, GroupReport, MAX_SIZE_FACTOR,
    MIN_SIZE_FACTOR,
};
pub use relocate::{move_into, GroupRelocation, Relocator};
