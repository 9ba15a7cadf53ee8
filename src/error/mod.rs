//! # Error Module
//!
//! Error types for the image sorter.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Fatal vs collected** - configuration, input and hashing errors abort a
//!   batch; store and relocation errors are collected per record or group

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SorterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Relocation error: {0}")]
    Relocate(#[from] RelocateError),
}

/// Problems with the batch configuration, detected before any work starts
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Working directory not found: {path}")]
    WorkingDirNotFound { path: PathBuf },

    #[error("Working directory is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Invalid size factor: {value} (must be between 2 and 64)")]
    InvalidSizeFactor { value: u32 },

    #[error("This operation needs a fingerprint store, but none is configured")]
    StoreRequired,

    #[error("Cannot exclude {name} from itself: both files have identity {identity}")]
    SelfExclusion { name: String, identity: String },
}

/// A file that was listed but could not be read or decoded
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Image not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read image file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Image is empty: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Failed to list directory {path}: {reason}")]
    Listing { path: PathBuf, reason: String },
}

/// Errors that occur while computing or comparing fingerprints
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Fingerprint lengths differ: {left} bits vs {right} bits")]
    LengthMismatch { left: u32, right: u32 },

    #[error("Invalid resample dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Resampling failed: {0}")]
    ResampleFailed(String),

    #[error("Invalid fingerprint text '{text}' for {bits} bits")]
    InvalidHex { text: String, bits: u32 },
}

/// Errors raised by a fingerprint store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Store query failed: {0}")]
    QueryFailed(String),

    #[error("Store corruption detected at {path}. Delete this file and try again.")]
    Corrupted { path: PathBuf },

    #[error("Stored fingerprint is unreadable: {0}")]
    BadFingerprint(#[from] HashError),
}

/// Errors that occur while moving grouped files
#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image {path} disappeared before it could be moved")]
    SourceMissing { path: PathBuf },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SorterError>;
