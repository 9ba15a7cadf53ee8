//! # Scanner Module
//!
//! Lists the image files of a working directory.
//!
//! ## Supported Formats
//! - JPEG (.jpg, .jpeg)
//! - PNG (.png)
//! - GIF (.gif)
//! - BMP (.bmp)
//! - TIFF (.tiff, .tif)
//! - WebP (.webp)
//!
//! Only the directory itself is listed (no recursion), so files already
//! relocated into group directories are not picked up again.
//!
//! ## Example
//! ```rust,ignore
//! use image_sorter::core::scanner::{list_images, ImageFilter};
//!
//! let files = list_images(Path::new("./images"), &ImageFilter::new())?;
//! ```

mod filter;

pub use filter::{ImageFilter, DEFAULT_EXTENSIONS};

use crate::error::InputError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files in `dir` accepted by `filter`, sorted by file name
pub fn list_images(dir: &Path, filter: &ImageFilter) -> Result<Vec<PathBuf>, InputError> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| InputError::Listing {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        if filter.should_include(entry.path()) {
            files.push(entry.into_path());
        } else {
            tracing::trace!(path = %entry.path().display(), "Skipping non-image entry");
        }
    }

    Ok(files)
}
