//! # img-sort CLI
//!
//! Command-line interface for the image sorter.
//!
//! ## Usage
//! ```bash
//! img-sort --working-dir ./images sort --method perceptual --precision 2
//! img-sort sort --output json --keep-in-place
//! img-sort exclude cat.png not-a-cat.png
//! ```

mod cli;

use image_sorter::Result;

fn main() -> Result<()> {
    cli::run()
}
