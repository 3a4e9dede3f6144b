//! Output generation for run reports.
//!
//! # Submodules
//!
//! - [`json`]: Archives a [`crate::models::RunReport`] as one JSON file per ISO week
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2024-W11.json
//! └── 2024-W12.json
//! ```

pub mod json;
