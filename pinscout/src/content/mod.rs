//! Content Stitching
//!
//! Turns the accepted pages into one ordered [`ContentBundle`] for pin
//! extraction: non-pinout text is filtered out per block, pinout tables are
//! capped, and a table split across a page break is carried onto the next
//! page even when that page scored too low on its own.

pub mod bundle;
pub mod filter;
pub mod stitcher;

pub use bundle::{page_marker, BundleEntry, BundleTable, ContentBundle, EntryKind};
pub use stitcher::{ContentStitcher, StitchOptions, MAX_TABLE_ROWS};
