//! Decoded Datasheet Documents
//!
//! PDF decoding happens outside this crate. A decoder hands over a JSON
//! document with one entry per page (text layer, extracted tables, raw image
//! blobs); this module turns it into immutable [`Page`] values with their
//! index and position fraction assigned.
//!
//! ```text
//! {
//!   "source": "ne555.pdf",
//!   "pages": [
//!     { "text": "...", "tables": [[["Pin", "Name"], ["1", "GND"]]], "images": [] }
//!   ]
//! }
//! ```

pub mod schema;

pub use schema::{Document, DocumentError, Page, Table};
