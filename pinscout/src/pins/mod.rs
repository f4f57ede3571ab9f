//! Pin and Package Data
//!
//! The shapes the pin-extraction collaborator returns: an ordered pin list and
//! a package guess. Side and position are never part of a [`Pin`]; they are
//! computed by the layout engine.

pub mod package;
pub mod schema;

pub use package::PackageFamily;
pub use schema::{PackageSpec, Pin, PinData, PinDataError};
