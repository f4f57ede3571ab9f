//! PinScout - pinout extraction pipeline for PDF datasheets
//!
//! This library finds the pages of a decoded datasheet that describe a
//! component's pinout, stitches their content (including tables split across
//! pages) into one bundle for a pin-extraction model, and lays the extracted
//! pins out on the physical sides of their package.
//!
//! # Quick Start
//!
//! ```no_run
//! use pinscout::{AIRouter, Collaborators, Document, PinScoutCore, PipelineOptions};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), pinscout::PinScoutError> {
//! let document = Document::load(Path::new("ne555.json"))?;
//! let options = PipelineOptions::default();
//! let router = AIRouter::from_settings(&options.provider, std::env::var("ANTHROPIC_API_KEY").ok());
//!
//! let report = PinScoutCore::run(&document, &options, Collaborators::from_provider(&router)).await?;
//!
//! println!("Pinout pages: {:?}", report.accepted_pages());
//! if let Some(layout) = &report.layout {
//!     for (pin, placement) in layout.iter() {
//!         println!("{} -> {} #{}", pin, placement.side, placement.position_index);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Page detection**: Weighted signals, thresholds and a review bucket
//! - **Content stitching**: Continuation tables carried across page breaks
//! - **Layout synthesis**: Family rules for DIP/SOIC/QFP/QFN plus named overrides
//! - **Optional AI**: Ollama/Claude for review verification and pin extraction

pub mod ai;
pub mod content;
pub mod core;
pub mod detection;
pub mod document;
pub mod layout;
pub mod pins;

// Re-export main types
pub use ai::{AIError, AIProvider, AIRouter, PageVerifier, PinExtractor, ProviderSettings};
pub use content::{ContentBundle, ContentStitcher, StitchOptions};
pub use core::{
    CandidateSummary, Collaborators, PinScoutCore, PinScoutError, PipelineOptions, PipelineReport,
    PipelineWarning,
};
pub use detection::{Classification, Decision, PageCandidate, PageScorer, SignalKind};
pub use document::{Document, Page, Table};
pub use layout::{LayoutAssignment, LayoutError, OverrideTable, PinLayoutEngine, Side};
pub use pins::{PackageFamily, PackageSpec, Pin, PinData};

/// Load a decoded document (convenience wrapper).
pub fn load_document(path: &std::path::Path) -> Result<Document, PinScoutError> {
    Document::load(path).map_err(PinScoutError::from)
}

/// Load extracted pin data (convenience wrapper).
pub fn load_pin_data(path: &std::path::Path) -> Result<PinData, PinScoutError> {
    PinData::load(path).map_err(PinScoutError::from)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Classification, Collaborators, ContentBundle, Decision, Document, LayoutAssignment,
        PackageFamily, PinData, PinScoutCore, PinScoutError, PipelineOptions, PipelineReport,
        Side,
    };
}
