//! Page Relevance Detection
//!
//! Scores every decoded page for how likely it is to hold the pinout, and
//! resolves the ambiguous middle band through an external verifier.

pub mod review;
pub mod scorer;
pub mod signals;

pub use review::{PageSummary, ReviewResolver, VerificationUnavailable};
pub use scorer::{
    Classification, Decision, PageCandidate, PageScorer, ReviewOutcome, ACCEPT_THRESHOLD,
    REVIEW_THRESHOLD,
};
pub use signals::{compute_signals, Signal, SignalError, SignalKind};
