//! Page Scoring
//!
//! Sums the weights of the triggered signals into a confidence score and
//! classifies the page against fixed thresholds.

use serde::{Deserialize, Serialize};

use crate::detection::signals::{compute_signals, Signal, SignalKind};
use crate::document::Page;

/// Scores at or above this are accepted outright.
pub const ACCEPT_THRESHOLD: u32 = 5;
/// Scores in `[REVIEW_THRESHOLD, ACCEPT_THRESHOLD)` go to the review bucket.
pub const REVIEW_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Reject,
    Review,
    Accept,
}

impl Classification {
    pub fn from_score(score: u32) -> Self {
        if score >= ACCEPT_THRESHOLD {
            Classification::Accept
        } else if score >= REVIEW_THRESHOLD {
            Classification::Review
        } else {
            Classification::Reject
        }
    }
}

/// Verdict folded back into a review-bucket candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// The verifier said the page holds pinout information
    Confirmed,
    /// The verifier said it does not
    Denied,
    /// The verifier failed or timed out
    Unavailable(String),
}

/// Final accept/reject decision for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accepted,
    Rejected,
    /// In the review bucket and not resolved yet
    Pending,
}

/// A scored page.
///
/// The score is only ever computed from the signals, and the classification
/// is always derived from the score. Review resolution is kept next to it
/// rather than overwriting it.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCandidate {
    pub page_index: usize,
    score: u32,
    signals: Vec<Signal>,
    review: Option<ReviewOutcome>,
    error: Option<String>,
}

impl PageCandidate {
    pub fn from_signals(page_index: usize, signals: Vec<Signal>) -> Self {
        let score = signals.iter().map(|s| s.weight).sum();
        Self {
            page_index,
            score,
            signals,
            review: None,
            error: None,
        }
    }

    /// A page the signal extractor could not handle. It scores zero and is
    /// therefore rejected.
    pub fn failed(page_index: usize, error: impl Into<String>) -> Self {
        Self {
            page_index,
            score: 0,
            signals: Vec::new(),
            review: None,
            error: Some(error.into()),
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn has_signal(&self, kind: SignalKind) -> bool {
        self.signals.iter().any(|s| s.kind == kind)
    }

    pub fn classification(&self) -> Classification {
        Classification::from_score(self.score)
    }

    pub fn review(&self) -> Option<&ReviewOutcome> {
        self.review.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn needs_review(&self) -> bool {
        self.classification() == Classification::Review && self.review.is_none()
    }

    /// Record a review verdict. Only review-bucket candidates take one;
    /// returns whether it was recorded.
    pub fn set_review(&mut self, outcome: ReviewOutcome) -> bool {
        if self.classification() != Classification::Review {
            return false;
        }
        self.review = Some(outcome);
        true
    }

    pub fn decision(&self) -> Decision {
        match self.classification() {
            Classification::Accept => Decision::Accepted,
            Classification::Reject => Decision::Rejected,
            Classification::Review => match self.review {
                Some(ReviewOutcome::Confirmed) => Decision::Accepted,
                Some(ReviewOutcome::Denied) | Some(ReviewOutcome::Unavailable(_)) => {
                    Decision::Rejected
                }
                None => Decision::Pending,
            },
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.decision() == Decision::Accepted
    }
}

/// Scores pages one at a time; holds no state between pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageScorer;

impl PageScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, page: &Page) -> PageCandidate {
        match compute_signals(page) {
            Ok(signals) => {
                let candidate = PageCandidate::from_signals(page.index, signals);
                tracing::debug!(
                    "Page {} scored {} ({:?}) from [{}]",
                    page.number(),
                    candidate.score(),
                    candidate.classification(),
                    candidate
                        .signals()
                        .iter()
                        .map(|s| s.kind.label())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                candidate
            }
            Err(e) => {
                tracing::warn!("Signal extraction failed, rejecting page: {}", e);
                PageCandidate::failed(page.index, e.to_string())
            }
        }
    }

    pub fn score_all(&self, pages: &[Page]) -> Vec<PageCandidate> {
        pages.iter().map(|page| self.score(page)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Table;

    fn filler(words: usize) -> String {
        vec!["lorem"; words].join(" ")
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(Classification::from_score(0), Classification::Reject);
        assert_eq!(Classification::from_score(2), Classification::Reject);
        assert_eq!(Classification::from_score(3), Classification::Review);
        assert_eq!(Classification::from_score(4), Classification::Review);
        assert_eq!(Classification::from_score(5), Classification::Accept);
        assert_eq!(Classification::from_score(12), Classification::Accept);
    }

    #[test]
    fn test_classification_is_monotonic() {
        let mut previous = Classification::Reject;
        for score in 0..=12 {
            let current = Classification::from_score(score);
            let rank = |c: Classification| match c {
                Classification::Reject => 0,
                Classification::Review => 1,
                Classification::Accept => 2,
            };
            assert!(rank(current) >= rank(previous));
            previous = current;
        }
    }

    #[test]
    fn test_table_only_page_goes_to_review() {
        let table = Table::from_rows(&[&["Pin No.", "Name", "Function"], &["1", "GND", "Ground"]]);
        let page = Page::new(0, 20, filler(120)).with_table(table);

        let candidate = PageScorer::new().score(&page);
        assert_eq!(candidate.score(), 4);
        assert_eq!(candidate.classification(), Classification::Review);
        assert_eq!(candidate.decision(), Decision::Pending);
        assert!(!candidate.is_accepted());
    }

    #[test]
    fn test_heading_and_table_accepts() {
        let table = Table::from_rows(&[&["Pin", "Name", "Description"], &["1", "OUT", "Output"]]);
        let page = Page::new(0, 20, format!("Pin Assignments\n{}", filler(120))).with_table(table);

        let candidate = PageScorer::new().score(&page);
        assert_eq!(candidate.score(), 7);
        assert_eq!(candidate.classification(), Classification::Accept);
        assert!(candidate.is_accepted());
    }

    #[test]
    fn test_score_is_sum_of_weights() {
        let table = Table::from_rows(&[&["Pin", "Name"], &["1", "VCC"]]);
        let page = Page::new(5, 10, "Pinout\nvcc gnd pin").with_table(table);
        let candidate = PageScorer::new().score(&page);
        let sum: u32 = candidate.signals().iter().map(|s| s.kind.weight()).sum();
        assert_eq!(candidate.score(), sum);
    }

    #[test]
    fn test_rescoring_is_identical() {
        let page = Page::new(4, 10, "Pin Functions\nGPIO0 GPIO1 VDD GND");
        let scorer = PageScorer::new();
        assert_eq!(scorer.score(&page), scorer.score(&page));
    }

    #[test]
    fn test_failed_page_is_rejected() {
        let page = Page::without_text(3, 10);
        let candidate = PageScorer::new().score(&page);
        assert_eq!(candidate.score(), 0);
        assert_eq!(candidate.classification(), Classification::Reject);
        assert!(candidate.error().unwrap().contains("no text layer"));
    }

    #[test]
    fn test_review_only_applies_to_review_bucket() {
        let mut rejected = PageCandidate::from_signals(0, vec![]);
        assert!(!rejected.set_review(ReviewOutcome::Confirmed));
        assert_eq!(rejected.decision(), Decision::Rejected);

        let table = Table::from_rows(&[&["Pin", "Name"], &["1", "VCC"]]);
        let page = Page::new(0, 20, filler(50)).with_table(table);
        let mut review = PageScorer::new().score(&page);
        assert!(review.needs_review());

        assert!(review.set_review(ReviewOutcome::Confirmed));
        assert_eq!(review.decision(), Decision::Accepted);
        // Score and classification are untouched by the verdict.
        assert_eq!(review.score(), 4);
        assert_eq!(review.classification(), Classification::Review);

        review.set_review(ReviewOutcome::Unavailable("timeout".into()));
        assert_eq!(review.decision(), Decision::Rejected);
    }
}
