//! Review Resolution
//!
//! Pages scoring in the review band are put to an external verifier one at a
//! time. Its YES/NO verdict decides the page. A verifier failure or timeout
//! rejects the page and is reported back as a warning; it never stops the
//! run.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::ai::provider::PageVerifier;
use crate::detection::scorer::{PageCandidate, ReviewOutcome};
use crate::document::Page;

/// Characters of page text sent to the verifier.
pub const SUMMARY_TEXT_LIMIT: usize = 4000;

pub const DEFAULT_VERIFICATION_TIMEOUT: Duration = Duration::from_secs(30);

/// The part of a page the verifier gets to see: text and table header rows.
/// Images are never sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub page_index: usize,
    pub text: String,
    pub table_headers: Vec<Vec<String>>,
}

impl PageSummary {
    pub fn from_page(page: &Page) -> Self {
        Self {
            page_index: page.index,
            text: page.text_or_empty().chars().take(SUMMARY_TEXT_LIMIT).collect(),
            table_headers: page
                .tables
                .iter()
                .filter_map(|t| t.first_row().map(|row| row.to_vec()))
                .collect(),
        }
    }
}

/// A review page that could not be verified and was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("verification unavailable for page {}: {reason}", .page_index + 1)]
pub struct VerificationUnavailable {
    pub page_index: usize,
    pub reason: String,
}

pub struct ReviewResolver<'a> {
    verifier: Option<&'a dyn PageVerifier>,
    timeout: Duration,
}

impl<'a> ReviewResolver<'a> {
    pub fn new(verifier: &'a dyn PageVerifier) -> Self {
        Self {
            verifier: Some(verifier),
            timeout: DEFAULT_VERIFICATION_TIMEOUT,
        }
    }

    /// A resolver with no verifier; every review page is rejected.
    pub fn offline() -> Self {
        Self {
            verifier: None,
            timeout: DEFAULT_VERIFICATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve every pending review candidate, in page order.
    pub async fn resolve(
        &self,
        candidates: &mut [PageCandidate],
        pages: &[Page],
    ) -> Vec<VerificationUnavailable> {
        let mut warnings = Vec::new();

        for candidate in candidates.iter_mut().filter(|c| c.needs_review()) {
            let outcome = match pages.iter().find(|p| p.index == candidate.page_index) {
                Some(page) => self.verify_page(page).await,
                None => ReviewOutcome::Unavailable("page content not available".to_string()),
            };

            if let ReviewOutcome::Unavailable(reason) = &outcome {
                let warning = VerificationUnavailable {
                    page_index: candidate.page_index,
                    reason: reason.clone(),
                };
                tracing::warn!("{}; rejecting page", warning);
                warnings.push(warning);
            } else {
                tracing::debug!(
                    "Page {} review verdict: {:?}",
                    candidate.page_index + 1,
                    outcome
                );
            }

            candidate.set_review(outcome);
        }

        warnings
    }

    async fn verify_page(&self, page: &Page) -> ReviewOutcome {
        let Some(verifier) = self.verifier else {
            return ReviewOutcome::Unavailable("offline mode".to_string());
        };

        let summary = PageSummary::from_page(page);
        match tokio::time::timeout(self.timeout, verifier.verify(&summary)).await {
            Ok(Ok(true)) => ReviewOutcome::Confirmed,
            Ok(Ok(false)) => ReviewOutcome::Denied,
            Ok(Err(e)) => ReviewOutcome::Unavailable(e.to_string()),
            Err(_) => ReviewOutcome::Unavailable(format!(
                "no verdict within {} seconds",
                self.timeout.as_secs_f32()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AIError;
    use crate::detection::scorer::{Decision, PageScorer};
    use crate::document::Table;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedVerifier {
        verdict: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageVerifier for FixedVerifier {
        async fn verify(&self, summary: &PageSummary) -> Result<bool, AIError> {
            assert!(!summary.table_headers.is_empty());
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.verdict)
        }
    }

    struct FailingVerifier;

    #[async_trait]
    impl PageVerifier for FailingVerifier {
        async fn verify(&self, _summary: &PageSummary) -> Result<bool, AIError> {
            Err(AIError::InvalidResponse("expected YES or NO".to_string()))
        }
    }

    struct SlowVerifier;

    #[async_trait]
    impl PageVerifier for SlowVerifier {
        async fn verify(&self, _summary: &PageSummary) -> Result<bool, AIError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(true)
        }
    }

    /// Page 0 is accepted outright, page 1 lands in the review bucket.
    fn fixture() -> (Vec<Page>, Vec<PageCandidate>) {
        let table = Table::from_rows(&[&["Pin No.", "Name", "Function"], &["1", "GND", "Ground"]]);
        let filler = vec!["lorem"; 120].join(" ");
        let pages = vec![
            Page::new(0, 10, "Pin Configuration").with_table(table.clone()),
            Page::new(1, 10, filler).with_table(table),
        ];
        let candidates = PageScorer::new().score_all(&pages);
        assert_eq!(candidates[0].decision(), Decision::Accepted);
        assert!(candidates[1].needs_review());
        (pages, candidates)
    }

    #[tokio::test]
    async fn test_confirmed_review_accepts() {
        let (pages, mut candidates) = fixture();
        let verifier = FixedVerifier {
            verdict: true,
            calls: AtomicUsize::new(0),
        };

        let warnings = ReviewResolver::new(&verifier)
            .resolve(&mut candidates, &pages)
            .await;

        assert!(warnings.is_empty());
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(candidates[1].decision(), Decision::Accepted);
        assert_eq!(candidates[1].score(), 4);
    }

    #[tokio::test]
    async fn test_denied_review_rejects() {
        let (pages, mut candidates) = fixture();
        let verifier = FixedVerifier {
            verdict: false,
            calls: AtomicUsize::new(0),
        };

        ReviewResolver::new(&verifier)
            .resolve(&mut candidates, &pages)
            .await;

        assert_eq!(candidates[1].review(), Some(&ReviewOutcome::Denied));
        assert_eq!(candidates[1].decision(), Decision::Rejected);
    }

    #[tokio::test]
    async fn test_verifier_failure_rejects_with_warning() {
        let (pages, mut candidates) = fixture();

        let warnings = ReviewResolver::new(&FailingVerifier)
            .resolve(&mut candidates, &pages)
            .await;

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].page_index, 1);
        assert!(warnings[0].reason.contains("YES or NO"));
        assert_eq!(candidates[1].decision(), Decision::Rejected);
        assert_eq!(candidates[0].decision(), Decision::Accepted);
    }

    #[tokio::test]
    async fn test_timeout_rejects() {
        let (pages, mut candidates) = fixture();

        let warnings = ReviewResolver::new(&SlowVerifier)
            .with_timeout(Duration::from_millis(100))
            .resolve(&mut candidates, &pages)
            .await;

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].reason.contains("no verdict"));
        assert_eq!(candidates[1].decision(), Decision::Rejected);
    }

    #[tokio::test]
    async fn test_offline_rejects_all_review_pages() {
        let (pages, mut candidates) = fixture();

        let warnings = ReviewResolver::offline()
            .resolve(&mut candidates, &pages)
            .await;

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].reason, "offline mode");
        assert!(warnings[0].to_string().starts_with("verification unavailable for page 2"));
    }

    #[test]
    fn test_summary_omits_images_and_caps_text() {
        let long = "x".repeat(SUMMARY_TEXT_LIMIT + 100);
        let page = Page::new(0, 1, long)
            .with_table(Table::from_rows(&[&["Pin", "Name"], &["1", "VCC"]]))
            .with_image(vec![0; 16]);
        let summary = PageSummary::from_page(&page);
        assert_eq!(summary.text.len(), SUMMARY_TEXT_LIMIT);
        assert_eq!(summary.table_headers, vec![vec!["Pin".to_string(), "Name".to_string()]]);
    }
}
