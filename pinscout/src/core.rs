//! Pipeline orchestration shared by the CLI and library callers.
//! Collaborators are passed in; nothing here talks to the network directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ai::provider::{PageVerifier, PinExtractor};
use crate::ai::router::ProviderSettings;
use crate::ai::AIError;
use crate::content::{ContentBundle, ContentStitcher, StitchOptions, MAX_TABLE_ROWS};
use crate::detection::review::{ReviewResolver, VerificationUnavailable};
use crate::detection::scorer::{
    Classification, Decision, PageCandidate, PageScorer, ReviewOutcome,
};
use crate::detection::signals::SignalKind;
use crate::document::{Document, DocumentError};
use crate::layout::{
    LayoutAssignment, LayoutError, LayoutWarning, OverrideError, OverrideTable, PinLayoutEngine,
};
use crate::pins::{PinData, PinDataError};

#[derive(Debug, thiserror::Error)]
pub enum PinScoutError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
    #[error("Pin data error: {0}")]
    PinData(#[from] PinDataError),
    #[error("Override error: {0}")]
    Override(#[from] OverrideError),
    #[error("AI error: {0}")]
    Ai(#[from] AIError),
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for pipeline runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOptions {
    /// Never call a verifier or extractor
    pub offline_mode: bool,
    pub verification_timeout_secs: u64,
    /// Part number used to pick a package variant during extraction
    pub part_number: Option<String>,
    /// Force a named layout override
    pub override_key: Option<String>,
    /// Extra directories of override JSON files
    pub override_dirs: Vec<PathBuf>,
    pub fallback_to_unfiltered: bool,
    pub max_table_rows: usize,
    pub provider: ProviderSettings,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            offline_mode: false,
            verification_timeout_secs: 30,
            part_number: None,
            override_key: None,
            override_dirs: vec![],
            fallback_to_unfiltered: true,
            max_table_rows: MAX_TABLE_ROWS,
            provider: ProviderSettings::default(),
        }
    }
}

impl PipelineOptions {
    /// Load options from a JSON file. Missing fields take their defaults;
    /// unknown fields are an error.
    pub fn from_file(path: &Path) -> Result<Self, PinScoutError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| PinScoutError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn stitch_options(&self) -> StitchOptions {
        StitchOptions {
            max_table_rows: self.max_table_rows,
            fallback_to_unfiltered: self.fallback_to_unfiltered,
        }
    }

    pub fn verification_timeout(&self) -> Duration {
        Duration::from_secs(self.verification_timeout_secs)
    }
}

/// Non-fatal problems met during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    SignalExtraction { page_index: usize, message: String },
    VerificationUnavailable { page_index: usize, reason: String },
    UnknownOverride { key: String },
    ExtractionSkipped { reason: String },
}

impl From<VerificationUnavailable> for PipelineWarning {
    fn from(w: VerificationUnavailable) -> Self {
        PipelineWarning::VerificationUnavailable {
            page_index: w.page_index,
            reason: w.reason,
        }
    }
}

impl From<&LayoutWarning> for PipelineWarning {
    fn from(w: &LayoutWarning) -> Self {
        match w {
            LayoutWarning::UnknownOverride(key) => PipelineWarning::UnknownOverride { key: key.clone() },
        }
    }
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineWarning::SignalExtraction { page_index, message } => {
                write!(f, "page {} rejected: {}", page_index + 1, message)
            }
            PipelineWarning::VerificationUnavailable { page_index, reason } => {
                write!(f, "page {} could not be verified: {}", page_index + 1, reason)
            }
            PipelineWarning::UnknownOverride { key } => {
                write!(f, "unknown layout override '{}'", key)
            }
            PipelineWarning::ExtractionSkipped { reason } => {
                write!(f, "pin extraction skipped: {}", reason)
            }
        }
    }
}

/// Serializable view of one scored page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub page_index: usize,
    pub score: u32,
    pub classification: Classification,
    pub decision: Decision,
    pub signals: Vec<SignalKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&PageCandidate> for CandidateSummary {
    fn from(c: &PageCandidate) -> Self {
        Self {
            page_index: c.page_index,
            score: c.score(),
            classification: c.classification(),
            decision: c.decision(),
            signals: c.signals().iter().map(|s| s.kind).collect(),
            review: c.review().cloned(),
            error: c.error().map(str::to_string),
        }
    }
}

/// Outcome of one pipeline run. Layout and extraction failures are kept
/// apart so the pin list stays usable without a layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub source: Option<String>,
    pub pages: Vec<CandidateSummary>,
    pub warnings: Vec<PipelineWarning>,
    pub bundle: ContentBundle,
    pub pin_data: Option<PinData>,
    pub layout: Option<LayoutAssignment>,
    pub extraction_error: Option<String>,
    pub layout_error: Option<String>,
}

impl PipelineReport {
    pub fn accepted_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|p| p.decision == Decision::Accepted)
            .map(|p| p.page_index)
            .collect()
    }

    pub fn has_layout(&self) -> bool {
        self.layout.is_some()
    }
}

/// External collaborators for a run. Either may be absent.
#[derive(Clone, Copy, Default)]
pub struct Collaborators<'a> {
    pub verifier: Option<&'a dyn PageVerifier>,
    pub extractor: Option<&'a dyn PinExtractor>,
}

impl<'a> Collaborators<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    /// Use one provider for both verification and extraction.
    pub fn from_provider<P: PageVerifier + PinExtractor>(provider: &'a P) -> Self {
        Self {
            verifier: Some(provider),
            extractor: Some(provider),
        }
    }

    pub fn with_verifier(mut self, verifier: &'a dyn PageVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_extractor(mut self, extractor: &'a dyn PinExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }
}

/// Core pipeline API used by the CLI.
pub struct PinScoutCore;

impl PinScoutCore {
    /// Score every page of the document.
    pub fn detect(document: &Document) -> Vec<PageCandidate> {
        let candidates = PageScorer::new().score_all(document.pages());
        let count = |c: Classification| {
            candidates
                .iter()
                .filter(|p| p.classification() == c)
                .count()
        };
        tracing::info!(
            "Scored {} pages: {} accept, {} review, {} reject",
            candidates.len(),
            count(Classification::Accept),
            count(Classification::Review),
            count(Classification::Reject)
        );
        candidates
    }

    /// Settle the review bucket. Without a verifier, or in offline mode,
    /// every review page is rejected with a warning.
    pub async fn resolve_reviews(
        candidates: &mut [PageCandidate],
        document: &Document,
        verifier: Option<&dyn PageVerifier>,
        options: &PipelineOptions,
    ) -> Vec<VerificationUnavailable> {
        let resolver = match verifier {
            Some(v) if !options.offline_mode => ReviewResolver::new(v),
            _ => ReviewResolver::offline(),
        };
        resolver
            .with_timeout(options.verification_timeout())
            .resolve(candidates, document.pages())
            .await
    }

    pub fn stitch(
        candidates: &[PageCandidate],
        document: &Document,
        options: &PipelineOptions,
    ) -> ContentBundle {
        ContentStitcher::with_options(options.stitch_options()).stitch(candidates, document.pages())
    }

    /// Built-in overrides plus every configured override directory.
    pub fn build_override_table(options: &PipelineOptions) -> Result<OverrideTable, PinScoutError> {
        let mut table = OverrideTable::builtin();
        for dir in &options.override_dirs {
            table.load_from_directory(dir)?;
        }
        Ok(table)
    }

    /// Lay out extracted pins.
    ///
    /// The override key is taken from `override_key`, then from the package
    /// spec, then from the component name when it names a known override.
    pub fn layout(
        engine: &PinLayoutEngine,
        pin_data: &PinData,
        override_key: Option<&str>,
    ) -> Result<LayoutAssignment, LayoutError> {
        let mut package = pin_data.package.clone();
        if let Some(key) = override_key {
            package.override_key = Some(key.to_string());
        } else if package.override_key.is_none()
            && engine.overrides().contains(&pin_data.component_name)
        {
            tracing::debug!(
                "Component '{}' has a layout override",
                pin_data.component_name
            );
            package.override_key = Some(pin_data.component_name.clone());
        }
        engine.layout(&pin_data.pins, &package)
    }

    /// Run detection, review, stitching, extraction and layout.
    pub async fn run(
        document: &Document,
        options: &PipelineOptions,
        collaborators: Collaborators<'_>,
    ) -> Result<PipelineReport, PinScoutError> {
        let engine = PinLayoutEngine::with_overrides(Self::build_override_table(options)?);
        let mut warnings = Vec::new();

        let mut candidates = Self::detect(document);
        for candidate in &candidates {
            if let Some(message) = candidate.error() {
                warnings.push(PipelineWarning::SignalExtraction {
                    page_index: candidate.page_index,
                    message: message.to_string(),
                });
            }
        }

        let unavailable =
            Self::resolve_reviews(&mut candidates, document, collaborators.verifier, options).await;
        warnings.extend(unavailable.into_iter().map(PipelineWarning::from));

        let bundle = Self::stitch(&candidates, document, options);

        let mut extraction_error = None;
        let pin_data = if bundle.is_empty() {
            let reason = "no pinout pages found".to_string();
            warnings.push(PipelineWarning::ExtractionSkipped {
                reason: reason.clone(),
            });
            extraction_error = Some(reason);
            None
        } else {
            match collaborators.extractor {
                Some(extractor) if !options.offline_mode => {
                    match extractor
                        .extract_pins(&bundle, options.part_number.as_deref())
                        .await
                    {
                        Ok(data) => {
                            tracing::info!(
                                "Extracted {} pins for {}",
                                data.pins.len(),
                                data.component_name
                            );
                            Some(data)
                        }
                        Err(e) => {
                            tracing::error!("Pin extraction failed: {}", e);
                            extraction_error = Some(e.to_string());
                            None
                        }
                    }
                }
                _ => {
                    warnings.push(PipelineWarning::ExtractionSkipped {
                        reason: "no extractor available".to_string(),
                    });
                    None
                }
            }
        };

        let mut layout = None;
        let mut layout_error = None;
        if let Some(data) = &pin_data {
            match Self::layout(&engine, data, options.override_key.as_deref()) {
                Ok(assignment) => {
                    warnings.extend(assignment.warnings().iter().map(PipelineWarning::from));
                    layout = Some(assignment);
                }
                Err(e) => {
                    tracing::warn!("Layout failed: {}", e);
                    layout_error = Some(e.to_string());
                }
            }
        }

        Ok(PipelineReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            source: document.source.clone(),
            pages: candidates.iter().map(CandidateSummary::from).collect(),
            warnings,
            bundle,
            pin_data,
            layout,
            extraction_error,
            layout_error,
        })
    }
}
