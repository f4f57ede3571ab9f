//! Content Stitching
//!
//! Walks the pages in order, keeps the pinout material of accepted pages and
//! carries a pinout table across page breaks. The only state between pages
//! is whether a pinout table is still open at the bottom of the previous
//! page.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::content::bundle::{page_marker, BundleEntry, BundleTable, ContentBundle, EntryKind};
use crate::content::filter::{filter_blocks, is_continuation_table, is_headerless};
use crate::detection::scorer::PageCandidate;
use crate::detection::signals::{is_pinout_table, SignalKind};
use crate::document::{Page, Table};

/// Data rows kept per table; the tail beyond this is dropped.
pub const MAX_TABLE_ROWS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchOptions {
    /// Data rows kept per table
    pub max_table_rows: usize,
    /// Use the whole text of accepted pages when block filtering keeps nothing
    pub fallback_to_unfiltered: bool,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            max_table_rows: MAX_TABLE_ROWS,
            fallback_to_unfiltered: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continuity {
    NoOpenTable,
    /// A pinout table may continue past the bottom of this page
    TableOpen { page_index: usize },
}

impl Continuity {
    fn continues_into(self, page_index: usize) -> bool {
        match self {
            Continuity::TableOpen { page_index: open } => open + 1 == page_index,
            Continuity::NoOpenTable => false,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ContentStitcher {
    options: StitchOptions,
}

impl ContentStitcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: StitchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &StitchOptions {
        &self.options
    }

    /// Build the content bundle from scored candidates and every page of the
    /// document.
    ///
    /// A page without a candidate is treated as not accepted.
    pub fn stitch(&self, candidates: &[PageCandidate], pages: &[Page]) -> ContentBundle {
        let by_index: HashMap<usize, &PageCandidate> =
            candidates.iter().map(|c| (c.page_index, c)).collect();

        let mut ordered: Vec<&Page> = pages.iter().collect();
        ordered.sort_by_key(|p| p.index);

        let mut entries = Vec::new();
        let mut accepted_pages = Vec::new();
        let mut kept_blocks = 0usize;
        let mut state = Continuity::NoOpenTable;

        for page in ordered {
            let candidate = by_index.get(&page.index).copied();
            let accepted = candidate.map(|c| c.is_accepted()).unwrap_or(false);
            let open = state.continues_into(page.index);

            let continuation: Vec<&Table> = if open {
                page.tables.iter().filter(|t| is_continuation_table(t)).collect()
            } else {
                Vec::new()
            };

            let mut table_shape_accept = false;

            if let (true, Some(candidate)) = (accepted, candidate) {
                let blocks = filter_blocks(page.text_or_empty());
                kept_blocks += blocks.len();

                let tables = page
                    .tables
                    .iter()
                    .filter_map(|t| {
                        if is_pinout_table(t) {
                            Some(self.cap_table(t, false, page.number()))
                        } else if open && is_continuation_table(t) {
                            Some(self.cap_table(t, true, page.number()))
                        } else {
                            None
                        }
                    })
                    .collect();

                let images = if candidate.has_signal(SignalKind::DiagramCaption) {
                    page.images.clone()
                } else {
                    Vec::new()
                };

                entries.push(BundleEntry {
                    page_index: page.index,
                    kind: EntryKind::Accepted,
                    text_block: marked(page.number(), &blocks.join("\n\n")),
                    tables,
                    images,
                });
                accepted_pages.push(page);
                table_shape_accept = candidate.has_signal(SignalKind::TableShape);
            } else if !continuation.is_empty() {
                tracing::debug!(
                    "Page {} continues the pinout table from page {}",
                    page.number(),
                    page.index
                );
                entries.push(BundleEntry {
                    page_index: page.index,
                    kind: EntryKind::Continuation,
                    text_block: marked(
                        page.number(),
                        &format!("Pinout table continued from page {}", page.index),
                    ),
                    tables: continuation
                        .iter()
                        .map(|t| self.cap_table(t, true, page.number()))
                        .collect(),
                    images: Vec::new(),
                });
            }

            state = if table_shape_accept || !continuation.is_empty() {
                Continuity::TableOpen {
                    page_index: page.index,
                }
            } else {
                Continuity::NoOpenTable
            };
        }

        let mut bundle = ContentBundle {
            entries,
            unfiltered_fallback: false,
        };

        if kept_blocks == 0 && self.options.fallback_to_unfiltered && !accepted_pages.is_empty() {
            tracing::info!(
                "No pinout text blocks survived filtering, using full text of {} accepted page(s)",
                accepted_pages.len()
            );
            for page in accepted_pages {
                if let Some(entry) = bundle
                    .entries
                    .iter_mut()
                    .find(|e| e.page_index == page.index)
                {
                    entry.text_block = marked(page.number(), page.text_or_empty().trim());
                }
            }
            bundle.unfiltered_fallback = true;
        }

        tracing::info!(
            "Stitched {} page(s) with {} table(s) into the content bundle",
            bundle.len(),
            bundle.table_count()
        );

        bundle
    }

    /// Keep the header (if any) and the first `max_table_rows` data rows.
    fn cap_table(&self, table: &Table, continued: bool, page_number: usize) -> BundleTable {
        let header_rows = if is_headerless(table) { 0 } else { 1 };
        let keep = (header_rows + self.options.max_table_rows).min(table.row_count());
        let truncated_rows = table.row_count() - keep;

        if truncated_rows > 0 {
            tracing::debug!(
                "Truncated {} row(s) of a table on page {}",
                truncated_rows,
                page_number
            );
        }

        BundleTable {
            rows: table.rows[..keep].to_vec(),
            continued,
            truncated_rows,
        }
    }
}

fn marked(page_number: usize, body: &str) -> String {
    if body.is_empty() {
        page_marker(page_number)
    } else {
        format!("{}\n{}", page_marker(page_number), body)
    }
}
