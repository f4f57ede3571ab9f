//! Block-Level Pinout Filtering
//!
//! The page-level heuristics from signal extraction applied at the
//! granularity of text blocks and tables, so only pinout material reaches the
//! extraction prompt.

use regex::Regex;
use std::sync::OnceLock;

use crate::detection::signals::{is_header_row, is_keyword_dense};
use crate::document::Table;

/// Section keywords, compared against the block with whitespace removed so
/// that "pindescription" style extraction glitches still match.
const SECTION_KEYWORDS: &[&str] = &[
    "pinout",
    "pin configuration",
    "pin description",
    "pin mapping",
    "pin name",
    "pin function",
    "pin assignment",
    "pin detail",
    "pin diagram",
    "pin definition",
    "pin table",
    "pin list",
];

const STRONG_INDICATORS: &[&str] = &["pin configurations", "pin mapping", "pinout -"];

/// Headings of datasheet sections that never carry the pinout.
const EXCLUDED_HEADINGS: &[&str] = &[
    "absolute maximum",
    "absolute minimum",
    "electrical characteristics",
    "recommended operating conditions",
    "thermal information",
    "ordering information",
    "packaging information",
    "mechanical dimensions",
    "physical dimensions",
    "soldering",
    "reeling information",
    "marking",
    "storage",
    "handling",
];

/// Largest pin number accepted in a continuation table's first column.
const MAX_PIN_NUMBER: u32 = 2048;

fn strong_figure_regex() -> Option<&'static Regex> {
    static FIGURE: OnceLock<Option<Regex>> = OnceLock::new();
    FIGURE
        .get_or_init(|| Regex::new(r"(?i)figure\s*\d+(?:-\d+)?\.\s*pinout").ok())
        .as_ref()
}

/// Pinout diagrams flattened to text look like "(PCINT8/XCK0/T0) PB0".
fn diagram_text_regex() -> Option<&'static Regex> {
    static DIAGRAM: OnceLock<Option<Regex>> = OnceLock::new();
    DIAGRAM
        .get_or_init(|| Regex::new(r"(?i)\([a-z0-9]+(?:/[a-z0-9]+){2,}\)\s*p[a-z]\d+").ok())
        .as_ref()
}

fn pin_row_regex() -> Option<&'static Regex> {
    static PIN_ROW: OnceLock<Option<Regex>> = OnceLock::new();
    PIN_ROW
        .get_or_init(|| Regex::new(r"^\s*\d{1,4}\s+[A-Za-z_/~!]").ok())
        .as_ref()
}

/// Split page text into blocks separated by blank lines.
pub fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
}

fn has_strong_indicator(lower: &str) -> bool {
    STRONG_INDICATORS.iter().any(|kw| lower.contains(kw))
        || strong_figure_regex()
            .map(|re| re.is_match(lower))
            .unwrap_or(false)
}

fn has_section_keyword(lower: &str) -> bool {
    let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();
    SECTION_KEYWORDS
        .iter()
        .any(|kw| compact.contains(&kw.replace(' ', "")))
}

fn has_excluded_heading(lower: &str) -> bool {
    let heading = lower.lines().next().unwrap_or("");
    EXCLUDED_HEADINGS.iter().any(|kw| heading.contains(kw))
}

/// Whether a block is pinout section text.
pub fn is_pinout_section(block: &str) -> bool {
    let lower = block.to_lowercase();
    if has_strong_indicator(&lower) {
        return true;
    }
    if has_excluded_heading(&lower) {
        return false;
    }
    has_section_keyword(&lower)
        || diagram_text_regex()
            .map(|re| re.is_match(&lower))
            .unwrap_or(false)
}

/// A block whose lines mostly read like rows of a pin table rendered as text
/// ("1  GND  Ground").
pub fn is_pin_row_block(block: &str) -> bool {
    let Some(re) = pin_row_regex() else {
        return false;
    };
    let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return false;
    }
    let rows = lines.iter().filter(|l| re.is_match(l)).count();
    rows * 2 > lines.len()
}

/// Keep the blocks of a page that belong to a pinout section or table.
///
/// A keyword-dense block directly after a kept block is treated as part of
/// the same section.
pub fn filter_blocks(text: &str) -> Vec<String> {
    let mut kept = Vec::new();
    let mut previous_kept = false;

    for block in split_blocks(text) {
        let lower = block.to_lowercase();
        let keep = is_pinout_section(&block)
            || (!has_excluded_heading(&lower)
                && (is_pin_row_block(&block) || (previous_kept && is_keyword_dense(&block))));

        if keep {
            kept.push(block);
        }
        previous_kept = keep;
    }

    kept
}

/// Parse a pin-number cell ("12", " 7 ").
pub fn parse_pin_number(cell: &str) -> Option<u32> {
    let cell = cell.trim();
    if cell.is_empty() || cell.len() > 4 || !cell.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    cell.parse::<u32>()
        .ok()
        .filter(|n| (1..=MAX_PIN_NUMBER).contains(n))
}

fn leads_with_pin_number(row: &[String]) -> bool {
    row.first()
        .and_then(|cell| parse_pin_number(cell))
        .is_some()
}

/// Whether a table lacks a header row of its own. A row led by a pin number
/// is data, whatever words its description uses.
pub fn is_headerless(table: &Table) -> bool {
    table.first_row().map(|row| !is_header_row(row)).unwrap_or(true)
}

/// A continuation table is the tail of a table begun on an earlier page: no
/// header row, and a first column of plausible pin numbers.
pub fn is_continuation_table(table: &Table) -> bool {
    if table.is_empty() || !is_headerless(table) {
        return false;
    }
    if !table.first_row().map(leads_with_pin_number).unwrap_or(false) {
        return false;
    }
    let numbered = table
        .rows
        .iter()
        .filter(|row| leads_with_pin_number(row))
        .count();
    numbered * 2 >= table.row_count()
}
