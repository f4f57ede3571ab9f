//! Page Signal Extraction
//!
//! Five cheap structural detectors run over a decoded page. They are
//! independent of each other: each returns at most one [`Signal`] and every
//! signal that fires is kept.
//!
//! | Signal           | Weight | Fires when                                        |
//! |------------------|--------|---------------------------------------------------|
//! | heading          | +3     | a pinout heading appears in the first lines       |
//! | table-shape      | +4     | a table header names at least two pinout columns  |
//! | diagram-caption  | +2     | the page has an image and a pinout caption        |
//! | keyword-density  | +2     | pinout keywords exceed 2 per 100 words            |
//! | position         | +1     | page sits between 20% and 70% of the document     |

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::document::{Page, Table};

pub const HEADING_WEIGHT: u32 = 3;
pub const TABLE_SHAPE_WEIGHT: u32 = 4;
pub const DIAGRAM_CAPTION_WEIGHT: u32 = 2;
pub const KEYWORD_DENSITY_WEIGHT: u32 = 2;
pub const POSITION_WEIGHT: u32 = 1;

/// Headings are only looked for near the top of a page.
pub const HEADING_SCAN_LINES: usize = 10;

/// Pinout keywords per 100 words that must be exceeded.
pub const KEYWORD_DENSITY_THRESHOLD: f64 = 2.0;

pub const POSITION_MIN: f64 = 0.20;
pub const POSITION_MAX: f64 = 0.70;

/// Header keywords matched as case-insensitive substrings of the header row.
pub const TABLE_HEADER_KEYWORDS: [&str; 5] = ["pin", "no.", "name", "function", "description"];
pub const MIN_HEADER_KEYWORDS: usize = 2;

const HEADING_PATTERNS: &[&str] = &[
    r"pin\s*(?:configuration|out|description|mapping|definition)s?\b",
    r"pinout\b",
    r"pin\s*assignments?\b",
    r"mechanical\s*data\b",
    r"package\s*(?:information|drawing|specification)s?\b",
    r"pin\s*functions?\b",
];

const CAPTION_PATTERNS: &[&str] = &[
    r"pinout",
    r"pin\s*configuration",
    r"pin\s*diagram",
    r"package\s*drawing",
    r"mechanical\s*drawing",
];

const PINOUT_KEYWORDS: &[&str] = &[
    "pin", "pins", "vcc", "vdd", "vss", "vee", "gnd", "ground", "gpio", "pwm", "i2c", "spi",
    "uart", "rx", "tx", "rxd", "txd", "adc", "dac", "reset", "enable", "clock", "oscillator",
    "xtal", "input", "output", "power", "analog", "digital", "interrupt", "nc",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Heading,
    TableShape,
    DiagramCaption,
    KeywordDensity,
    Position,
}

impl SignalKind {
    pub const ALL: [SignalKind; 5] = [
        SignalKind::Heading,
        SignalKind::TableShape,
        SignalKind::DiagramCaption,
        SignalKind::KeywordDensity,
        SignalKind::Position,
    ];

    pub fn weight(self) -> u32 {
        match self {
            SignalKind::Heading => HEADING_WEIGHT,
            SignalKind::TableShape => TABLE_SHAPE_WEIGHT,
            SignalKind::DiagramCaption => DIAGRAM_CAPTION_WEIGHT,
            SignalKind::KeywordDensity => KEYWORD_DENSITY_WEIGHT,
            SignalKind::Position => POSITION_WEIGHT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SignalKind::Heading => "heading",
            SignalKind::TableShape => "table-shape",
            SignalKind::DiagramCaption => "diagram-caption",
            SignalKind::KeywordDensity => "keyword-density",
            SignalKind::Position => "position",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A triggered detector with its weight and a short human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub weight: u32,
    pub evidence: String,
}

impl Signal {
    fn new(kind: SignalKind, evidence: String) -> Self {
        Self {
            kind,
            weight: kind.weight(),
            evidence,
        }
    }
}

/// Page input that the detectors cannot work with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("page {0} has no text layer")]
    MissingText(usize),
    #[error("page {page} has position fraction {position} outside [0, 1]")]
    InvalidPosition { page: usize, position: f64 },
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(&format!("(?i){}", p)) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!("Skipping invalid pattern {:?}: {}", p, e);
                None
            }
        })
        .collect()
}

fn heading_regexes() -> &'static [Regex] {
    static HEADINGS: OnceLock<Vec<Regex>> = OnceLock::new();
    HEADINGS.get_or_init(|| compile(HEADING_PATTERNS))
}

fn caption_regexes() -> &'static [Regex] {
    static CAPTIONS: OnceLock<Vec<Regex>> = OnceLock::new();
    CAPTIONS.get_or_init(|| compile(CAPTION_PATTERNS))
}

fn no_connect_regex() -> Option<&'static Regex> {
    static NO_CONNECT: OnceLock<Option<Regex>> = OnceLock::new();
    NO_CONNECT
        .get_or_init(|| Regex::new(r"(?i)\bno[\s-]*connect").ok())
        .as_ref()
}

/// Compute every signal that fires for `page`, in [`SignalKind`] order.
pub fn compute_signals(page: &Page) -> Result<Vec<Signal>, SignalError> {
    let text = page
        .text
        .as_deref()
        .ok_or(SignalError::MissingText(page.index))?;

    if !page.position.is_finite() || !(0.0..=1.0).contains(&page.position) {
        return Err(SignalError::InvalidPosition {
            page: page.index,
            position: page.position,
        });
    }

    let signals = [
        detect_heading(text),
        detect_table_shape(&page.tables),
        detect_diagram_caption(text, page.images.len()),
        detect_keyword_density(text),
        detect_position(page.position),
    ];

    Ok(signals.into_iter().flatten().collect())
}

fn detect_heading(text: &str) -> Option<Signal> {
    for (line_no, line) in text.lines().take(HEADING_SCAN_LINES).enumerate() {
        if heading_regexes().iter().any(|re| re.is_match(line)) {
            return Some(Signal::new(
                SignalKind::Heading,
                format!("pinout heading '{}' on line {}", line.trim(), line_no + 1),
            ));
        }
    }
    None
}

fn detect_table_shape(tables: &[Table]) -> Option<Signal> {
    tables.iter().enumerate().find_map(|(i, table)| {
        if !is_pinout_table(table) {
            return None;
        }
        let matched = table.first_row().map(header_keyword_count).unwrap_or(0);
        Some(Signal::new(
            SignalKind::TableShape,
            format!("table {} header matches {} pinout columns", i + 1, matched),
        ))
    })
}

fn detect_diagram_caption(text: &str, image_count: usize) -> Option<Signal> {
    if image_count == 0 {
        return None;
    }
    text.lines()
        .find(|line| caption_regexes().iter().any(|re| re.is_match(line)))
        .map(|caption| {
            Signal::new(
                SignalKind::DiagramCaption,
                format!("{} image(s) with caption '{}'", image_count, caption.trim()),
            )
        })
}

fn detect_keyword_density(text: &str) -> Option<Signal> {
    let (hits, words) = keyword_hits(text);
    if words == 0 {
        return None;
    }
    let density = hits as f64 * 100.0 / words as f64;
    if density > KEYWORD_DENSITY_THRESHOLD {
        Some(Signal::new(
            SignalKind::KeywordDensity,
            format!("{} pinout keywords in {} words ({:.1} per 100)", hits, words, density),
        ))
    } else {
        None
    }
}

fn detect_position(position: f64) -> Option<Signal> {
    if (POSITION_MIN..=POSITION_MAX).contains(&position) {
        Some(Signal::new(
            SignalKind::Position,
            format!("page at {:.0}% of the document", position * 100.0),
        ))
    } else {
        None
    }
}

/// Count of pinout keywords and of words in `text`.
pub fn keyword_hits(text: &str) -> (usize, usize) {
    let mut words = 0;
    let mut hits = 0;
    for raw in text.split_whitespace() {
        words += 1;
        let token = raw
            .trim_matches(|c: char| !c.is_ascii_alphanumeric())
            .to_ascii_lowercase();
        if PINOUT_KEYWORDS.contains(&token.as_str()) {
            hits += 1;
        }
    }
    if let Some(re) = no_connect_regex() {
        hits += re.find_iter(text).count();
    }
    (hits, words)
}

/// Whether `text` alone would trigger the keyword-density signal.
pub fn is_keyword_dense(text: &str) -> bool {
    detect_keyword_density(text).is_some()
}

/// Number of distinct [`TABLE_HEADER_KEYWORDS`] found in a header row.
pub fn header_keyword_count(row: &[String]) -> usize {
    let header = row
        .iter()
        .map(|cell| cell.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    TABLE_HEADER_KEYWORDS
        .iter()
        .filter(|kw| header.contains(*kw))
        .count()
}

/// A header row names at least two pinout columns and does not lead with a
/// pin number.
pub fn is_header_row(row: &[String]) -> bool {
    let numbered = row
        .first()
        .map(|cell| {
            let cell = cell.trim();
            !cell.is_empty() && cell.chars().all(|c| c.is_ascii_digit())
        })
        .unwrap_or(false);
    !numbered && header_keyword_count(row) >= MIN_HEADER_KEYWORDS
}

/// A pinout table has a header naming pinout columns and at least one row
/// below it.
pub fn is_pinout_table(table: &Table) -> bool {
    table.row_count() >= 2
        && table
            .first_row()
            .map(is_header_row)
            .unwrap_or(false)
}
