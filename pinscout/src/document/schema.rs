use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse document JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A table extracted from a page, as a grid of cell strings.
///
/// The first row is the header row when the table has one; continuation
/// fragments of a table split across pages usually start straight with data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Build a table from string slices (handy for fixtures and tests).
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        }
    }

    pub fn first_row(&self) -> Option<&[String]> {
        self.rows.first().map(|row| row.as_slice())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One decoded datasheet page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 0-based page index within the document
    pub index: usize,

    /// Text layer; `None` when the decoder produced no text for the page
    pub text: Option<String>,

    /// Tables in reading order
    #[serde(default)]
    pub tables: Vec<Table>,

    /// Raw image blobs; only their presence is ever inspected
    #[serde(default, skip_serializing)]
    pub images: Vec<Vec<u8>>,

    /// `index / total_pages`, in [0, 1]
    pub position: f64,
}

impl Page {
    pub fn new(index: usize, total_pages: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: Some(text.into()),
            tables: Vec::new(),
            images: Vec::new(),
            position: position_fraction(index, total_pages),
        }
    }

    /// A page whose text layer could not be decoded.
    pub fn without_text(index: usize, total_pages: usize) -> Self {
        Self {
            index,
            text: None,
            tables: Vec::new(),
            images: Vec::new(),
            position: position_fraction(index, total_pages),
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.images.push(bytes);
        self
    }

    /// 1-based page number as printed in page markers.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

fn position_fraction(index: usize, total_pages: usize) -> f64 {
    if total_pages == 0 {
        return 0.0;
    }
    index as f64 / total_pages as f64
}

/// Decoder output as it appears on disk. Table cells may be `null` when the
/// decoder found an empty cell.
#[derive(Debug, Deserialize)]
struct DecodedDocument {
    #[serde(default)]
    source: Option<String>,
    pages: Vec<DecodedPage>,
}

#[derive(Debug, Deserialize)]
struct DecodedPage {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    tables: Vec<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    images: Vec<Vec<u8>>,
}

/// A whole decoded datasheet.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub source: Option<String>,
    pages: Vec<Page>,
}

impl Document {
    /// Build a document from pages, re-deriving indices and positions from
    /// their order.
    pub fn from_pages(pages: Vec<Page>) -> Self {
        let total = pages.len();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(index, mut page)| {
                page.index = index;
                page.position = position_fraction(index, total);
                page
            })
            .collect();
        Self { source: None, pages }
    }

    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        let decoded: DecodedDocument = serde_json::from_str(json)?;
        let total = decoded.pages.len();

        let pages = decoded
            .pages
            .into_iter()
            .enumerate()
            .map(|(index, page)| Page {
                index,
                text: page.text,
                tables: page
                    .tables
                    .into_iter()
                    .map(|rows| {
                        Table::new(
                            rows.into_iter()
                                .map(|row| row.into_iter().map(Option::unwrap_or_default).collect())
                                .collect(),
                        )
                    })
                    .collect(),
                images: page.images,
                position: position_fraction(index, total),
            })
            .collect();

        Ok(Self {
            source: decoded.source,
            pages,
        })
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path)?;
        let mut document = Self::from_json_str(&content)?;
        if document.source.is_none() {
            document.source = path.file_name().map(|n| n.to_string_lossy().to_string());
        }
        tracing::debug!(
            "Loaded {} decoded pages from {}",
            document.page_count(),
            path.display()
        );
        Ok(document)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
