use serde::{Deserialize, Serialize};

/// Page marker placed ahead of every retained text block.
pub fn page_marker(page_number: usize) -> String {
    format!("--- Page {} ---", page_number)
}

/// Why a page made it into the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// The page was accepted by scoring or review
    Accepted,
    /// The page was not accepted but continues a table from the page before
    Continuation,
}

/// A table as carried in the bundle, after the row cap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleTable {
    pub rows: Vec<Vec<String>>,
    /// Tail of a table begun on an earlier page
    #[serde(default)]
    pub continued: bool,
    /// Rows dropped from the end by the row cap
    #[serde(default)]
    pub truncated_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub page_index: usize,
    pub kind: EntryKind,
    /// Retained text, starting with the page marker
    pub text_block: String,
    pub tables: Vec<BundleTable>,
    #[serde(skip)]
    pub images: Vec<Vec<u8>>,
}

impl BundleEntry {
    pub fn page_number(&self) -> usize {
        self.page_index + 1
    }

    /// Retained text without the leading page marker.
    pub fn body(&self) -> &str {
        let marker = page_marker(self.page_number());
        self.text_block
            .strip_prefix(marker.as_str())
            .map(str::trim_start)
            .unwrap_or(&self.text_block)
    }
}

/// The filtered, stitched content handed to pin extraction. Entries are in
/// ascending page order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBundle {
    pub entries: Vec<BundleEntry>,
    /// Set when block filtering kept nothing and whole page text was used
    #[serde(default)]
    pub unfiltered_fallback: bool,
}

impl ContentBundle {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn page_indices(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.page_index).collect()
    }

    pub fn entry(&self, page_index: usize) -> Option<&BundleEntry> {
        self.entries.iter().find(|e| e.page_index == page_index)
    }

    pub fn contains_page(&self, page_index: usize) -> bool {
        self.entry(page_index).is_some()
    }

    pub fn table_count(&self) -> usize {
        self.entries.iter().map(|e| e.tables.len()).sum()
    }

    pub fn image_count(&self) -> usize {
        self.entries.iter().map(|e| e.images.len()).sum()
    }

    pub fn images(&self) -> impl Iterator<Item = &[u8]> {
        self.entries
            .iter()
            .flat_map(|e| e.images.iter().map(|img| img.as_slice()))
    }

    /// Render the bundle as the plain-text datasheet excerpt used in the
    /// extraction prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let pages = self
            .entries
            .iter()
            .map(|e| e.page_number().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("Relevant pages: {}\n", pages));

        let text_entries: Vec<&BundleEntry> = self
            .entries
            .iter()
            .filter(|e| !e.body().is_empty())
            .collect();
        if !text_entries.is_empty() {
            out.push_str("\n--- Pinout Information ---\n");
            for entry in text_entries {
                out.push_str(&entry.text_block);
                out.push_str("\n\n");
            }
        }

        if self.table_count() > 0 {
            out.push_str("\n--- Pinout Tables ---\n");
            for entry in &self.entries {
                for table in &entry.tables {
                    if table.continued {
                        out.push_str(&format!(
                            "Table from page {} (continued):\n",
                            entry.page_number()
                        ));
                    } else {
                        out.push_str(&format!("Table from page {}:\n", entry.page_number()));
                    }
                    for row in &table.rows {
                        out.push_str(&row.join(" | "));
                        out.push('\n');
                    }
                    if table.truncated_rows > 0 {
                        out.push_str(&format!("({} more rows not shown)\n", table.truncated_rows));
                    }
                    out.push('\n');
                }
            }
        }

        let image_pages: Vec<String> = self
            .entries
            .iter()
            .filter(|e| !e.images.is_empty())
            .map(|e| e.page_number().to_string())
            .collect();
        if !image_pages.is_empty() {
            out.push_str(&format!(
                "\n[{} pinout diagram image(s) available from page(s) {}]\n",
                self.image_count(),
                image_pages.join(", ")
            ));
        }

        out.trim_end().to_string()
    }
}
