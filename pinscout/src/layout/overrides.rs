//! Named Layout Overrides
//!
//! Parts whose pinout does not follow a family rule (modules with an uneven
//! side split, for instance) are described explicitly, per side, as pin
//! ranges. Overrides come from two places:
//! 1. Built-in JSON files compiled into the binary
//! 2. User JSON files loaded from directories, which shadow built-ins with
//!    the same key

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::layout::Side;

/// Highest pin number an override may name.
pub const MAX_OVERRIDE_PIN: u32 = 2048;

const EMBEDDED_ESP32_WROOM_32: &str = include_str!("../../overrides/esp32-wroom-32.json");

#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid directory: {0}")]
    InvalidDirectory(String),
    #[error("Invalid override '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

/// Inclusive pin range. `start > end` lists the pins in descending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRange {
    pub start: u32,
    pub end: u32,
}

impl PinRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn pins(&self) -> Vec<u32> {
        if self.start <= self.end {
            (self.start..=self.end).collect()
        } else {
            (self.end..=self.start).rev().collect()
        }
    }
}

/// Pin ranges per side, each side listed in placement order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SideRanges {
    pub left: Vec<PinRange>,
    pub bottom: Vec<PinRange>,
    pub right: Vec<PinRange>,
    pub top: Vec<PinRange>,
}

impl SideRanges {
    pub fn ranges(&self, side: Side) -> &[PinRange] {
        match side {
            Side::Left => &self.left,
            Side::Bottom => &self.bottom,
            Side::Right => &self.right,
            Side::Top => &self.top,
        }
    }

    /// Pins of `side` in placement order.
    pub fn pins(&self, side: Side) -> Vec<u32> {
        self.ranges(side).iter().flat_map(|r| r.pins()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinOverride {
    /// Component identity the override is looked up by
    pub key: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub sides: SideRanges,
}

impl PinOverride {
    /// Every pin number the override places, in traversal order.
    pub fn all_pins(&self) -> Vec<u32> {
        Side::TRAVERSAL
            .iter()
            .flat_map(|side| self.sides.pins(*side))
            .collect()
    }

    pub fn pin_count(&self) -> usize {
        self.all_pins().len()
    }

    fn validate(&self) -> Result<(), OverrideError> {
        let invalid = |reason: &str| OverrideError::Invalid {
            key: self.key.clone(),
            reason: reason.to_string(),
        };

        if normalize_key(&self.key).is_empty() {
            return Err(invalid("key is empty"));
        }

        // Bounds are checked per range so a bad file never gets expanded.
        let mut any = false;
        for range in Side::TRAVERSAL.iter().flat_map(|side| self.sides.ranges(*side)) {
            any = true;
            if range.start == 0 || range.end == 0 {
                return Err(invalid("pin numbers start at 1"));
            }
            if range.start.max(range.end) > MAX_OVERRIDE_PIN {
                return Err(invalid(&format!(
                    "pin numbers above {} are not supported",
                    MAX_OVERRIDE_PIN
                )));
            }
        }
        if !any {
            return Err(invalid("no pins on any side"));
        }
        Ok(())
    }
}

/// Uppercase with whitespace removed, so "esp32 - wroom-32" finds
/// "ESP32-WROOM-32".
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Lookup table of overrides by key and alias.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    overrides: Vec<PinOverride>,
    index: HashMap<String, usize>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the overrides compiled into the binary.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for json_str in [EMBEDDED_ESP32_WROOM_32] {
            let parsed = serde_json::from_str::<PinOverride>(json_str)
                .map_err(OverrideError::from)
                .and_then(|ov| table.add(ov));
            if let Err(e) = parsed {
                tracing::warn!("Failed to load embedded override: {}", e);
            }
        }
        table
    }

    /// Add an override; one with the same key or alias replaces the lookup
    /// of the earlier entry.
    pub fn add(&mut self, ov: PinOverride) -> Result<(), OverrideError> {
        ov.validate()?;

        let slot = self.overrides.len();
        for name in std::iter::once(&ov.key).chain(ov.aliases.iter()) {
            let key = normalize_key(name);
            if key.is_empty() {
                continue;
            }
            if self.index.insert(key, slot).is_some() {
                tracing::debug!("Override '{}' replaces an earlier definition", name);
            }
        }
        self.overrides.push(ov);
        Ok(())
    }

    /// Load every `.json` file in `dir`. Files that fail to parse or
    /// validate are skipped with a warning.
    pub fn load_from_directory(&mut self, dir: &Path) -> Result<usize, OverrideError> {
        if !dir.is_dir() {
            return Err(OverrideError::InvalidDirectory(
                dir.to_string_lossy().to_string(),
            ));
        }

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        paths.sort();

        let mut count = 0;
        for path in paths {
            match self.load_from_file(&path) {
                Ok(()) => count += 1,
                Err(e) => {
                    tracing::warn!("Failed to load override from {:?}: {}", path, e);
                }
            }
        }

        tracing::info!("Loaded {} layout overrides from {:?}", count, dir);
        Ok(count)
    }

    pub fn load_from_file(&mut self, path: &Path) -> Result<(), OverrideError> {
        let content = std::fs::read_to_string(path)?;
        let ov: PinOverride = serde_json::from_str(&content)?;
        self.add(ov)
    }

    pub fn get(&self, key: &str) -> Option<&PinOverride> {
        self.index
            .get(&normalize_key(key))
            .and_then(|slot| self.overrides.get(*slot))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Overrides that are still reachable by their own key, in insertion
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = &PinOverride> {
        self.overrides
            .iter()
            .enumerate()
            .filter(|(slot, ov)| self.index.get(&normalize_key(&ov.key)) == Some(slot))
            .map(|(_, ov)| ov)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
