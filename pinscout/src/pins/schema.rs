use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::pins::package::PackageFamily;

#[derive(Debug, Error)]
pub enum PinDataError {
    #[error("Failed to read pin data: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse pin data JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single package pin as reported by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    /// Positive pin number, unique within one [`PinData`]
    pub number: u32,
    pub name: String,
    /// Free-text function ("power", "GPIO / ADC0", ...)
    #[serde(default)]
    pub function: String,
}

impl Pin {
    pub fn new(number: u32, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            function: String::new(),
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }
}

/// Package descriptor used to pick a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub family: PackageFamily,
    pub pin_count: u32,
    /// Name of an explicit layout override for non-conforming parts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_key: Option<String>,
}

impl PackageSpec {
    pub fn new(family: PackageFamily, pin_count: u32) -> Self {
        Self {
            family,
            pin_count,
            override_key: None,
        }
    }

    pub fn with_override(mut self, key: impl Into<String>) -> Self {
        self.override_key = Some(key.into());
        self
    }
}

/// Complete extraction result for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinData {
    pub component_name: String,
    pub package: PackageSpec,
    pub pins: Vec<Pin>,
    /// How the pins were found (table, diagram, mixed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<String>,
}

impl PinData {
    pub fn new(component_name: impl Into<String>, package: PackageSpec, pins: Vec<Pin>) -> Self {
        Self {
            component_name: component_name.into(),
            package,
            pins,
            extraction_method: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, PinDataError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, PinDataError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn pin(&self, number: u32) -> Option<&Pin> {
        self.pins.iter().find(|p| p.number == number)
    }
}
