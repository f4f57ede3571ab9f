//! Pin Layout Synthesis
//!
//! Maps an extracted pin list onto the physical sides of its package. Regular
//! families follow a fixed numbering convention; parts that do not are
//! described by named overrides.
//!
//! Every assignment satisfies:
//! - each input pin is placed exactly once,
//! - no two pins share a `(side, position_index)` slot,
//! - position indices on a side run contiguously from 0.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::pins::PackageFamily;

pub mod engine;
pub mod overrides;

pub use engine::PinLayoutEngine;
pub use overrides::{normalize_key, OverrideError, OverrideTable, PinOverride, PinRange, SideRanges};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Bottom,
    Right,
    Top,
}

impl Side {
    /// Counter-clockwise traversal order starting at the top-left corner.
    pub const TRAVERSAL: [Side; 4] = [Side::Left, Side::Bottom, Side::Right, Side::Top];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Bottom => "bottom",
            Side::Right => "right",
            Side::Top => "top",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub side: Side,
    /// 0-based placement order along the side
    pub position_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum LayoutSource {
    Family(PackageFamily),
    Override(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutWarning {
    /// The package named an override that is not in the table
    UnknownOverride(String),
}

impl std::fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutWarning::UnknownOverride(key) => {
                write!(f, "unknown layout override '{}', using the family rule", key)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("package pin count must be positive")]
    InvalidPinCount,

    #[error("pin list has {actual} pins but the package declares {expected}")]
    PinCountMismatch { expected: u32, actual: usize },

    #[error("pin number {0} is not a positive integer")]
    InvalidPinNumber(u32),

    #[error("pin {0} appears more than once")]
    DuplicatePin(u32),

    #[error(
        "override '{key}' does not cover every pin exactly once \
         (missing {missing:?}, duplicated {duplicated:?}, unexpected {unexpected:?})"
    )]
    OverrideCoverage {
        key: String,
        missing: Vec<u32>,
        duplicated: Vec<u32>,
        unexpected: Vec<u32>,
    },
}

/// Side and position for every pin of one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutAssignment {
    placements: BTreeMap<u32, Placement>,
    source: LayoutSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<LayoutWarning>,
}

impl LayoutAssignment {
    pub(crate) fn new(source: LayoutSource) -> Self {
        Self {
            placements: BTreeMap::new(),
            source,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn place(&mut self, pin: u32, side: Side, position_index: usize) {
        self.placements.insert(
            pin,
            Placement {
                side,
                position_index,
            },
        );
    }

    pub(crate) fn push_warning(&mut self, warning: LayoutWarning) {
        self.warnings.push(warning);
    }

    pub fn get(&self, pin: u32) -> Option<Placement> {
        self.placements.get(&pin).copied()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn source(&self) -> &LayoutSource {
        &self.source
    }

    pub fn warnings(&self) -> &[LayoutWarning] {
        &self.warnings
    }

    /// Placements in pin-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Placement)> + '_ {
        self.placements.iter().map(|(pin, placement)| (*pin, *placement))
    }

    /// Pins on `side`, in position order.
    pub fn pins_on(&self, side: Side) -> Vec<u32> {
        let mut pins: Vec<(usize, u32)> = self
            .placements
            .iter()
            .filter(|(_, p)| p.side == side)
            .map(|(pin, p)| (p.position_index, *pin))
            .collect();
        pins.sort_unstable();
        pins.into_iter().map(|(_, pin)| pin).collect()
    }

    /// Number of pins per side, in traversal order.
    pub fn side_counts(&self) -> [(Side, usize); 4] {
        Side::TRAVERSAL.map(|side| {
            (
                side,
                self.placements.values().filter(|p| p.side == side).count(),
            )
        })
    }
}
