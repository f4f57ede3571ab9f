use std::collections::{BTreeMap, BTreeSet};

use crate::layout::overrides::{OverrideTable, PinOverride};
use crate::layout::{LayoutAssignment, LayoutError, LayoutSource, LayoutWarning, Side};
use crate::pins::{PackageFamily, PackageSpec, Pin};

/// Assigns every pin a side and a position on that side.
///
/// Resolution order: a known `override_key` first, then the family rule.
/// An override key that is not in the table falls through to the family rule
/// with a warning on the assignment.
#[derive(Debug, Clone)]
pub struct PinLayoutEngine {
    overrides: OverrideTable,
}

impl Default for PinLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PinLayoutEngine {
    /// Engine with the built-in overrides.
    pub fn new() -> Self {
        Self {
            overrides: OverrideTable::builtin(),
        }
    }

    pub fn with_overrides(overrides: OverrideTable) -> Self {
        Self { overrides }
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    pub fn layout(&self, pins: &[Pin], package: &PackageSpec) -> Result<LayoutAssignment, LayoutError> {
        let numbers = validate_pins(pins, package.pin_count)?;

        let mut warnings = Vec::new();
        if let Some(key) = package.override_key.as_deref() {
            match self.overrides.get(key) {
                Some(ov) => {
                    tracing::debug!("Laying out {} pins with override '{}'", numbers.len(), ov.key);
                    return apply_override(ov, &numbers);
                }
                None => {
                    tracing::warn!("Unknown layout override '{}', using the {} rule", key, package.family);
                    warnings.push(LayoutWarning::UnknownOverride(key.to_string()));
                }
            }
        }

        let mut assignment = layout_family(package.family, &numbers);
        for warning in warnings {
            assignment.push_warning(warning);
        }
        Ok(assignment)
    }
}

/// Check the pin list against the declared count and return the pin numbers
/// in ascending order.
fn validate_pins(pins: &[Pin], pin_count: u32) -> Result<Vec<u32>, LayoutError> {
    if pin_count == 0 {
        return Err(LayoutError::InvalidPinCount);
    }
    if pins.len() != pin_count as usize {
        return Err(LayoutError::PinCountMismatch {
            expected: pin_count,
            actual: pins.len(),
        });
    }

    let mut seen = BTreeSet::new();
    for pin in pins {
        if pin.number == 0 {
            return Err(LayoutError::InvalidPinNumber(pin.number));
        }
        if !seen.insert(pin.number) {
            return Err(LayoutError::DuplicatePin(pin.number));
        }
    }

    Ok(seen.into_iter().collect())
}

/// Lay out pins by family rule. `numbers` must be sorted ascending and
/// unique; pins are placed by rank, so gaps in the numbering are tolerated.
pub fn layout_family(family: PackageFamily, numbers: &[u32]) -> LayoutAssignment {
    let mut assignment = LayoutAssignment::new(LayoutSource::Family(family));
    if family.is_dual() {
        place_dual(&mut assignment, numbers);
    } else {
        place_quad(&mut assignment, numbers);
    }
    assignment
}

/// Down the left side, then back up the right. The extra pin of an odd count
/// goes on the left; right position 0 is the highest pin.
fn place_dual(assignment: &mut LayoutAssignment, numbers: &[u32]) {
    let left_count = numbers.len().div_ceil(2);
    let (left, right) = numbers.split_at(left_count);

    for (position, pin) in left.iter().enumerate() {
        assignment.place(*pin, Side::Left, position);
    }
    for (position, pin) in right.iter().rev().enumerate() {
        assignment.place(*pin, Side::Right, position);
    }
}

/// Counter-clockwise from the top-left corner. Each side gets `N / 4` pins
/// and the remainder goes one each to the first sides in traversal order.
fn place_quad(assignment: &mut LayoutAssignment, numbers: &[u32]) {
    let base = numbers.len() / 4;
    let remainder = numbers.len() % 4;

    let mut remaining = numbers.iter();
    for (i, side) in Side::TRAVERSAL.iter().enumerate() {
        let count = base + usize::from(i < remainder);
        for (position, pin) in remaining.by_ref().take(count).enumerate() {
            assignment.place(*pin, *side, position);
        }
    }
}

fn apply_override(ov: &PinOverride, numbers: &[u32]) -> Result<LayoutAssignment, LayoutError> {
    let placed = ov.all_pins();

    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for pin in &placed {
        *counts.entry(*pin).or_default() += 1;
    }
    let expected: BTreeSet<u32> = numbers.iter().copied().collect();

    let missing: Vec<u32> = expected
        .iter()
        .filter(|n| !counts.contains_key(n))
        .copied()
        .collect();
    let duplicated: Vec<u32> = counts
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(pin, _)| *pin)
        .collect();
    let unexpected: Vec<u32> = counts
        .keys()
        .filter(|n| !expected.contains(n))
        .copied()
        .collect();

    if !missing.is_empty() || !duplicated.is_empty() || !unexpected.is_empty() {
        return Err(LayoutError::OverrideCoverage {
            key: ov.key.clone(),
            missing,
            duplicated,
            unexpected,
        });
    }

    let mut assignment = LayoutAssignment::new(LayoutSource::Override(ov.key.clone()));
    for side in Side::TRAVERSAL {
        for (position, pin) in ov.sides.pins(side).into_iter().enumerate() {
            assignment.place(pin, side, position);
        }
    }
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::overrides::{PinRange, SideRanges};

    fn pins(n: u32) -> Vec<Pin> {
        (1..=n).map(|i| Pin::new(i, format!("P{}", i))).collect()
    }

    #[test]
    fn test_dip8_convention() {
        let engine = PinLayoutEngine::new();
        let layout = engine
            .layout(&pins(8), &PackageSpec::new(PackageFamily::Dip, 8))
            .unwrap();

        assert_eq!(layout.pins_on(Side::Left), vec![1, 2, 3, 4]);
        assert_eq!(layout.pins_on(Side::Right), vec![8, 7, 6, 5]);
        assert_eq!(layout.get(8).unwrap().position_index, 0);
        assert_eq!(layout.source(), &LayoutSource::Family(PackageFamily::Dip));
    }

    #[test]
    fn test_odd_dual_count_favours_left() {
        let layout = layout_family(PackageFamily::Soic, &[1, 2, 3, 4, 5]);
        assert_eq!(layout.pins_on(Side::Left), vec![1, 2, 3]);
        assert_eq!(layout.pins_on(Side::Right), vec![5, 4]);
    }

    #[test]
    fn test_tqfp44_even_split() {
        let engine = PinLayoutEngine::new();
        let layout = engine
            .layout(&pins(44), &PackageSpec::new(PackageFamily::Tqfp, 44))
            .unwrap();
        for (_, count) in layout.side_counts() {
            assert_eq!(count, 11);
        }
        assert_eq!(layout.pins_on(Side::Bottom)[0], 12);
        assert_eq!(layout.pins_on(Side::Top), (34..=44).collect::<Vec<_>>());
    }

    #[test]
    fn test_remainder_order() {
        let layout = layout_family(PackageFamily::Qfn, &(1..=38).collect::<Vec<_>>());
        assert_eq!(
            layout.side_counts(),
            [(Side::Left, 10), (Side::Bottom, 10), (Side::Right, 9), (Side::Top, 9)]
        );

        let layout = layout_family(PackageFamily::Lqfp, &(1..=7).collect::<Vec<_>>());
        assert_eq!(
            layout.side_counts(),
            [(Side::Left, 2), (Side::Bottom, 2), (Side::Right, 2), (Side::Top, 1)]
        );
    }

    #[test]
    fn test_bga_and_unknown_fallbacks() {
        let numbers: Vec<u32> = (1..=12).collect();
        let bga = layout_family(PackageFamily::Bga, &numbers);
        let qfn = layout_family(PackageFamily::Qfn, &numbers);
        assert_eq!(bga.iter().collect::<Vec<_>>(), qfn.iter().collect::<Vec<_>>());

        let unknown = layout_family(PackageFamily::Unknown, &numbers);
        let dip = layout_family(PackageFamily::Dip, &numbers);
        assert_eq!(unknown.iter().collect::<Vec<_>>(), dip.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_validation_errors() {
        let engine = PinLayoutEngine::new();

        assert_eq!(
            engine.layout(&pins(7), &PackageSpec::new(PackageFamily::Dip, 8)),
            Err(LayoutError::PinCountMismatch {
                expected: 8,
                actual: 7
            })
        );
        assert_eq!(
            engine.layout(&[], &PackageSpec::new(PackageFamily::Dip, 0)),
            Err(LayoutError::InvalidPinCount)
        );

        let mut dup = pins(4);
        dup[3].number = 2;
        assert_eq!(
            engine.layout(&dup, &PackageSpec::new(PackageFamily::Dip, 4)),
            Err(LayoutError::DuplicatePin(2))
        );

        let mut zero = pins(4);
        zero[0].number = 0;
        assert_eq!(
            engine.layout(&zero, &PackageSpec::new(PackageFamily::Dip, 4)),
            Err(LayoutError::InvalidPinNumber(0))
        );
    }

    #[test]
    fn test_override_applied_verbatim() {
        let engine = PinLayoutEngine::new();
        let package = PackageSpec::new(PackageFamily::Qfn, 38).with_override("esp32-wroom-32");
        let layout = engine.layout(&pins(38), &package).unwrap();

        assert_eq!(layout.pins_on(Side::Left), (1..=14).collect::<Vec<_>>());
        assert_eq!(layout.pins_on(Side::Bottom), (15..=24).collect::<Vec<_>>());
        assert_eq!(layout.pins_on(Side::Right), (25..=38).collect::<Vec<_>>());
        assert!(layout.pins_on(Side::Top).is_empty());
        assert_eq!(layout.source(), &LayoutSource::Override("ESP32-WROOM-32".into()));
    }

    #[test]
    fn test_override_ignores_family() {
        let engine = PinLayoutEngine::new();
        let a = engine
            .layout(&pins(38), &PackageSpec::new(PackageFamily::Qfn, 38).with_override("ESP32-WROOM-32"))
            .unwrap();
        let b = engine
            .layout(&pins(38), &PackageSpec::new(PackageFamily::Dip, 38).with_override("ESP32-WROOM-32"))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_override_falls_back() {
        let engine = PinLayoutEngine::new();
        let package = PackageSpec::new(PackageFamily::Dip, 8).with_override("NOT-A-PART");
        let layout = engine.layout(&pins(8), &package).unwrap();

        assert_eq!(layout.source(), &LayoutSource::Family(PackageFamily::Dip));
        assert_eq!(
            layout.warnings(),
            &[LayoutWarning::UnknownOverride("NOT-A-PART".into())]
        );
        assert_eq!(layout.pins_on(Side::Right), vec![8, 7, 6, 5]);
    }

    #[test]
    fn test_override_coverage_error() {
        let mut table = OverrideTable::new();
        table
            .add(PinOverride {
                key: "GAPPY".into(),
                aliases: vec![],
                description: String::new(),
                sides: SideRanges {
                    left: vec![PinRange::new(1, 3)],
                    right: vec![PinRange::new(3, 5)],
                    ..SideRanges::default()
                },
            })
            .unwrap();
        let engine = PinLayoutEngine::with_overrides(table);

        let package = PackageSpec::new(PackageFamily::Dip, 6).with_override("GAPPY");
        match engine.layout(&pins(6), &package) {
            Err(LayoutError::OverrideCoverage {
                missing,
                duplicated,
                unexpected,
                ..
            }) => {
                assert_eq!(missing, vec![6]);
                assert_eq!(duplicated, vec![3]);
                assert!(unexpected.is_empty());
            }
            other => panic!("expected coverage error, got {:?}", other),
        }
    }
}
