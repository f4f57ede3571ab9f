//! Package Family Detection
//!
//! Normalises the free-form package names found in datasheets ("PDIP-8",
//! "48-pin LQFP", "VQFN (RGE)") to the families the layout engine knows.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageFamily {
    #[serde(rename = "DIP", alias = "dip")]
    Dip,
    #[serde(rename = "SOIC", alias = "soic")]
    Soic,
    #[serde(rename = "TQFP", alias = "tqfp")]
    Tqfp,
    #[serde(rename = "LQFP", alias = "lqfp")]
    Lqfp,
    #[serde(rename = "QFN", alias = "qfn")]
    Qfn,
    #[serde(rename = "BGA", alias = "bga")]
    Bga,
    #[serde(rename = "unknown", alias = "UNKNOWN", alias = "Unknown")]
    Unknown,
}

/// Checked in order; the first family whose pattern matches wins.
const FAMILY_PATTERNS: &[(PackageFamily, &str)] = &[
    (PackageFamily::Bga, r"bga|ball\s*grid\s*array"),
    (PackageFamily::Lqfp, r"lqfp|low[-\s]*profile\s*quad\s*flat"),
    (PackageFamily::Tqfp, r"tqfp|thin\s*quad\s*flat\s*pack|\bqfp\b|pqfp"),
    (PackageFamily::Qfn, r"qfn|quad\s*flat\s*no[-\s]?lead|dfn|\bmlf\b"),
    (PackageFamily::Soic, r"soic|small\s*outline|t?ssop|msop|\bsop\b|\bso-?\d+\b"),
    (PackageFamily::Dip, r"dip|dual\s*in[-\s]*line"),
];

fn family_regexes() -> &'static [(PackageFamily, Regex)] {
    static FAMILIES: OnceLock<Vec<(PackageFamily, Regex)>> = OnceLock::new();
    FAMILIES.get_or_init(|| {
        FAMILY_PATTERNS
            .iter()
            .filter_map(|(family, pattern)| {
                Regex::new(&format!("(?i){}", pattern))
                    .ok()
                    .map(|re| (*family, re))
            })
            .collect()
    })
}

impl PackageFamily {
    pub const ALL: [PackageFamily; 7] = [
        PackageFamily::Dip,
        PackageFamily::Soic,
        PackageFamily::Tqfp,
        PackageFamily::Lqfp,
        PackageFamily::Qfn,
        PackageFamily::Bga,
        PackageFamily::Unknown,
    ];

    /// Detect a family from free text, falling back to `Unknown`.
    pub fn detect(text: &str) -> Self {
        family_regexes()
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(family, _)| *family)
            .unwrap_or(PackageFamily::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageFamily::Dip => "DIP",
            PackageFamily::Soic => "SOIC",
            PackageFamily::Tqfp => "TQFP",
            PackageFamily::Lqfp => "LQFP",
            PackageFamily::Qfn => "QFN",
            PackageFamily::Bga => "BGA",
            PackageFamily::Unknown => "unknown",
        }
    }

    /// Families laid out on two opposite sides.
    pub fn is_dual(&self) -> bool {
        matches!(
            self,
            PackageFamily::Dip | PackageFamily::Soic | PackageFamily::Unknown
        )
    }
}

impl std::fmt::Display for PackageFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PackageFamily {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::detect(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_common_names() {
        let cases = [
            ("PDIP-8", PackageFamily::Dip),
            ("8-Lead Plastic Dual In-Line", PackageFamily::Dip),
            ("SOIC-14", PackageFamily::Soic),
            ("TSSOP-20", PackageFamily::Soic),
            ("MSOP", PackageFamily::Soic),
            ("44-pin TQFP", PackageFamily::Tqfp),
            ("LQFP48", PackageFamily::Lqfp),
            ("VQFN-32", PackageFamily::Qfn),
            ("28 MLF", PackageFamily::Qfn),
            ("DFN-8", PackageFamily::Qfn),
            ("LFBGA-100", PackageFamily::Bga),
            ("Ball Grid Array", PackageFamily::Bga),
            ("module", PackageFamily::Unknown),
            ("", PackageFamily::Unknown),
        ];
        for (text, expected) in cases {
            assert_eq!(PackageFamily::detect(text), expected, "{}", text);
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PackageFamily::Tqfp).unwrap();
        assert_eq!(json, "\"TQFP\"");
        let parsed: PackageFamily = serde_json::from_str("\"qfn\"").unwrap();
        assert_eq!(parsed, PackageFamily::Qfn);
        let parsed: PackageFamily = serde_json::from_str("\"unknown\"").unwrap();
        assert_eq!(parsed, PackageFamily::Unknown);
    }

    #[test]
    fn test_dual_families() {
        assert!(PackageFamily::Dip.is_dual());
        assert!(PackageFamily::Unknown.is_dual());
        assert!(!PackageFamily::Bga.is_dual());
    }
}
