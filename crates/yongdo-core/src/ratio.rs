//! Statutory ceiling lookup: coverage ratio (건폐율) and floor-area ratio
//! (용적률) by use district.
//!
//! Rules are checked in order against the label and the first containing
//! match wins, so a label carrying several markers resolves to the earliest.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coverage ratio and floor-area ratio, both in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioPair {
    pub coverage_pct: u32,
    pub floor_area_pct: u32,
}

impl RatioPair {
    pub const fn new(coverage_pct: u32, floor_area_pct: u32) -> Self {
        Self {
            coverage_pct,
            floor_area_pct,
        }
    }
}

impl Default for RatioPair {
    fn default() -> Self {
        DEFAULT_RATIOS
    }
}

impl fmt::Display for RatioPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "건폐율 {}% / 용적률 {}%",
            self.coverage_pct, self.floor_area_pct
        )
    }
}

/// Used when no rule matches, including for the "no information" sentinel.
pub const DEFAULT_RATIOS: RatioPair = RatioPair::new(60, 200);

const RULES: &[(&str, RatioPair)] = &[
    ("1종", RatioPair::new(60, 150)),
    ("2종", RatioPair::new(60, 200)),
    ("3종", RatioPair::new(50, 250)),
    ("준주거", RatioPair::new(60, 400)),
    ("상업", RatioPair::new(60, 800)),
];

/// Map a zoning label to its ratio pair.
pub fn ratio_for(label: &str) -> RatioPair {
    RULES
        .iter()
        .find(|(marker, _)| label.contains(marker))
        .map_or(DEFAULT_RATIOS, |&(_, pair)| pair)
}
