//! Zoning label extraction from free text.
//!
//! The regulatory services disagree on which element carries the use-district
//! name, so labels are found by scanning text for Korean zoning suffixes
//! rather than by trusting a single tag.
//!
//! A fragment is a *mention* when it contains 지역, 지구 or 구역. A mention
//! is *preferred* when it names a residential tier (종 + 주거) or a
//! commercial district (상업 + 지역). The last preferred mention wins. Other
//! mentions are overlays (녹지, 지구단위계획구역 and the like) and never
//! become the label.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ratio::{RatioPair, ratio_for};

/// Rendered in place of a label when no zoning text was recognised.
pub const NO_INFORMATION: &str = "정보 없음";

const DISTRICT_SUFFIXES: &[&str] = &["지역", "지구", "구역"];

/// A land-use district name such as `제2종일반주거지역`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoningLabel(String);

impl ZoningLabel {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn ratios(&self) -> RatioPair {
        ratio_for(&self.0)
    }
}

impl fmt::Display for ZoningLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of scanning a response for a zoning label.
///
/// `NotRecognized` is not a failure: the upstream answered, but nothing in
/// the payload looked like a district name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum ZoningMatch {
    Recognized(ZoningLabel),
    NotRecognized,
}

impl ZoningMatch {
    pub fn label(&self) -> Option<&ZoningLabel> {
        match self {
            Self::Recognized(label) => Some(label),
            Self::NotRecognized => None,
        }
    }

    /// Label text, or [`NO_INFORMATION`].
    pub fn as_str(&self) -> &str {
        self.label().map_or(NO_INFORMATION, ZoningLabel::as_str)
    }

    /// Coverage and floor-area ratios; the default pair when not recognised.
    pub fn ratios(&self) -> RatioPair {
        ratio_for(self.as_str())
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, Self::Recognized(_))
    }
}

impl fmt::Display for ZoningMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`scan_zoning`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoningScan {
    /// Distinct district mentions, in first-seen order.
    pub mentions: Vec<String>,
    pub zoning: ZoningMatch,
}

/// True if `text` looks like a zoning district, zone or area name.
pub fn is_district_mention(text: &str) -> bool {
    DISTRICT_SUFFIXES.iter().any(|s| text.contains(s))
}

/// True if `text` names a residential tier or a commercial district.
pub fn is_preferred_mention(text: &str) -> bool {
    (text.contains('종') && text.contains("주거"))
        || (text.contains("상업") && text.contains("지역"))
}

/// Scan text fragments in document order and pick a zoning label.
///
/// Fragments are trimmed; anything shorter than two characters is ignored.
pub fn scan_zoning<'a, I>(texts: I) -> ZoningScan
where
    I: IntoIterator<Item = &'a str>,
{
    let mut mentions: Vec<String> = Vec::new();
    let mut preferred: Option<&str> = None;

    for text in texts {
        let text = text.trim();
        if text.chars().count() < 2 || !is_district_mention(text) {
            continue;
        }
        if !mentions.iter().any(|m| m == text) {
            mentions.push(text.to_string());
        }
        if is_preferred_mention(text) {
            preferred = Some(text);
        }
    }

    let zoning = match preferred {
        Some(label) => ZoningMatch::Recognized(ZoningLabel::new(label)),
        None => ZoningMatch::NotRecognized,
    };
    tracing::debug!(mentions = mentions.len(), zoning = %zoning, "zoning scan complete");

    ZoningScan { mentions, zoning }
}
