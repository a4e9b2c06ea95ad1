//! Parcel Number Unit (PNU) identifiers and addresses.
//!
//! A PNU is the 19-digit cadastral key used by every Korean land registry
//! service:
//!
//! - digits 1-10: legal-dong code (시도 2 + 시군구 3 + 읍면동 3 + 리 2)
//! - digit 11: land type (`1` ordinary land, `2` mountain land 산)
//! - digits 12-15: main lot number (본번)
//! - digits 16-19: sub lot number (부번)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Required PNU length in digits.
pub const PNU_LEN: usize = 19;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParcelIdError {
    #[error("PNU must be exactly {PNU_LEN} digits, got {0}")]
    WrongLength(usize),
    #[error("PNU contains a non-digit character: {0:?}")]
    NonDigit(char),
}

/// A validated 19-digit parcel identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParcelId(String);

impl ParcelId {
    /// Validate and wrap a PNU. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Result<Self, ParcelIdError> {
        let s = s.trim();
        if let Some(c) = s.chars().find(|c| !c.is_ascii_digit()) {
            return Err(ParcelIdError::NonDigit(c));
        }
        if s.len() != PNU_LEN {
            return Err(ParcelIdError::WrongLength(s.len()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 10-digit legal-dong (법정동) code.
    pub fn legal_dong_code(&self) -> &str {
        &self.0[..10]
    }

    /// True when the land-type digit marks mountain land (산).
    pub fn is_mountain(&self) -> bool {
        &self.0[10..11] == "2"
    }

    pub fn main_lot(&self) -> u32 {
        self.0[11..15].parse().unwrap_or(0)
    }

    pub fn sub_lot(&self) -> u32 {
        self.0[15..19].parse().unwrap_or(0)
    }

    /// Lot number as written on an address: `84-8`, `84`, `산 12-3`.
    pub fn lot_display(&self) -> String {
        let prefix = if self.is_mountain() { "산 " } else { "" };
        match self.sub_lot() {
            0 => format!("{prefix}{}", self.main_lot()),
            sub => format!("{prefix}{}-{sub}", self.main_lot()),
        }
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ParcelId {
    type Err = ParcelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ParcelId {
    type Error = ParcelIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ParcelId> for String {
    fn from(id: ParcelId) -> Self {
        id.0
    }
}

/// A street or lot address, as typed and (once resolved) as canonicalised
/// by the geocoding service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub raw: String,
    pub canonical: Option<String>,
}

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            canonical: None,
        }
    }

    pub fn resolved(raw: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            canonical: Some(canonical.into()),
        }
    }

    /// Canonical text when known, otherwise what the user typed.
    pub fn display(&self) -> &str {
        self.canonical.as_deref().unwrap_or(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_nineteen_digits() {
        let id = ParcelId::parse("1159010700100840008").unwrap();
        assert_eq!(id.as_str(), "1159010700100840008");
    }

    #[test]
    fn trims_whitespace() {
        let id = ParcelId::parse("  1159010700100840008\n").unwrap();
        assert_eq!(id.to_string(), "1159010700100840008");
    }

    #[test]
    fn rejects_short_and_long() {
        assert_eq!(
            ParcelId::parse("115901070010084000"),
            Err(ParcelIdError::WrongLength(18))
        );
        assert_eq!(
            ParcelId::parse("11590107001008400080"),
            Err(ParcelIdError::WrongLength(20))
        );
        assert_eq!(ParcelId::parse(""), Err(ParcelIdError::WrongLength(0)));
    }

    #[test]
    fn rejects_non_digits() {
        assert_eq!(
            ParcelId::parse("115901070010084000A"),
            Err(ParcelIdError::NonDigit('A'))
        );
        assert_eq!(
            ParcelId::parse("1159010700-10084000"),
            Err(ParcelIdError::NonDigit('-'))
        );
    }

    #[test]
    fn full_width_digits_are_not_digits() {
        assert!(matches!(
            ParcelId::parse("１１５９０１０７００１００８４０００８"),
            Err(ParcelIdError::NonDigit('１'))
        ));
    }

    #[test]
    fn components() {
        let id = ParcelId::parse("1159010700100840008").unwrap();
        assert_eq!(id.legal_dong_code(), "1159010700");
        assert!(!id.is_mountain());
        assert_eq!(id.main_lot(), 84);
        assert_eq!(id.sub_lot(), 8);
        assert_eq!(id.lot_display(), "84-8");
    }

    #[test]
    fn mountain_lot_without_sub_number() {
        let id = ParcelId::parse("4113510900200120000").unwrap();
        assert!(id.is_mountain());
        assert_eq!(id.lot_display(), "산 12");
    }

    #[test]
    fn serde_validates() {
        let id: ParcelId = serde_json::from_str("\"1159010700100840008\"").unwrap();
        assert_eq!(id.main_lot(), 84);
        assert!(serde_json::from_str::<ParcelId>("\"123\"").is_err());
    }

    #[test]
    fn address_prefers_canonical() {
        assert_eq!(Address::new("동작구 사당동 84-8").display(), "동작구 사당동 84-8");
        let resolved = Address::resolved("사당동 84-8", "서울특별시 동작구 사당동 84-8");
        assert_eq!(resolved.display(), "서울특별시 동작구 사당동 84-8");
    }
}
