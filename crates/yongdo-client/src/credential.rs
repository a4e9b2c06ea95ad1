//! Service keys and their two textual forms.
//!
//! data.go.kr hands out every key twice, as a "Decoding" and an "Encoding"
//! string, and services differ in which one they accept. Whatever the
//! operator pastes, both forms are derived from the decoded value so the
//! set of variants is the same either way.

use std::fmt;

use percent_encoding::percent_decode_str;
use serde::Serialize;

use crate::query::PreEncoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyVariant {
    Decoded,
    Encoded,
}

impl fmt::Display for KeyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Decoded => "decoded",
            Self::Encoded => "encoded",
        })
    }
}

/// An API key. Never printed, logged or persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Percent-decoded form. Invalid escapes are kept literally.
    pub fn decoded(&self) -> String {
        percent_decode_str(&self.0).decode_utf8_lossy().into_owned()
    }

    /// Percent-encoded form of [`Credential::decoded`].
    pub fn encoded(&self) -> String {
        PreEncoded::encode(&self.decoded()).as_str().to_string()
    }

    /// The forms to try, decoded first. Identical forms collapse to one.
    pub fn variants(&self) -> Vec<(KeyVariant, PreEncoded)> {
        let decoded = self.decoded();
        let encoded = PreEncoded::encode(&decoded);
        if encoded.as_str() == decoded {
            vec![(KeyVariant::Decoded, encoded)]
        } else {
            vec![
                (KeyVariant::Decoded, PreEncoded::assume(decoded)),
                (KeyVariant::Encoded, encoded),
            ]
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
