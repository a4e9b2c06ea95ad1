//! Query-string assembly with an explicit "already encoded" marker.
//!
//! Public-data service keys are issued in two textual forms, and the
//! encoded form must reach the server byte-for-byte. [`PreEncoded`] values
//! are appended verbatim; everything else goes through percent-encoding.

use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Url;

use crate::error::TransportError;

/// Characters left as-is: the RFC 3986 unreserved set.
pub(crate) const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A query value in its final on-the-wire form.
#[derive(Clone, PartialEq, Eq)]
pub struct PreEncoded(String);

impl PreEncoded {
    /// Wrap a value the caller guarantees is already in wire form.
    pub fn assume(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Percent-encode `raw` into wire form.
    pub fn encode(raw: &str) -> Self {
        Self(utf8_percent_encode(raw, QUERY_VALUE).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Pre-encoded values are usually service keys.
impl fmt::Debug for PreEncoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PreEncoded(<{} bytes>)", self.0.len())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryString {
    buf: String,
}

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name=value`, percent-encoding the value.
    pub fn param(self, name: &str, value: &str) -> Self {
        self.pre_encoded(name, &PreEncoded::encode(value))
    }

    /// Append `name=value` without touching the value.
    pub fn pre_encoded(mut self, name: &str, value: &PreEncoded) -> Self {
        if !self.buf.is_empty() {
            self.buf.push('&');
        }
        self.buf.push_str(name);
        self.buf.push('=');
        self.buf.push_str(value.as_str());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Attach the query to `base`.
    pub fn to_url(&self, base: &str) -> Result<Url, TransportError> {
        let sep = if base.contains('?') { '&' } else { '?' };
        let raw = format!("{base}{sep}{}", self.buf);
        Url::parse(&raw).map_err(|e| TransportError::InvalidUrl(format!("{base}: {e}")))
    }
}
