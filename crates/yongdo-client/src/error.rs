use thiserror::Error;

use crate::prober::ZoningQueryResult;

/// Failure below the HTTP status line: the request never produced a response.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
    #[error("invalid transport configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // The URL carries the service key; never let it into a message.
        let err = err.without_url();
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("geocoder unreachable: {0}")]
    Unreachable(#[from] TransportError),
    #[error("geocoder returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed geocoder response ({detail}): {body}")]
    Malformed { detail: String, body: String },
    #[error("geocoder rejected the request ({status}): {message}")]
    Rejected { status: String, message: String },
    #[error("no parcel matches {query:?}")]
    NoMatch { query: String },
}

impl ResolveError {
    /// True for problems the user fixes by changing the address, not the setup.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::NoMatch { .. })
    }
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("no endpoint candidates configured")]
    NoCandidates,
    #[error("service key is empty")]
    EmptyCredential,
    #[error("all {} zoning attempts failed; last upstream message: {diagnostic}", .attempts.len())]
    Exhausted {
        /// Upstream text from the most informative failed attempt.
        diagnostic: String,
        attempts: Vec<ZoningQueryResult>,
    },
}
