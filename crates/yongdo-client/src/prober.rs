//! Zoning probe: try each candidate service with each key form until one
//! answers `NORMAL SERVICE`, then read the zoning label out of the reply.
//!
//! Attempts run strictly in order and stop at the first success. Failed
//! attempts are kept so the caller can show the upstream's own words; the
//! portal's messages are the only way to tell a wrong key from a wrong
//! service from a key that is not provisioned yet.

use serde::Serialize;
use tracing::{info, warn};
use yongdo_core::{EndpointCandidate, ParcelId, ZoningMatch, ZoningScan, scan_zoning};

use crate::credential::{Credential, KeyVariant};
use crate::error::{ProbeError, TransportError};
use crate::query::{PreEncoded, QueryString};
use crate::response::{XmlDocument, parse_xml};
use crate::transport::{HttpResponse, Transport, snippet};

/// `resultMsg` value of a successful reply.
pub const SUCCESS_SENTINEL: &str = "NORMAL SERVICE";

const DIAGNOSTIC_BODY_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Success,
    /// The upstream answered and said no.
    Rejected,
    /// Non-200 status, or a body that is not the expected XML.
    Malformed,
    /// No reply at all: timeout or connection failure.
    Unreachable,
}

/// Outcome of one (endpoint, key form) attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoningQueryResult {
    pub endpoint: String,
    pub variant: KeyVariant,
    pub status: AttemptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoning: Option<ZoningMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

/// A successful probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoningAnswer {
    pub endpoint: String,
    pub variant: KeyVariant,
    pub zoning: ZoningMatch,
    /// Every district-like text in the reply.
    pub mentions: Vec<String>,
    /// All attempts made, ending with the successful one.
    pub attempts: Vec<ZoningQueryResult>,
}

pub struct ZoningProber<T> {
    transport: T,
}

impl<T: Transport> ZoningProber<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Probe `candidates` in order for the zoning of `pnu`.
    pub async fn probe(
        &self,
        pnu: &ParcelId,
        key: &Credential,
        candidates: &[EndpointCandidate],
    ) -> Result<ZoningAnswer, ProbeError> {
        if candidates.is_empty() {
            return Err(ProbeError::NoCandidates);
        }
        if key.is_empty() {
            return Err(ProbeError::EmptyCredential);
        }

        let variants = key.variants();
        let mut attempts = Vec::with_capacity(candidates.len() * variants.len());

        for candidate in candidates {
            for (variant, value) in &variants {
                info!(endpoint = %candidate.label, %variant, %pnu, "probing zoning service");
                let reply = self.fetch(candidate, value, pnu).await;
                let (result, scan) = classify(candidate, *variant, reply);

                if let Some(scan) = scan {
                    info!(
                        endpoint = %candidate.label,
                        %variant,
                        zoning = %scan.zoning,
                        mentions = scan.mentions.len(),
                        "zoning service answered"
                    );
                    attempts.push(result);
                    return Ok(ZoningAnswer {
                        endpoint: candidate.label.clone(),
                        variant: *variant,
                        zoning: scan.zoning,
                        mentions: scan.mentions,
                        attempts,
                    });
                }

                warn!(
                    endpoint = %candidate.label,
                    %variant,
                    status = ?result.status,
                    diagnostic = result.diagnostic.as_deref().unwrap_or(""),
                    "zoning attempt failed"
                );
                attempts.push(result);
            }
        }

        Err(exhausted(attempts))
    }

    async fn fetch(
        &self,
        candidate: &EndpointCandidate,
        key: &PreEncoded,
        pnu: &ParcelId,
    ) -> Result<HttpResponse, TransportError> {
        let url = QueryString::new()
            .pre_encoded("serviceKey", key)
            .param("pnu", pnu.as_str())
            .param("format", "xml")
            .to_url(&candidate.url)?;
        self.transport.get(&url).await
    }
}

/// Classify one reply. Returns the scan only on success.
fn classify(
    candidate: &EndpointCandidate,
    variant: KeyVariant,
    reply: Result<HttpResponse, TransportError>,
) -> (ZoningQueryResult, Option<ZoningScan>) {
    let failed = |status: AttemptStatus, diagnostic: String| {
        (
            ZoningQueryResult {
                endpoint: candidate.label.clone(),
                variant,
                status,
                zoning: None,
                diagnostic: Some(diagnostic),
            },
            None,
        )
    };

    let reply = match reply {
        Ok(reply) => reply,
        Err(TransportError::InvalidUrl(e)) => return failed(AttemptStatus::Malformed, e),
        Err(e) => return failed(AttemptStatus::Unreachable, e.to_string()),
    };
    if reply.status != 200 {
        return failed(
            AttemptStatus::Malformed,
            format!(
                "HTTP {}: {}",
                reply.status,
                snippet(&reply.body, DIAGNOSTIC_BODY_CHARS)
            ),
        );
    }
    let doc = match parse_xml(&reply.body) {
        Ok(doc) => doc,
        Err(e) => {
            return failed(
                AttemptStatus::Malformed,
                format!(
                    "unparseable response ({e}): {}",
                    snippet(&reply.body, DIAGNOSTIC_BODY_CHARS)
                ),
            );
        }
    };
    match doc.result_msg() {
        Some(msg) if is_success(msg) => {}
        Some(msg) => return failed(AttemptStatus::Rejected, msg.to_string()),
        None => {
            return match doc.gateway_error() {
                Some(msg) => failed(AttemptStatus::Rejected, msg),
                None => failed(
                    AttemptStatus::Malformed,
                    format!("<{}> reply carries no resultMsg", doc.root),
                ),
            };
        }
    }

    let scan = extract(&doc, candidate.label_tag.as_deref());
    let result = ZoningQueryResult {
        endpoint: candidate.label.clone(),
        variant,
        status: AttemptStatus::Success,
        zoning: Some(scan.zoning.clone()),
        diagnostic: None,
    };
    (result, Some(scan))
}

/// Accepts the sentinel with surrounding whitespace or a trailing period.
fn is_success(msg: &str) -> bool {
    let msg = msg.trim();
    msg.strip_suffix('.').unwrap_or(msg).trim_end() == SUCCESS_SENTINEL
}

/// Scan the hinted element first; fall back to the whole reply.
fn extract(doc: &XmlDocument, label_tag: Option<&str>) -> ZoningScan {
    let full = scan_zoning(doc.texts());
    if let Some(tag) = label_tag {
        let hinted = scan_zoning(doc.texts_in(tag));
        if hinted.zoning.is_recognized() {
            return ZoningScan {
                mentions: full.mentions,
                zoning: hinted.zoning,
            };
        }
    }
    full
}

/// Pick the most telling failure: the last rejection or malformed reply,
/// or the last unreachable attempt when nothing answered at all.
fn exhausted(attempts: Vec<ZoningQueryResult>) -> ProbeError {
    let diagnostic = attempts
        .iter()
        .rev()
        .find(|a| matches!(a.status, AttemptStatus::Rejected | AttemptStatus::Malformed))
        .or_else(|| attempts.last())
        .and_then(|a| a.diagnostic.clone())
        .unwrap_or_default();
    ProbeError::Exhausted {
        diagnostic,
        attempts,
    }
}
