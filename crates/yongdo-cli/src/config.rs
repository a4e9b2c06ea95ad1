//! Runtime configuration assembled from flags and environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Args;
use yongdo_client::{Credential, TransportConfig};
use yongdo_core::{EndpointCandidate, default_candidates};

#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// data.go.kr service key, in either its Decoding or Encoding form.
    #[arg(long, env = "YONGDO_SERVICE_KEY", hide_env_values = true, global = true)]
    pub service_key: Option<String>,

    /// VWorld API key used for address lookups.
    #[arg(long, env = "YONGDO_GEOCODER_KEY", hide_env_values = true, global = true)]
    pub geocoder_key: Option<String>,

    /// Referer registered with the VWorld key.
    #[arg(long, env = "YONGDO_REFERER", default_value = "http://localhost", global = true)]
    pub referer: String,

    /// Per-request timeout in seconds (clamped to 5-15).
    #[arg(long, default_value_t = yongdo_client::transport::DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout_secs: u64,

    /// JSON file with the ordered list of zoning services to try.
    #[arg(long, env = "YONGDO_CANDIDATES", global = true)]
    pub candidates: Option<PathBuf>,
}

impl ServiceArgs {
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::default()
            .with_timeout_secs(self.timeout_secs)
            .with_referer(self.referer.clone())
    }

    pub fn service_key(&self) -> anyhow::Result<Credential> {
        required_key(self.service_key.as_deref(), "--service-key", "YONGDO_SERVICE_KEY")
    }

    pub fn geocoder_key(&self) -> anyhow::Result<Credential> {
        required_key(self.geocoder_key.as_deref(), "--geocoder-key", "YONGDO_GEOCODER_KEY")
    }

    pub fn candidates(&self) -> anyhow::Result<Vec<EndpointCandidate>> {
        match &self.candidates {
            Some(path) => load_candidates(path),
            None => Ok(default_candidates()),
        }
    }
}

fn required_key(value: Option<&str>, flag: &str, env: &str) -> anyhow::Result<Credential> {
    let key = Credential::new(value.unwrap_or_default());
    if key.is_empty() {
        bail!("missing API key: pass {flag} or set {env}");
    }
    Ok(key)
}

/// Read an ordered candidate list from a JSON array.
pub fn load_candidates(path: &Path) -> anyhow::Result<Vec<EndpointCandidate>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading candidate list {}", path.display()))?;
    let candidates: Vec<EndpointCandidate> = serde_json::from_str(&text)
        .with_context(|| format!("parsing candidate list {}", path.display()))?;
    if candidates.is_empty() {
        bail!("candidate list {} is empty", path.display());
    }
    Ok(candidates)
}
