//! HTTP transport for the two upstream services.
//!
//! The upstream quirks (relaxed certificate checks for the zoning portal,
//! browser headers for the geocoder) live in the per-service constructors
//! here and nowhere else. Callers talk to the [`Transport`] trait so tests
//! can substitute scripted upstreams.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA, REFERER, USER_AGENT};
use tracing::{debug, warn};

use crate::error::TransportError;

pub const MIN_TIMEOUT_SECS: u64 = 5;
pub const MAX_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Status line and body of an upstream reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET for `url` exactly as given.
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        (**self).get(url).await
    }
}

/// Retry on 5xx only, doubling the delay after each attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << retry.min(16))
    }
}

/// Settings shared by both service profiles.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    /// Origin registered with the geocoder for the operator's key.
    pub referer: String,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            referer: "http://localhost".to_string(),
            user_agent: BROWSER_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl TransportConfig {
    /// Set the per-request timeout, clamped to 5–15 seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS));
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }
}

/// Plain reqwest-backed transport. Wrap in [`Retry`] for the 5xx policy.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client for the public-data zoning services.
    ///
    /// Certificate validation is off: the portal presents chains that
    /// rustls rejects. Use this client for nothing else.
    pub fn zoning(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| TransportError::Config(format!("zoning client: {e}")))?;
        Ok(Self { client })
    }

    /// Client for the geocoder, which only answers callers presenting a
    /// browser user agent and a registered referer.
    pub fn geocoder(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("User-Agent", &config.user_agent)?);
        headers.insert(REFERER, header_value("Referer", &config.referer)?);
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::Config(format!("geocoder client: {e}")))?;
        Ok(Self { client })
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(value)
        .map_err(|e| TransportError::Config(format!("invalid {name} header: {e}")))
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        debug!(host = url.host_str().unwrap_or(""), status, bytes = body.len(), "upstream reply");
        Ok(HttpResponse { status, body })
    }
}

/// Decorator applying a [`RetryPolicy`] to another transport.
///
/// Only 5xx replies are retried. Transport errors return at once. When
/// retries run out the last 5xx reply is handed back for the caller to
/// classify.
#[derive(Debug, Clone)]
pub struct Retry<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> Retry<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for Retry<T> {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let mut retry = 0;
        loop {
            let resp = self.inner.get(url).await?;
            if !(500..600).contains(&resp.status) || retry >= self.policy.max_retries {
                return Ok(resp);
            }
            let delay = self.policy.delay_for(retry);
            warn!(
                host = url.host_str().unwrap_or(""),
                status = resp.status,
                retry = retry + 1,
                delay_ms = delay.as_millis() as u64,
                "upstream server error, retrying"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}

/// Zoning-service transport with the configured retry policy.
pub fn zoning_transport(config: &TransportConfig) -> Result<Retry<ReqwestTransport>, TransportError> {
    Ok(Retry::new(ReqwestTransport::zoning(config)?, config.retry))
}

/// Geocoder transport with the configured retry policy.
pub fn geocoder_transport(
    config: &TransportConfig,
) -> Result<Retry<ReqwestTransport>, TransportError> {
    Ok(Retry::new(ReqwestTransport::geocoder(config)?, config.retry))
}

/// First `max` characters of `body`, for diagnostics.
pub(crate) fn snippet(body: &str, max: usize) -> String {
    let body = body.trim();
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<Vec<Result<HttpResponse, TransportError>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(mut replies: Vec<Result<HttpResponse, TransportError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn get(&self, _url: &Url) -> Result<HttpResponse, TransportError> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(HttpResponse::new(500, "exhausted")))
        }
    }

    fn url() -> Url {
        Url::parse("http://localhost/op").unwrap()
    }

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn retries_server_errors_until_cap() {
        let scripted = Scripted::new(vec![]);
        let retry = Retry::new(&scripted, fast(2));
        let resp = retry.get(&url()).await.unwrap();
        assert_eq!(resp.status, 500);
        assert_eq!(scripted.calls(), 3);
    }

    #[tokio::test]
    async fn stops_on_first_non_server_error() {
        let scripted = Scripted::new(vec![
            Ok(HttpResponse::new(503, "busy")),
            Ok(HttpResponse::new(200, "<ok/>")),
        ]);
        let retry = Retry::new(&scripted, fast(5));
        let resp = retry.get(&url()).await.unwrap();
        assert_eq!(resp, HttpResponse::new(200, "<ok/>"));
        assert_eq!(scripted.calls(), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let scripted = Scripted::new(vec![Ok(HttpResponse::new(401, "denied"))]);
        let retry = Retry::new(&scripted, fast(3));
        assert_eq!(retry.get(&url()).await.unwrap().status, 401);
        assert_eq!(scripted.calls(), 1);
    }

    #[tokio::test]
    async fn transport_errors_are_not_retried() {
        let scripted = Scripted::new(vec![Err(TransportError::Timeout("slow".into()))]);
        let retry = Retry::new(&scripted, fast(3));
        assert!(matches!(
            retry.get(&url()).await,
            Err(TransportError::Timeout(_))
        ));
        assert_eq!(scripted.calls(), 1);
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(RetryPolicy::none().delay_for(3), Duration::ZERO);
    }

    #[test]
    fn timeout_is_clamped() {
        assert_eq!(
            TransportConfig::default().with_timeout_secs(1).timeout,
            Duration::from_secs(5)
        );
        assert_eq!(
            TransportConfig::default().with_timeout_secs(60).timeout,
            Duration::from_secs(15)
        );
        assert_eq!(
            TransportConfig::default().with_timeout_secs(8).timeout,
            Duration::from_secs(8)
        );
    }

    #[test]
    fn service_profiles_build() {
        let config = TransportConfig::default();
        assert!(zoning_transport(&config).is_ok());
        assert!(geocoder_transport(&config).is_ok());
    }

    /// Accept one connection on a local port, answer `200 ok`, and hand
    /// back the request head with header names lowercased.
    async fn capture_request_head() -> (Url, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
                .await
                .unwrap();
            String::from_utf8_lossy(&head)
                .lines()
                .map(|line| match line.split_once(':') {
                    Some((name, value)) => format!("{}:{}", name.to_ascii_lowercase(), value),
                    None => line.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n")
        });
        let url = Url::parse(&format!("http://{addr}/req/search?query=x")).unwrap();
        (url, handle)
    }

    #[tokio::test]
    async fn geocoder_sends_browser_headers() {
        let (url, head) = capture_request_head().await;
        let config = TransportConfig::default().with_referer("https://yongdo.example");
        let reply = ReqwestTransport::geocoder(&config)
            .unwrap()
            .get(&url)
            .await
            .unwrap();
        assert_eq!(reply, HttpResponse::new(200, "ok"));

        let head = head.await.unwrap();
        assert!(head.contains("user-agent: Mozilla/5.0"), "{head}");
        assert!(head.contains("referer: https://yongdo.example"), "{head}");
        assert!(head.contains("cache-control: no-cache"), "{head}");
        assert!(head.contains("pragma: no-cache"), "{head}");
    }

    #[tokio::test]
    async fn zoning_client_sends_no_geocoder_headers() {
        let (url, head) = capture_request_head().await;
        let config = TransportConfig::default().with_referer("https://yongdo.example");
        let reply = ReqwestTransport::zoning(&config)
            .unwrap()
            .get(&url)
            .await
            .unwrap();
        assert_eq!(reply.status, 200);

        let head = head.await.unwrap();
        assert!(!head.contains("user-agent:"), "{head}");
        assert!(!head.contains("referer:"), "{head}");
        assert!(!head.contains("cache-control:"), "{head}");
        assert!(!head.contains("pragma:"), "{head}");
    }

    #[test]
    fn bad_referer_is_a_config_error() {
        let config = TransportConfig::default().with_referer("http://bad\nheader");
        assert!(matches!(
            ReqwestTransport::geocoder(&config),
            Err(TransportError::Config(_))
        ));
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        assert_eq!(snippet("  짧은 응답 ", 10), "짧은 응답");
        assert_eq!(snippet("가나다라마", 3), "가나다...");
    }
}
