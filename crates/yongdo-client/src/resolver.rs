//! Address to PNU resolution through the VWorld search API.

use serde::{Deserialize, Serialize};
use tracing::info;
use yongdo_core::{Address, ParcelId};

use crate::credential::Credential;
use crate::error::ResolveError;
use crate::query::QueryString;
use crate::transport::{Transport, snippet};

pub const GEOCODER_URL: &str = "https://api.vworld.kr/req/search";

const STATUS_OK: &str = "OK";
const STATUS_NOT_FOUND: &str = "NOT_FOUND";
const DIAGNOSTIC_BODY_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedParcel {
    pub pnu: ParcelId,
    pub address: Address,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    response: SearchResponse,
}

#[derive(Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    result: Option<SearchResult>,
    #[serde(default)]
    error: Option<SearchFault>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: String,
    title: String,
}

#[derive(Deserialize)]
struct SearchFault {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

pub struct AddressResolver<T> {
    transport: T,
    base_url: String,
}

impl<T: Transport> AddressResolver<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            base_url: GEOCODER_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Look up the parcel for a free-text address. The first hit wins.
    pub async fn resolve(
        &self,
        address: &str,
        key: &Credential,
    ) -> Result<ResolvedParcel, ResolveError> {
        let query = address.trim();
        if query.is_empty() {
            return Err(ResolveError::NoMatch {
                query: address.to_string(),
            });
        }

        let url = QueryString::new()
            .param("service", "search")
            .param("request", "search")
            .param("version", "2.0")
            .param("crs", "EPSG:4326")
            .param("size", "10")
            .param("page", "1")
            .param("query", query)
            .param("type", "address")
            .param("category", "parcel")
            .param("format", "json")
            .param("key", &key.decoded())
            .to_url(&self.base_url)
            .map_err(|e| ResolveError::Malformed {
                detail: e.to_string(),
                body: String::new(),
            })?;

        info!(query, "resolving address");
        let reply = self.transport.get(&url).await?;
        if !reply.is_success() {
            return Err(ResolveError::Http {
                status: reply.status,
                body: snippet(&reply.body, DIAGNOSTIC_BODY_CHARS),
            });
        }

        let envelope: SearchEnvelope =
            serde_json::from_str(&reply.body).map_err(|e| ResolveError::Malformed {
                detail: e.to_string(),
                body: snippet(&reply.body, DIAGNOSTIC_BODY_CHARS),
            })?;
        let response = envelope.response;

        match response.status.as_str() {
            STATUS_OK => {}
            STATUS_NOT_FOUND => {
                return Err(ResolveError::NoMatch {
                    query: query.to_string(),
                });
            }
            status => {
                let message = match response.error {
                    Some(SearchFault {
                        code: Some(code),
                        text: Some(text),
                    }) => format!("{code}: {text}"),
                    Some(SearchFault {
                        text: Some(text), ..
                    }) => text,
                    _ => snippet(&reply.body, DIAGNOSTIC_BODY_CHARS),
                };
                return Err(ResolveError::Rejected {
                    status: status.to_string(),
                    message,
                });
            }
        }

        let Some(first) = response.result.and_then(|r| r.items.into_iter().next()) else {
            return Err(ResolveError::NoMatch {
                query: query.to_string(),
            });
        };

        let pnu = ParcelId::parse(&first.id).map_err(|e| ResolveError::Malformed {
            detail: format!("result id {:?} is not a PNU: {e}", first.id),
            body: snippet(&reply.body, DIAGNOSTIC_BODY_CHARS),
        })?;
        info!(%pnu, title = %first.title, "address resolved");

        Ok(ResolvedParcel {
            pnu,
            address: Address::resolved(query, first.title),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::HttpResponse;
    use async_trait::async_trait;
    use reqwest::Url;
    use std::sync::Mutex;

    struct OneShot {
        reply: Result<HttpResponse, String>,
        seen: Mutex<Vec<Url>>,
    }

    impl OneShot {
        fn ok(status: u16, body: &str) -> Self {
            Self {
                reply: Ok(HttpResponse::new(status, body)),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn down() -> Self {
            Self {
                reply: Err("timed out".into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for OneShot {
        async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(url.clone());
            self.reply.clone().map_err(TransportError::Timeout)
        }
    }

    const FOUND: &str = r#"{"response":{"service":{"name":"search"},"status":"OK",
        "record":{"total":"1","current":"1"},
        "result":{"crs":"EPSG:4326","type":"address","items":[
            {"id":"1159010700100840008","title":"서울특별시 동작구 사당동 84-8",
             "point":{"x":"126.98","y":"37.48"}},
            {"id":"1159010700100840009","title":"서울특별시 동작구 사당동 84-9"}
        ]}}}"#;

    fn key() -> Credential {
        Credential::new("0A1B2C3D-TEST")
    }

    #[tokio::test]
    async fn resolves_first_item() {
        let upstream = OneShot::ok(200, FOUND);
        let resolver = AddressResolver::new(&upstream);

        let parcel = resolver.resolve(" 사당동 84-8 ", &key()).await.unwrap();
        assert_eq!(parcel.pnu.as_str(), "1159010700100840008");
        assert_eq!(parcel.address.raw, "사당동 84-8");
        assert_eq!(parcel.address.display(), "서울특별시 동작구 사당동 84-8");

        let seen = upstream.seen.lock().unwrap();
        let url = &seen[0];
        assert_eq!(url.host_str(), Some("api.vworld.kr"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("category".into(), "parcel".into())));
        assert!(pairs.contains(&("query".into(), "사당동 84-8".into())));
        assert!(pairs.contains(&("key".into(), "0A1B2C3D-TEST".into())));
        assert!(pairs.contains(&("format".into(), "json".into())));
    }

    #[tokio::test]
    async fn empty_result_is_no_match() {
        let body = r#"{"response":{"status":"OK","result":{"items":[]}}}"#;
        let resolver = AddressResolver::new(OneShot::ok(200, body));
        let err = resolver.resolve("없는 주소", &key()).await.unwrap_err();
        assert!(matches!(err, ResolveError::NoMatch { .. }));
        assert!(err.is_user_correctable());
    }

    #[tokio::test]
    async fn not_found_status_is_no_match() {
        let body = r#"{"response":{"status":"NOT_FOUND","record":{"total":"0"}}}"#;
        let resolver = AddressResolver::new(OneShot::ok(200, body));
        assert!(matches!(
            resolver.resolve("없는 주소", &key()).await,
            Err(ResolveError::NoMatch { .. })
        ));
    }

    #[tokio::test]
    async fn blank_address_issues_no_request() {
        let upstream = OneShot::ok(200, FOUND);
        let resolver = AddressResolver::new(&upstream);
        assert!(matches!(
            resolver.resolve("   ", &key()).await,
            Err(ResolveError::NoMatch { .. })
        ));
        assert!(upstream.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_status_keeps_upstream_text() {
        let body = r#"{"response":{"status":"ERROR","error":{"level":"1","code":"INCORRECT_KEY","text":"인증키 정보가 올바르지 않습니다."}}}"#;
        let resolver = AddressResolver::new(OneShot::ok(200, body));
        match resolver.resolve("사당동", &key()).await.unwrap_err() {
            ResolveError::Rejected { status, message } => {
                assert_eq!(status, "ERROR");
                assert_eq!(message, "INCORRECT_KEY: 인증키 정보가 올바르지 않습니다.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_failure_carries_body() {
        let resolver = AddressResolver::new(OneShot::ok(502, "Bad Gateway"));
        match resolver.resolve("사당동", &key()).await.unwrap_err() {
            ResolveError::Http { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "Bad Gateway");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_is_malformed() {
        let resolver = AddressResolver::new(OneShot::ok(200, "<html>blocked</html>"));
        let err = resolver.resolve("사당동", &key()).await.unwrap_err();
        assert!(matches!(err, ResolveError::Malformed { ref body, .. } if body.contains("blocked")));
        assert!(!err.is_user_correctable());
    }

    #[tokio::test]
    async fn non_pnu_id_is_malformed() {
        let body = r#"{"response":{"status":"OK","result":{"items":[{"id":"ABC","title":"x"}]}}}"#;
        let resolver = AddressResolver::new(OneShot::ok(200, body));
        assert!(matches!(
            resolver.resolve("사당동", &key()).await,
            Err(ResolveError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_unreachable() {
        let resolver = AddressResolver::new(OneShot::down());
        assert!(matches!(
            resolver.resolve("사당동", &key()).await,
            Err(ResolveError::Unreachable(TransportError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn bad_base_url_is_a_setup_error() {
        let upstream = OneShot::ok(200, FOUND);
        let resolver = AddressResolver::new(&upstream).with_base_url("not a url");
        let err = resolver.resolve("사당동", &key()).await.unwrap_err();
        assert!(matches!(err, ResolveError::Malformed { ref detail, .. } if detail.contains("invalid request URL")));
        assert!(!err.to_string().contains("unreachable"));
        assert!(upstream.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn custom_base_url() {
        let upstream = OneShot::ok(200, FOUND);
        let resolver = AddressResolver::new(&upstream).with_base_url("http://localhost:9000/search");
        resolver.resolve("사당동", &key()).await.unwrap();
        assert_eq!(upstream.seen.lock().unwrap()[0].port(), Some(9000));
    }
}
