//! Candidate regulatory-data services for the zoning probe.
//!
//! Which service answers depends on what the operator's key was provisioned
//! for, so the list is ordered most-likely-first and can be replaced from a
//! JSON file.

use serde::{Deserialize, Serialize};

/// One zoning-data service variant to try.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCandidate {
    /// Human-readable name shown in diagnostics.
    pub label: String,
    /// Operation URL without a query string.
    pub url: String,
    /// Element expected to carry the district name, if the schema is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_tag: Option<String>,
}

impl EndpointCandidate {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            label_tag: None,
        }
    }

    pub fn with_label_tag(mut self, tag: impl Into<String>) -> Self {
        self.label_tag = Some(tag.into());
        self
    }
}

/// The known services, in priority order.
pub fn default_candidates() -> Vec<EndpointCandidate> {
    vec![
        EndpointCandidate::new(
            "토지이용규제 (LandUseRegulationInfo)",
            "http://apis.data.go.kr/1613000/LandUseRegulationInfoService/getLandUseRegulationInfo",
        )
        .with_label_tag("prposAreaDstrcCodeNm"),
        EndpointCandidate::new(
            "토지이용계획 (NSLandUseInfo)",
            "http://apis.data.go.kr/1613000/NSLandUseInfoService/getLandUsePlanInfo",
        )
        .with_label_tag("prposAreaDstrcCodeNm"),
        EndpointCandidate::new(
            "도시계획 (UrbanPlanningStatistics)",
            "http://apis.data.go.kr/1613000/UrbanPlanningStatisticsService/getUrbanPlanningStatistics",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_ordered_regulation_first() {
        let candidates = default_candidates();
        assert_eq!(candidates.len(), 3);
        assert!(candidates[0].url.contains("LandUseRegulationInfoService"));
        assert!(candidates[2].label_tag.is_none());
        assert!(candidates.iter().all(|c| !c.url.contains('?')));
    }

    #[test]
    fn json_without_tag() {
        let json = r#"[{"label": "custom", "url": "http://localhost/zoning"}]"#;
        let parsed: Vec<EndpointCandidate> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, vec![EndpointCandidate::new("custom", "http://localhost/zoning")]);
    }

    #[test]
    fn tag_omitted_when_absent() {
        let json = serde_json::to_string(&EndpointCandidate::new("a", "http://b")).unwrap();
        assert_eq!(json, r#"{"label":"a","url":"http://b"}"#);
    }
}
