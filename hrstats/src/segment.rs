//! Host platform segment expressions.
//!
//! Tracked page views carry custom variables identifying the entity they belong to. Slot 1 tags
//! operations and spaces, slot 2 tags bundles and clusters, slot 3 tags the download type.
//! A segment restricts a host query to page views matching all of its `;`-joined clauses.
//!
//! Nothing here escapes its input: an id containing `;`, `==` or `=@` produces a segment the host
//! will happily evaluate to an empty result. Validate ids at the edge with
//! [`EntityId::parse`](crate::types::EntityId::parse).

use serde::Serialize;
use std::fmt;

use crate::types::{EntityId, EntityKind};

/// Custom variable name/value slot pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    pub name: &'static str,
    pub value: &'static str,
}

const SPACE_KEYS: KeyPair = KeyPair {
    name: "customVariablePageName1",
    value: "customVariablePageValue1",
};

const CLUSTER_KEYS: KeyPair = KeyPair {
    name: "customVariablePageName2",
    value: "customVariablePageValue2",
};

const DOWNLOAD_TYPE_KEYS: KeyPair = KeyPair {
    name: "customVariablePageName3",
    value: "customVariablePageValue3",
};

impl EntityKind {
    pub fn key_pair(&self) -> KeyPair {
        match self {
            EntityKind::Operation | EntityKind::Space => SPACE_KEYS,
            EntityKind::Bundle | EntityKind::Cluster => CLUSTER_KEYS,
        }
    }
}

/// Download subtypes broken out in every summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadType {
    Document,
    Infographic,
    Dataset,
    Assessment,
}

impl DownloadType {
    pub const ALL: [DownloadType; 4] = [
        DownloadType::Document,
        DownloadType::Infographic,
        DownloadType::Dataset,
        DownloadType::Assessment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadType::Document => "document",
            DownloadType::Infographic => "infographic",
            DownloadType::Dataset => "dataset",
            DownloadType::Assessment => "assessment",
        }
    }

    /// Value the tracker stores in custom variable slot 3.
    pub fn tracked_value(&self) -> String {
        format!("hr_{}", self.as_str())
    }

    /// Column the subtype's download count is stored under.
    pub fn metric_name(&self) -> String {
        format!("nb_downloads_{}", self.as_str())
    }
}

impl fmt::Display for DownloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A segment filter expression, e.g. `customVariablePageName1==operations;customVariablePageValue1=@42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Segment(String);

impl Segment {
    /// Wrap a raw expression.
    pub fn raw(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    /// `{typeKey}=={plural};{valueKey}=@{id}`
    pub fn base(kind: EntityKind, id: &EntityId) -> Self {
        let keys = kind.key_pair();
        Self(format!("{}=={};{}=@{}", keys.name, kind.plural(), keys.value, id))
    }

    pub fn with_download_type(&self, download_type: DownloadType) -> Self {
        Self(format!(
            "{};{}==type;{}=={}",
            self.0,
            DOWNLOAD_TYPE_KEYS.name,
            DOWNLOAD_TYPE_KEYS.value,
            download_type.tracked_value()
        ))
    }

    pub fn with_country(&self, iso2: &str) -> Self {
        Self(format!("{};countryCode=={}", self.0, iso2))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Segment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_segment_operation() {
        let segment = Segment::base(EntityKind::Operation, &EntityId::new("42"));
        assert_eq!(segment.as_str(), "customVariablePageName1==operations;customVariablePageValue1=@42");
    }

    #[test]
    fn test_base_segment_uses_cluster_slot_for_bundles() {
        let segment = Segment::base(EntityKind::Bundle, &EntityId::new("7"));
        assert_eq!(segment.as_str(), "customVariablePageName2==bundles;customVariablePageValue2=@7");

        let segment = Segment::base(EntityKind::Cluster, &EntityId::new("7"));
        assert_eq!(segment.as_str(), "customVariablePageName2==clusters;customVariablePageValue2=@7");
    }

    #[test]
    fn test_base_segment_shape_for_every_kind() {
        for kind in EntityKind::ALL {
            let segment = Segment::base(kind, &EntityId::new("123"));
            let clauses: Vec<_> = segment.as_str().split(';').collect();
            assert_eq!(clauses.len(), 2, "{segment}");
            assert_eq!(segment.as_str().matches("==").count(), 1, "{segment}");
            assert_eq!(segment.as_str().matches("=@").count(), 1, "{segment}");
            assert!(clauses[0].contains("=="));
            assert!(clauses[1].contains("=@"));
            // deterministic
            assert_eq!(segment, Segment::base(kind, &EntityId::new("123")));
        }
    }

    #[test]
    fn test_with_download_type() {
        let segment = Segment::base(EntityKind::Space, &EntityId::new("5")).with_download_type(DownloadType::Dataset);
        assert_eq!(
            segment.as_str(),
            "customVariablePageName1==spaces;customVariablePageValue1=@5;customVariablePageName3==type;customVariablePageValue3==hr_dataset"
        );
    }

    #[test]
    fn test_with_country() {
        let segment = Segment::base(EntityKind::Operation, &EntityId::new("42")).with_country("NP");
        assert_eq!(
            segment.as_str(),
            "customVariablePageName1==operations;customVariablePageValue1=@42;countryCode==NP"
        );
    }

    #[test]
    fn test_country_then_download_type() {
        let segment = Segment::base(EntityKind::Operation, &EntityId::new("42"))
            .with_country("NP")
            .with_download_type(DownloadType::Document);
        assert!(segment.as_str().ends_with(";countryCode==NP;customVariablePageName3==type;customVariablePageValue3==hr_document"));
    }

    #[test]
    fn test_no_escaping_is_performed() {
        let segment = Segment::base(EntityKind::Operation, &EntityId::new("1;countryCode==fr"));
        assert_eq!(
            segment.as_str(),
            "customVariablePageName1==operations;customVariablePageValue1=@1;countryCode==fr"
        );
    }

    #[test]
    fn test_download_type_names() {
        let metrics: Vec<_> = DownloadType::ALL.iter().map(|t| t.metric_name()).collect();
        assert_eq!(
            metrics,
            vec!["nb_downloads_document", "nb_downloads_infographic", "nb_downloads_dataset", "nb_downloads_assessment"]
        );
        assert_eq!(DownloadType::Infographic.tracked_value(), "hr_infographic");
    }
}
