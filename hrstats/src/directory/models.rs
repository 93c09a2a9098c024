//! Directory API payloads.
//!
//! The directory wraps every response in `{ "data": [...] }`. Records are loosely shaped: the
//! same field can be an object, an array, `null` or missing depending on the entity type, so the
//! nested references are parsed leniently and anything unexpected is treated as absent.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::EntityId;

/// `{ "data": [...] }`
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRef {
    #[serde(default)]
    pub pcode: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl CountryRef {
    /// The pcode, if present and not blank.
    pub fn code(&self) -> Option<&str> {
        self.pcode.as_deref().map(str::trim).filter(|code| !code.is_empty())
    }
}

/// Parent operation reference on spaces and bundles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRef {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_country")]
    pub country: Option<CountryRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_country")]
    pub country: Option<CountryRef>,
    #[serde(default, deserialize_with = "lenient_operations")]
    pub operation: Vec<OperationRef>,
}

impl EntityRecord {
    pub fn new(id: impl Into<EntityId>, label: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn with_country(mut self, pcode: impl Into<String>) -> Self {
        self.country = Some(CountryRef {
            pcode: Some(pcode.into()),
            label: None,
        });
        self
    }

    pub fn with_operation_country(mut self, pcode: impl Into<String>) -> Self {
        self.operation.push(OperationRef {
            country: Some(CountryRef {
                pcode: Some(pcode.into()),
                label: None,
            }),
            ..Default::default()
        });
        self
    }

    /// Country the entity belongs to: `country.pcode`, else `operation[0].country.pcode`.
    pub fn country_code(&self) -> Option<&str> {
        self.country.as_ref().and_then(CountryRef::code).or_else(|| {
            self.operation
                .first()
                .and_then(|operation| operation.country.as_ref())
                .and_then(CountryRef::code)
        })
    }
}

fn lenient_country<'de, D>(deserializer: D) -> Result<Option<CountryRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// `operation` is an array on most records, a bare object on a few.
fn lenient_operations<'de, D>(deserializer: D) -> Result<Vec<OperationRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        Some(value @ Value::Object(_)) => vec![serde_json::from_value(value).unwrap_or_default()],
        _ => Vec::new(),
    })
}
