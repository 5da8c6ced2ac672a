//! API metadata records delivered by configuration sources

use serde::{Deserialize, Serialize};

/// Metadata describing one documented service.
///
/// Records are produced by a [`SpecSource`](crate::core::sources::SpecSource)
/// and stored whole in the registry. Only `name` and `url` drive behavior;
/// everything else is display metadata for the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiRecord {
    /// Registry key, also used in `/api/{name}` routes
    pub name: String,
    /// Absolute URL of the specification document
    pub url: String,
    pub title: String,
    pub version: String,
    pub description: String,
    /// Kind of resource exposing the API (e.g. Service, Deployment)
    pub resource_type: String,
    pub resource_name: String,
    pub namespace: String,
    pub last_updated: String,
    /// Methods the UI should offer for "try it out"
    pub allowed_methods: Option<Vec<String>>,
    /// Set by the source when it could not describe this service
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl ApiRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Whether the source flagged this record as failed
    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_partial_record() {
        let record: ApiRecord = serde_json::from_value(json!({
            "name": "petstore",
            "url": "http://petstore.default.svc/v2/swagger.json",
            "resourceType": "Service",
            "allowedMethods": ["get", "post"]
        }))
        .unwrap();

        assert_eq!(record.name, "petstore");
        assert_eq!(record.resource_type, "Service");
        assert_eq!(
            record.allowed_methods,
            Some(vec!["get".to_string(), "post".to_string()])
        );
        assert!(record.title.is_empty());
        assert!(!record.has_error());
    }

    #[test]
    fn test_serialize_omits_empty_error() {
        let record = ApiRecord::new("orders", "http://orders/openapi.json");
        let value = serde_json::to_value(&record).unwrap();

        assert!(value.get("error").is_none());
        assert_eq!(value["lastUpdated"], "");
        assert!(value["allowedMethods"].is_null());

        let failed = ApiRecord {
            error: "no endpoints".to_string(),
            ..record
        };
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["error"], "no endpoints");
    }
}
