//! Feature collection model.
//!
//! A WFS JSON response is decoded into a [`FeatureSet`]: the top-level
//! attributes of the collection plus its [`Feature`] records. Features keep
//! their geometry and properties as open JSON; only the identifier used for
//! deduplication is required.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Default property used as the feature identifier.
pub const DEFAULT_ID_PROPERTY: &str = "gid";

/// Errors raised while decoding a server response.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The response is not valid JSON, or not a feature collection.
    #[error("Invalid feature collection: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A feature lacks the identifier field.
    #[error("Feature has no identifier field '{field}'")]
    MissingIdentifier { field: String },

    /// The identifier is not a string or number.
    #[error("Feature identifier '{field}' must be a string or number, got {value}")]
    InvalidIdentifier { field: String, value: Value },
}

/// The field a feature's identity is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierField {
    /// A named entry of the feature's `properties`.
    Property(String),
    /// The GeoJSON top-level `id` member.
    FeatureId,
}

impl Default for IdentifierField {
    fn default() -> Self {
        Self::Property(DEFAULT_ID_PROPERTY.to_string())
    }
}

impl fmt::Display for IdentifierField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierField::Property(name) => write!(f, "properties.{}", name),
            IdentifierField::FeatureId => write!(f, "id"),
        }
    }
}

/// Identity of a feature for deduplication purposes.
///
/// The JSON type is part of the identity: `1` and `"1"` are different
/// features. Numbers keep their serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureId {
    Text(String),
    Number(String),
}

impl FeatureId {
    pub fn as_str(&self) -> &str {
        match self {
            FeatureId::Text(s) | FeatureId::Number(s) => s,
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Text(s) => write!(f, "\"{}\"", s),
            FeatureId::Number(n) => f.write_str(n),
        }
    }
}

/// Reads `"properties": null` as an empty map.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One feature record: geometry, properties and any other members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
    /// Remaining members such as `type` or `geometry_name`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feature {
    /// Reads the deduplication identifier from the designated field.
    pub fn identifier(&self, field: &IdentifierField) -> Result<FeatureId, DecodeError> {
        let (value, name) = match field {
            IdentifierField::Property(name) => (self.properties.get(name), name.as_str()),
            IdentifierField::FeatureId => (self.id.as_ref(), "id"),
        };

        match value {
            None | Some(Value::Null) => Err(DecodeError::MissingIdentifier {
                field: name.to_string(),
            }),
            Some(Value::String(s)) => Ok(FeatureId::Text(s.clone())),
            Some(Value::Number(n)) => Ok(FeatureId::Number(n.to_string())),
            Some(other) => Err(DecodeError::InvalidIdentifier {
                field: name.to_string(),
                value: other.clone(),
            }),
        }
    }
}

/// Decoded response for one region.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    pub features: Vec<Feature>,
    /// Top-level members other than `features`.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl FeatureSet {
    /// Decodes a JSON feature collection.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Number of features in this set.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Checks that bytes are well-formed JSON without building a model.
pub fn validate_json(bytes: &[u8]) -> Result<(), DecodeError> {
    serde_json::from_slice::<serde::de::IgnoredAny>(bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "totalFeatures": 2,
        "features": [
            {"type": "Feature", "id": "WCORP-001.1",
             "geometry": {"type": "Point", "coordinates": [115.8, -31.9]},
             "geometry_name": "the_geom", "properties": {"gid": 1, "name": "Perth"}},
            {"type": "Feature", "id": "WCORP-001.2", "geometry": null,
             "properties": {"gid": "2", "name": "Broome"}}
        ],
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::4283"}}
    }"#;

    #[test]
    fn test_decode_sample_collection() {
        let set = FeatureSet::from_slice(SAMPLE.as_bytes()).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.attributes["type"], json!("FeatureCollection"));
        assert_eq!(set.attributes["totalFeatures"], json!(2));
        assert!(set.attributes.contains_key("crs"));
        assert!(!set.attributes.contains_key("features"));
        assert_eq!(set.features[0].extra["geometry_name"], json!("the_geom"));
    }

    #[test]
    fn test_identifier_from_property() {
        let set = FeatureSet::from_slice(SAMPLE.as_bytes()).unwrap();
        let field = IdentifierField::default();

        assert_eq!(set.features[0].identifier(&field).unwrap().as_str(), "1");
        assert_eq!(set.features[1].identifier(&field).unwrap().as_str(), "2");
    }

    #[test]
    fn test_identifier_from_feature_id() {
        let set = FeatureSet::from_slice(SAMPLE.as_bytes()).unwrap();
        let id = set.features[1]
            .identifier(&IdentifierField::FeatureId)
            .unwrap();
        assert_eq!(id.as_str(), "WCORP-001.2");
    }

    #[test]
    fn test_missing_identifier_is_error() {
        let set = FeatureSet::from_slice(SAMPLE.as_bytes()).unwrap();
        let result = set.features[0].identifier(&IdentifierField::Property("ufi".into()));
        assert!(matches!(result, Err(DecodeError::MissingIdentifier { .. })));
    }

    #[test]
    fn test_structured_identifier_is_error() {
        let feature: Feature = serde_json::from_value(json!({
            "type": "Feature",
            "geometry": null,
            "properties": {"gid": [1, 2]}
        }))
        .unwrap();

        let result = feature.identifier(&IdentifierField::default());
        assert!(matches!(result, Err(DecodeError::InvalidIdentifier { .. })));
    }

    #[test]
    fn test_numeric_and_string_identifiers_differ() {
        let set = FeatureSet::from_slice(SAMPLE.as_bytes()).unwrap();
        let field = IdentifierField::default();

        let numeric = set.features[0].identifier(&field).unwrap();
        let text: Feature = serde_json::from_value(json!({
            "type": "Feature",
            "geometry": null,
            "properties": {"gid": "1"}
        }))
        .unwrap();

        assert_eq!(numeric, FeatureId::Number("1".to_string()));
        assert_eq!(text.identifier(&field).unwrap(), FeatureId::Text("1".to_string()));
        assert_ne!(numeric, text.identifier(&field).unwrap());
    }

    #[test]
    fn test_null_properties_decode_as_empty() {
        let set = FeatureSet::from_slice(
            br#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "id": "WCORP-001.7", "geometry": null, "properties": null}
            ]}"#,
        )
        .unwrap();

        let feature = &set.features[0];
        assert!(feature.properties.is_empty());
        assert_eq!(
            feature.identifier(&IdentifierField::FeatureId).unwrap().as_str(),
            "WCORP-001.7"
        );
        assert!(matches!(
            feature.identifier(&IdentifierField::default()),
            Err(DecodeError::MissingIdentifier { .. })
        ));
    }

    #[test]
    fn test_missing_properties_decode_as_empty() {
        let feature: Feature =
            serde_json::from_value(json!({"type": "Feature", "id": 3, "geometry": null})).unwrap();
        assert!(feature.properties.is_empty());
    }

    #[test]
    fn test_missing_features_array_is_error() {
        let result = FeatureSet::from_slice(br#"{"type": "FeatureCollection"}"#);
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_validate_json() {
        assert!(validate_json(br#"{"a": [1, 2]}"#).is_ok());
        assert!(validate_json(b"<ServiceExceptionReport/>").is_err());
    }

    #[test]
    fn test_feature_serializes_members_flat() {
        let set = FeatureSet::from_slice(SAMPLE.as_bytes()).unwrap();
        let value = serde_json::to_value(&set.features[0]).unwrap();

        assert_eq!(value["type"], json!("Feature"));
        assert_eq!(value["id"], json!("WCORP-001.1"));
        assert_eq!(value["properties"]["name"], json!("Perth"));
    }
}
