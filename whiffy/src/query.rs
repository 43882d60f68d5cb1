//! WFS `GetFeature` query construction.
//!
//! [`WfsQuery`] holds the base URI and fixed parameters for one feature type
//! and produces request URIs, optionally restricted to a bounding box.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::coord::BoundingBox;

/// Characters left unescaped in query keys and values.
///
/// Matches the conventional "unreserved plus slash" set; commas in the bbox
/// value are escaped.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Name of the spatial filter parameter.
pub const BBOX_PARAM: &str = "bbox";

/// Serializable identity of a query: everything except the bounding box.
///
/// Used as part of the cache key so that responses for different servers or
/// feature types never alias each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryIdentity {
    pub base_uri: String,
    pub params: Vec<(String, Option<String>)>,
}

/// Builder for WFS `GetFeature` request URIs.
#[derive(Debug, Clone, PartialEq)]
pub struct WfsQuery {
    base_uri: String,
    params: Vec<(String, Option<String>)>,
}

impl WfsQuery {
    /// Creates a JSON `GetFeature` query for one feature type.
    pub fn new(base_uri: impl Into<String>, typename: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            params: vec![
                ("request".to_string(), Some("GetFeature".to_string())),
                ("version-1.0.0".to_string(), None),
                ("outputformat".to_string(), Some("json".to_string())),
                ("typename".to_string(), Some(typename.into())),
            ],
        }
    }

    /// Adds or replaces a `key=value` parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key.into(), Some(value.into()));
        self
    }

    /// Adds a bare flag parameter.
    pub fn with_flag(mut self, key: impl Into<String>) -> Self {
        self.set(key.into(), None);
        self
    }

    fn set(&mut self, key: String, value: Option<String>) {
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }

    /// The base URI requests are sent to.
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Returns the cache identity of this query.
    pub fn identity(&self) -> QueryIdentity {
        QueryIdentity {
            base_uri: self.base_uri.clone(),
            params: self.params.clone(),
        }
    }

    /// Builds the request URI, adding a bbox filter when one is given.
    ///
    /// The filter is `west,south,east,north` with six decimals per
    /// coordinate.
    pub fn build_uri(&self, bbox: Option<&BoundingBox>) -> String {
        let filter = bbox.map(|b| {
            let [w, s, e, n] = b.to_wsen();
            (
                BBOX_PARAM.to_string(),
                Some(format!("{:.6},{:.6},{:.6},{:.6}", w, s, e, n)),
            )
        });

        let query = self
            .params
            .iter()
            .filter(|(k, _)| filter.is_none() || k != BBOX_PARAM)
            .chain(filter.iter())
            .map(|(k, v)| {
                let mut part = encode(k);
                if let Some(v) = v {
                    part.push('=');
                    part.push_str(&encode(v));
                }
                part
            })
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.base_uri, query)
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, QUERY_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::LatLng;
    use proptest::prelude::*;

    const BASE: &str = "https://www2.landgate.wa.gov.au/ows/wfspublic_4283/wfs";

    #[test]
    fn test_uri_without_bbox() {
        let query = WfsQuery::new(BASE, "WCORP-001");

        assert_eq!(
            query.build_uri(None),
            format!(
                "{}?request=GetFeature&version-1.0.0&outputformat=json&typename=WCORP-001",
                BASE
            )
        );
    }

    #[test]
    fn test_uri_with_bbox_is_west_south_east_north() {
        let query = WfsQuery::new(BASE, "WCORP-001");
        let bbox =
            BoundingBox::new(LatLng::new(-14.0, 129.0), LatLng::new(-35.0, 112.0)).unwrap();

        let uri = query.build_uri(Some(&bbox));

        assert!(uri.ends_with(
            "&bbox=112.000000%2C-35.000000%2C129.000000%2C-14.000000"
        ));
    }

    #[test]
    fn test_keys_and_values_are_percent_encoded() {
        let query = WfsQuery::new("http://example.com/wfs", "topp:states")
            .with_param("cql filter", "name='a b'")
            .with_flag("pretty&print");

        let uri = query.build_uri(None);

        assert!(uri.contains("typename=topp%3Astates"));
        assert!(uri.contains("cql%20filter=name%3D%27a%20b%27"));
        assert!(uri.ends_with("&pretty%26print"));
    }

    #[test]
    fn test_with_param_replaces_existing_key() {
        let query = WfsQuery::new("http://example.com/wfs", "a").with_param("typename", "b");
        let uri = query.build_uri(None);

        assert!(uri.contains("typename=b"));
        assert!(!uri.contains("typename=a"));
    }

    #[test]
    fn test_bbox_overrides_fixed_bbox_param() {
        let query = WfsQuery::new("http://example.com/wfs", "a").with_param("bbox", "0,0,1,1");
        let bbox = BoundingBox::new(LatLng::new(2.0, 2.0), LatLng::new(1.0, 1.0)).unwrap();

        let uri = query.build_uri(Some(&bbox));

        assert_eq!(uri.matches("bbox=").count(), 1);
        assert!(uri.contains("bbox=1.000000%2C1.000000%2C2.000000%2C2.000000"));
    }

    #[test]
    fn test_identity_distinguishes_typenames() {
        let a = WfsQuery::new(BASE, "WCORP-001").identity();
        let b = WfsQuery::new(BASE, "WCORP-002").identity();
        assert_ne!(a, b);
    }

    proptest! {
        /// Property: encoded components never contain raw separators.
        #[test]
        fn prop_encoded_values_have_no_separators(value in "\\PC*") {
            let encoded = encode(&value);
            prop_assert!(!encoded.contains('&'));
            prop_assert!(!encoded.contains('='));
            prop_assert!(!encoded.contains('?'));
            prop_assert!(!encoded.contains(' '));
        }
    }
}
