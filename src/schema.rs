// 🏛️ Schema Layer - Year key extraction
// The time axis is read off the first feature's attribute names.

use crate::dataset::{Feature, FeatureCollection, YearKey};
use crate::error::SchemaExtractionError;
use tracing::{debug, warn};

/// Substring the default heuristic looks for.
pub const DEFAULT_YEAR_MARKER: &str = "20";

// ============================================================================
// YEAR KEY PREDICATE
// ============================================================================

/// Decides whether an attribute name is a year column.
pub trait YearKeyPredicate {
    fn is_year_key(&self, attribute: &str) -> bool;

    /// Short description used in error messages.
    fn describe(&self) -> String {
        String::from("custom predicate")
    }
}

impl<F> YearKeyPredicate for F
where
    F: Fn(&str) -> bool,
{
    fn is_year_key(&self, attribute: &str) -> bool {
        self(attribute)
    }
}

/// Accepts any attribute whose name contains the marker anywhere.
///
/// Known fragility: with the default `"20"` marker a non-year column such as
/// `"region20"` is accepted too. Pass a stricter predicate when the dataset
/// has such columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainsMarker(pub String);

impl Default for ContainsMarker {
    fn default() -> Self {
        ContainsMarker(DEFAULT_YEAR_MARKER.to_string())
    }
}

impl YearKeyPredicate for ContainsMarker {
    fn is_year_key(&self, attribute: &str) -> bool {
        attribute.contains(self.0.as_str())
    }

    fn describe(&self) -> String {
        self.0.clone()
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Year keys of one sample feature, in attribute definition order.
/// Returns an empty list when nothing matches.
pub fn extract_year_keys(sample: &Feature, predicate: &dyn YearKeyPredicate) -> Vec<YearKey> {
    sample
        .attribute_names()
        .filter(|name| predicate.is_year_key(name))
        .map(YearKey::new)
        .collect()
}

/// Year keys of a collection, taken from its first feature.
/// An empty result is fatal: nothing can be rendered without a time axis.
pub fn year_keys_for(
    collection: &FeatureCollection,
    predicate: &dyn YearKeyPredicate,
) -> Result<Vec<YearKey>, SchemaExtractionError> {
    let sample = collection.first().ok_or_else(|| SchemaExtractionError {
        sample: String::from("(empty collection)"),
        marker: predicate.describe(),
    })?;

    let keys = extract_year_keys(sample, predicate);
    if keys.is_empty() {
        return Err(SchemaExtractionError {
            sample: sample.province().to_string(),
            marker: predicate.describe(),
        });
    }

    debug!(count = keys.len(), first = %keys[0], "year keys extracted");
    Ok(keys)
}

/// Features that lack one or more year keys. Rendering treats those years as
/// missing; this only reports them.
pub fn check_homogeneity(collection: &FeatureCollection, keys: &[YearKey]) -> Vec<(String, Vec<YearKey>)> {
    let mut gaps = Vec::new();

    for feature in collection {
        let missing: Vec<YearKey> = keys
            .iter()
            .filter(|k| !feature.has_attribute(k.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            warn!(
                province = feature.province(),
                missing = missing.len(),
                "feature does not carry every year key"
            );
            gaps.push((feature.province().to_string(), missing));
        }
    }

    gaps
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{FeatureId, Position};
    use serde_json::{json, Map, Value};

    fn feature(id: usize, props: Value) -> Feature {
        let properties: Map<String, Value> = match props {
            Value::Object(map) => map,
            _ => panic!("properties must be an object"),
        };
        Feature::new(FeatureId(id), Position { lon: 0.0, lat: 0.0 }, properties)
    }

    #[test]
    fn test_default_heuristic_keeps_fragile_match() {
        let sample = feature(0, json!({"province": "X", "2000": 1, "2010": 2, "name20": 3}));

        let keys = extract_year_keys(&sample, &ContainsMarker::default());

        assert_eq!(
            keys,
            vec![YearKey::new("2000"), YearKey::new("2010"), YearKey::new("name20")]
        );
    }

    #[test]
    fn test_custom_predicate() {
        let sample = feature(0, json!({"province": "X", "2000": 1, "2010": 2, "name20": 3}));
        let four_digits = |name: &str| name.len() == 4 && name.chars().all(|c| c.is_ascii_digit());

        let keys = extract_year_keys(&sample, &four_digits);

        assert_eq!(keys, vec![YearKey::new("2000"), YearKey::new("2010")]);
    }

    #[test]
    fn test_no_year_keys_is_fatal() {
        let collection = FeatureCollection::new(vec![feature(0, json!({"province": "X", "code": 1}))]);

        let err = year_keys_for(&collection, &ContainsMarker::default()).unwrap_err();

        assert_eq!(err.sample, "X");
        assert_eq!(err.marker, "20");
    }

    #[test]
    fn test_empty_collection_is_fatal() {
        let collection = FeatureCollection::default();
        assert!(year_keys_for(&collection, &ContainsMarker::default()).is_err());
    }

    #[test]
    fn test_keys_come_from_first_feature_only() {
        let collection = FeatureCollection::new(vec![
            feature(0, json!({"province": "A", "2000": 1})),
            feature(1, json!({"province": "B", "2000": 1, "2005": 2})),
        ]);

        let keys = year_keys_for(&collection, &ContainsMarker::default()).unwrap();
        assert_eq!(keys, vec![YearKey::new("2000")]);
    }

    #[test]
    fn test_check_homogeneity_reports_gaps() {
        let collection = FeatureCollection::new(vec![
            feature(0, json!({"province": "A", "2000": 1, "2005": 2})),
            feature(1, json!({"province": "B", "2000": 1})),
        ]);
        let keys = vec![YearKey::new("2000"), YearKey::new("2005")];

        let gaps = check_homogeneity(&collection, &keys);

        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].0, "B");
        assert_eq!(gaps[0].1, vec![YearKey::new("2005")]);
    }
}
