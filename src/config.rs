// ⚙️ Configuration
// Everything tunable about a session, defaulting to the province GDP map's values.
// Built from command-line flags; there is no config file.

use crate::error::ConfigError;
use crate::filter::{FilterPredicateSet, DEFAULT_BAD_ABOVE, DEFAULT_GOOD_BELOW};
use crate::legend::{default_anchors, LegendAnchor, DEFAULT_LEGEND_TITLE};
use crate::scale::{RadiusScaler, DEFAULT_SCALE_FACTOR};
use crate::schema::{ContainsMarker, DEFAULT_YEAR_MARKER};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_DATASET: &str = "data/gdp.geojson";

/// Geographic window the map is allowed to show.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Default for MapBounds {
    fn default() -> Self {
        MapBounds {
            west: 64.0,
            south: 15.0,
            east: 140.0,
            north: 54.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    pub dataset: PathBuf,
    pub scale_factor: f64,
    pub good_below: f64,
    pub bad_above: f64,
    /// Substring that marks an attribute as a year column
    pub year_marker: String,
    pub legend_title: String,
    pub legend_anchors: Vec<LegendAnchor>,
    pub bounds: MapBounds,
}

impl Default for VizConfig {
    fn default() -> Self {
        VizConfig {
            dataset: PathBuf::from(DEFAULT_DATASET),
            scale_factor: DEFAULT_SCALE_FACTOR,
            good_below: DEFAULT_GOOD_BELOW,
            bad_above: DEFAULT_BAD_ABOVE,
            year_marker: DEFAULT_YEAR_MARKER.to_string(),
            legend_title: DEFAULT_LEGEND_TITLE.to_string(),
            legend_anchors: default_anchors(),
            bounds: MapBounds::default(),
        }
    }
}

impl VizConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(ConfigError::ScaleFactor(self.scale_factor));
        }
        // Good and Bad must stay disjoint
        if self.good_below > self.bad_above {
            return Err(ConfigError::OverlappingThresholds {
                good_below: self.good_below,
                bad_above: self.bad_above,
            });
        }
        if self.year_marker.is_empty() {
            return Err(ConfigError::EmptyYearMarker);
        }
        if self.legend_anchors.is_empty() {
            return Err(ConfigError::NoLegendAnchors);
        }
        Ok(())
    }

    pub fn scaler(&self) -> RadiusScaler {
        RadiusScaler::new(self.scale_factor)
    }

    pub fn predicates(&self) -> FilterPredicateSet {
        FilterPredicateSet::new(self.good_below, self.bad_above)
    }

    pub fn year_predicate(&self) -> ContainsMarker {
        ContainsMarker(self.year_marker.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = VizConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.scaler(), RadiusScaler::default());
        assert_eq!(config.predicates(), FilterPredicateSet::default());
        assert_eq!(config.year_predicate(), ContainsMarker::default());
    }

    #[test]
    fn test_rejects_bad_scale_factor() {
        let config = VizConfig {
            scale_factor: 0.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ScaleFactor(0.0)));
    }

    #[test]
    fn test_rejects_overlapping_thresholds() {
        let config = VizConfig {
            good_below: 3000.0,
            bad_above: 2000.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OverlappingThresholds { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_marker_and_anchors() {
        let config = VizConfig {
            year_marker: String::new(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyYearMarker));

        let config = VizConfig {
            legend_anchors: Vec::new(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoLegendAnchors));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: VizConfig = serde_json::from_str(r#"{"scale_factor": 1.0}"#).unwrap();
        assert_eq!(config.scale_factor, 1.0);
        assert_eq!(config.good_below, 900.0);
        assert_eq!(config.dataset, PathBuf::from(DEFAULT_DATASET));
    }
}
