// 🧭 Legend - fixed reference circles
// Scale anchors, computed once from the radius scaler. Never tied to live data.

use crate::scale::RadiusScaler;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LEGEND_TITLE: &str = "GDP in 亿元(15 million US Dollar)";

/// Baseline the reference circles sit on.
pub const LEGEND_BASELINE: f64 = 150.0;

/// One hand-chosen reference value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendAnchor {
    pub key: String,
    pub value: f64,
    /// Vertical position of the label
    pub label_y: f64,
}

impl LegendAnchor {
    pub fn new(key: impl Into<String>, value: f64, label_y: f64) -> Self {
        LegendAnchor {
            key: key.into(),
            value,
            label_y,
        }
    }
}

/// max / mean / min anchors used by the province GDP map.
pub fn default_anchors() -> Vec<LegendAnchor> {
    vec![
        LegendAnchor::new("max", 30000.0, 40.0),
        LegendAnchor::new("mean", 10000.0, 90.0),
        LegendAnchor::new("min", 200.0, 130.0),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub key: String,
    pub value: f64,
    pub reference_radius: f64,
    pub reference_label: String,
    /// Circle centre, so every circle touches the baseline
    pub cy: f64,
    pub label_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub title: String,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    /// Largest reference radius; the terminal legend scales its dots by it.
    pub fn max_radius(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.reference_radius)
            .fold(0.0, f64::max)
    }
}

/// Value rounded to two decimals, without trailing zeros.
fn label_for(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{}", rounded)
}

/// Build the legend. Pure; call once at session start.
pub fn build_legend(title: &str, anchors: &[LegendAnchor], scaler: &RadiusScaler) -> Legend {
    let entries = anchors
        .iter()
        .map(|anchor| {
            let reference_radius = scaler.radius(anchor.value);
            LegendEntry {
                key: anchor.key.clone(),
                value: anchor.value,
                reference_radius,
                reference_label: label_for(anchor.value),
                cy: LEGEND_BASELINE - reference_radius,
                label_y: anchor.label_y,
            }
        })
        .collect();

    Legend {
        title: title.to_string(),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::radius;

    #[test]
    fn test_default_legend() {
        let legend = build_legend(DEFAULT_LEGEND_TITLE, &default_anchors(), &RadiusScaler::default());

        assert_eq!(legend.entries.len(), 3);
        let keys: Vec<&str> = legend.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["max", "mean", "min"]);

        let max = &legend.entries[0];
        assert_eq!(max.reference_radius, radius(30000.0));
        assert_eq!(max.reference_label, "30000");
        assert_eq!(max.cy, 150.0 - max.reference_radius);
        assert_eq!(legend.max_radius(), max.reference_radius);
    }

    #[test]
    fn test_label_rounding() {
        assert_eq!(label_for(1234.5678), "1234.57");
        assert_eq!(label_for(200.0), "200");
    }

    #[test]
    fn test_radii_descend_with_anchor_values() {
        let legend = build_legend("t", &default_anchors(), &RadiusScaler::default());
        let radii: Vec<f64> = legend.entries.iter().map(|e| e.reference_radius).collect();
        assert!(radii[0] > radii[1] && radii[1] > radii[2]);
    }
}
