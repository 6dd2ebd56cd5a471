// 🔵 Symbol State - per-feature geometry and popup for one (year, filter)
//
// Every render is a full pass over the collection. Nothing is patched
// incrementally, so no radius, popup or visibility can survive from a
// previous year.

use crate::dataset::{Feature, FeatureCollection, FeatureId, YearKey};
use crate::filter::{FilterCategory, FilterPredicateSet};
use crate::render::{PopupOffset, Symbol, SymbolLayer, SymbolStyle};
use crate::scale::{RadiusScaler, MIN_RADIUS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

// ============================================================================
// SYMBOL STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenReason {
    /// The active predicate rejected the feature
    FilteredOut,
    /// No value for this year
    MissingValue,
}

/// Derived, never stored beyond one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolState {
    pub feature: FeatureId,
    pub province: String,
    pub value: Option<f64>,
    pub visible: bool,
    pub radius: f64,
    pub popup_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<HiddenReason>,
}

pub fn popup_text(province: &str, year: &YearKey, value: f64) -> String {
    format!("province: {}; GDP of {}: {}", province, year, value)
}

/// Pure half of a render: the state of every feature at `year` under
/// `category`.
pub fn compute_states(
    features: &FeatureCollection,
    year: &YearKey,
    category: FilterCategory,
    predicates: &FilterPredicateSet,
    scaler: &RadiusScaler,
) -> Vec<SymbolState> {
    features
        .iter()
        .map(|feature| {
            let value = feature.value_at(year);
            let hidden = match value {
                None => {
                    trace!(province = feature.province(), %year, "missing value at time");
                    Some(HiddenReason::MissingValue)
                }
                Some(_) if !predicates.evaluate(category, feature, year) => Some(HiddenReason::FilteredOut),
                Some(_) => None,
            };

            match (value, hidden) {
                (Some(v), None) => SymbolState {
                    feature: feature.id(),
                    province: feature.province().to_string(),
                    value,
                    visible: true,
                    radius: scaler.radius(v),
                    popup_text: popup_text(feature.province(), year, v),
                    hidden: None,
                },
                _ => SymbolState {
                    feature: feature.id(),
                    province: feature.province().to_string(),
                    value,
                    visible: false,
                    radius: MIN_RADIUS,
                    popup_text: String::new(),
                    hidden,
                },
            }
        })
        .collect()
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// Pushes symbol state to a rendered layer. Owns the layer handle.
pub struct SymbolStateController<L: SymbolLayer> {
    features: Arc<FeatureCollection>,
    layer: L,
    predicates: FilterPredicateSet,
    scaler: RadiusScaler,
    last_states: Vec<SymbolState>,
}

impl<L: SymbolLayer> SymbolStateController<L> {
    pub fn new(
        features: Arc<FeatureCollection>,
        layer: L,
        predicates: FilterPredicateSet,
        scaler: RadiusScaler,
    ) -> Self {
        SymbolStateController {
            features,
            layer,
            predicates,
            scaler,
            last_states: Vec::new(),
        }
    }

    /// Recompute every symbol for `year` under `category` and push it.
    pub fn render(&mut self, year: &YearKey, category: FilterCategory) {
        let states = compute_states(&self.features, year, category, &self.predicates, &self.scaler);

        self.predicates.reapply(&mut self.layer, category, year);

        for state in states.iter().filter(|s| s.visible) {
            self.layer.set_radius(state.feature, state.radius);
            self.layer.bind_popup(
                state.feature,
                state.popup_text.clone(),
                PopupOffset::above(state.radius),
            );
        }

        debug!(
            %year,
            filter = %category,
            visible = states.iter().filter(|s| s.visible).count(),
            total = states.len(),
            "symbols rendered"
        );

        self.last_states = states;
    }

    /// States pushed by the most recent render.
    pub fn states(&self) -> &[SymbolState] {
        &self.last_states
    }

    pub fn visible_states(&self) -> impl Iterator<Item = &SymbolState> {
        self.last_states.iter().filter(|s| s.visible)
    }

    pub fn layer(&self) -> &L {
        &self.layer
    }

    pub fn features(&self) -> &FeatureCollection {
        &self.features
    }
}

/// Layer factory: the initial symbol of a feature at the first year.
/// Features without a value there start as the minimum dot.
pub fn initial_symbol(feature: &Feature, first_year: &YearKey, scaler: &RadiusScaler) -> Symbol {
    let radius = feature
        .value_at(first_year)
        .map(|v| scaler.radius(v))
        .unwrap_or(MIN_RADIUS);

    Symbol {
        feature: feature.id(),
        position: feature.position(),
        radius,
        style: SymbolStyle::default(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
