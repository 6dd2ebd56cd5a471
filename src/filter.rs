// 🔍 Filter Predicates - value-range categories
// Exactly one category is active at a time. Selecting one is pure; callers
// re-render afterwards.

use crate::dataset::{Feature, YearKey};
use crate::render::SymbolLayer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_GOOD_BELOW: f64 = 900.0;
pub const DEFAULT_BAD_ABOVE: f64 = 2000.0;

// ============================================================================
// FILTER CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterCategory {
    #[default]
    All,
    Good,
    Bad,
}

impl FilterCategory {
    pub const ALL: [FilterCategory; 3] = [FilterCategory::All, FilterCategory::Good, FilterCategory::Bad];

    pub fn title(&self) -> &str {
        match self {
            FilterCategory::All => "All",
            FilterCategory::Good => "Good",
            FilterCategory::Bad => "Bad",
        }
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown filter category {0:?} (expected all, good or bad)")]
pub struct UnknownFilterCategory(pub String);

impl FromStr for FilterCategory {
    type Err = UnknownFilterCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterCategory::All),
            "good" => Ok(FilterCategory::Good),
            "bad" => Ok(FilterCategory::Bad),
            _ => Err(UnknownFilterCategory(s.to_string())),
        }
    }
}

// ============================================================================
// PREDICATE SET
// ============================================================================

/// The three predicates over `(feature, year)`.
///
/// Thresholds are literal: below `good_below` is Good, above `bad_above` is
/// Bad, and the band in between carries no label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicateSet {
    pub good_below: f64,
    pub bad_above: f64,
}

impl Default for FilterPredicateSet {
    fn default() -> Self {
        FilterPredicateSet {
            good_below: DEFAULT_GOOD_BELOW,
            bad_above: DEFAULT_BAD_ABOVE,
        }
    }
}

impl FilterPredicateSet {
    pub fn new(good_below: f64, bad_above: f64) -> Self {
        FilterPredicateSet { good_below, bad_above }
    }

    pub fn all(&self, _feature: &Feature, _year: &YearKey) -> bool {
        true
    }

    pub fn good(&self, feature: &Feature, year: &YearKey) -> bool {
        match feature.value_at(year) {
            Some(v) => v < self.good_below,
            None => false,
        }
    }

    pub fn bad(&self, feature: &Feature, year: &YearKey) -> bool {
        match feature.value_at(year) {
            Some(v) => v > self.bad_above,
            None => false,
        }
    }

    pub fn evaluate(&self, category: FilterCategory, feature: &Feature, year: &YearKey) -> bool {
        match category {
            FilterCategory::All => self.all(feature, year),
            FilterCategory::Good => self.good(feature, year),
            FilterCategory::Bad => self.bad(feature, year),
        }
    }

    /// Whether a feature belongs to the rendered set: it needs a value at
    /// `year` and must pass the active predicate.
    pub fn admits(&self, category: FilterCategory, feature: &Feature, year: &YearKey) -> bool {
        feature.value_at(year).is_some() && self.evaluate(category, feature, year)
    }

    /// Narrow the layer to the features the active category admits at `year`.
    /// `year` must be the current one; a stale year leaves the wrong set.
    pub fn reapply<L>(&self, layer: &mut L, category: FilterCategory, year: &YearKey)
    where
        L: SymbolLayer + ?Sized,
    {
        layer.set_filter(&|feature| self.admits(category, feature, year));
    }
}

// ============================================================================
// TESTS
// ============================================================================
