// ⏰ Time Sequence - discrete year index driving the symbol layer
//
// State: (index, filter) held together so a render never mixes a new filter
// with an old index. Initial state is (0, All). There is no terminal state.

use crate::dataset::YearKey;
use crate::filter::FilterCategory;
use crate::render::SymbolLayer;
use crate::symbols::{SymbolState, SymbolStateController};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Snapshot of everything a render reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewState {
    pub index: usize,
    pub filter: FilterCategory,
}

pub struct TimeSequenceController<L: SymbolLayer> {
    years: Vec<YearKey>,
    view: ViewState,
    symbols: SymbolStateController<L>,
}

impl<L: SymbolLayer> TimeSequenceController<L> {
    /// `years` must not be empty. Only `Session` builds one, after schema
    /// extraction has rejected an empty time axis.
    pub(crate) fn new(years: Vec<YearKey>, symbols: SymbolStateController<L>) -> Self {
        debug_assert!(!years.is_empty(), "time axis needs at least one year");
        TimeSequenceController {
            years,
            view: ViewState::default(),
            symbols,
        }
    }

    pub fn years(&self) -> &[YearKey] {
        &self.years
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.years.len().saturating_sub(1)
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn index(&self) -> usize {
        self.view.index
    }

    pub fn filter(&self) -> FilterCategory {
        self.view.filter
    }

    pub fn current_year(&self) -> &YearKey {
        &self.years[self.view.index]
    }

    pub fn symbols(&self) -> &SymbolStateController<L> {
        &self.symbols
    }

    pub fn states(&self) -> &[SymbolState] {
        self.symbols.states()
    }

    pub fn layer(&self) -> &L {
        self.symbols.layer()
    }

    /// Render the current view without changing it.
    pub fn render(&mut self) {
        let view = self.view;
        let year = self.years[view.index].clone();
        self.symbols.render(&year, view.filter);
    }

    /// Move to `index`, clamped to the time axis, and re-render with the
    /// active filter. Returns the index actually applied.
    pub fn set_index(&mut self, index: usize) -> usize {
        let clamped = index.min(self.last_index());
        if clamped != index {
            debug!(requested = index, applied = clamped, "time index clamped");
        }
        self.view.index = clamped;
        self.render();
        clamped
    }

    /// Select a filter and re-render at the current year.
    pub fn set_filter(&mut self, filter: FilterCategory) {
        self.view.filter = filter;
        self.render();
    }

    /// Jump to a year by key. Unknown keys leave the state untouched.
    pub fn set_year(&mut self, year: &YearKey) -> Option<usize> {
        let index = self.years.iter().position(|y| y == year)?;
        Some(self.set_index(index))
    }

    pub fn step_forward(&mut self) -> usize {
        let next = self.view.index.saturating_add(1);
        self.set_index(next)
    }

    pub fn step_back(&mut self) -> usize {
        let prev = self.view.index.saturating_sub(1);
        self.set_index(prev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Feature, FeatureCollection, FeatureId, Position};
    use crate::filter::FilterPredicateSet;
    use crate::render::{MapSurface, Scene, SceneLayer};
    use crate::scale::RadiusScaler;
    use crate::symbols::initial_symbol;
    use serde_json::{json, Map};
    use std::sync::Arc;

    fn timeline() -> TimeSequenceController<SceneLayer> {
        let make = |id: usize, name: &str, a: i64, b: i64| {
            let mut props = Map::new();
            props.insert("province".to_string(), json!(name));
            props.insert("2000".to_string(), json!(a));
            props.insert("2005".to_string(), json!(b));
            Feature::new(FeatureId(id), Position { lon: 0.0, lat: 0.0 }, props)
        };
        let features = Arc::new(FeatureCollection::new(vec![make(0, "A", 800, 950), make(1, "B", 2500, 100)]));
        let years = vec![YearKey::new("2000"), YearKey::new("2005")];
        let scaler = RadiusScaler::default();
        let layer = Scene::new().add_symbol_layer(features.clone(), &|f| initial_symbol(f, &years[0], &scaler));
        let symbols = SymbolStateController::new(features, layer, FilterPredicateSet::default(), scaler);
        let mut t = TimeSequenceController::new(years, symbols);
        t.render();
        t
    }

    fn visible(t: &TimeSequenceController<SceneLayer>) -> Vec<String> {
        t.symbols().visible_states().map(|s| s.province.clone()).collect()
    }

    #[test]
    fn test_initial_state() {
        let t = timeline();
        assert_eq!(t.view(), ViewState { index: 0, filter: FilterCategory::All });
        assert_eq!(t.current_year(), &YearKey::new("2000"));
        assert_eq!(visible(&t), vec!["A", "B"]);
    }

    #[test]
    fn test_set_index_clamps() {
        let mut t = timeline();
        assert_eq!(t.set_index(7), 1);
        assert_eq!(t.index(), 1);
        assert_eq!(t.current_year(), &YearKey::new("2005"));
    }

    #[test]
    fn test_filter_persists_across_time_changes() {
        let mut t = timeline();
        t.set_filter(FilterCategory::Good);
        assert_eq!(visible(&t), vec!["A"]);

        t.set_index(1);
        assert_eq!(t.filter(), FilterCategory::Good);
        assert_eq!(visible(&t), vec!["B"]);
    }

    #[test]
    fn test_popups_follow_current_year() {
        let mut t = timeline();
        t.set_index(1);

        for s in t.symbols().visible_states() {
            assert!(s.popup_text.contains("2005"));
            assert!(s.popup_text.contains(&s.value.unwrap().to_string()));
        }
        let a = t.layer().symbol(FeatureId(0)).unwrap();
        assert_eq!(a.popup.as_ref().unwrap().text, "province: A; GDP of 2005: 950");
    }

    #[test]
    fn test_steps_and_year_lookup() {
        let mut t = timeline();
        assert_eq!(t.step_back(), 0);
        assert_eq!(t.step_forward(), 1);
        assert_eq!(t.step_forward(), 1);
        assert_eq!(t.set_year(&YearKey::new("2000")), Some(0));
        assert_eq!(t.set_year(&YearKey::new("1999")), None);
        assert_eq!(t.index(), 0);
    }
}
