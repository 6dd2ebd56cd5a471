// 🚀 Session - bootstrap and input events
//
// Startup order:
// 1. validate config
// 2. load dataset            (fatal on error)
// 3. extract year keys       (fatal on error)
// 4. symbol layer + controls
// 5. initial render at (0, All)
//
// A `Session` only exists once all of that succeeded, so input can never
// reach the controllers before the data is there.

use crate::config::VizConfig;
use crate::dataset::{load_dataset, FeatureCollection, LoadReport, YearKey};
use crate::error::SessionError;
use crate::filter::FilterCategory;
use crate::legend::{build_legend, Legend};
use crate::render::{Control, ControlHandle, ControlPosition, MapSurface};
use crate::schema::{check_homogeneity, year_keys_for};
use crate::symbols::{initial_symbol, SymbolState, SymbolStateController};
use crate::timeline::{TimeSequenceController, ViewState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Discrete user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum SessionEvent {
    SliderMoved(usize),
    FilterClicked(FilterCategory),
    StepForward,
    StepBack,
}

#[derive(Debug, Clone, Copy)]
struct Controls {
    slider: ControlHandle,
    label: ControlHandle,
    legend: ControlHandle,
}

pub struct Session<S: MapSurface> {
    id: Uuid,
    surface: S,
    timeline: TimeSequenceController<S::Layer>,
    legend: Legend,
    controls: Controls,
    report: Option<LoadReport>,
}

impl<S: MapSurface> Session<S> {
    /// Load the configured dataset and start a session on `surface`.
    pub fn start(config: &VizConfig, surface: S) -> Result<Self, SessionError> {
        config.validate()?;
        let (features, report) = load_dataset(&config.dataset)?;
        let mut session = Self::with_features(config, features, surface)?;
        session.report = Some(report);
        Ok(session)
    }

    /// Start a session on an already loaded collection.
    pub fn with_features(
        config: &VizConfig,
        features: FeatureCollection,
        mut surface: S,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        let years = year_keys_for(&features, &config.year_predicate())?;
        check_homogeneity(&features, &years);

        let features = Arc::new(features);
        let scaler = config.scaler();
        let layer = surface.add_symbol_layer(features.clone(), &|f| initial_symbol(f, &years[0], &scaler));

        let legend = build_legend(&config.legend_title, &config.legend_anchors, &scaler);
        let controls = Controls {
            slider: surface.add_control(
                ControlPosition::TopRight,
                Control::Slider {
                    min: 0,
                    max: years.len() - 1,
                    step: 1,
                    value: 0,
                },
            ),
            label: surface.add_control(
                ControlPosition::TopRight,
                Control::SliderLabel {
                    text: years[0].to_string(),
                },
            ),
            legend: surface.add_control(ControlPosition::BottomLeft, Control::Legend(legend.clone())),
        };

        let symbols = SymbolStateController::new(features, layer, config.predicates(), scaler);
        let mut timeline = TimeSequenceController::new(years, symbols);
        timeline.render();

        let id = Uuid::new_v4();
        info!(
            session = %id,
            years = timeline.len(),
            features = timeline.symbols().features().len(),
            "session started"
        );

        Ok(Session {
            id,
            surface,
            timeline,
            legend,
            controls,
            report: None,
        })
    }

    /// React to one input event. Each event ends in exactly one full render.
    pub fn handle(&mut self, event: SessionEvent) -> ViewState {
        let before = self.timeline.index();
        match event {
            SessionEvent::SliderMoved(index) => {
                self.timeline.set_index(index);
            }
            SessionEvent::FilterClicked(filter) => self.timeline.set_filter(filter),
            SessionEvent::StepForward => {
                self.timeline.step_forward();
            }
            SessionEvent::StepBack => {
                self.timeline.step_back();
            }
        }

        if self.timeline.index() != before {
            self.sync_slider();
        }
        self.timeline.view()
    }

    /// Jump to a year by key; `None` when the key is not on the time axis.
    pub fn select_year(&mut self, year: &YearKey) -> Option<ViewState> {
        let index = self.timeline.years().iter().position(|y| y == year)?;
        Some(self.handle(SessionEvent::SliderMoved(index)))
    }

    fn sync_slider(&mut self) {
        let index = self.timeline.index();
        self.surface.update_control(
            self.controls.slider,
            Control::Slider {
                min: 0,
                max: self.timeline.last_index(),
                step: 1,
                value: index,
            },
        );
        self.surface.update_control(
            self.controls.label,
            Control::SliderLabel {
                text: self.timeline.current_year().to_string(),
            },
        );
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn view(&self) -> ViewState {
        self.timeline.view()
    }

    pub fn years(&self) -> &[YearKey] {
        self.timeline.years()
    }

    pub fn current_year(&self) -> &YearKey {
        self.timeline.current_year()
    }

    pub fn states(&self) -> &[SymbolState] {
        self.timeline.states()
    }

    pub fn features(&self) -> &FeatureCollection {
        self.timeline.symbols().features()
    }

    pub fn layer(&self) -> &S::Layer {
        self.timeline.layer()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn legend(&self) -> &Legend {
        &self.legend
    }

    pub fn legend_control(&self) -> ControlHandle {
        self.controls.legend
    }

    pub fn report(&self) -> Option<&LoadReport> {
        self.report.as_ref()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::parse_geojson;
    use crate::render::{Scene, SceneLayer};
    use std::io::Write;

    const TWO_PROVINCES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature",
             "properties": {"province": "A", "2000": 800, "2005": 950},
             "geometry": {"type": "Point", "coordinates": [116.4, 39.9]}},
            {"type": "Feature",
             "properties": {"province": "B", "2000": 2500, "2005": 100},
             "geometry": {"type": "Point", "coordinates": [121.5, 31.2]}}
        ]
    }"#;

    fn session() -> Session<Scene> {
        let features = parse_geojson(TWO_PROVINCES).unwrap();
        Session::with_features(&VizConfig::default(), features, Scene::new()).unwrap()
    }

    fn visible(s: &Session<Scene>) -> Vec<&str> {
        s.layer()
            .visible()
            .map(|sym| s.features().get(sym.symbol.feature).unwrap().province())
            .collect()
    }

    fn layer_radius(layer: &SceneLayer, province: &str) -> f64 {
        layer
            .symbols()
            .iter()
            .zip(layer.features().iter())
            .find(|(_, f)| f.province() == province)
            .map(|(s, _)| s.symbol.radius)
            .unwrap()
    }

    #[test]
    fn test_two_province_scenario() {
        let mut s = session();
        assert_eq!(s.years(), &[YearKey::new("2000"), YearKey::new("2005")]);

        s.handle(SessionEvent::SliderMoved(0));
        s.handle(SessionEvent::FilterClicked(FilterCategory::Good));
        assert_eq!(visible(&s), vec!["A"]);
        let r = layer_radius(s.layer(), "A");
        assert!((r - 13.1).abs() < 0.01, "radius {}", r);

        s.handle(SessionEvent::SliderMoved(1));
        s.handle(SessionEvent::FilterClicked(FilterCategory::Bad));
        assert!(visible(&s).is_empty());

        s.handle(SessionEvent::SliderMoved(0));
        assert_eq!(visible(&s), vec!["B"]);
    }

    #[test]
    fn test_good_never_grows_visible_set() {
        let mut s = session();
        for index in 0..s.years().len() {
            s.handle(SessionEvent::SliderMoved(index));
            s.handle(SessionEvent::FilterClicked(FilterCategory::All));
            let all = s.layer().visible_count();

            s.handle(SessionEvent::FilterClicked(FilterCategory::Good));
            assert!(s.layer().visible_count() <= all);
            for state in s.states().iter().filter(|st| st.visible) {
                assert!(state.value.unwrap() < 900.0);
            }
        }
    }

    #[test]
    fn test_slider_updates_label_control() {
        let mut s = session();
        s.handle(SessionEvent::SliderMoved(1));

        let labels: Vec<&Control> = s
            .surface()
            .controls()
            .iter()
            .map(|c| &c.control)
            .filter(|c| matches!(c, Control::SliderLabel { .. }))
            .collect();
        assert_eq!(labels, vec![&Control::SliderLabel { text: "2005".to_string() }]);

        assert!(s.surface().controls().iter().any(|c| c.control
            == Control::Slider {
                min: 0,
                max: 1,
                step: 1,
                value: 1
            }));
    }

    #[test]
    fn test_legend_mounted_once_and_independent() {
        let mut s = session();
        let before = s.legend().clone();

        s.handle(SessionEvent::SliderMoved(1));
        s.handle(SessionEvent::FilterClicked(FilterCategory::Bad));

        assert_eq!(s.legend(), &before);
        assert_eq!(
            s.surface().control(s.legend_control()),
            Some(&Control::Legend(before))
        );
    }

    #[test]
    fn test_select_year() {
        let mut s = session();
        let view = s.select_year(&YearKey::new("2005")).unwrap();
        assert_eq!(view.index, 1);
        assert!(s.select_year(&YearKey::new("1990")).is_none());
        assert_eq!(s.current_year(), &YearKey::new("2005"));
    }

    #[test]
    fn test_schema_error_is_fatal() {
        let text = r#"{"features": [{"properties": {"province": "A", "gdp": 1},
            "geometry": {"type": "Point", "coordinates": [0, 0]}}]}"#;
        let features = parse_geojson(text).unwrap();

        let result = Session::with_features(&VizConfig::default(), features, Scene::new());
        assert!(matches!(result, Err(SessionError::SchemaExtraction(_))));
    }

    #[test]
    fn test_start_from_file() {
        let mut file = tempfile::Builder::new().suffix(".geojson").tempfile().unwrap();
        file.write_all(TWO_PROVINCES.as_bytes()).unwrap();
        let config = VizConfig {
            dataset: file.path().to_path_buf(),
            ..Default::default()
        };

        let s = Session::start(&config, Scene::new()).unwrap();
        assert_eq!(s.report().unwrap().feature_count, 2);
        assert_eq!(s.view(), ViewState::default());
    }

    #[test]
    fn test_load_error_is_fatal() {
        let config = VizConfig {
            dataset: "/missing/gdp.geojson".into(),
            ..Default::default()
        };
        let result = Session::start(&config, Scene::new());
        assert!(matches!(result, Err(SessionError::DatasetLoad(_))));
    }
}
