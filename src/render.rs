// 🎨 Rendering Collaborator - the contracts the core draws through
//
// The core never talks to a concrete map library. It needs four things:
// 1. a per-feature symbol layer built from a factory
// 2. `set_filter` to narrow which features the layer renders
// 3. per-symbol `set_radius` / `bind_popup`
// 4. a synchronous control factory for the slider, its label and the legend
//
// `Scene` is the in-memory implementation used by the terminal UI, the HTTP
// server and the tests.

use crate::dataset::{Feature, FeatureCollection, FeatureId, Position};
use crate::legend::Legend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// SYMBOLS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolStyle {
    pub fill_color: String,
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
}

impl Default for SymbolStyle {
    fn default() -> Self {
        SymbolStyle {
            fill_color: "white".to_string(),
            color: "#000".to_string(),
            weight: 1.0,
            opacity: 1.0,
            fill_opacity: 0.8,
        }
    }
}

/// What the layer factory produces for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub feature: FeatureId,
    pub position: Position,
    pub radius: f64,
    pub style: SymbolStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopupOffset {
    pub x: f64,
    pub y: f64,
}

impl PopupOffset {
    /// Anchor just above the top edge of a circle.
    pub fn above(radius: f64) -> Self {
        PopupOffset { x: 0.0, y: -radius }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Popup {
    pub text: String,
    pub offset: PopupOffset,
}

/// Handle to a rendered per-feature symbol layer.
pub trait SymbolLayer {
    /// Narrow the rendered set to features for which `keep` is true.
    /// Excluded features are removed from the layer, not restyled.
    fn set_filter(&mut self, keep: &dyn Fn(&Feature) -> bool);

    fn set_radius(&mut self, id: FeatureId, radius: f64);

    fn bind_popup(&mut self, id: FeatureId, text: String, offset: PopupOffset);
}

// ============================================================================
// CONTROLS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Control {
    Slider {
        min: usize,
        max: usize,
        step: usize,
        value: usize,
    },
    SliderLabel {
        text: String,
    },
    Legend(Legend),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlHandle(pub usize);

/// A map that can host a symbol layer and controls.
pub trait MapSurface {
    type Layer: SymbolLayer;

    /// Build one symbol per feature. The returned layer is the only handle to
    /// it; callers thread it into whatever re-renders the symbols.
    fn add_symbol_layer(
        &mut self,
        features: Arc<FeatureCollection>,
        factory: &dyn Fn(&Feature) -> Symbol,
    ) -> Self::Layer;

    fn add_control(&mut self, position: ControlPosition, control: Control) -> ControlHandle;

    fn update_control(&mut self, handle: ControlHandle, control: Control);
}

// ============================================================================
// IN-MEMORY SCENE
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SceneSymbol {
    pub symbol: Symbol,
    pub visible: bool,
    pub popup: Option<Popup>,
}

/// Symbol layer that keeps everything in memory.
#[derive(Debug, Clone)]
pub struct SceneLayer {
    features: Arc<FeatureCollection>,
    symbols: Vec<SceneSymbol>,
}

impl SceneLayer {
    pub fn symbols(&self) -> &[SceneSymbol] {
        &self.symbols
    }

    pub fn symbol(&self, id: FeatureId) -> Option<&SceneSymbol> {
        self.symbols.get(id.0)
    }

    /// Symbols currently in the rendered set.
    pub fn visible(&self) -> impl Iterator<Item = &SceneSymbol> {
        self.symbols.iter().filter(|s| s.visible)
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }

    pub fn features(&self) -> &FeatureCollection {
        &self.features
    }
}

impl SymbolLayer for SceneLayer {
    fn set_filter(&mut self, keep: &dyn Fn(&Feature) -> bool) {
        for (feature, symbol) in self.features.iter().zip(self.symbols.iter_mut()) {
            symbol.visible = keep(feature);
        }
    }

    fn set_radius(&mut self, id: FeatureId, radius: f64) {
        if let Some(s) = self.symbols.get_mut(id.0) {
            s.symbol.radius = radius;
        }
    }

    fn bind_popup(&mut self, id: FeatureId, text: String, offset: PopupOffset) {
        if let Some(s) = self.symbols.get_mut(id.0) {
            s.popup = Some(Popup { text, offset });
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MountedControl {
    pub handle: ControlHandle,
    pub position: ControlPosition,
    pub control: Control,
}

/// In-memory map surface.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    controls: Vec<MountedControl>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn controls(&self) -> &[MountedControl] {
        &self.controls
    }

    pub fn control(&self, handle: ControlHandle) -> Option<&Control> {
        self.controls
            .iter()
            .find(|c| c.handle == handle)
            .map(|c| &c.control)
    }
}

impl MapSurface for Scene {
    type Layer = SceneLayer;

    fn add_symbol_layer(
        &mut self,
        features: Arc<FeatureCollection>,
        factory: &dyn Fn(&Feature) -> Symbol,
    ) -> SceneLayer {
        let symbols = features
            .iter()
            .map(|f| SceneSymbol {
                symbol: factory(f),
                visible: true,
                popup: None,
            })
            .collect();

        SceneLayer { features, symbols }
    }

    fn add_control(&mut self, position: ControlPosition, control: Control) -> ControlHandle {
        let handle = ControlHandle(self.controls.len());
        self.controls.push(MountedControl {
            handle,
            position,
            control,
        });
        handle
    }

    fn update_control(&mut self, handle: ControlHandle, control: Control) {
        if let Some(mounted) = self.controls.iter_mut().find(|c| c.handle == handle) {
            mounted.control = control;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn collection() -> Arc<FeatureCollection> {
        let make = |id: usize, name: &str| {
            let mut props = Map::new();
            props.insert("province".to_string(), Value::from(name));
            props.insert("2000".to_string(), json!(id * 100));
            Feature::new(FeatureId(id), Position { lon: id as f64, lat: 0.0 }, props)
        };
        Arc::new(FeatureCollection::new(vec![make(0, "A"), make(1, "B"), make(2, "C")]))
    }

    fn layer() -> SceneLayer {
        Scene::new().add_symbol_layer(collection(), &|f| Symbol {
            feature: f.id(),
            position: f.position(),
            radius: 3.0,
            style: SymbolStyle::default(),
        })
    }

    #[test]
    fn test_factory_builds_one_symbol_per_feature() {
        let layer = layer();
        assert_eq!(layer.symbols().len(), 3);
        assert_eq!(layer.visible_count(), 3);
        assert_eq!(layer.symbol(FeatureId(1)).unwrap().symbol.position.lon, 1.0);
    }

    #[test]
    fn test_set_filter_excludes_features() {
        let mut layer = layer();
        layer.set_filter(&|f| f.province() != "B");

        let visible: Vec<FeatureId> = layer.visible().map(|s| s.symbol.feature).collect();
        assert_eq!(visible, vec![FeatureId(0), FeatureId(2)]);

        layer.set_filter(&|_| true);
        assert_eq!(layer.visible_count(), 3);
    }

    #[test]
    fn test_symbol_mutators() {
        let mut layer = layer();
        layer.set_radius(FeatureId(2), 9.5);
        layer.bind_popup(FeatureId(2), "hello".to_string(), PopupOffset::above(9.5));
        layer.set_radius(FeatureId(42), 1.0);

        let s = layer.symbol(FeatureId(2)).unwrap();
        assert_eq!(s.symbol.radius, 9.5);
        let popup = s.popup.as_ref().unwrap();
        assert_eq!(popup.text, "hello");
        assert_eq!(popup.offset, PopupOffset { x: 0.0, y: -9.5 });
    }

    #[test]
    fn test_controls_mount_and_update() {
        let mut scene = Scene::new();
        let label = scene.add_control(
            ControlPosition::TopRight,
            Control::SliderLabel { text: "2000".to_string() },
        );
        scene.update_control(label, Control::SliderLabel { text: "2005".to_string() });

        assert_eq!(scene.controls().len(), 1);
        assert_eq!(
            scene.control(label),
            Some(&Control::SliderLabel { text: "2005".to_string() })
        );
    }
}
