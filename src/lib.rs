// Province Timeline - Core Library
// Proportional-symbol GDP map: year slider + value-range filters.
// Exposes all modules for use in the TUI, the API server, and tests.

pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod legend;
pub mod render;
pub mod scale;
pub mod schema;
pub mod session;
pub mod symbols;
pub mod timeline;

// Re-export commonly used types
pub use cli::SessionOpts;
pub use config::{MapBounds, VizConfig};
pub use dataset::{
    load_dataset, parse_csv, parse_geojson,
    Feature, FeatureCollection, FeatureId, LoadReport, Position, YearKey,
};
pub use error::{ConfigError, DatasetLoadError, InvalidRadiusInput, SchemaExtractionError, SessionError};
pub use filter::{FilterCategory, FilterPredicateSet, UnknownFilterCategory};
pub use legend::{build_legend, Legend, LegendAnchor, LegendEntry};
pub use render::{
    Control, ControlHandle, ControlPosition, MapSurface, Popup, PopupOffset,
    Scene, SceneLayer, SceneSymbol, Symbol, SymbolLayer, SymbolStyle,
};
pub use scale::{radius, RadiusScaler, MIN_RADIUS};
pub use schema::{extract_year_keys, year_keys_for, ContainsMarker, YearKeyPredicate};
pub use session::{Session, SessionEvent};
pub use symbols::{compute_states, HiddenReason, SymbolState, SymbolStateController};
pub use timeline::{TimeSequenceController, ViewState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
