// 🗺️ Dataset - Province feature collection
// Loaded once per session, read-only afterwards.
//
// Two sources are accepted:
// 1. GeoJSON FeatureCollection with Point geometry (the canonical form)
// 2. CSV with `province,lon,lat,<year columns...>`

use crate::error::DatasetLoadError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Property that carries the province name.
pub const PROVINCE_PROPERTY: &str = "province";

// ============================================================================
// CORE TYPES
// ============================================================================

/// Position of a feature inside its collection. Stable for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub usize);

/// Name of one year column, e.g. `"2005"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct YearKey(String);

impl YearKey {
    pub fn new(key: impl Into<String>) -> Self {
        YearKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for YearKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for YearKey {
    fn from(s: &str) -> Self {
        YearKey::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

/// One province: a point plus its ordered attribute table.
#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    id: FeatureId,
    province: String,
    position: Position,
    /// Attributes in source order (year columns included)
    properties: Map<String, Value>,
}

impl Feature {
    pub fn new(id: FeatureId, position: Position, properties: Map<String, Value>) -> Self {
        let province = match properties.get(PROVINCE_PROPERTY) {
            Some(Value::String(name)) => name.clone(),
            Some(other) => other.to_string(),
            None => String::from("(unnamed)"),
        };

        Feature {
            id,
            province,
            position,
            properties,
        }
    }

    pub fn id(&self) -> FeatureId {
        self.id
    }

    pub fn province(&self) -> &str {
        &self.province
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Attribute names in their definition order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Numeric value of a year column. Numeric strings are coerced;
    /// anything else counts as missing.
    pub fn value_at(&self, year: &YearKey) -> Option<f64> {
        match self.properties.get(year.as_str())? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

/// Ordered, immutable set of features.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureCollection {
    features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn first(&self) -> Option<&Feature> {
        self.features.first()
    }

    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(id.0)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

// ============================================================================
// LOAD REPORT
// ============================================================================

/// What was loaded, from where, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadReport {
    pub source: PathBuf,
    pub feature_count: usize,
    /// SHA-256 of the raw dataset bytes (hex)
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
}

fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// GEOJSON
// ============================================================================

#[derive(Deserialize)]
struct RawCollection {
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    geometry: Option<RawGeometry>,
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

fn point_position(index: usize, geometry: Option<RawGeometry>) -> Result<Position, DatasetLoadError> {
    let malformed = |reason: &str| DatasetLoadError::MalformedFeature {
        index,
        reason: reason.to_string(),
    };

    let geometry = geometry.ok_or_else(|| malformed("missing geometry"))?;
    if geometry.kind != "Point" {
        return Err(malformed(&format!("geometry is {}, expected Point", geometry.kind)));
    }

    let coords = geometry
        .coordinates
        .as_array()
        .ok_or_else(|| malformed("Point coordinates are not an array"))?;

    match (coords.first().and_then(Value::as_f64), coords.get(1).and_then(Value::as_f64)) {
        (Some(lon), Some(lat)) => Ok(Position { lon, lat }),
        _ => Err(malformed("Point coordinates need numeric [lon, lat]")),
    }
}

/// Parse a GeoJSON FeatureCollection. Property order is preserved.
/// Input that is not valid UTF-8 is a JSON error.
pub fn parse_geojson(input: impl AsRef<[u8]>) -> Result<FeatureCollection, DatasetLoadError> {
    let raw: RawCollection = serde_json::from_slice(input.as_ref())?;

    if raw.features.is_empty() {
        return Err(DatasetLoadError::Empty);
    }

    let features = raw
        .features
        .into_iter()
        .enumerate()
        .map(|(index, f)| {
            let position = point_position(index, f.geometry)?;
            Ok(Feature::new(FeatureId(index), position, f.properties.unwrap_or_default()))
        })
        .collect::<Result<Vec<_>, DatasetLoadError>>()?;

    Ok(FeatureCollection::new(features))
}

// ============================================================================
// CSV
// ============================================================================

fn csv_cell(raw: &str) -> Value {
    let raw = raw.trim();
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(raw.to_string()),
    }
}

/// Parse the tabular form: one row per province, coordinates in `lon`/`lat`.
pub fn parse_csv(bytes: &[u8]) -> Result<FeatureCollection, DatasetLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let (lon_col, lat_col) = match (column("lon"), column("lat")) {
        (Some(lon), Some(lat)) => (lon, lat),
        _ => {
            return Err(DatasetLoadError::MalformedFeature {
                index: 0,
                reason: "CSV header needs lon and lat columns".to_string(),
            })
        }
    };

    let mut features = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let coord = |col: usize| record.get(col).and_then(|c| c.trim().parse::<f64>().ok());
        let position = match (coord(lon_col), coord(lat_col)) {
            (Some(lon), Some(lat)) => Position { lon, lat },
            _ => {
                return Err(DatasetLoadError::MalformedFeature {
                    index,
                    reason: "lon/lat are not numeric".to_string(),
                })
            }
        };

        let mut properties = Map::new();
        for (col, name) in headers.iter().enumerate() {
            if col == lon_col || col == lat_col {
                continue;
            }
            let cell = record.get(col).unwrap_or("");
            let value = if name == PROVINCE_PROPERTY {
                Value::String(cell.to_string())
            } else if cell.is_empty() {
                Value::Null
            } else {
                csv_cell(cell)
            };
            properties.insert(name.to_string(), value);
        }

        features.push(Feature::new(FeatureId(index), position, properties));
    }

    if features.is_empty() {
        return Err(DatasetLoadError::Empty);
    }

    Ok(FeatureCollection::new(features))
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Load a dataset from disk. `.csv` files use the tabular parser, everything
/// else is read as GeoJSON.
pub fn load_dataset(path: &Path) -> Result<(FeatureCollection, LoadReport), DatasetLoadError> {
    let bytes = fs::read(path).map_err(|source| DatasetLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let collection = if is_csv {
        parse_csv(&bytes)?
    } else {
        parse_geojson(&bytes)?
    };

    let report = LoadReport {
        source: path.to_path_buf(),
        feature_count: collection.len(),
        fingerprint: fingerprint(&bytes),
        loaded_at: Utc::now(),
    };

    info!(
        source = %report.source.display(),
        features = report.feature_count,
        fingerprint = %&report.fingerprint[..12],
        "dataset loaded"
    );

    Ok((collection, report))
}

// ============================================================================
// TESTS
// ============================================================================
