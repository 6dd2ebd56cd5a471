// ⚠️ Error Kinds
// Fatal errors stop session startup; local ones are absorbed per feature.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// FATAL AT STARTUP
// ============================================================================

/// The dataset could not be read or is not a usable feature collection.
#[derive(Debug, Error)]
pub enum DatasetLoadError {
    #[error("failed to read dataset {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset is not valid GeoJSON")]
    Json(#[from] serde_json::Error),

    #[error("dataset is not valid CSV")]
    Csv(#[from] csv::Error),

    #[error("feature #{index}: {reason}")]
    MalformedFeature { index: usize, reason: String },

    #[error("dataset contains no features")]
    Empty,
}

/// No YearKey could be derived from the sample feature.
#[derive(Debug, Error)]
#[error("no year attribute found on sample feature {sample:?} (marker {marker:?})")]
pub struct SchemaExtractionError {
    pub sample: String,
    pub marker: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("scale factor must be positive and finite, got {0}")]
    ScaleFactor(f64),

    #[error("good threshold {good_below} is above bad threshold {bad_above}; categories would overlap")]
    OverlappingThresholds { good_below: f64, bad_above: f64 },

    #[error("year marker must not be empty")]
    EmptyYearMarker,

    #[error("legend needs at least one anchor")]
    NoLegendAnchors,
}

/// Anything that prevents a session from starting.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    DatasetLoad(#[from] DatasetLoadError),

    #[error(transparent)]
    SchemaExtraction(#[from] SchemaExtractionError),
}

// ============================================================================
// LOCAL (NON-FATAL)
// ============================================================================

/// Value handed to the radius scaler that has no real square root.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid radius input {0}")]
pub struct InvalidRadiusInput(pub f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_wraps_schema_error() {
        let err: SessionError = SchemaExtractionError {
            sample: "Beijing".to_string(),
            marker: "20".to_string(),
        }
        .into();

        assert!(matches!(err, SessionError::SchemaExtraction(_)));
        assert!(err.to_string().contains("Beijing"));
    }

    #[test]
    fn test_malformed_feature_message() {
        let err = DatasetLoadError::MalformedFeature {
            index: 3,
            reason: "geometry is not a Point".to_string(),
        };
        assert_eq!(err.to_string(), "feature #3: geometry is not a Point");
    }
}
