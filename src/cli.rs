// 🧭 Command-line options shared by the terminal binary and the API server

use crate::config::{VizConfig, DEFAULT_DATASET};
use crate::filter::{DEFAULT_BAD_ABOVE, DEFAULT_GOOD_BELOW};
use crate::scale::DEFAULT_SCALE_FACTOR;
use crate::schema::DEFAULT_YEAR_MARKER;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct SessionOpts {
    /// GeoJSON (or .csv) dataset
    #[arg(long, global = true, default_value = DEFAULT_DATASET)]
    pub data: PathBuf,

    #[arg(long, global = true, default_value_t = DEFAULT_SCALE_FACTOR)]
    pub scale_factor: f64,

    /// Values below this are "good"
    #[arg(long, global = true, default_value_t = DEFAULT_GOOD_BELOW)]
    pub good_below: f64,

    /// Values above this are "bad"
    #[arg(long, global = true, default_value_t = DEFAULT_BAD_ABOVE)]
    pub bad_above: f64,

    /// Attribute names containing this are year columns
    #[arg(long, global = true, default_value = DEFAULT_YEAR_MARKER)]
    pub year_marker: String,
}

impl SessionOpts {
    pub fn config(&self) -> VizConfig {
        VizConfig {
            dataset: self.data.clone(),
            scale_factor: self.scale_factor,
            good_below: self.good_below,
            bad_above: self.bad_above,
            year_marker: self.year_marker.clone(),
            ..Default::default()
        }
    }
}
