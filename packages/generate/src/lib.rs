#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Synthetic dataset generation for the street lights maintenance demo.
//!
//! A run is a fixed sequence of [`Stage`]s driven by a [`PipelineContext`]:
//! neighborhoods are laid out over the city region, street lights are
//! sampled inside them, suppliers are scattered across the region,
//! maintenance history and enrichment tables are derived from the lights,
//! and the whole dataset is validated before a single file is written.
//!
//! Every random draw goes through the context's one seeded RNG, so a run
//! with an explicit seed and reference time is byte-for-byte repeatable.
//! Output files are staged and only renamed into place once every table of
//! the run has been written successfully.

pub mod config;
pub mod context;
pub mod enrichment;
pub mod export;
pub mod load;
pub mod maintenance;
pub mod neighborhoods;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod street_lights;
pub mod summary;
pub mod suppliers;
pub mod templates;
pub mod validate;

use std::path::{Path, PathBuf};

use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use config::GeneratorConfig;
pub use context::PipelineContext;

/// Timestamp format used in every CSV column holding a date and time.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date format used in every CSV column holding a calendar date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A step of the generation pipeline, used to report where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Configuration,
    Neighborhoods,
    StreetLights,
    Suppliers,
    Maintenance,
    Enrichment,
    Validation,
    Export,
}

/// Errors that can occur while generating or exporting a dataset.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The configuration was rejected before generation started.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A generated record broke a dataset invariant.
    #[error("Invariant violated in {stage}: {message}")]
    Invariant {
        /// Stage that produced or checked the record.
        stage: Stage,
        /// Which record and which rule.
        message: String,
    },

    /// A geometric operation failed.
    #[error("Spatial error in {stage}: {source}")]
    Spatial {
        /// Stage that requested the geometry.
        stage: Stage,
        /// Underlying failure.
        source: streetlights_spatial::SpatialError,
    },

    /// A stage failed; wraps the underlying error with the stage name.
    #[error("Stage {stage} failed: {source}")]
    StageFailed {
        /// The failing stage.
        stage: Stage,
        /// Underlying failure.
        source: Box<Self>,
    },

    /// An upstream input file needed by a single-stage run is missing.
    #[error("Missing input {}: run the upstream stage first", path.display())]
    MissingInput {
        /// Expected file location.
        path: PathBuf,
    },

    /// A value read back from CSV could not be converted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A TOML profile could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GenerateError {
    /// Shorthand for an [`GenerateError::Invariant`] error.
    pub fn invariant(stage: Stage, message: impl Into<String>) -> Self {
        Self::Invariant {
            stage,
            message: message.into(),
        }
    }

    /// The stage the error is attributed to, if any.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Invariant { stage, .. }
            | Self::Spatial { stage, .. }
            | Self::StageFailed { stage, .. } => Some(*stage),
            Self::Config(_) => Some(Stage::Configuration),
            _ => None,
        }
    }
}

/// Returns the default output directory (`data/` at the workspace root).
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR` so the location does
/// not depend on the caller's working directory. Falls back to a relative
/// `data/` if the workspace root cannot be determined.
#[must_use]
pub fn default_output_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("data"), |root| root.join("data"))
}
