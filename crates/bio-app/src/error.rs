//! Error types for the bio-app session layer.

use std::path::PathBuf;

use bio_core::CoreError;
use bio_project::ProjectError;
use bio_results::{BackendKind, ResultsError};

/// Fatal conditions. Advisory outcomes (missing terms, substituted time indices) are
/// reported through [`crate::ReadReport`] instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No configuration file (*.dat) found in {dir}")]
    NoConfig { dir: PathBuf },

    #[error("No run id found in the configuration; pass one explicitly")]
    NoRunId,

    #[error("No budgets associated with this session")]
    NoBudgets,

    #[error("No field dumps associated with this session")]
    NoFields,

    #[error("{what} requires the raw backend, session uses {backend}")]
    Unsupported {
        backend: BackendKind,
        what: &'static str,
    },

    #[error("Turbine series not stored: {key}")]
    SeriesNotFound { key: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Project(ProjectError),

    #[error("Storage error: {0}")]
    Results(ResultsError),

    #[error(transparent)]
    Core(CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bio-app operations.
pub type AppResult<T> = Result<T, AppError>;

// Conversions from backend error types
impl From<ProjectError> for AppError {
    fn from(err: ProjectError) -> Self {
        AppError::Project(err)
    }
}

impl From<ResultsError> for AppError {
    fn from(err: ResultsError) -> Self {
        AppError::Results(err)
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Core(err)
    }
}

impl AppError {
    /// True when an archive write was refused because the destination exists.
    pub fn is_destination_exists(&self) -> bool {
        matches!(self, AppError::Results(ResultsError::DestinationExists { .. }))
    }

    /// True when the directory does not hold the requested dataset at all.
    pub fn is_dataset_not_found(&self) -> bool {
        matches!(self, AppError::Results(ResultsError::DatasetNotFound { .. }))
    }
}
