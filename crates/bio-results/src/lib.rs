//! bio-results: on-disk budget storage.
//!
//! Three interchangeable backends share the [`BudgetSource`] contract:
//! the solver's raw output directory, and two single-snapshot archives
//! (NumPy `.npz` and MAT-file level 5).

pub mod archive;
pub mod array;
pub mod index;
pub mod mat;
pub mod naming;
pub mod npz;
pub mod raw;
pub mod store;
pub mod types;

pub use archive::{ArchiveSource, write_archive};
pub use array::ElementOrder;
pub use naming::{PlaneAxis, RunFiles, TurbineProperty};
pub use raw::{FIELD_TAGS, RawSource, field_tag};
pub use store::{BackendKind, BudgetSource, LoadedTerms};
pub use types::*;

use bio_core::CoreError;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid file pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("No {what} found in {dir}")]
    DatasetNotFound { dir: String, what: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Size mismatch in {path}: expected {expected} values, found {actual}")]
    Size {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("NPZ read error: {0}")]
    NpzRead(#[from] ndarray_npy::ReadNpzError),

    #[error("NPZ write error: {0}")]
    NpzWrite(#[from] ndarray_npy::WriteNpzError),

    #[error("MAT-file error in {path}: {message}")]
    Mat { path: String, message: String },

    #[error("Destination already exists: {path}")]
    DestinationExists { path: String },

    #[error("{what} is not supported by the {backend} backend")]
    Unsupported {
        backend: BackendKind,
        what: &'static str,
    },
}
