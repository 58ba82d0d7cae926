//! Backend contract shared by the raw directory and the archive formats.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ndarray::Array3;

use crate::ResultsResult;
use crate::types::ArchiveFormat;

/// The active storage backend of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Raw,
    Archive(ArchiveFormat),
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::Archive(format) => write!(f, "{format} archive"),
        }
    }
}

/// Outcome of one backend load. Terms either arrive whole in `arrays`, are listed in
/// `missing` when nothing is stored for them, or in `unreadable` when a stored dump failed
/// to read; a truncated array is never returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedTerms {
    pub tidx: Option<u32>,
    pub n: Option<u32>,
    pub arrays: BTreeMap<String, Array3<f64>>,
    pub missing: Vec<String>,
    pub unreadable: Vec<String>,
}

pub trait BudgetSource {
    fn kind(&self) -> BackendKind;

    /// Budget ids with stored data, sorted. Includes the wake budget whenever the mean budget
    /// is present.
    fn existing_budgets(&self) -> ResultsResult<Vec<u8>>;

    /// Term names available in `budgets`, or in every existing budget when `None`.
    fn existing_terms(&self, budgets: Option<&[u8]>, include_wakes: bool) -> ResultsResult<Vec<String>>;

    /// Time indices holding budget dumps; `None` when the backend holds a single snapshot.
    fn budget_tidxs(&self) -> ResultsResult<Option<Vec<u32>>>;

    /// Materializes `names` at `tidx`, each shaped `dims`.
    fn load(&self, names: &[String], tidx: Option<u32>, dims: [usize; 3]) -> ResultsResult<LoadedTerms>;
}

/// Adds the wake budget when the mean budget is present; warns when nothing was found.
pub(crate) fn finish_budget_list(mut found: BTreeSet<u8>) -> Vec<u8> {
    if found.is_empty() {
        tracing::warn!("no budget data found");
    }
    if found.contains(&bio_core::budget::MEAN) {
        found.insert(bio_core::budget::WAKE);
    }
    found.into_iter().collect()
}
