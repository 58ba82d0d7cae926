//! The solver's own output directory: one flat binary file per term and time index.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use bio_core::{KeyRegistry, TermKey, budget};
use ndarray::{Array2, Array3, Dim};
use regex::Regex;

use crate::array::{self, ElementOrder};
use crate::index;
use crate::naming::{PlaneAxis, RunFiles, TurbineProperty};
use crate::store::{BackendKind, BudgetSource, LoadedTerms, finish_budget_list};
use crate::{ResultsError, ResultsResult};

/// Instantaneous field names and the tags used in their file names.
pub const FIELD_TAGS: [(&str, &str); 8] = [
    ("u", "uVel"),
    ("v", "vVel"),
    ("w", "wVel"),
    ("p", "prss"),
    ("T", "potT"),
    ("pfrn", "pfrn"),
    ("pdns", "pdns"),
    ("ptrb", "ptrb"),
];

pub fn field_tag(name: &str) -> Option<&'static str> {
    FIELD_TAGS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, tag)| *tag)
}

#[derive(Clone, Debug)]
pub struct RawSource {
    files: RunFiles,
}

impl RawSource {
    pub fn new(dir: impl Into<PathBuf>, run_id: u32) -> Self {
        Self {
            files: RunFiles::new(dir, run_id),
        }
    }

    pub fn files(&self) -> &RunFiles {
        &self.files
    }

    pub fn dir(&self) -> &Path {
        self.files.dir()
    }

    fn file_names(&self) -> ResultsResult<Vec<String>> {
        index::list_file_names(self.dir())
    }

    pub fn field_tidxs(&self) -> ResultsResult<Vec<u32>> {
        index::scan(self.dir(), &self.files.field_tidx_pattern(), "field dumps")
    }

    pub fn budget_tidx_list(&self) -> ResultsResult<Vec<u32>> {
        index::scan(self.dir(), &self.files.budget_tidx_pattern(), "budget dumps")
    }

    pub fn sample_counts(&self) -> ResultsResult<Vec<u32>> {
        index::scan(self.dir(), &self.files.sample_count_pattern(), "budget sample counts")
    }

    pub fn last_budget_n(&self) -> ResultsResult<u32> {
        last(self.sample_counts()?, self.dir(), "budget sample counts")
    }

    pub fn turbine_tidxs(&self) -> ResultsResult<Vec<u32>> {
        index::scan(self.dir(), &self.files.turbine_tidx_pattern(), "turbine power dumps")
    }

    /// Values of the info record; the first is the simulation time.
    pub fn read_info(&self, tidx: u32) -> ResultsResult<Vec<f64>> {
        array::read_text_values(&self.files.info(tidx))
    }

    pub fn sim_time(&self, tidx: u32) -> ResultsResult<f64> {
        let path = self.files.info(tidx);
        self.read_info(tidx)?
            .first()
            .copied()
            .ok_or_else(|| ResultsError::Parse {
                path: path.display().to_string(),
                message: "empty info record".to_string(),
            })
    }

    /// Reads one instantaneous field by its short name (`u`, `v`, `T`, ...).
    pub fn read_field(&self, name: &str, tidx: u32, dims: [usize; 3]) -> ResultsResult<Array3<f64>> {
        let tag = field_tag(name).ok_or_else(|| ResultsError::DatasetNotFound {
            dir: self.dir().display().to_string(),
            what: format!("field {name:?}"),
        })?;
        let path = self.files.field(tag, tidx);
        tracing::debug!(path = %path.display(), "reading field");
        array::read_array3(&path, dims, ElementOrder::Fortran)
    }

    /// Reads one planar dump, shaped over the two axes other than `axis`.
    pub fn read_plane(
        &self,
        axis: PlaneAxis,
        index: usize,
        tidx: u32,
        label: &str,
        dims: [usize; 2],
    ) -> ResultsResult<Array2<f64>> {
        let path = self.files.plane(axis, index, tidx, label);
        tracing::debug!(path = %path.display(), "reading plane");
        let data = array::read_f64_file(&path)?;
        array::reshape_flat(data, Dim(dims), ElementOrder::Fortran, &path)
    }

    /// One turbine text file; a single value comes back as a one-element series.
    pub fn read_turbine_file(
        &self,
        prop: TurbineProperty,
        tidx: u32,
        turbine: usize,
    ) -> ResultsResult<Vec<f64>> {
        let path = self.files.turbine(prop, tidx, turbine);
        tracing::debug!(path = %path.display(), "reading turbine series");
        array::read_text_values(&path)
    }

    /// Every budget dump at `tidx` with its sample count, keyed by term. The largest count
    /// wins if a term was dumped more than once at the same time index.
    fn budget_files_at(&self, names: &[String], tidx: u32) -> ResultsResult<BTreeMap<TermKey, (PathBuf, u32)>> {
        let re = Regex::new(&self.files.budget_lookup_pattern(tidx))?;
        let mut found: BTreeMap<TermKey, (PathBuf, u32)> = BTreeMap::new();
        for name in names {
            let Some(caps) = re.captures(name) else {
                continue;
            };
            let (Ok(b), Ok(term), Ok(n)) = (caps[1].parse::<u8>(), caps[2].parse::<u8>(), caps[3].parse::<u32>())
            else {
                continue;
            };
            let key = TermKey::new(b, term);
            if found.get(&key).is_none_or(|(_, m)| n > *m) {
                found.insert(key, (self.dir().join(name), n));
            }
        }
        Ok(found)
    }

    fn term_ids(&self, names: &[String], budget: u8) -> ResultsResult<BTreeSet<u32>> {
        index::captures(names, &self.files.term_id_pattern(budget))
    }
}

fn last(values: Vec<u32>, dir: &Path, what: &str) -> ResultsResult<u32> {
    values
        .last()
        .copied()
        .ok_or_else(|| ResultsError::DatasetNotFound {
            dir: dir.display().to_string(),
            what: what.to_string(),
        })
}

impl BudgetSource for RawSource {
    fn kind(&self) -> BackendKind {
        BackendKind::Raw
    }

    fn existing_budgets(&self) -> ResultsResult<Vec<u8>> {
        let names = self.file_names()?;
        let found = index::captures(&names, &self.files.budget_id_pattern())?
            .into_iter()
            .filter_map(|b| u8::try_from(b).ok())
            .collect();
        Ok(finish_budget_list(found))
    }

    fn existing_terms(&self, budgets: Option<&[u8]>, include_wakes: bool) -> ResultsResult<Vec<String>> {
        let budget_list = match budgets {
            Some(list) => list.to_vec(),
            None => self.existing_budgets()?,
        };
        let names = self.file_names()?;
        let mut keys = BTreeSet::new();
        for &b in &budget_list {
            for term in self.term_ids(&names, b)? {
                if let Ok(term) = u8::try_from(term) {
                    keys.insert(TermKey::new(b, term));
                }
            }
            // wake terms are derived from the mean velocities of budget 0
            if include_wakes && b == budget::WAKE {
                let mean_terms = self.term_ids(&names, budget::MEAN)?;
                for term in 1..=3u8 {
                    if mean_terms.contains(&u32::from(term)) {
                        keys.insert(TermKey::new(budget::WAKE, term));
                    }
                }
            }
        }

        let registry = KeyRegistry::global();
        let terms: Vec<String> = keys
            .into_iter()
            .filter_map(|key| match registry.resolve_inverse(key) {
                Ok(name) => Some(name.to_string()),
                Err(_) => {
                    tracing::debug!(%key, "ignoring dump with unregistered key");
                    None
                }
            })
            .collect();
        if terms.is_empty() {
            tracing::warn!(budgets = ?budget_list, "no terms found");
        }
        Ok(terms)
    }

    fn budget_tidxs(&self) -> ResultsResult<Option<Vec<u32>>> {
        self.budget_tidx_list().map(Some)
    }

    fn load(&self, names: &[String], tidx: Option<u32>, dims: [usize; 3]) -> ResultsResult<LoadedTerms> {
        let tidx = match tidx {
            Some(t) => t,
            None => last(self.budget_tidx_list()?, self.dir(), "budget dumps")?,
        };
        let dumps = self.budget_files_at(&self.file_names()?, tidx)?;
        let registry = KeyRegistry::global();
        let mut loaded = LoadedTerms {
            tidx: Some(tidx),
            ..LoadedTerms::default()
        };

        for name in names {
            let Ok(key) = registry.resolve(name) else {
                loaded.missing.push(name.clone());
                continue;
            };
            let Some((path, n)) = dumps.get(&key).cloned() else {
                tracing::debug!(term = %name, tidx, "no dump for term");
                loaded.missing.push(name.clone());
                continue;
            };
            tracing::debug!(path = %path.display(), "reading budget term");
            match array::read_array3(&path, dims, ElementOrder::Fortran) {
                Ok(arr) => {
                    loaded.arrays.insert(name.clone(), arr);
                    loaded.n = Some(loaded.n.map_or(n, |m| m.max(n)));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read budget term");
                    loaded.unreadable.push(name.clone());
                }
            }
        }
        Ok(loaded)
    }
}
