//! Consolidated single-snapshot archives: `<stem>_budgets.<ext>` plus `<stem>_metadata.json`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use bio_core::KeyRegistry;
use ndarray::ArrayD;

use crate::array::to_grid_shape;
use crate::store::{BackendKind, BudgetSource, LoadedTerms, finish_budget_list};
use crate::types::{ArchiveFormat, ArchiveMetadata};
use crate::{ResultsError, ResultsResult, mat, npz};

pub fn budgets_path(dir: &Path, stem: &str, format: ArchiveFormat) -> PathBuf {
    dir.join(format!("{stem}_budgets.{}", format.extension()))
}

pub fn metadata_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}_metadata.json"))
}

#[derive(Clone, Debug)]
pub struct ArchiveSource {
    dir: PathBuf,
    stem: String,
    format: ArchiveFormat,
}

impl ArchiveSource {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>, format: ArchiveFormat) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn set_stem(&mut self, stem: impl Into<String>) {
        self.stem = stem.into();
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    pub fn budgets_path(&self) -> PathBuf {
        budgets_path(&self.dir, &self.stem, self.format)
    }

    pub fn metadata_path(&self) -> PathBuf {
        metadata_path(&self.dir, &self.stem)
    }

    pub fn has_budgets(&self) -> bool {
        self.budgets_path().is_file()
    }

    pub fn read_metadata(&self) -> ResultsResult<ArchiveMetadata> {
        let path = self.metadata_path();
        if !path.is_file() {
            return Err(ResultsError::DatasetNotFound {
                dir: self.dir.display().to_string(),
                what: format!("archive metadata {}", path.display()),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Every array name in the data container, in storage order.
    pub fn stored_names(&self) -> ResultsResult<Vec<String>> {
        let path = self.budgets_path();
        match self.format {
            ArchiveFormat::Npz => npz::npz_names(&path),
            ArchiveFormat::Mat => mat::mat_names(&path),
        }
    }
}

impl BudgetSource for ArchiveSource {
    fn kind(&self) -> BackendKind {
        BackendKind::Archive(self.format)
    }

    fn existing_budgets(&self) -> ResultsResult<Vec<u8>> {
        let registry = KeyRegistry::global();
        let found: BTreeSet<u8> = self
            .stored_names()?
            .iter()
            .filter_map(|name| registry.resolve(name).ok())
            .map(|key| key.budget)
            .collect();
        Ok(finish_budget_list(found))
    }

    /// Without a budget filter every stored name is returned as-is, registered or not and
    /// with no wake synthesis. With a filter, only registered names of those budgets are kept.
    fn existing_terms(&self, budgets: Option<&[u8]>, _include_wakes: bool) -> ResultsResult<Vec<String>> {
        let all = self.stored_names()?;
        let Some(budgets) = budgets else {
            return Ok(all);
        };
        let registry = KeyRegistry::global();
        let terms: Vec<String> = all
            .into_iter()
            .filter(|name| {
                registry
                    .resolve(name)
                    .is_ok_and(|key| budgets.contains(&key.budget))
            })
            .collect();
        if terms.is_empty() {
            tracing::warn!(budgets = ?budgets, "no terms found");
        }
        Ok(terms)
    }

    fn budget_tidxs(&self) -> ResultsResult<Option<Vec<u32>>> {
        Ok(None)
    }

    /// Archives hold a single snapshot, so `tidx` is ignored.
    fn load(&self, names: &[String], _tidx: Option<u32>, dims: [usize; 3]) -> ResultsResult<LoadedTerms> {
        let path = self.budgets_path();
        tracing::debug!(path = %path.display(), count = names.len(), "reading archive");
        let (raw, missing) = match self.format {
            ArchiveFormat::Npz => npz::read_npz(&path, names)?,
            ArchiveFormat::Mat => mat::read_mat(&path, names)?,
        };

        let mut arrays = BTreeMap::new();
        let mut unreadable = Vec::new();
        for (name, arr) in raw {
            match to_grid_shape(&arr, dims, &name) {
                Ok(full) => {
                    arrays.insert(name, full);
                }
                Err(e) => {
                    tracing::warn!(term = %name, error = %e, "stored array does not fit the grid");
                    unreadable.push(name);
                }
            }
        }
        Ok(LoadedTerms {
            tidx: None,
            n: None,
            arrays,
            missing,
            unreadable,
        })
    }
}

/// Writes `arrays` and `metadata` as one archive.
///
/// Refuses with [`ResultsError::DestinationExists`] when the data container is already
/// present and `overwrite` is false; nothing is written in that case. A failed metadata
/// write removes the container again.
pub fn write_archive(
    format: ArchiveFormat,
    dir: &Path,
    stem: &str,
    arrays: &BTreeMap<String, ArrayD<f64>>,
    metadata: &ArchiveMetadata,
    overwrite: bool,
) -> ResultsResult<PathBuf> {
    let path = budgets_path(dir, stem, format);
    if path.exists() {
        if !overwrite {
            return Err(ResultsError::DestinationExists {
                path: path.display().to_string(),
            });
        }
        tracing::warn!(path = %path.display(), "archive already exists, overwriting");
    }
    let meta_json = serde_json::to_string_pretty(metadata)?;
    fs::create_dir_all(dir)?;

    match format {
        ArchiveFormat::Npz => npz::write_npz(&path, arrays)?,
        ArchiveFormat::Mat => mat::write_mat(&path, arrays)?,
    }
    if let Err(e) = fs::write(metadata_path(dir, stem), meta_json) {
        // a container without its metadata cannot be reopened
        fs::remove_file(&path).ok();
        return Err(e.into());
    }

    tracing::info!(
        path = %path.display(),
        terms = ?arrays.keys().collect::<Vec<_>>(),
        "archive written"
    );
    Ok(path)
}
