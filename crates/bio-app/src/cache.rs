//! In-memory budget cache.

use std::collections::BTreeMap;

use bio_results::LoadedTerms;
use ndarray::Array3;

/// Loaded budget terms, all from one time index.
///
/// Merging terms from a different time index clears the cache first, so entries from two
/// time indices are never held together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetCache {
    entries: BTreeMap<String, Array3<f64>>,
    tidx: Option<u32>,
    n: Option<u32>,
}

impl BudgetCache {
    pub fn new(tidx: Option<u32>, n: Option<u32>) -> Self {
        Self {
            entries: BTreeMap::new(),
            tidx,
            n,
        }
    }

    pub fn tidx(&self) -> Option<u32> {
        self.tidx
    }

    pub fn n(&self) -> Option<u32> {
        self.n
    }

    pub fn get(&self, name: &str) -> Option<&Array3<f64>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Array3<f64>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the cache and retags it; returns the names that were cleared.
    pub fn reset(&mut self, tidx: Option<u32>, n: Option<u32>) -> Vec<String> {
        let cleared = self.names();
        self.entries.clear();
        self.tidx = tidx;
        self.n = n;
        cleared
    }

    /// Moves the cache to `tidx`, dropping every entry if that changes the time index.
    pub fn switch_tidx(&mut self, tidx: Option<u32>) -> Vec<String> {
        if self.tidx == tidx {
            return Vec::new();
        }
        let cleared = self.reset(tidx, None);
        if !cleared.is_empty() {
            tracing::debug!(?tidx, cleared = ?cleared, "time index changed, budget cache cleared");
        }
        cleared
    }

    /// Inserts a whole backend load. Returns the names inserted.
    pub fn merge(&mut self, loaded: LoadedTerms) -> Vec<String> {
        self.switch_tidx(loaded.tidx);
        if loaded.n.is_some() {
            self.n = loaded.n;
        }
        let names: Vec<String> = loaded.arrays.keys().cloned().collect();
        self.entries.extend(loaded.arrays);
        names
    }

    /// Inserts one derived term at the current time index.
    pub fn insert(&mut self, name: impl Into<String>, arr: Array3<f64>) {
        self.entries.insert(name.into(), arr);
    }
}
