//! Minimal actuator-disk turbine bookkeeping.
//!
//! Only what the data-access layer needs: positions for origin re-centering, a sort
//! key, and a serializable form for archive metadata.

use std::cmp::Ordering;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::namelist::ConfigParser;
use crate::{ProjectError, ProjectResult};

/// Turbine property used to order a [`TurbineArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    /// Streamwise location
    #[default]
    XLoc,
    YLoc,
    ZLoc,
    /// Order in which turbines were read
    Index,
}

impl FromStr for SortKey {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xloc" | "x" => Ok(SortKey::XLoc),
            "yloc" | "y" => Ok(SortKey::YLoc),
            "zloc" | "z" => Ok(SortKey::ZLoc),
            "n" | "index" => Ok(SortKey::Index),
            _ => Err(ProjectError::WrongType {
                key: s.to_string(),
                expected: "one of xloc, yloc, zloc, n",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turbine {
    /// 1-based index in read order
    pub n: usize,
    /// Parsed turbine input deck (actuator disk parameters)
    pub params: RunConfig,
}

impl Turbine {
    pub fn new(n: usize, params: RunConfig) -> Self {
        Self { n, params }
    }

    /// Hub position `(xloc, yloc, zloc)`; missing coordinates read as zero.
    pub fn pos(&self) -> [f64; 3] {
        ["xloc", "yloc", "zloc"].map(|k| self.params.search_f64(k).unwrap_or(0.0))
    }

    pub fn diameter(&self) -> Option<f64> {
        self.params.search_f64("diam")
    }

    pub fn thrust_coefficient(&self) -> Option<f64> {
        self.params.search_f64("ct")
    }

    pub fn yaw(&self) -> Option<f64> {
        self.params.search_f64("yaw")
    }

    pub fn sort_value(&self, key: SortKey) -> f64 {
        let [x, y, z] = self.pos();
        match key {
            SortKey::XLoc => x,
            SortKey::YLoc => y,
            SortKey::ZLoc => z,
            SortKey::Index => self.n as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbineArray {
    pub turb_dir: String,
    pub num_turbines: usize,
    pub adm_type: i64,
    pub sort_by: SortKey,
    pub turbines: Vec<Turbine>,
}

impl TurbineArray {
    /// Reads one turbine deck per file in `dir`, in file-name order.
    pub fn from_dir(
        dir: &Path,
        num_turbines: Option<usize>,
        adm_type: i64,
        parser: &dyn ConfigParser,
    ) -> ProjectResult<Self> {
        if !dir.is_dir() {
            return Err(ProjectError::TurbineDirNotFound {
                path: dir.display().to_string(),
            });
        }

        let mut files: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let limit = num_turbines.unwrap_or(files.len());
        if limit != files.len() {
            tracing::debug!(
                requested = limit,
                found = files.len(),
                "turbine count differs from number of turbine files"
            );
        }

        let mut decks = Vec::with_capacity(limit.min(files.len()));
        for file in files.iter().take(limit) {
            tracing::debug!(file = %file.display(), "reading turbine deck");
            decks.push(parser.parse_file(file)?);
        }

        let mut array = Self::from_params(decks, adm_type);
        array.turb_dir = dir.display().to_string();
        Ok(array)
    }

    pub fn from_params(decks: Vec<RunConfig>, adm_type: i64) -> Self {
        let turbines: Vec<Turbine> = decks
            .into_iter()
            .enumerate()
            .map(|(i, params)| Turbine::new(i + 1, params))
            .collect();
        let mut array = Self {
            turb_dir: String::new(),
            num_turbines: turbines.len(),
            adm_type,
            sort_by: SortKey::default(),
            turbines,
        };
        array.sort(false);
        array
    }

    /// Stable sort by the current sort key.
    pub fn sort(&mut self, reverse: bool) {
        let key = self.sort_by;
        self.turbines.sort_by(|a, b| {
            let ord = a
                .sort_value(key)
                .partial_cmp(&b.sort_value(key))
                .unwrap_or(Ordering::Equal);
            if reverse { ord.reverse() } else { ord }
        });
    }

    pub fn set_sort(&mut self, key: SortKey, sort: bool, reverse: bool) {
        self.sort_by = key;
        if sort {
            self.sort(reverse);
        }
    }

    /// Turbine by its 1-based read index.
    pub fn by_index(&self, n: usize) -> Option<&Turbine> {
        self.turbines.iter().find(|t| t.n == n)
    }

    pub fn first(&self) -> Option<&Turbine> {
        self.turbines.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turbine> {
        self.turbines.iter()
    }

    pub fn len(&self) -> usize {
        self.turbines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turbines.is_empty()
    }
}
