//! Raw-only readers: instantaneous fields, planar dumps and turbine series.

use std::collections::{BTreeMap, HashSet};

use bio_results::{FIELD_TAGS, PlaneAxis, RawSource, TurbineProperty, field_tag, turbine_series_key};
use ndarray::{Array1, ArrayD};

use crate::error::{AppError, AppResult};
use crate::session::{Backend, BudgetSession};
use crate::slice::{SliceResult, extent_of};

/// Time indices of a turbine read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TidxSelection {
    /// Last field dump, or the last turbine dump when there are no fields.
    #[default]
    Last,
    /// Every time index with a turbine power file.
    All,
    List(Vec<u32>),
}

impl BudgetSession {
    fn raw(&self, what: &'static str) -> AppResult<&RawSource> {
        match &self.backend {
            Backend::Raw(src) => Ok(src),
            Backend::Archive(_) => Err(AppError::Unsupported {
                backend: self.backend_kind(),
                what,
            }),
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, ndarray::Array3<f64>> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ndarray::Array3<f64>> {
        self.fields.get(name)
    }

    pub fn field_tidxs(&self) -> &[u32] {
        &self.field_tidxs
    }

    /// Time index of the fields currently held.
    pub fn field_tidx(&self) -> Option<u32> {
        self.field_tidx
    }

    /// Simulation time of the fields currently held.
    pub fn sim_time(&self) -> Option<f64> {
        self.sim_time
    }

    /// Reads instantaneous fields at `tidx` (default: last field dump). Fields held for
    /// another time index are dropped. `None` reads every field dumped at `tidx`.
    /// Returns the names read.
    pub fn read_fields(&mut self, names: Option<&[&str]>, tidx: Option<u32>) -> AppResult<Vec<String>> {
        let raw = self.raw("field reads")?;
        let Some(last) = self.field_tidxs.last().copied() else {
            return Err(AppError::NoFields);
        };
        let tidx = tidx.unwrap_or(last);
        let wanted: Vec<&str> = match names {
            Some(names) => names
                .iter()
                .copied()
                .filter(|n| {
                    let known = field_tag(n).is_some();
                    if !known {
                        tracing::warn!(field = *n, "unknown field name, skipped");
                    }
                    known
                })
                .collect(),
            // only the fields actually dumped at this time index
            None => FIELD_TAGS
                .iter()
                .filter(|(_, tag)| raw.files().field(tag, tidx).is_file())
                .map(|(name, _)| *name)
                .collect(),
        };

        let sim_time = raw.sim_time(tidx)?;
        let dims = self.grid.dims();
        let mut fields = BTreeMap::new();
        for name in wanted {
            fields.insert(name.to_string(), raw.read_field(name, tidx, dims)?);
        }
        let read: Vec<String> = fields.keys().cloned().collect();

        if self.field_tidx != Some(tidx) {
            self.fields.clear();
        }
        self.fields.extend(fields);
        self.field_tidx = Some(tidx);
        self.sim_time = Some(sim_time);
        tracing::info!(tidx, time = sim_time, fields = ?read, "fields read");
        Ok(read)
    }

    /// Simulation time of every field dump, in time-index order.
    pub fn unique_times(&self) -> AppResult<Vec<f64>> {
        let raw = self.raw("time queries")?;
        self.field_tidxs
            .iter()
            .map(|&t| raw.sim_time(t).map_err(AppError::from))
            .collect()
    }

    /// Reads planar dumps normal to `axis` at the solver's 1-based `index`.
    ///
    /// Arrays are keyed `{label}_{tidx}`. The collapsed axis keeps the plane's coordinate.
    pub fn read_plane(
        &self,
        axis: PlaneAxis,
        index: usize,
        labels: &[&str],
        tidxs: &[u32],
    ) -> AppResult<SliceResult> {
        let raw = self.raw("plane reads")?;
        let normal = axis.index();
        let n = self.grid.dims()[normal];
        if index == 0 || index > n {
            return Err(AppError::InvalidInput(format!(
                "plane index {index} outside 1..={n}"
            )));
        }

        let dims = self.grid.dims();
        let in_plane: Vec<usize> = (0..3).filter(|&i| i != normal).collect();
        let shape = [dims[in_plane[0]], dims[in_plane[1]]];

        let mut arrays: BTreeMap<String, ArrayD<f64>> = BTreeMap::new();
        for &tidx in tidxs {
            for label in labels {
                let plane = raw.read_plane(axis, index, tidx, label, shape)?;
                arrays.insert(format!("{label}_{tidx}"), plane.into_dyn());
            }
        }

        let axes: [Array1<f64>; 3] = std::array::from_fn(|i| {
            let coords = self.grid.axes()[i].coords();
            if i == normal {
                Array1::from(vec![coords[index - 1]])
            } else {
                coords.clone()
            }
        });
        let mut collapsed = [false; 3];
        collapsed[normal] = true;
        let extent = extent_of(&axes, false);
        Ok(SliceResult {
            arrays,
            axes,
            collapsed,
            extent,
        })
    }

    /// Reads one turbine property over the selected time indices.
    ///
    /// `steady` collapses each file to its mean; it defaults to true for a single time
    /// index. Repeated values are dropped, keeping first occurrences. Archive sessions
    /// return the series stored in the archive metadata.
    pub fn read_turbine_property(
        &self,
        selection: TidxSelection,
        prop: TurbineProperty,
        turbine: usize,
        steady: Option<bool>,
    ) -> AppResult<Vec<f64>> {
        let raw = match &self.backend {
            Backend::Raw(src) => src,
            Backend::Archive(_) => {
                return self
                    .metadata
                    .as_ref()
                    .and_then(|m| m.series(turbine, prop))
                    .map(<[f64]>::to_vec)
                    .ok_or_else(|| AppError::SeriesNotFound {
                        key: turbine_series_key(turbine, prop),
                    });
            }
        };

        let tidxs = match selection {
            TidxSelection::Last => {
                let last = match self.field_tidxs.last() {
                    Some(&t) => t,
                    None => *raw.turbine_tidxs()?.last().ok_or(AppError::NoFields)?,
                };
                vec![last]
            }
            TidxSelection::All => raw.turbine_tidxs()?,
            TidxSelection::List(tidxs) => tidxs,
        };
        let steady = steady.unwrap_or(tidxs.len() == 1);

        let mut series = Vec::new();
        for tidx in tidxs {
            let values = raw.read_turbine_file(prop, tidx, turbine)?;
            if steady {
                if !values.is_empty() {
                    series.push(values.iter().sum::<f64>() / values.len() as f64);
                }
            } else {
                series.extend(values);
            }
        }

        let mut seen = HashSet::new();
        series.retain(|v| seen.insert(v.to_bits()));
        Ok(series)
    }

    pub fn read_turbine_power(&self, selection: TidxSelection, turbine: usize) -> AppResult<Vec<f64>> {
        self.read_turbine_property(selection, TurbineProperty::Power, turbine, None)
    }

    pub fn read_turbine_uvel(&self, selection: TidxSelection, turbine: usize) -> AppResult<Vec<f64>> {
        self.read_turbine_property(selection, TurbineProperty::Uvel, turbine, None)
    }

    pub fn read_turbine_vvel(&self, selection: TidxSelection, turbine: usize) -> AppResult<Vec<f64>> {
        self.read_turbine_property(selection, TurbineProperty::Vvel, turbine, None)
    }
}
