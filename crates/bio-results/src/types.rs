//! Archive data types.

use std::collections::BTreeMap;
use std::fmt;

use bio_project::{RunConfig, TurbineArray};
use serde::{Deserialize, Serialize};

use crate::naming::TurbineProperty;

/// Container format of a consolidated archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    Npz,
    Mat,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Npz => "npz",
            Self::Mat => "mat",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Everything needed to rebuild a session from an archive, stored beside the data container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub format: ArchiveFormat,
    /// RFC 3339 creation timestamp.
    pub created: String,
    pub config: RunConfig,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    #[serde(default)]
    pub origin: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turbines: Option<TurbineArray>,
    /// Per-turbine scalar series keyed by [`turbine_series_key`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub turbine_series: BTreeMap<String, Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tidx: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_n: Option<u32>,
}

impl ArchiveMetadata {
    pub fn new(format: ArchiveFormat, config: RunConfig, axes: [Vec<f64>; 3], origin: [f64; 3]) -> Self {
        let [x, y, z] = axes;
        Self {
            format,
            created: chrono::Utc::now().to_rfc3339(),
            config,
            x,
            y,
            z,
            origin,
            turbines: None,
            turbine_series: BTreeMap::new(),
            source_tidx: None,
            source_n: None,
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.x.len(), self.y.len(), self.z.len()]
    }

    pub fn series(&self, turbine: usize, prop: TurbineProperty) -> Option<&[f64]> {
        self.turbine_series
            .get(&turbine_series_key(turbine, prop))
            .map(Vec::as_slice)
    }
}

/// `t<k>_<property>`, with `k` the 1-based turbine index.
pub fn turbine_series_key(turbine: usize, prop: TurbineProperty) -> String {
    format!("t{turbine}_{prop}")
}
