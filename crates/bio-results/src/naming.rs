//! File-name conventions of the solver's run directory.

use std::fmt;
use std::path::{Path, PathBuf};

use bio_core::TermKey;
use serde::{Deserialize, Serialize};

/// Turbine scalar series dumped per time index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurbineProperty {
    Power,
    Uvel,
    Vvel,
}

impl TurbineProperty {
    pub const ALL: [TurbineProperty; 3] = [Self::Power, Self::Uvel, Self::Vvel];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Uvel => "uvel",
            Self::Vvel => "vvel",
        }
    }

    fn tag_and_ext(self) -> (char, &'static str) {
        match self {
            Self::Power => ('P', "pow"),
            Self::Uvel => ('U', "vel"),
            Self::Vvel => ('V', "vel"),
        }
    }
}

impl fmt::Display for TurbineProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normal axis of a planar dump.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaneAxis {
    X,
    Y,
    Z,
}

impl PlaneAxis {
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    fn letter(self) -> char {
        match self {
            Self::X => 'x',
            Self::Y => 'y',
            Self::Z => 'z',
        }
    }
}

/// Path builders and index patterns for one run id inside one directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunFiles {
    dir: PathBuf,
    run_id: u32,
}

impl RunFiles {
    pub fn new(dir: impl Into<PathBuf>, run_id: u32) -> Self {
        Self {
            dir: dir.into(),
            run_id,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run_id(&self) -> u32 {
        self.run_id
    }

    pub fn budget(&self, key: TermKey, tidx: u32, n: u32) -> PathBuf {
        self.dir.join(format!(
            "Run{:02}_budget{}_term{:02}_t{:06}_n{:06}.s3D",
            self.run_id, key.budget, key.term, tidx, n
        ))
    }

    pub fn field(&self, tag: &str, tidx: u32) -> PathBuf {
        self.dir
            .join(format!("Run{:02}_{}_t{:06}.out", self.run_id, tag, tidx))
    }

    pub fn info(&self, tidx: u32) -> PathBuf {
        self.field("info", tidx)
    }

    /// `index` is the solver's 1-based plane index.
    pub fn plane(&self, axis: PlaneAxis, index: usize, tidx: u32, label: &str) -> PathBuf {
        self.dir.join(format!(
            "Run{:02}_t{:06}_{}{:05}.pl{}",
            self.run_id,
            tidx,
            axis.letter(),
            index,
            label
        ))
    }

    pub fn turbine(&self, prop: TurbineProperty, tidx: u32, turbine: usize) -> PathBuf {
        let (tag, ext) = prop.tag_and_ext();
        self.dir.join(format!(
            "Run{:02}_t{:06}_turb{}{:02}.{}",
            self.run_id, tidx, tag, turbine, ext
        ))
    }

    /// Matches every budget dump at one time index, capturing budget, term and sample count.
    pub fn budget_lookup_pattern(&self, tidx: u32) -> String {
        format!(
            r"^Run{:02}_budget(\d+)_term(\d+)_t{:06}_n(\d+)\.s3D$",
            self.run_id, tidx
        )
    }

    pub fn field_tidx_pattern(&self) -> String {
        format!(r"^Run{:02}.*_t(\d+).*\.out$", self.run_id)
    }

    pub fn budget_tidx_pattern(&self) -> String {
        format!(r"^Run{:02}.*budget.*_t(\d+).*", self.run_id)
    }

    pub fn sample_count_pattern(&self) -> String {
        format!(r"^Run{:02}.*_n(\d+).*", self.run_id)
    }

    pub fn turbine_tidx_pattern(&self) -> String {
        format!(r"^Run{:02}.*_t(\d+).*\.pow$", self.run_id)
    }

    pub fn budget_id_pattern(&self) -> String {
        format!(r"^Run{:02}.*_budget(\d+).*", self.run_id)
    }

    pub fn term_id_pattern(&self, budget: u8) -> String {
        format!(r"^Run{:02}_budget{}_term(\d+).*", self.run_id, budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_padded_names() {
        let files = RunFiles::new("/data", 3);
        let p = files.budget(TermKey::new(0, 1), 100, 42);
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "Run03_budget0_term01_t000100_n000042.s3D"
        );
        assert_eq!(
            files.field("uVel", 7).file_name().unwrap().to_str().unwrap(),
            "Run03_uVel_t000007.out"
        );
        assert_eq!(
            files.info(7).file_name().unwrap().to_str().unwrap(),
            "Run03_info_t000007.out"
        );
        assert_eq!(
            files
                .plane(PlaneAxis::Y, 12, 500, "u")
                .file_name()
                .unwrap()
                .to_str()
                .unwrap(),
            "Run03_t000500_y00012.plu"
        );
        assert_eq!(
            files
                .turbine(TurbineProperty::Vvel, 500, 2)
                .file_name()
                .unwrap()
                .to_str()
                .unwrap(),
            "Run03_t000500_turbV02.vel"
        );
    }

    #[test]
    fn lookup_pattern_matches_generated_name() {
        let files = RunFiles::new("/data", 1);
        let key = TermKey::new(3, 4);
        let re = regex::Regex::new(&files.budget_lookup_pattern(9)).unwrap();
        let name = files.budget(key, 9, 1234);
        let caps = re
            .captures(name.file_name().unwrap().to_str().unwrap())
            .unwrap();
        assert_eq!((&caps[1], &caps[2], &caps[3]), ("3", "04", "001234"));
        assert!(!re.is_match("Run01_budget3_term04_t000010_n001234.s3D"));
        assert!(!re.is_match("Run02_budget3_term04_t000009_n001234.s3D"));
    }
}
