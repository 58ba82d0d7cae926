//! Synthetic run directory shared by the session tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use bio_core::TermKey;
use bio_results::RunFiles;
use bio_results::array::{ElementOrder, write_array};
use ndarray::Array3;

pub const INPUT: &str = "\
&io
 runid = 1
/
&input
 nx = 4, ny = 4, nz = 4
 lx = 4.0, ly = 4.0, lz = 4.0
/
&physics
 isinviscid = .true.
/
&windturbines
 usewindturbines = .false.
/
";

pub fn unique_temp_dir(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("bio_app_{tag}_{nanos}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Mean streamwise velocity with a deficit growing downstream, offset by `tidx`.
pub fn ubar(tidx: u32) -> Array3<f64> {
    Array3::from_shape_fn((4, 4, 4), |(i, j, k)| {
        8.0 - 0.5 * i as f64 + 0.1 * j as f64 + 0.25 * k as f64 + f64::from(tidx) / 1000.0
    })
}

pub fn vbar(tidx: u32) -> Array3<f64> {
    Array3::from_shape_fn((4, 4, 4), |(i, _, k)| 0.1 * i as f64 - 0.05 * k as f64 + f64::from(tidx) / 1000.0)
}

pub fn wbar(_tidx: u32) -> Array3<f64> {
    Array3::from_shape_fn((4, 4, 4), |(i, j, _)| 0.01 * (i + j) as f64)
}

/// Writes the input deck and the mean velocities (budget 0, terms 1..3) at tidx 100
/// (10 samples) and 200 (20 samples).
pub fn raw_run(tag: &str) -> PathBuf {
    let dir = unique_temp_dir(tag);
    std::fs::write(dir.join("Run01_input.dat"), INPUT).unwrap();
    let files = RunFiles::new(&dir, 1);
    for (tidx, n) in [(100, 10), (200, 20)] {
        for (term, arr) in [(1, ubar(tidx)), (2, vbar(tidx)), (3, wbar(tidx))] {
            write_array(&files.budget(TermKey::new(0, term), tidx, n), &arr, ElementOrder::Fortran).unwrap();
        }
    }
    dir
}

pub fn write_text(path: &Path, values: &[f64]) {
    let text: Vec<String> = values.iter().map(|v| format!("{v:.8E}")).collect();
    std::fs::write(path, text.join("\n") + "\n").unwrap();
}
