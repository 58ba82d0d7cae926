//! NumPy `.npz` containers: a zip of `<name>.npy` members.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use ndarray::{ArrayD, IxDyn, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter};

use crate::{ResultsError, ResultsResult};

const MEMBER_SUFFIX: &str = ".npy";

pub fn write_npz(path: &Path, arrays: &BTreeMap<String, ArrayD<f64>>) -> ResultsResult<()> {
    let mut npz = NpzWriter::new(File::create(path)?);
    for (name, arr) in arrays {
        npz.add_array(format!("{name}{MEMBER_SUFFIX}"), arr)?;
    }
    npz.finish()?;
    Ok(())
}

fn open(path: &Path) -> ResultsResult<NpzReader<File>> {
    if !path.exists() {
        return Err(ResultsError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(NpzReader::new(File::open(path)?)?)
}

/// Stored array names, without the member suffix.
pub fn npz_names(path: &Path) -> ResultsResult<Vec<String>> {
    let mut npz = open(path)?;
    Ok(npz
        .names()?
        .into_iter()
        .map(|n| n.strip_suffix(MEMBER_SUFFIX).map(str::to_string).unwrap_or(n))
        .collect())
}

/// Reads `names`; absent or undecodable members are returned in the second list.
pub fn read_npz(
    path: &Path,
    names: &[String],
) -> ResultsResult<(BTreeMap<String, ArrayD<f64>>, Vec<String>)> {
    let mut npz = open(path)?;
    let stored = npz.names()?;
    let mut arrays = BTreeMap::new();
    let mut missing = Vec::new();
    for name in names {
        let member = format!("{name}{MEMBER_SUFFIX}");
        let member = if stored.contains(&member) {
            member
        } else if stored.contains(name) {
            name.clone()
        } else {
            missing.push(name.clone());
            continue;
        };
        match npz.by_name::<OwnedRepr<f64>, IxDyn>(&member) {
            Ok(arr) => {
                arrays.insert(name.clone(), arr);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), term = %name, error = %e, "failed to decode npz member");
                missing.push(name.clone());
            }
        }
    }
    Ok((arrays, missing))
}
