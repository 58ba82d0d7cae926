//! MAT-file level 5 containers.
//!
//! Writing produces uncompressed `double` matrices, stored column-major as MATLAB expects.
//! Reading goes through the `matfile` parser.

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::{ArrayD, IxDyn};

use crate::array::{ElementOrder, flatten, reshape_flat};
use crate::{ResultsError, ResultsResult};

const HEADER_LEN: usize = 128;
const MI_INT8: u32 = 1;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MX_DOUBLE_CLASS: u32 = 6;

fn pad8(buf: &mut Vec<u8>) {
    while buf.len() % 8 != 0 {
        buf.push(0);
    }
}

fn push_element(buf: &mut Vec<u8>, data_type: u32, payload: &[u8]) {
    buf.extend_from_slice(&data_type.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    pad8(buf);
}

fn header() -> Vec<u8> {
    let text = format!(
        "MATLAB 5.0 MAT-file, Platform: {}, Created on: {}",
        std::env::consts::OS,
        chrono::Utc::now().format("%a %b %e %H:%M:%S %Y")
    );
    let mut buf = text.into_bytes();
    buf.truncate(116);
    buf.resize(116, b' ');
    // no subsystem data
    buf.extend_from_slice(&[0u8; 8]);
    buf.extend_from_slice(&0x0100u16.to_le_bytes());
    buf.extend_from_slice(b"IM");
    buf
}

fn matrix_element(name: &str, arr: &ArrayD<f64>) -> ResultsResult<Vec<u8>> {
    // MATLAB matrices have at least two dimensions; 1-D arrays are stored as rows.
    let dims: Vec<usize> = match arr.shape() {
        [] => vec![1, 1],
        [n] => vec![1, *n],
        shape => shape.to_vec(),
    };
    let mut body = Vec::new();

    let mut flags = Vec::with_capacity(8);
    flags.extend_from_slice(&MX_DOUBLE_CLASS.to_le_bytes());
    flags.extend_from_slice(&0u32.to_le_bytes());
    push_element(&mut body, MI_UINT32, &flags);

    let mut dim_bytes = Vec::with_capacity(4 * dims.len());
    for &d in &dims {
        let d = i32::try_from(d).map_err(|_| ResultsError::Mat {
            path: name.to_string(),
            message: format!("dimension {d} exceeds the MAT-file limit"),
        })?;
        dim_bytes.extend_from_slice(&d.to_le_bytes());
    }
    push_element(&mut body, MI_INT32, &dim_bytes);

    push_element(&mut body, MI_INT8, name.as_bytes());

    let data = flatten(arr, ElementOrder::Fortran);
    let mut real = Vec::with_capacity(8 * data.len());
    for v in data {
        real.extend_from_slice(&v.to_le_bytes());
    }
    push_element(&mut body, MI_DOUBLE, &real);

    let mut element = Vec::with_capacity(body.len() + 8);
    element.extend_from_slice(&MI_MATRIX.to_le_bytes());
    element.extend_from_slice(&(body.len() as u32).to_le_bytes());
    element.extend_from_slice(&body);
    Ok(element)
}

pub fn write_mat(path: &Path, arrays: &BTreeMap<String, ArrayD<f64>>) -> ResultsResult<()> {
    let mut buf = header();
    debug_assert_eq!(buf.len(), HEADER_LEN);
    for (name, arr) in arrays {
        buf.extend_from_slice(&matrix_element(name, arr)?);
    }
    std::fs::write(path, buf)?;
    Ok(())
}

fn parse(path: &Path) -> ResultsResult<matfile::MatFile> {
    if !path.exists() {
        return Err(ResultsError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let file = std::fs::File::open(path)?;
    matfile::MatFile::parse(file).map_err(|e| ResultsError::Mat {
        path: path.display().to_string(),
        message: format!("{e:?}"),
    })
}

/// Stored variable names, skipping `__header__`-style entries.
pub fn mat_names(path: &Path) -> ResultsResult<Vec<String>> {
    let mat = parse(path)?;
    Ok(mat
        .arrays()
        .iter()
        .map(|a| a.name().to_string())
        .filter(|n| !n.starts_with('_'))
        .collect())
}

/// Reads real `double` variables; absent or non-double variables land in the second list.
pub fn read_mat(
    path: &Path,
    names: &[String],
) -> ResultsResult<(BTreeMap<String, ArrayD<f64>>, Vec<String>)> {
    let mat = parse(path)?;
    let mut arrays = BTreeMap::new();
    let mut missing = Vec::new();
    for name in names {
        let Some(array) = mat.find_by_name(name) else {
            missing.push(name.clone());
            continue;
        };
        let matfile::NumericData::Double { real, .. } = array.data() else {
            tracing::warn!(path = %path.display(), term = %name, "MAT variable is not a double array");
            missing.push(name.clone());
            continue;
        };
        match reshape_flat(real.clone(), IxDyn(array.size()), ElementOrder::Fortran, path) {
            Ok(arr) => {
                arrays.insert(name.clone(), arr);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), term = %name, error = %e, "failed to decode MAT variable");
                missing.push(name.clone());
            }
        }
    }
    Ok((arrays, missing))
}
