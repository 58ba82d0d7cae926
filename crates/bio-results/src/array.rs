//! Flat float64 streams and their reshaping into n-d arrays.
//!
//! The solver dumps arrays in Fortran (column-major) order. Reshaping such a stream in
//! C order does not fail; it silently transposes the axes. The element order is therefore
//! an explicit argument everywhere a flat stream meets a shape.

use std::path::Path;

use ndarray::{Array, Array3, ArrayBase, Data, Dim, Dimension, ShapeBuilder};

use crate::{ResultsError, ResultsResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ElementOrder {
    /// Column-major: the first index varies fastest.
    #[default]
    Fortran,
    /// Row-major: the last index varies fastest.
    C,
}

pub fn decode_f64(bytes: &[u8], path: &Path) -> ResultsResult<Vec<f64>> {
    if bytes.len() % 8 != 0 {
        return Err(ResultsError::Parse {
            path: path.display().to_string(),
            message: format!("{} bytes is not a whole number of float64 values", bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        })
        .collect())
}

pub fn encode_f64(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Reshapes a flat stream into `dim`, interpreting it in `order`.
pub fn reshape_flat<D: Dimension>(
    data: Vec<f64>,
    dim: D,
    order: ElementOrder,
    path: &Path,
) -> ResultsResult<Array<f64, D>> {
    let expected = dim.size();
    if data.len() != expected {
        return Err(ResultsError::Size {
            path: path.display().to_string(),
            expected,
            actual: data.len(),
        });
    }
    let shape = dim.set_f(order == ElementOrder::Fortran);
    Array::from_shape_vec(shape, data).map_err(|e| ResultsError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Flattens `arr` into a stream laid out in `order`.
pub fn flatten<S, D>(arr: &ArrayBase<S, D>, order: ElementOrder) -> Vec<f64>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    match order {
        ElementOrder::C => arr.iter().copied().collect(),
        ElementOrder::Fortran => arr.t().iter().copied().collect(),
    }
}

pub fn read_f64_file(path: &Path) -> ResultsResult<Vec<f64>> {
    if !path.exists() {
        return Err(ResultsError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let bytes = std::fs::read(path)?;
    decode_f64(&bytes, path)
}

pub fn read_array3(
    path: &Path,
    dims: [usize; 3],
    order: ElementOrder,
) -> ResultsResult<Array3<f64>> {
    let data = read_f64_file(path)?;
    reshape_flat(data, Dim(dims), order, path)
}

pub fn write_array<S, D>(path: &Path, arr: &ArrayBase<S, D>, order: ElementOrder) -> ResultsResult<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    std::fs::write(path, encode_f64(&flatten(arr, order)))?;
    Ok(())
}

/// Restores an array whose unit axes may have been squeezed out to the full grid shape.
pub fn to_grid_shape<S, D>(
    arr: &ArrayBase<S, D>,
    dims: [usize; 3],
    what: &str,
) -> ResultsResult<Array3<f64>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let non_unit = |shape: &[usize]| -> Vec<usize> {
        shape.iter().copied().filter(|&d| d != 1).collect()
    };
    if non_unit(arr.shape()) != non_unit(&dims) {
        return Err(ResultsError::Size {
            path: what.to_string(),
            expected: dims.iter().product(),
            actual: arr.len(),
        });
    }
    // Inserting or removing unit axes does not change the logical element order.
    let flat = flatten(arr, ElementOrder::C);
    reshape_flat(flat, Dim(dims), ElementOrder::C, Path::new(what))
}

/// Whitespace-delimited numeric text, flattened in reading order.
///
/// A file holding a single value yields a one-element vector.
pub fn read_text_values(path: &Path) -> ResultsResult<Vec<f64>> {
    if !path.exists() {
        return Err(ResultsError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    content
        .split_whitespace()
        .map(|tok| {
            tok.replace(['d', 'D'], "e")
                .parse::<f64>()
                .map_err(|e| ResultsError::Parse {
                    path: path.display().to_string(),
                    message: format!("{tok:?}: {e}"),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn fortran_order_on_non_cubic_shape() {
        let (nx, ny, nz) = (2, 3, 4);
        // value encodes its own (i, j, k) position
        let flat: Vec<f64> = (0..nz)
            .flat_map(|k| (0..ny).flat_map(move |j| (0..nx).map(move |i| (100 * i + 10 * j + k) as f64)))
            .collect();
        let arr = reshape_flat(flat.clone(), Dim([nx, ny, nz]), ElementOrder::Fortran, Path::new("t"))
            .unwrap();
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    assert_eq!(arr[[i, j, k]], (100 * i + 10 * j + k) as f64);
                }
            }
        }
        assert_eq!(flatten(&arr, ElementOrder::Fortran), flat);

        // row-major interpretation of the same stream silently scrambles positions
        let wrong = reshape_flat(flat, Dim([nx, ny, nz]), ElementOrder::C, Path::new("t")).unwrap();
        assert_ne!(wrong, arr);
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let err = reshape_flat(vec![0.0; 5], Dim([2, 3]), ElementOrder::Fortran, Path::new("t"))
            .unwrap_err();
        assert!(matches!(err, ResultsError::Size { expected: 6, actual: 5, .. }));
    }

    #[test]
    fn byte_codec_rejects_partial_values() {
        let bytes = encode_f64(&[1.5, -2.0]);
        assert_eq!(decode_f64(&bytes, Path::new("t")).unwrap(), vec![1.5, -2.0]);
        assert!(decode_f64(&bytes[..15], Path::new("t")).is_err());
    }

    #[test]
    fn squeezed_arrays_expand_to_grid() {
        let plane = Array2::from_shape_fn((3, 4), |(i, k)| (10 * i + k) as f64);
        let full = to_grid_shape(&plane, [3, 1, 4], "plane").unwrap();
        assert_eq!(full.shape(), &[3, 1, 4]);
        assert_eq!(full[[2, 0, 3]], 23.0);

        let dyn_arr = plane.clone().into_dyn();
        assert!(to_grid_shape(&dyn_arr, [4, 1, 3], "plane").is_err());
        assert_eq!(to_grid_shape(&dyn_arr, [1, 3, 4], "plane").unwrap()[[0, 1, 2]], 12.0);
    }
}
