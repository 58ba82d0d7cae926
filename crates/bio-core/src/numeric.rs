use crate::CoreError;

/// Floating point type of every coordinate and field value
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Index of the element of `values` closest to `target`.
///
/// Ties resolve to the lower index. Returns `None` for an empty slice.
pub fn nearest_index(values: &[Real], target: Real) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, Real)>, (i, v)| {
            let d = (v - target).abs();
            match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((i, d)),
            }
        })
        .map(|(i, _)| i)
}

/// Integer in `values` closest to `target`; ties resolve to the smaller value.
pub fn nearest_value(values: &[u32], target: u32) -> Option<u32> {
    values
        .iter()
        .copied()
        .min_by_key(|v| (v.abs_diff(target), *v))
}
