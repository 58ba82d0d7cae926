//! Coordinate-based sub-array extraction.
//!
//! Bounds are given in physical coordinates, resolved to the nearest grid indices, or as
//! explicit indices. A scalar bound selects one index and the axis is squeezed out of the
//! result; a range is inclusive on both ends.

use std::collections::BTreeMap;

use bio_core::{CoreError, nearest_index};
use bio_results::array::to_grid_shape;
use ndarray::{Array1, ArrayD, ArrayView3, Axis, Slice};

use crate::error::AppResult;

/// Selection along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Bound {
    #[default]
    Full,
    /// Nearest single coordinate; the axis is collapsed.
    At(f64),
    /// Inclusive coordinate range, in either order.
    Range(f64, f64),
    /// Grid index; the axis is collapsed.
    Index(usize),
    /// Inclusive index range, in either order.
    IndexRange(usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SliceBounds {
    pub x: Bound,
    pub y: Bound,
    pub z: Bound,
}

impl SliceBounds {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn x(mut self, bound: Bound) -> Self {
        self.x = bound;
        self
    }

    pub fn y(mut self, bound: Bound) -> Self {
        self.y = bound;
        self
    }

    pub fn z(mut self, bound: Bound) -> Self {
        self.z = bound;
        self
    }

    fn per_axis(&self) -> [Bound; 3] {
        [self.x, self.y, self.z]
    }
}

/// Resolved selection: a single index or an inclusive index span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Index(usize),
    Span(usize, usize),
}

impl Selection {
    fn bounds(self) -> (usize, usize) {
        match self {
            Selection::Index(i) => (i, i),
            Selection::Span(lo, hi) => (lo, hi),
        }
    }
}

fn select(coords: &Array1<f64>, bound: Bound) -> AppResult<Selection> {
    let values = coords.to_vec();
    let nearest = |v: f64| {
        nearest_index(&values, v).ok_or(CoreError::InvalidArg {
            what: "cannot slice an empty axis",
        })
    };
    Ok(match bound {
        Bound::Full => match values.len() {
            0 => return Err(CoreError::InvalidArg { what: "cannot slice an empty axis" }.into()),
            len => Selection::Span(0, len - 1),
        },
        Bound::At(v) => Selection::Index(nearest(v)?),
        Bound::Range(a, b) => Selection::Span(nearest(a.min(b))?, nearest(a.max(b))?),
        Bound::Index(i) => Selection::Index(checked(i, values.len())?),
        Bound::IndexRange(a, b) => {
            Selection::Span(checked(a.min(b), values.len())?, checked(a.max(b), values.len())?)
        }
    })
}

fn checked(index: usize, len: usize) -> Result<usize, CoreError> {
    if index < len {
        Ok(index)
    } else {
        Err(CoreError::InvalidArg {
            what: "slice index outside the axis",
        })
    }
}

/// Removes every length-1 axis.
fn squeeze(mut arr: ArrayD<f64>) -> ArrayD<f64> {
    for i in (0..arr.ndim()).rev() {
        if arr.shape()[i] == 1 {
            arr = arr.index_axis_move(Axis(i), 0);
        }
    }
    arr
}

/// Sliced arrays plus the coordinates they now span.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceResult {
    pub arrays: BTreeMap<String, ArrayD<f64>>,
    /// Sliced x, y, z coordinates. A collapsed axis keeps its single coordinate.
    pub axes: [Array1<f64>; 3],
    pub collapsed: [bool; 3],
    /// `[min, max]` of each axis with more than one point, in x, y, z order.
    pub extent: Vec<f64>,
}

impl SliceResult {
    pub fn x(&self) -> &Array1<f64> {
        &self.axes[0]
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.axes[1]
    }

    pub fn z(&self) -> &Array1<f64> {
        &self.axes[2]
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.arrays.get(name)
    }

    pub fn keys(&self) -> Vec<String> {
        self.arrays.keys().cloned().collect()
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.axes[0].len(), self.axes[1].len(), self.axes[2].len()]
    }

    /// Arrays restored to 3-D over the sliced axes.
    pub fn expanded(&self, name: &str) -> AppResult<Option<ndarray::Array3<f64>>> {
        match self.arrays.get(name) {
            Some(arr) => Ok(Some(to_grid_shape(arr, self.dims(), name)?)),
            None => Ok(None),
        }
    }

    /// Slices this result again; `keys` restricts the arrays carried over.
    pub fn reslice(
        &self,
        keys: Option<&[String]>,
        bounds: SliceBounds,
        round_extent: bool,
    ) -> AppResult<SliceResult> {
        let names = keys.map(<[String]>::to_vec).unwrap_or_else(|| self.keys());
        let mut full = Vec::with_capacity(names.len());
        for name in names {
            if let Some(arr) = self.expanded(&name)? {
                full.push((name, arr));
            } else {
                tracing::warn!(term = %name, "term not in slice");
            }
        }
        let mut out = slice_arrays(
            full.iter().map(|(n, a)| (n.clone(), a.view())),
            [&self.axes[0], &self.axes[1], &self.axes[2]],
            bounds,
            round_extent,
        )?;
        for (c, prev) in out.collapsed.iter_mut().zip(self.collapsed) {
            *c |= prev;
        }
        Ok(out)
    }
}

/// Slices each `(name, array)` over `axes` with `bounds`.
pub fn slice_arrays<'a, I>(
    arrays: I,
    axes: [&Array1<f64>; 3],
    bounds: SliceBounds,
    round_extent: bool,
) -> AppResult<SliceResult>
where
    I: IntoIterator<Item = (String, ArrayView3<'a, f64>)>,
{
    let bounds = bounds.per_axis();
    let mut selections = [Selection::Index(0); 3];
    for i in 0..3 {
        selections[i] = select(axes[i], bounds[i])?;
    }
    let dims = [axes[0].len(), axes[1].len(), axes[2].len()];

    let mut out = BTreeMap::new();
    for (name, arr) in arrays {
        if arr.shape() != dims {
            return Err(CoreError::ShapeMismatch {
                what: name,
                expected: dims.to_vec(),
                actual: arr.shape().to_vec(),
            }
            .into());
        }
        let mut view = arr;
        for (i, sel) in selections.iter().enumerate() {
            let (lo, hi) = sel.bounds();
            view.slice_axis_inplace(Axis(i), Slice::from(lo..hi + 1));
        }
        out.insert(name, squeeze(view.to_owned().into_dyn()));
    }

    let sliced_axes: [Array1<f64>; 3] = std::array::from_fn(|i| {
        let (lo, hi) = selections[i].bounds();
        axes[i].slice_axis(Axis(0), Slice::from(lo..hi + 1)).to_owned()
    });
    let collapsed = selections.map(|s| matches!(s, Selection::Index(_)));
    let extent = extent_of(&sliced_axes, round_extent);

    Ok(SliceResult {
        arrays: out,
        axes: sliced_axes,
        collapsed,
        extent,
    })
}

pub(crate) fn extent_of(axes: &[Array1<f64>; 3], round: bool) -> Vec<f64> {
    let mut extent = Vec::with_capacity(6);
    for axis in axes.iter().filter(|a| a.len() > 1) {
        let lo = axis.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = axis.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        extent.push(lo);
        extent.push(hi);
    }
    if round {
        extent.iter_mut().for_each(|v| *v = v.round());
    }
    extent
}

/// Horizontal average of a 3-D array: one value per z level.
pub fn xy_average(arr: ArrayView3<f64>) -> Array1<f64> {
    let nz = arr.len_of(Axis(2));
    arr.mean_axis(Axis(0))
        .and_then(|plane| plane.mean_axis(Axis(0)))
        .unwrap_or_else(|| Array1::zeros(nz))
}

/// Vertical profiles of horizontally averaged terms.
#[derive(Debug, Clone, PartialEq)]
pub struct XyProfiles {
    pub z: Array1<f64>,
    pub profiles: BTreeMap<String, Array1<f64>>,
}

impl XyProfiles {
    pub fn from_slice(sl: &SliceResult) -> AppResult<Self> {
        let mut profiles = BTreeMap::new();
        for name in sl.arrays.keys() {
            if let Some(full) = sl.expanded(name)? {
                profiles.insert(name.clone(), xy_average(full.view()));
            }
        }
        Ok(Self {
            z: sl.z().clone(),
            profiles,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Array1<f64>> {
        self.profiles.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, array};

    fn axes() -> [Array1<f64>; 3] {
        [
            array![0.0, 1.0, 2.0, 3.0],
            array![0.0, 0.5, 1.0],
            array![0.25, 0.75],
        ]
    }

    fn field() -> Array3<f64> {
        Array3::from_shape_fn((4, 3, 2), |(i, j, k)| (100 * i + 10 * j + k) as f64)
    }

    fn run(bounds: SliceBounds) -> SliceResult {
        let [x, y, z] = axes();
        let f = field();
        slice_arrays([("f".to_string(), f.view())], [&x, &y, &z], bounds, false).unwrap()
    }

    #[test]
    fn full_range_keeps_shape() {
        let sl = run(SliceBounds::full().x(Bound::Range(0.0, 3.0)));
        assert_eq!(sl.get("f").unwrap().shape(), &[4, 3, 2]);
        assert_eq!(sl.extent, vec![0.0, 3.0, 0.0, 1.0, 0.25, 0.75]);
        assert_eq!(sl.collapsed, [false; 3]);
    }

    #[test]
    fn scalar_bound_removes_axis() {
        let sl = run(SliceBounds::full().y(Bound::At(0.6)));
        let f = sl.get("f").unwrap();
        assert_eq!(f.shape(), &[4, 2]);
        assert_eq!(f[[3, 1]], 311.0);
        assert_eq!(sl.y(), &array![0.5]);
        assert_eq!(sl.collapsed, [false, true, false]);
        assert_eq!(sl.extent, vec![0.0, 3.0, 0.25, 0.75]);
    }

    #[test]
    fn range_resolves_to_nearest_indices_inclusive() {
        // 0.9 -> index 1 and 2.2 -> index 2, reversed order is accepted
        let sl = run(SliceBounds::full().x(Bound::Range(2.2, 0.9)));
        assert_eq!(sl.x(), &array![1.0, 2.0]);
        assert_eq!(sl.get("f").unwrap()[[0, 0, 0]], 100.0);
    }

    #[test]
    fn reslice_and_round_extent() {
        let sl = run(SliceBounds::full().z(Bound::At(0.3)));
        assert_eq!(sl.get("f").unwrap().shape(), &[4, 3]);
        let again = sl
            .reslice(None, SliceBounds::full().x(Bound::Range(0.6, 2.4)), true)
            .unwrap();
        assert_eq!(again.get("f").unwrap().shape(), &[2, 3]);
        assert_eq!(again.get("f").unwrap()[[0, 2]], 120.0);
        assert_eq!(again.collapsed, [false, false, true]);
        assert_eq!(again.extent, vec![1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn index_bounds() {
        let sl = run(SliceBounds::full().x(Bound::IndexRange(3, 2)).z(Bound::Index(1)));
        assert_eq!(sl.x(), &array![2.0, 3.0]);
        assert_eq!(sl.z(), &array![0.75]);
        assert_eq!(sl.get("f").unwrap()[[1, 2]], 321.0);

        let [x, y, z] = axes();
        let f = field();
        let out = slice_arrays(
            [("f".to_string(), f.view())],
            [&x, &y, &z],
            SliceBounds::full().y(Bound::Index(3)),
            false,
        );
        assert!(out.is_err());
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let [x, y, z] = axes();
        let wrong = Array3::<f64>::zeros((2, 2, 2));
        let err = slice_arrays([("f".to_string(), wrong.view())], [&x, &y, &z], SliceBounds::full(), false);
        assert!(err.is_err());
    }

    #[test]
    fn xy_profiles() {
        let sl = run(SliceBounds::full());
        let prof = XyProfiles::from_slice(&sl).unwrap();
        // mean over i in 0..4 and j in 0..3 of 100 i + 10 j + k
        assert_eq!(prof.get("f").unwrap(), &array![160.0, 161.0]);
        assert_eq!(prof.z, array![0.25, 0.75]);
    }
}
