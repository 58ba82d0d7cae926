//! Wake deficit: a reference inflow profile minus the local mean velocity.

use std::fmt::Debug;

use bio_core::{CoreError, ensure_finite};
use ndarray::{Array1, Array3, ArrayView3, Axis};

use crate::error::AppResult;

/// Inflow velocity components, one value per z level.
#[derive(Debug, Clone, PartialEq)]
pub struct InflowVelocity {
    pub u: Array1<f64>,
    pub v: Array1<f64>,
    pub w: Array1<f64>,
}

/// An undisturbed inflow as a function of height.
pub trait InflowProfile: Debug {
    fn velocity(&self, z: &Array1<f64>) -> AppResult<InflowVelocity>;
}

/// Height-independent inflow.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConstantInflow {
    pub u: f64,
    pub v: f64,
    pub w: f64,
}

impl InflowProfile for ConstantInflow {
    fn velocity(&self, z: &Array1<f64>) -> AppResult<InflowVelocity> {
        let n = z.len();
        Ok(InflowVelocity {
            u: Array1::from_elem(n, self.u),
            v: Array1::from_elem(n, self.v),
            w: Array1::from_elem(n, self.w),
        })
    }
}

/// Tabulated inflow, linearly interpolated in height and held constant beyond the table.
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedInflow {
    z: Vec<f64>,
    u: Vec<f64>,
    v: Vec<f64>,
    w: Vec<f64>,
}

impl TabulatedInflow {
    pub fn new(z: Vec<f64>, u: Vec<f64>, v: Vec<f64>, w: Vec<f64>) -> AppResult<Self> {
        if z.is_empty() || [u.len(), v.len(), w.len()].iter().any(|&n| n != z.len()) {
            return Err(CoreError::ShapeMismatch {
                what: "inflow table".to_string(),
                expected: vec![z.len(); 3],
                actual: vec![u.len(), v.len(), w.len()],
            }
            .into());
        }
        for x in z.iter().chain(&u).chain(&v).chain(&w) {
            ensure_finite(*x, "inflow table entry")?;
        }
        if z.windows(2).any(|p| p[1] <= p[0]) {
            return Err(CoreError::NonMonotonicAxis { axis: "inflow z" }.into());
        }
        Ok(Self { z, u, v, w })
    }

    fn interp(&self, values: &[f64], at: f64) -> f64 {
        let last = self.z.len() - 1;
        if at <= self.z[0] {
            return values[0];
        }
        if at >= self.z[last] {
            return values[last];
        }
        let hi = self.z.partition_point(|&zi| zi < at);
        let lo = hi - 1;
        let t = (at - self.z[lo]) / (self.z[hi] - self.z[lo]);
        values[lo] + t * (values[hi] - values[lo])
    }
}

impl InflowProfile for TabulatedInflow {
    fn velocity(&self, z: &Array1<f64>) -> AppResult<InflowVelocity> {
        Ok(InflowVelocity {
            u: z.mapv(|zi| self.interp(&self.u, zi)),
            v: z.mapv(|zi| self.interp(&self.v, zi)),
            w: z.mapv(|zi| self.interp(&self.w, zi)),
        })
    }
}

/// Where the reference inflow comes from.
#[derive(Debug, Default)]
pub enum InflowSource {
    /// Mean velocities on the first x plane, averaged over y. w is taken as zero.
    #[default]
    Budgets,
    /// Mean velocities averaged over the whole horizontal plane. w is taken as zero.
    PlaneAverage,
    Profile(Box<dyn InflowProfile>),
}

#[derive(Debug, Default)]
pub struct WakeOptions {
    pub source: InflowSource,
    /// Also compute `wwake` (needs `wbar`).
    pub include_w: bool,
    /// Recompute even when the wake terms are already cached.
    pub overwrite: bool,
}

/// Mean over y of the `x = 0` plane.
pub fn inlet_profile(mean: ArrayView3<f64>) -> Array1<f64> {
    let nz = mean.len_of(Axis(2));
    mean.index_axis(Axis(0), 0)
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(nz))
}

/// `inflow(z) - mean(x, y, z)`, the inflow broadcast over the horizontal plane.
pub fn wake_deficit(inflow: &Array1<f64>, mean: &Array3<f64>) -> AppResult<Array3<f64>> {
    let nz = mean.len_of(Axis(2));
    if inflow.len() != nz {
        return Err(CoreError::ShapeMismatch {
            what: "inflow profile".to_string(),
            expected: vec![nz],
            actual: vec![inflow.len()],
        }
        .into());
    }
    let mut deficit = mean.clone();
    for ((_, _, k), value) in deficit.indexed_iter_mut() {
        *value = inflow[k] - *value;
    }
    Ok(deficit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn deficit_broadcasts_over_plane() {
        let mean = Array3::from_elem((2, 3, 4), 6.0);
        let inflow = array![8.0, 9.0, 10.0, 11.0];
        let wake = wake_deficit(&inflow, &mean).unwrap();
        for ((_, _, k), v) in wake.indexed_iter() {
            assert_eq!(*v, inflow[k] - 6.0);
        }
        assert!(wake_deficit(&array![1.0], &mean).is_err());
    }

    #[test]
    fn inlet_profile_averages_first_plane() {
        let mean = Array3::from_shape_fn((2, 2, 3), |(i, j, k)| (100 * i + 10 * j + k) as f64);
        assert_eq!(inlet_profile(mean.view()), array![5.0, 6.0, 7.0]);
    }

    #[test]
    fn tabulated_interpolation_is_clamped() {
        let table = TabulatedInflow::new(
            vec![0.0, 1.0, 2.0],
            vec![0.0, 2.0, 4.0],
            vec![1.0, 1.0, 1.0],
            vec![0.0; 3],
        )
        .unwrap();
        let vel = table.velocity(&array![-1.0, 0.5, 1.5, 3.0]).unwrap();
        assert_eq!(vel.u, array![0.0, 1.0, 3.0, 4.0]);
        assert_eq!(vel.v, array![1.0, 1.0, 1.0, 1.0]);
        assert!(TabulatedInflow::new(vec![1.0, 0.0], vec![0.0; 2], vec![0.0; 2], vec![0.0; 2]).is_err());
        assert!(TabulatedInflow::new(vec![0.0, 1.0], vec![f64::NAN, 0.0], vec![0.0; 2], vec![0.0; 2]).is_err());
    }
}
