//! Physical coordinate grid of a run.
//!
//! x and y are node-centered starting at zero; z is cell-centered, staggered half a cell
//! above the lower boundary. Coordinates can be re-centered on an arbitrary origin (for
//! example a turbine hub) and restored afterwards.

use ndarray::Array1;

use crate::error::{CoreError, CoreResult};

pub const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];

/// One coordinate axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Axis {
    name: &'static str,
    /// Current coordinates, shifted by the grid origin.
    coords: Array1<f64>,
    /// Coordinates in the unshifted frame; recentering is always recomputed from these.
    base: Array1<f64>,
    spacing: Option<f64>,
    extent: f64,
}

impl Axis {
    fn explicit(name: &'static str, coords: Array1<f64>, offset: f64) -> CoreResult<Self> {
        if coords.is_empty() {
            return Err(CoreError::InvalidArg {
                what: "axis must have at least one point",
            });
        }
        if coords.windows(2).into_iter().any(|w| w[1] <= w[0]) {
            return Err(CoreError::NonMonotonicAxis { axis: name });
        }
        let spacing = (coords.len() > 1).then(|| coords[1] - coords[0]);
        let extent = coords[coords.len() - 1] - coords[0];
        let base = if offset == 0.0 {
            coords.clone()
        } else {
            &coords + offset
        };
        Ok(Self {
            name,
            coords,
            base,
            spacing,
            extent,
        })
    }

    fn uniform(name: &'static str, length: f64, n: usize, staggered: bool) -> CoreResult<Self> {
        if n == 0 {
            return Err(CoreError::InvalidArg {
                what: "cell count must be positive",
            });
        }
        if !(length.is_finite() && length > 0.0) {
            return Err(CoreError::NonFinite {
                what: "domain length",
                value: length,
            });
        }
        let d = length / n as f64;
        let coords = if staggered {
            Array1::linspace(d / 2.0, length - d / 2.0, n)
        } else {
            Array1::linspace(0.0, length - d, n)
        };
        Ok(Self {
            name,
            base: coords.clone(),
            coords,
            spacing: (n > 1).then_some(d),
            extent: length,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn coords(&self) -> &Array1<f64> {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Uniform spacing; `None` for single-point axes.
    pub fn spacing(&self) -> Option<f64> {
        self.spacing
    }

    /// Domain length for uniform axes, coordinate span for explicit ones.
    pub fn extent(&self) -> f64 {
        self.extent
    }

    fn shift_to(&mut self, origin: f64) {
        self.coords = if origin == 0.0 {
            self.base.clone()
        } else {
            &self.base - origin
        };
    }
}

/// Three axes plus the origin the coordinates are currently expressed relative to.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    axes: [Axis; 3],
    origin: [f64; 3],
    normalized: bool,
}

impl Grid {
    /// Builds a grid from explicit coordinates already expressed relative to `origin`.
    pub fn from_axes(
        x: Array1<f64>,
        y: Array1<f64>,
        z: Array1<f64>,
        origin: [f64; 3],
    ) -> CoreResult<Self> {
        let [ox, oy, oz] = origin;
        Ok(Self {
            axes: [
                Axis::explicit(AXIS_NAMES[0], x, ox)?,
                Axis::explicit(AXIS_NAMES[1], y, oy)?,
                Axis::explicit(AXIS_NAMES[2], z, oz)?,
            ],
            origin,
            normalized: false,
        })
    }

    /// Builds the solver's uniform grid from domain lengths and cell counts.
    pub fn from_extents(lengths: [f64; 3], counts: [usize; 3]) -> CoreResult<Self> {
        let mut axes = Vec::with_capacity(3);
        for (i, name) in AXIS_NAMES.iter().enumerate() {
            axes.push(Axis::uniform(name, lengths[i], counts[i], i == 2)?);
        }
        let [x, y, z]: [Axis; 3] = axes.try_into().map_err(|_| CoreError::InvalidArg {
            what: "grid needs exactly three axes",
        })?;
        Ok(Self {
            axes: [x, y, z],
            origin: [0.0; 3],
            normalized: false,
        })
    }

    pub fn x(&self) -> &Axis {
        &self.axes[0]
    }

    pub fn y(&self) -> &Axis {
        &self.axes[1]
    }

    pub fn z(&self) -> &Axis {
        &self.axes[2]
    }

    pub fn axes(&self) -> &[Axis; 3] {
        &self.axes
    }

    /// `(nx, ny, nz)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.axes[0].len(), self.axes[1].len(), self.axes[2].len())
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.axes[0].len(), self.axes[1].len(), self.axes[2].len()]
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Moves the origin to `target`, or restores the unshifted frame when `None`.
    ///
    /// Re-applying the current origin is a no-op.
    pub fn recenter(&mut self, target: Option<[f64; 3]>) {
        match target {
            Some(t) if self.normalized && t == self.origin => {}
            Some(t) => {
                for (axis, o) in self.axes.iter_mut().zip(t) {
                    axis.shift_to(o);
                }
                self.origin = t;
                self.normalized = true;
            }
            None => {
                for axis in &mut self.axes {
                    axis.shift_to(0.0);
                }
                self.origin = [0.0; 3];
                self.normalized = false;
            }
        }
    }
}
