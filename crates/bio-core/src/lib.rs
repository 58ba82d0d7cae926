//! bio-core: stable foundation for budgetio.
//!
//! Contains:
//! - keys (bidirectional term name <-> (budget, term) registry)
//! - grid (axis arrays, staggering, origin re-centering)
//! - numeric (Real, finiteness check, nearest-index helpers)
//! - error (shared error types)

pub mod error;
pub mod grid;
pub mod keys;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use grid::{Axis, Grid, AXIS_NAMES};
pub use keys::{KeyRegistry, TermKey, budget};
pub use numeric::*;
