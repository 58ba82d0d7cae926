//! Session layer for budgetio.
//!
//! A [`BudgetSession`] binds one run directory (or archive) to a grid, a configuration,
//! an optional turbine array and an in-memory budget cache. Reads, slices, wake deficits
//! and archive writes all go through it.

pub mod cache;
pub mod error;
pub mod readers;
pub mod report;
pub mod session;
pub mod slice;
pub mod terms;
pub mod wake;

// Re-export key types for convenience
pub use cache::BudgetCache;
pub use error::{AppError, AppResult};
pub use readers::TidxSelection;
pub use report::{Notice, ReadReport};
pub use session::{BudgetSession, Origin, SessionOptions, WriteRequest, default_stem};
pub use slice::{Bound, SliceBounds, SliceResult, XyProfiles};
pub use terms::{Resolution, TermSelector};
pub use wake::{ConstantInflow, InflowProfile, InflowSource, InflowVelocity, TabulatedInflow, WakeOptions};

pub use bio_results::{ArchiveFormat, BackendKind, PlaneAxis, TurbineProperty};
