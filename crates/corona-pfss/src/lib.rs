//! Potential-field source-surface (PFSS) extrapolation of the solar
//! coronal magnetic field.
//!
//! From a full-sun synoptic map of the photospheric radial field, computes
//! the unique current-free field between the photosphere and a spherical
//! source surface where the field is forced radial (or pinned to a second
//! map), then traces field lines through the solution.
//!
//! ```no_run
//! use corona_pfss::{pfss, BatchTracer, FieldLineTracer, Input, OuterBoundary, SynopticMap};
//!
//! # fn run() -> corona_types::error::CoronaResult<()> {
//! let map = SynopticMap::from_file("gong.json")?;
//! let input = Input::new(map, 30, 2.5, OuterBoundary::Radial)?;
//! let output = pfss(&input)?;
//! let ss = output.source_surface_br();
//! # Ok(())
//! # }
//! ```

pub mod coords;
pub mod fieldline;
pub mod input;
pub mod map;
pub mod output;
pub mod solver;
pub mod tracing;

pub use coords::CoordSequence;
pub use fieldline::{FieldLine, FieldLines};
pub use input::{Input, OuterBoundary};
pub use map::{BUnit, MapMeta, Projection, SynopticMap};
pub use output::Output;
pub use solver::pfss;
pub use tracing::{BatchTracer, FieldLineTracer, ReferenceTracer};
