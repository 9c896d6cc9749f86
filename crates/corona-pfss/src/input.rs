//! Validated input to the potential-field solver.
//!
//! Bundles the photospheric boundary map with the radial grid parameters and
//! the outer boundary condition, after checking everything the solver relies
//! on: an equal-area (CEA) projection, full-sphere coverage and finite data.

use crate::map::{validation, SynopticMap};
use corona_types::error::{CoronaError, CoronaResult};
use corona_types::grid::Grid;
use ndarray::Array2;

/// Condition imposed at the source surface.
#[derive(Debug, Clone)]
pub enum OuterBoundary {
    /// Purely radial field at the source surface (the classical choice).
    Radial,
    /// Prescribed radial field at the source surface, as a synoptic map with
    /// the same shape and projection as the photospheric one.
    Fixed(SynopticMap),
}

/// Boundary map plus grid parameters, validated and ready to solve.
#[derive(Debug, Clone)]
pub struct Input {
    map: SynopticMap,
    grid: Grid,
    /// Photospheric B_r in solver layout (phi, s).
    br: Array2<f64>,
    /// Source-surface B_r in solver layout, present for a fixed boundary.
    outer_br: Option<Array2<f64>>,
}

impl Input {
    /// Validate a photospheric map and grid parameters.
    ///
    /// `nr` is the number of radial cells and `rss` the source-surface
    /// radius in photospheric radii. The map must be a full-sun CEA map
    /// with finite values; a `Fixed` outer boundary must match it in shape
    /// and projection.
    pub fn new(
        map: SynopticMap,
        nr: usize,
        rss: f64,
        outer: OuterBoundary,
    ) -> CoronaResult<Self> {
        check_map(&map, "photospheric boundary")?;
        let (ns, nphi) = map.shape();
        let grid = Grid::new(ns, nphi, nr, rss)?;
        let br = to_solver_layout(&map.data);
        let outer_br = match outer {
            OuterBoundary::Radial => None,
            OuterBoundary::Fixed(outer_map) => {
                check_map(&outer_map, "source-surface boundary")?;
                if outer_map.shape() != map.shape() {
                    return Err(CoronaError::ShapeMismatch {
                        expected: vec![ns, nphi],
                        got: vec![outer_map.shape().0, outer_map.shape().1],
                    });
                }
                Some(to_solver_layout(&outer_map.data))
            }
        };
        Ok(Input {
            map,
            grid,
            br,
            outer_br,
        })
    }

    pub fn map(&self) -> &SynopticMap {
        &self.map
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Photospheric B_r in (phi, s) layout.
    pub fn br(&self) -> &Array2<f64> {
        &self.br
    }

    /// Source-surface B_r in (phi, s) layout, if a fixed outer boundary was
    /// requested.
    pub fn outer_br(&self) -> Option<&Array2<f64>> {
        self.outer_br.as_ref()
    }

    /// Symmetric display range (-lim, lim) covering the boundary data.
    pub fn display_range(&self) -> (f64, f64) {
        let lim = self.br.iter().fold(0.0_f64, |m, &v| m.max(v.abs()));
        (-lim, lim)
    }
}

fn check_map(map: &SynopticMap, label: &str) -> CoronaResult<()> {
    if !map.is_cea() {
        return Err(validation(format!(
            "{label} map must use the cylindrical-equal-area (CEA) projection"
        )));
    }
    if !map.is_full_sun() {
        return Err(validation(format!(
            "{label} map must cover the full sphere"
        )));
    }
    if map.data.iter().any(|v| !v.is_finite()) {
        return Err(validation(format!(
            "{label} map contains non-finite values"
        )));
    }
    Ok(())
}

/// Transpose map data (s, phi) into the solver's (phi, s) layout.
fn to_solver_layout(data: &Array2<f64>) -> Array2<f64> {
    let (ns, nphi) = data.dim();
    Array2::from_shape_fn((nphi, ns), |(i, j)| data[[j, i]])
}
