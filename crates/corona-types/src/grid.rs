//! The discretized spherical-shell coordinate system.
//!
//! The solution domain is the shell between the photosphere (r = 1) and the
//! source surface (r = rss), discretized on a grid that is equally spaced in
//! rho = ln(r), s = cos(theta) and phi. Equal spacing in s makes every
//! radial-face cell carry the same solid angle, which is what lets the
//! solver treat the inner magnetogram column-by-column without area weights.

use crate::error::{CoronaError, CoronaResult};
use ndarray::Array1;

/// Immutable grid parameters and derived coordinate arrays.
///
/// `*c` arrays hold cell-centre coordinates, `*g` arrays cell-edge
/// coordinates (one element longer). All three coordinates are stored in
/// their transformed form: `pc`/`pg` in radians, `sc`/`sg` in cos(theta),
/// `rc`/`rg` in ln(r).
#[derive(Debug, Clone)]
pub struct Grid {
    pub ns: usize,
    pub nphi: usize,
    pub nr: usize,
    pub rss: f64,
    pub ds: f64,
    pub dphi: f64,
    pub drho: f64,
    pub pc: Array1<f64>,
    pub pg: Array1<f64>,
    pub sc: Array1<f64>,
    pub sg: Array1<f64>,
    pub rc: Array1<f64>,
    pub rg: Array1<f64>,
}

impl Grid {
    /// Build a grid with `ns` cells in s, `nphi` in phi, `nr` in rho, and a
    /// source surface at `rss` photospheric radii.
    pub fn new(ns: usize, nphi: usize, nr: usize, rss: f64) -> CoronaResult<Self> {
        if ns == 0 || nphi == 0 || nr == 0 {
            return Err(CoronaError::Validation(format!(
                "grid cell counts must be positive, got ns={ns}, nphi={nphi}, nr={nr}"
            )));
        }
        if !(rss > 1.0) || !rss.is_finite() {
            return Err(CoronaError::Validation(format!(
                "source surface must lie strictly outside the photosphere, got rss={rss}"
            )));
        }

        let ds = 2.0 / ns as f64;
        let dphi = 2.0 * std::f64::consts::PI / nphi as f64;
        let rho_ss = rss.ln();
        let drho = rho_ss / nr as f64;

        let pg = Array1::from_shape_fn(nphi + 1, |i| i as f64 * dphi);
        let pc = Array1::from_shape_fn(nphi, |i| (i as f64 + 0.5) * dphi);
        let sg = Array1::from_shape_fn(ns + 1, |j| -1.0 + j as f64 * ds);
        let sc = Array1::from_shape_fn(ns, |j| -1.0 + (j as f64 + 0.5) * ds);
        let rg = Array1::from_shape_fn(nr + 1, |k| k as f64 * drho);
        let rc = Array1::from_shape_fn(nr, |k| (k as f64 + 0.5) * drho);

        Ok(Grid {
            ns,
            nphi,
            nr,
            rss,
            ds,
            dphi,
            drho,
            pc,
            pg,
            sc,
            sg,
            rc,
            rg,
        })
    }

    /// ln(rss): the rho coordinate of the source surface.
    pub fn rho_ss(&self) -> f64 {
        self.rss.ln()
    }
}
