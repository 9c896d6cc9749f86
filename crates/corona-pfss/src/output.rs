//! Computed potential-field solution and its query surface.

use crate::coords::{cart2strum, CoordSequence};
use crate::map::{validation, BUnit, SynopticMap};
use corona_math::contour::zero_contours;
use corona_math::interp::trilinear_vec;
use corona_types::error::{CoronaError, CoronaResult};
use corona_types::frame::CarringtonFrame;
use corona_types::grid::Grid;
use ndarray::{Array2, Array3, Array4};
use ndarray_npy::WriteNpyExt;
use std::fs::File;
use std::io::BufWriter;

/// Below this sine of colatitude a point counts as polar and the tangential
/// field components are reported as zero.
const POLE_SIGMA_TOL: f64 = 1e-10;

/// Tolerance on the radial domain check in `get_bvec`, photospheric radii.
const DOMAIN_TOL: f64 = 1e-9;

/// The solved coronal field between the photosphere and the source surface.
///
/// Holds the vector-potential edge circulations, the face-centred field
/// components and a node-centred weighted field used for interpolation.
pub struct Output {
    map: SynopticMap,
    grid: Grid,
    alr: Array3<f64>,
    als: Array3<f64>,
    alp: Array3<f64>,
    br: Array3<f64>,
    bs: Array3<f64>,
    bp: Array3<f64>,
    bg: Array4<f64>,
}

impl Output {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        map: SynopticMap,
        grid: Grid,
        alr: Array3<f64>,
        als: Array3<f64>,
        alp: Array3<f64>,
        br: Array3<f64>,
        bs: Array3<f64>,
        bp: Array3<f64>,
        bg: Array4<f64>,
    ) -> Self {
        Output {
            map,
            grid,
            alr,
            als,
            alp,
            br,
            bs,
            bp,
            bg,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The boundary map the solution was computed from.
    pub fn input_map(&self) -> &SynopticMap {
        &self.map
    }

    /// Carrington frame of the solution, carrying the source-surface radius.
    pub fn coordinate_frame(&self) -> CarringtonFrame {
        CarringtonFrame::new(self.map.meta.obstime, self.grid.rss)
    }

    /// Unit of the field values. Falls back to dimensionless with a warning
    /// when the boundary map carries no parseable unit.
    pub fn bunit(&self) -> BUnit {
        match &self.map.meta.bunit {
            None => {
                log::warn!("boundary map carries no unit, assuming dimensionless");
                BUnit::Dimensionless
            }
            Some(raw) => match BUnit::parse(raw) {
                Some(u) => u,
                None => {
                    log::warn!("could not parse map unit {raw:?}, assuming dimensionless");
                    BUnit::Dimensionless
                }
            },
        }
    }

    /// Edge circulations of the vector potential: (rho, s, phi) components.
    pub fn al(&self) -> (&Array3<f64>, &Array3<f64>, &Array3<f64>) {
        (&self.alr, &self.als, &self.alp)
    }

    /// Face-centred field components: (B_r, B_s, B_phi).
    pub fn bc(&self) -> (&Array3<f64>, &Array3<f64>, &Array3<f64>) {
        (&self.br, &self.bs, &self.bp)
    }

    /// Node-centred weighted field, shape (nphi + 1, ns + 1, nr + 1, 3).
    pub fn bg(&self) -> &Array4<f64> {
        &self.bg
    }

    /// Radial field at the source surface, as a synoptic map in the input
    /// map's projection and unit.
    pub fn source_surface_br(&self) -> SynopticMap {
        let (ns, nphi, nr) = (self.grid.ns, self.grid.nphi, self.grid.nr);
        let data = Array2::from_shape_fn((ns, nphi), |(j, i)| self.br[[i, j, nr]]);
        SynopticMap::new(data, self.map.meta.clone())
    }

    /// Polarity-inversion lines of the source-surface field, as coordinate
    /// sequences at r = rss.
    pub fn source_surface_pils(&self) -> Vec<CoordSequence> {
        let ss = self.source_surface_br();
        let contours = zero_contours(&ss.data, &self.grid.pc, &self.grid.sc);
        let frame = self.coordinate_frame();
        contours
            .into_iter()
            .map(|line| {
                let points = line
                    .into_iter()
                    .map(|(phi, s)| {
                        let sigma = (1.0 - s * s).max(0.0).sqrt();
                        let r = self.grid.rss;
                        [r * sigma * phi.cos(), r * sigma * phi.sin(), r * s]
                    })
                    .collect();
                CoordSequence::from_cartesian(frame, points)
            })
            .collect()
    }

    /// Fractional grid indices of a strum point.
    pub(crate) fn grid_index(&self, rho: f64, s: f64, phi: f64) -> (f64, f64, f64) {
        (
            phi / self.grid.dphi,
            (s + 1.0) / self.grid.ds,
            rho / self.grid.drho,
        )
    }

    /// Sample the field at a strum point, returning (B_r, B_s, B_phi).
    pub(crate) fn sample(&self, rho: f64, s: f64, phi: f64) -> [f64; 3] {
        let (fi, fj, fk) = self.grid_index(rho, s, phi);
        let w = trilinear_vec(&self.bg, fi, fj, fk);
        let sigma = (1.0 - s * s).max(0.0).sqrt();
        if sigma < POLE_SIGMA_TOL {
            [w[2], 0.0, 0.0]
        } else {
            [w[2], w[1] / sigma, w[0] * sigma]
        }
    }

    /// Interpolate the field at arbitrary points.
    ///
    /// `out_type` selects the component basis: "spherical" gives
    /// (B_r, B_theta, B_phi) rows, "cartesian" gives (B_x, B_y, B_z).
    /// Points outside [1, rss] are clamped to the domain with a warning, as
    /// is a query whose epoch differs from the map's.
    pub fn get_bvec(&self, coords: &CoordSequence, out_type: &str) -> CoronaResult<Array2<f64>> {
        if out_type != "spherical" && out_type != "cartesian" {
            return Err(CoronaError::Config(format!(
                "out_type must be \"spherical\" or \"cartesian\", got {out_type:?}"
            )));
        }
        if coords.is_empty() {
            return Err(validation("at least one coordinate point is required"));
        }
        let frame = self.coordinate_frame();
        if !coords.frame().same_epoch(&frame) {
            log::warn!(
                "coordinate epoch {} differs from the map epoch {}",
                coords.frame().obstime,
                frame.obstime
            );
        }

        let mut warned_domain = false;
        let mut out = Array2::<f64>::zeros((coords.len(), 3));
        for (n, &[x, y, z]) in coords.points().iter().enumerate() {
            let (rho, s, phi) = cart2strum(x, y, z);
            let r = rho.exp();
            if !warned_domain && (r < 1.0 - DOMAIN_TOL || r > self.grid.rss + DOMAIN_TOL) {
                log::warn!("point radius {r} outside [1, {}], clamping", self.grid.rss);
                warned_domain = true;
            }
            let [bradial, bsv, bphi] = self.sample(rho, s, phi);
            match out_type {
                "spherical" => {
                    out[[n, 0]] = bradial;
                    out[[n, 1]] = -bsv;
                    out[[n, 2]] = bphi;
                }
                _ => {
                    let sigma = (1.0 - s * s).max(0.0).sqrt();
                    let (cp, sp) = (phi.cos(), phi.sin());
                    let btheta = -bsv;
                    out[[n, 0]] = bradial * sigma * cp + btheta * s * cp - bphi * sp;
                    out[[n, 1]] = bradial * sigma * sp + btheta * s * sp + bphi * cp;
                    out[[n, 2]] = bradial * s - btheta * sigma;
                }
            }
        }
        Ok(out)
    }

    /// Write the node-centred field to a .npy file.
    pub fn write_bg(&self, path: &str) -> CoronaResult<()> {
        let file = File::create(path)?;
        self.bg
            .write_npy(BufWriter::new(file))
            .map_err(|e| CoronaError::Npy(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Input, OuterBoundary};
    use crate::map::MapMeta;
    use crate::solver::pfss;
    use chrono::TimeZone;
    use chrono::Utc;

    fn dipole_output() -> Output {
        let (ns, nphi) = (30, 20);
        let meta = MapMeta::carrington_cea(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            (ns, nphi),
        );
        let data = Array2::from_shape_fn((ns, nphi), |(j, _)| {
            let s = -1.0 + 2.0 * (j as f64 + 0.5) / ns as f64;
            2.0 * s
        });
        let map = SynopticMap::new(data, meta);
        let input = Input::new(map, 10, 2.5, OuterBoundary::Radial).unwrap();
        pfss(&input).unwrap()
    }

    #[test]
    fn test_source_surface_map_shape_and_meta() {
        let out = dipole_output();
        let ss = out.source_surface_br();
        assert_eq!(ss.shape(), (30, 20));
        assert!(ss.is_cea());
        assert_eq!(ss.meta.obstime, out.input_map().meta.obstime);
    }

    #[test]
    fn test_dipole_pil_lies_on_equator() {
        let out = dipole_output();
        let pils = out.source_surface_pils();
        assert!(!pils.is_empty());
        let mut total = 0;
        for pil in &pils {
            for &(_, lat, r) in &pil.to_spherical() {
                assert!(lat.abs() < 1.0, "PIL latitude {lat} deg");
                assert!((r - 2.5).abs() < 1e-12);
                total += 1;
            }
        }
        assert!(total > 10);
    }

    #[test]
    fn test_get_bvec_rejects_bad_out_type() {
        let out = dipole_output();
        let coords = CoordSequence::from_spherical(
            out.coordinate_frame(),
            &[0.0],
            &[45.0],
            &[1.5],
        )
        .unwrap();
        assert!(out.get_bvec(&coords, "cylindrical").is_err());
        assert!(out.get_bvec(&coords, "spherical").is_ok());
    }

    #[test]
    fn test_get_bvec_rejects_empty_input() {
        let out = dipole_output();
        let coords = CoordSequence::from_cartesian(out.coordinate_frame(), vec![]);
        assert!(out.get_bvec(&coords, "spherical").is_err());
    }

    #[test]
    fn test_dipole_bvec_matches_known_signs() {
        let out = dipole_output();
        let coords = CoordSequence::from_spherical(
            out.coordinate_frame(),
            &[10.0, 10.0],
            &[75.0, -75.0],
            &[1.01, 1.01],
        )
        .unwrap();
        let b = out.get_bvec(&coords, "spherical").unwrap();
        // northern point: outward radial field; southern: inward
        assert!(b[[0, 0]] > 0.0);
        assert!(b[[1, 0]] < 0.0);
        // axisymmetric solution: no azimuthal component
        assert!(b[[0, 2]].abs() < 1e-10);
        // cartesian basis change preserves the magnitude
        let c = out.get_bvec(&coords, "cartesian").unwrap();
        for n in 0..2 {
            let ms: f64 = (0..3).map(|k| b[[n, k]] * b[[n, k]]).sum();
            let mc: f64 = (0..3).map(|k| c[[n, k]] * c[[n, k]]).sum();
            assert!((ms - mc).abs() < 1e-12 * ms.max(1.0));
        }
    }

    #[test]
    fn test_bunit_fallback() {
        let mut out = dipole_output();
        out.map.meta.bunit = Some("G".to_string());
        assert_eq!(out.bunit(), BUnit::Gauss);
        out.map.meta.bunit = Some("furlongs".to_string());
        assert_eq!(out.bunit(), BUnit::Dimensionless);
        out.map.meta.bunit = None;
        assert_eq!(out.bunit(), BUnit::Dimensionless);
    }
}
