//! Coordinate representations and conversions.
//!
//! The solver's native coordinates are (rho = ln r, s = cos theta, phi),
//! "strum" for short. Seed points and results travel as `CoordSequence`
//! collections: Cartesian storage in units of the photospheric radius, tied
//! to a Carrington frame.

use corona_types::error::{CoronaError, CoronaResult};
use corona_types::frame::CarringtonFrame;

/// Cartesian (x, y, z) to (rho, s, phi). phi is wrapped into [0, 2*pi).
pub fn cart2strum(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let r = (x * x + y * y + z * z).sqrt();
    let rho = r.ln();
    let s = if r > 0.0 { z / r } else { 0.0 };
    let phi = y.atan2(x).rem_euclid(2.0 * std::f64::consts::PI);
    (rho, s, phi)
}

/// (rho, s, phi) to Cartesian (x, y, z).
pub fn strum2cart(rho: f64, s: f64, phi: f64) -> (f64, f64, f64) {
    let r = rho.exp();
    let sigma = (1.0 - s * s).max(0.0).sqrt();
    (r * sigma * phi.cos(), r * sigma * phi.sin(), r * s)
}

/// An ordered collection of 3-D points in a shared frame.
#[derive(Debug, Clone)]
pub struct CoordSequence {
    frame: CarringtonFrame,
    points: Vec<[f64; 3]>,
}

impl CoordSequence {
    /// Build from Cartesian points in photospheric radii.
    pub fn from_cartesian(frame: CarringtonFrame, points: Vec<[f64; 3]>) -> Self {
        CoordSequence { frame, points }
    }

    /// Build from spherical coordinates: Carrington longitude and latitude in
    /// degrees, radius in photospheric radii. The slices must agree in
    /// length.
    pub fn from_spherical(
        frame: CarringtonFrame,
        lon_deg: &[f64],
        lat_deg: &[f64],
        radius: &[f64],
    ) -> CoronaResult<Self> {
        if lon_deg.len() != lat_deg.len() || lon_deg.len() != radius.len() {
            return Err(CoronaError::ShapeMismatch {
                expected: vec![lon_deg.len()],
                got: vec![lat_deg.len(), radius.len()],
            });
        }
        let points = lon_deg
            .iter()
            .zip(lat_deg)
            .zip(radius)
            .map(|((&lon, &lat), &r)| {
                let lon = lon.to_radians();
                let lat = lat.to_radians();
                [
                    r * lat.cos() * lon.cos(),
                    r * lat.cos() * lon.sin(),
                    r * lat.sin(),
                ]
            })
            .collect();
        Ok(CoordSequence { frame, points })
    }

    pub fn frame(&self) -> &CarringtonFrame {
        &self.frame
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Spherical view: (longitude deg in [0, 360), latitude deg, radius).
    pub fn to_spherical(&self) -> Vec<(f64, f64, f64)> {
        self.points
            .iter()
            .map(|&[x, y, z]| {
                let r = (x * x + y * y + z * z).sqrt();
                let lat = if r > 0.0 { (z / r).asin() } else { 0.0 };
                let lon = y.atan2(x).rem_euclid(2.0 * std::f64::consts::PI);
                (lon.to_degrees(), lat.to_degrees(), r)
            })
            .collect()
    }

    /// Strum view: (rho, s, phi) per point.
    pub fn to_strum(&self) -> Vec<(f64, f64, f64)> {
        self.points
            .iter()
            .map(|&[x, y, z]| cart2strum(x, y, z))
            .collect()
    }

    /// Radii of all points, photospheric radii.
    pub fn radii(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|&[x, y, z]| (x * x + y * y + z * z).sqrt())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    fn frame() -> CarringtonFrame {
        CarringtonFrame::new(Utc.with_ymd_and_hms(1992, 12, 21, 0, 0, 0).unwrap(), 2.5)
    }

    #[test]
    fn test_unit_x_roundtrip() {
        let (rho, s, phi) = cart2strum(1.0, 0.0, 0.0);
        assert!(rho.abs() < 1e-15);
        assert!(s.abs() < 1e-15);
        assert!(phi.abs() < 1e-15);
        let (x, y, z) = strum2cart(rho, s, phi);
        assert!((x - 1.0).abs() < 1e-15);
        assert!(y.abs() < 1e-15);
        assert!(z.abs() < 1e-15);
    }

    #[test]
    fn test_roundtrip_sampled_sphere() {
        for &lat in &[-80.0_f64, -30.0, 0.0, 45.0, 89.0] {
            for &lon in &[0.0_f64, 90.0, 181.0, 359.0] {
                let lat_r = lat.to_radians();
                let lon_r = lon.to_radians();
                let p = [
                    lat_r.cos() * lon_r.cos(),
                    lat_r.cos() * lon_r.sin(),
                    lat_r.sin(),
                ];
                let (rho, s, phi) = cart2strum(p[0], p[1], p[2]);
                let (x, y, z) = strum2cart(rho, s, phi);
                assert!((x - p[0]).abs() < 1e-12);
                assert!((y - p[1]).abs() < 1e-12);
                assert!((z - p[2]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_spherical_constructor_and_view() {
        let seq =
            CoordSequence::from_spherical(frame(), &[10.0, 200.0], &[45.0, -45.0], &[1.0, 2.0])
                .unwrap();
        assert_eq!(seq.len(), 2);
        let sph = seq.to_spherical();
        assert!((sph[0].0 - 10.0).abs() < 1e-10);
        assert!((sph[0].1 - 45.0).abs() < 1e-10);
        assert!((sph[0].2 - 1.0).abs() < 1e-12);
        assert!((sph[1].0 - 200.0).abs() < 1e-10);
        assert!((sph[1].2 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_spherical_constructor_length_mismatch() {
        let err = CoordSequence::from_spherical(frame(), &[0.0, 1.0], &[0.0], &[1.0, 1.0]);
        assert!(err.is_err());
    }
}
