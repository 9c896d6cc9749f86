//! Synoptic magnetogram maps and their metadata.
//!
//! This is the narrow stand-in for the full map layer the model consumes:
//! a data array plus just enough projection/frame/unit metadata to validate
//! a boundary condition. FITS parsing and reprojection live outside the
//! core; maps arrive here already resampled onto the equal-area grid.

use chrono::{DateTime, Utc};
use corona_types::error::{CoronaError, CoronaResult};
use corona_types::frame::CarringtonFrame;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Relative tolerance for full-sphere coverage checks.
const COVERAGE_TOL: f64 = 1e-6;

/// Map projection identifier, following the FITS CTYPE suffix convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    /// Cylindrical equal area: regular in phi and s = cos(theta).
    #[serde(rename = "CEA")]
    CylindricalEqualArea,
    /// Plate carrée: regular in phi and theta. Not valid solver input.
    #[serde(rename = "CAR")]
    PlateCarree,
}

/// World-coordinate metadata for a synoptic map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapMeta {
    pub projection: Projection,
    /// Longitude span of one pixel, degrees.
    pub cdelt1: f64,
    /// cos(theta) span of one pixel (CEA) or latitude degrees (CAR).
    pub cdelt2: f64,
    pub obstime: DateTime<Utc>,
    /// Unit of the data values, e.g. "G" or "nT". Optional.
    pub bunit: Option<String>,
}

impl MapMeta {
    /// Metadata for a full-sphere Carrington CEA map of `(ns, nphi)` pixels.
    pub fn carrington_cea(obstime: DateTime<Utc>, shape: (usize, usize)) -> Self {
        let (ns, nphi) = shape;
        MapMeta {
            projection: Projection::CylindricalEqualArea,
            cdelt1: 360.0 / nphi as f64,
            cdelt2: 2.0 / ns as f64,
            obstime,
            bunit: None,
        }
    }
}

/// A full-sun synoptic map: `(ns, nphi)` data with row 0 at s = -1 (south)
/// and column 0 at Carrington longitude 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynopticMap {
    pub data: Array2<f64>,
    pub meta: MapMeta,
}

impl SynopticMap {
    pub fn new(data: Array2<f64>, meta: MapMeta) -> Self {
        SynopticMap { data, meta }
    }

    /// `(ns, nphi)` pixel counts.
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Check the cylindrical equal-area projection requirement.
    pub fn is_cea(&self) -> bool {
        self.meta.projection == Projection::CylindricalEqualArea
    }

    /// Check that the pixels tile the entire sphere: nphi * cdelt1 = 360 deg
    /// and ns * cdelt2 = 2 in cos(theta).
    pub fn is_full_sun(&self) -> bool {
        let (ns, nphi) = self.shape();
        let lon_span = nphi as f64 * self.meta.cdelt1;
        let s_span = ns as f64 * self.meta.cdelt2;
        (lon_span - 360.0).abs() < COVERAGE_TOL * 360.0 && (s_span - 2.0).abs() < COVERAGE_TOL * 2.0
    }

    /// The heliographic frame of this map (photospheric radius).
    pub fn frame(&self) -> CarringtonFrame {
        CarringtonFrame::new(self.meta.obstime, 1.0)
    }

    /// Load a map from a JSON file.
    pub fn from_file(path: &str) -> CoronaResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let map: Self = serde_json::from_str(&contents)?;
        Ok(map)
    }

    /// Write a map to a JSON file.
    pub fn to_file(&self, path: &str) -> CoronaResult<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Magnetic-field unit of a map's data values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BUnit {
    Gauss,
    Tesla,
    NanoTesla,
    /// Mx/cm^2, numerically identical to gauss for radial flux maps.
    MaxwellPerCm2,
    Dimensionless,
}

impl BUnit {
    /// Parse a FITS-style unit string. Returns `None` for anything
    /// unrecognized; the caller decides how loudly to fall back.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "G" | "Gauss" | "gauss" => Some(BUnit::Gauss),
            "T" | "Tesla" | "tesla" => Some(BUnit::Tesla),
            "nT" => Some(BUnit::NanoTesla),
            "Mx/cm^2" | "Mx/cm2" => Some(BUnit::MaxwellPerCm2),
            "" => Some(BUnit::Dimensionless),
            _ => None,
        }
    }

    /// Conversion factor to gauss, where defined.
    pub fn to_gauss(self) -> Option<f64> {
        use corona_types::constants::GAUSS_PER_TESLA;
        match self {
            BUnit::Gauss | BUnit::MaxwellPerCm2 => Some(1.0),
            BUnit::Tesla => Some(GAUSS_PER_TESLA),
            BUnit::NanoTesla => Some(1.0e-9 * GAUSS_PER_TESLA),
            BUnit::Dimensionless => None,
        }
    }
}

impl std::fmt::Display for BUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BUnit::Gauss => "G",
            BUnit::Tesla => "T",
            BUnit::NanoTesla => "nT",
            BUnit::MaxwellPerCm2 => "Mx/cm^2",
            BUnit::Dimensionless => "",
        };
        f.write_str(s)
    }
}

/// Build a validation error naming the failed requirement.
pub(crate) fn validation(msg: impl Into<String>) -> CoronaError {
    CoronaError::Validation(msg.into())
}
