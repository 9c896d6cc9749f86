/// Solar radius (m), IAU 2015 nominal value. All model radii are expressed
/// as multiples of this, so it only enters when exporting physical lengths.
pub const R_SUN_M: f64 = 6.957e8;

/// Gauss per tesla, for magnetogram unit conversions.
pub const GAUSS_PER_TESLA: f64 = 1.0e4;

/// Degrees per radian.
pub const DEG_PER_RAD: f64 = 180.0 / std::f64::consts::PI;
