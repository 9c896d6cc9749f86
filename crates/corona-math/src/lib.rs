//! Numerical primitives for the corona PFSS solver.

pub mod contour;
pub mod eigen;
pub mod fft;
pub mod interp;
pub mod rk45;
pub mod tridiag;
