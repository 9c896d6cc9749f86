//! Shared types for the corona PFSS solver: error taxonomy, physical
//! constants, the spherical-shell grid and the Carrington model frame.

pub mod constants;
pub mod error;
pub mod frame;
pub mod grid;
