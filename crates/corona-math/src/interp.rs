//! Trilinear interpolation of a node-centred vector field.
//!
//! The dense PFSS field is sampled at grid nodes of shape
//! `(nphi + 1, ns + 1, nr + 1, 3)` with the first and last phi slices
//! identical, so interpolation is periodic in the first axis and clamped in
//! the other two.

use ndarray::Array4;

/// Interpolate all three components of `field` at the fractional index
/// position `(fi, fj, fk)` (phi, s, rho axes).
///
/// `fi` is wrapped into `[0, nphi)`; `fj` and `fk` are clamped to the grid.
pub fn trilinear_vec(field: &Array4<f64>, fi: f64, fj: f64, fk: f64) -> [f64; 3] {
    let (np1, ns1, nr1, _) = field.dim();
    let nphi = np1 - 1;
    let ns = ns1 - 1;
    let nr = nr1 - 1;

    let fi = fi.rem_euclid(nphi as f64);
    let fj = fj.clamp(0.0, ns as f64);
    let fk = fk.clamp(0.0, nr as f64);

    let i0 = (fi.floor() as usize).min(nphi - 1);
    let j0 = (fj.floor() as usize).min(ns.saturating_sub(1));
    let k0 = (fk.floor() as usize).min(nr.saturating_sub(1));
    let i1 = i0 + 1; // valid: the periodic duplicate slice exists at nphi
    let j1 = (j0 + 1).min(ns);
    let k1 = (k0 + 1).min(nr);

    let ti = (fi - i0 as f64).clamp(0.0, 1.0);
    let tj = (fj - j0 as f64).clamp(0.0, 1.0);
    let tk = (fk - k0 as f64).clamp(0.0, 1.0);

    let mut out = [0.0; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let c000 = field[[i0, j0, k0, c]];
        let c100 = field[[i1, j0, k0, c]];
        let c010 = field[[i0, j1, k0, c]];
        let c110 = field[[i1, j1, k0, c]];
        let c001 = field[[i0, j0, k1, c]];
        let c101 = field[[i1, j0, k1, c]];
        let c011 = field[[i0, j1, k1, c]];
        let c111 = field[[i1, j1, k1, c]];

        let c00 = c000 * (1.0 - ti) + c100 * ti;
        let c10 = c010 * (1.0 - ti) + c110 * ti;
        let c01 = c001 * (1.0 - ti) + c101 * ti;
        let c11 = c011 * (1.0 - ti) + c111 * ti;

        let c0 = c00 * (1.0 - tj) + c10 * tj;
        let c1 = c01 * (1.0 - tj) + c11 * tj;

        *slot = c0 * (1.0 - tk) + c1 * tk;
    }
    out
}
