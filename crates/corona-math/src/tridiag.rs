//! Thomas algorithm for tridiagonal systems.
//!
//! The PFSS solver reduces each (m, l) harmonic mode to a diagonally
//! dominant three-point boundary-value problem along rho, solved here.

/// Solve the tridiagonal system Ax = d with the Thomas algorithm.
///
/// - `sub`: sub-diagonal \[n\] (`sub[0]` unused)
/// - `diag`: main diagonal \[n\]
/// - `sup`: super-diagonal \[n\] (`sup[n-1]` unused)
/// - `rhs`: right-hand side \[n\]
///
/// Panics if a pivot vanishes (singular system). The radial systems built by
/// the solver are diagonally dominant, so this cannot happen for them.
pub fn thomas_solve(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = rhs.len();
    assert!(n > 0, "system size must be > 0");
    assert_eq!(sub.len(), n);
    assert_eq!(diag.len(), n);
    assert_eq!(sup.len(), n);

    let mut sup_p = vec![0.0; n];
    let mut rhs_p = vec![0.0; n];

    sup_p[0] = sup[0] / diag[0];
    rhs_p[0] = rhs[0] / diag[0];
    for i in 1..n {
        let pivot = diag[i] - sub[i] * sup_p[i - 1];
        assert!(pivot != 0.0, "singular tridiagonal system at row {i}");
        if i < n - 1 {
            sup_p[i] = sup[i] / pivot;
        }
        rhs_p[i] = (rhs[i] - sub[i] * rhs_p[i - 1]) / pivot;
    }

    let mut x = vec![0.0; n];
    x[n - 1] = rhs_p[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = rhs_p[i] - sup_p[i] * x[i + 1];
    }
    x
}
