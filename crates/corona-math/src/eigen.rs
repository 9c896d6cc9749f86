//! Jacobi eigendecomposition for dense symmetric matrices.
//!
//! The latitudinal operator of each azimuthal wavenumber is a symmetric
//! (tridiagonal) ns-by-ns matrix; cyclic Jacobi rotations are simple,
//! unconditionally stable and plenty fast at synoptic-map resolutions.

use ndarray::{Array1, Array2};

const MAX_SWEEPS: usize = 64;
const OFF_DIAG_TOL: f64 = 1e-14;

/// Eigendecomposition of a symmetric matrix.
///
/// Returns `(eigenvalues, eigenvectors)` with eigenvalues ascending and
/// eigenvectors as orthonormal columns, `a ≈ V diag(w) V^T`.
///
/// Only the symmetric part of `a` is meaningful; no symmetry check is made.
pub fn symmetric_eigen(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "matrix must be square");

    let mut m = a.clone();
    let mut v: Array2<f64> = Array2::eye(n);
    let scale: f64 = m.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs())).max(1.0);

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += m[[p, q]].abs();
            }
        }
        if off < OFF_DIAG_TOL * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = m[[p, q]];
                if apq.abs() < OFF_DIAG_TOL * scale * 1e-2 {
                    continue;
                }
                let app = m[[p, p]];
                let aqq = m[[q, q]];
                let theta = 0.5 * (aqq - app) / apq;
                // Stable rotation: t = sign(theta) / (|theta| + sqrt(theta^2 + 1))
                let t = if theta >= 0.0 {
                    1.0 / (theta + (theta * theta + 1.0).sqrt())
                } else {
                    -1.0 / (-theta + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let mkp = m[[k, p]];
                    let mkq = m[[k, q]];
                    m[[k, p]] = c * mkp - s * mkq;
                    m[[k, q]] = s * mkp + c * mkq;
                }
                for k in 0..n {
                    let mpk = m[[p, k]];
                    let mqk = m[[q, k]];
                    m[[p, k]] = c * mpk - s * mqk;
                    m[[q, k]] = s * mpk + c * mqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    // Sort ascending, permuting columns to match.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| m[[i, i]].partial_cmp(&m[[j, j]]).unwrap());

    let w = Array1::from_shape_fn(n, |i| m[[order[i], order[i]]]);
    let vecs = Array2::from_shape_fn((n, n), |(r, cidx)| v[[r, order[cidx]]]);
    (w, vecs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(w: &Array1<f64>, v: &Array2<f64>) -> Array2<f64> {
        let n = w.len();
        Array2::from_shape_fn((n, n), |(i, j)| {
            (0..n).map(|k| v[[i, k]] * w[k] * v[[j, k]]).sum()
        })
    }

    #[test]
    fn test_diagonal_matrix() {
        let a = Array2::from_shape_fn((4, 4), |(i, j)| if i == j { (i + 1) as f64 } else { 0.0 });
        let (w, _v) = symmetric_eigen(&a);
        for i in 0..4 {
            assert!((w[i] - (i + 1) as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn test_known_2x2() {
        // [[2, 1], [1, 2]] has eigenvalues 1 and 3.
        let a = ndarray::arr2(&[[2.0, 1.0], [1.0, 2.0]]);
        let (w, v) = symmetric_eigen(&a);
        assert!((w[0] - 1.0).abs() < 1e-12);
        assert!((w[1] - 3.0).abs() < 1e-12);
        let r = reconstruct(&w, &v);
        for i in 0..2 {
            for j in 0..2 {
                assert!((r[[i, j]] - a[[i, j]]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_tridiagonal_laplacian() {
        // Discrete Laplacian with Dirichlet ends: lambda_k = 2 - 2 cos(k pi / (n+1)).
        let n = 10;
        let a = Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                2.0
            } else if i.abs_diff(j) == 1 {
                -1.0
            } else {
                0.0
            }
        });
        let (w, v) = symmetric_eigen(&a);
        for k in 0..n {
            let expect = 2.0 - 2.0 * ((k + 1) as f64 * std::f64::consts::PI / (n as f64 + 1.0)).cos();
            assert!(
                (w[k] - expect).abs() < 1e-10,
                "eigenvalue {k}: {} vs {expect}",
                w[k]
            );
        }
        // Orthonormal columns
        for p in 0..n {
            for q in 0..n {
                let dot: f64 = (0..n).map(|i| v[[i, p]] * v[[i, q]]).sum();
                let expect = if p == q { 1.0 } else { 0.0 };
                assert!((dot - expect).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_singular_matrix_has_zero_eigenvalue() {
        // Graph-Laplacian-like matrix annihilating the constant vector, the
        // same structure as the solver's m = 0 monopole mode.
        let n = 6;
        let a = Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                if i == 0 || i == n - 1 {
                    1.0
                } else {
                    2.0
                }
            } else if i.abs_diff(j) == 1 {
                -1.0
            } else {
                0.0
            }
        });
        let (w, v) = symmetric_eigen(&a);
        assert!(w[0].abs() < 1e-12, "null mode eigenvalue: {}", w[0]);
        // Null vector is constant
        let first = v[[0, 0]];
        for i in 1..n {
            assert!((v[[i, 0]] - first).abs() < 1e-10);
        }
    }
}
