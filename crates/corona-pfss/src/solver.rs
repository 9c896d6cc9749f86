//! Potential-field source-surface solver.
//!
//! Works in (rho = ln r, s = cos theta, phi) coordinates on a staggered
//! grid. The field is represented through a vector potential A with
//! A_rho = 0, so B = curl A satisfies the discrete divergence-free
//! condition exactly. The current-free condition reduces, after a Fourier
//! transform in phi and an eigendecomposition of the angular operator, to
//! one tridiagonal system in rho per mode.

use crate::input::Input;
use crate::output::Output;
use corona_math::eigen::symmetric_eigen;
use corona_math::fft::{fft_phi, ifft_phi_real};
use corona_math::tridiag::thomas_solve;
use corona_types::error::CoronaResult;
use corona_types::grid::Grid;
use ndarray::{Array2, Array3, Array4};
use num_complex::Complex64;

/// Eigenvalues below this fraction of the largest one are treated as the
/// monopole mode and dropped. The boundary map therefore contributes no net
/// flux regardless of its mean.
const MONOPOLE_TOL: f64 = 1e-12;

/// Angular geometric factors of the staggered grid.
struct AngularFactors {
    /// Conductance of s-directed edges, length ns. Multiplies d(psi)/d(phi).
    fs: Vec<f64>,
    /// Conductance of phi-directed edges, length ns + 1. Zero at the poles.
    fp: Vec<f64>,
}

impl AngularFactors {
    fn new(grid: &Grid) -> Self {
        let ns = grid.ns;
        let mut fs = vec![0.0; ns];
        let mut fp = vec![0.0; ns + 1];
        for j in 0..ns {
            let sigma_c = (1.0 - grid.sc[j] * grid.sc[j]).sqrt();
            fs[j] = (grid.sg[j + 1].asin() - grid.sg[j].asin()) / (sigma_c * grid.dphi);
        }
        for j in 1..ns {
            let sigma_g = (1.0 - grid.sg[j] * grid.sg[j]).sqrt();
            fp[j] = sigma_g * grid.dphi / (grid.sc[j].asin() - grid.sc[j - 1].asin());
        }
        AngularFactors { fs, fp }
    }
}

/// Radial discretisation coefficients.
struct RadialCoeffs {
    /// Exact shell integrals of exp(2 rho) per cell, length nr.
    e2: Vec<f64>,
    /// Couples psi at adjacent rho levels, length nr.
    alpha: Vec<f64>,
    /// Multiplies the eigenvalue on interior rows, length nr (index 0 unused).
    beta: Vec<f64>,
    /// Eigenvalue weight of the open outer boundary row.
    beta_outer: f64,
}

impl RadialCoeffs {
    fn new(grid: &Grid) -> Self {
        let nr = grid.nr;
        let da = grid.ds * grid.dphi;
        let mut e2 = vec![0.0; nr];
        for k in 0..nr {
            e2[k] = ((2.0 * grid.rg[k + 1]).exp() - (2.0 * grid.rg[k]).exp()) / 2.0;
        }
        let mut alpha = vec![0.0; nr];
        for k in 0..nr {
            alpha[k] = grid.rc[k].exp() / e2[k];
        }
        let mut beta = vec![0.0; nr];
        for k in 1..nr {
            beta[k] = (-2.0 * grid.rg[k]).exp() * (grid.rc[k].exp() - grid.rc[k - 1].exp()) / da;
        }
        let beta_outer =
            (-2.0 * grid.rg[nr]).exp() * (grid.rg[nr].exp() - grid.rc[nr - 1].exp()) / da;
        RadialCoeffs {
            e2,
            alpha,
            beta,
            beta_outer,
        }
    }
}

/// Compute the potential field between the photosphere and the source
/// surface.
pub fn pfss(input: &Input) -> CoronaResult<Output> {
    let grid = input.grid().clone();
    let (ns, nphi, nr) = (grid.ns, grid.nphi, grid.nr);

    let zero_outer = input
        .outer_br()
        .map_or(true, |b| b.iter().all(|&v| v == 0.0));
    if input.br().iter().all(|&v| v == 0.0) && zero_outer {
        return Ok(zero_output(input, grid));
    }

    let ang = AngularFactors::new(&grid);
    let rad = RadialCoeffs::new(&grid);
    let da = grid.ds * grid.dphi;

    let bhat = fft_phi(input.br());
    let bhat_out = input.outer_br().map(fft_phi);

    // psi mode amplitudes, one per azimuthal wavenumber.
    let mut psihat = Array3::<Complex64>::zeros((nphi, ns, nr + 1));

    // m and nphi - m share the same angular matrix.
    for m in 0..=nphi / 2 {
        let km2 = 4.0 * (std::f64::consts::PI * m as f64 / nphi as f64).sin().powi(2);
        let a = angular_matrix(km2, &ang);
        let (lam, q) = symmetric_eigen(&a);
        let lam_max = lam.iter().cloned().fold(0.0_f64, f64::max);

        let mut columns = vec![m];
        if m != 0 && 2 * m != nphi {
            columns.push(nphi - m);
        }
        for &mc in &columns {
            for l in 0..ns {
                if lam[l] <= MONOPOLE_TOL * lam_max {
                    continue;
                }
                // Project the boundary spectra onto this eigenmode.
                let mut c_in = Complex64::new(0.0, 0.0);
                let mut c_out = Complex64::new(0.0, 0.0);
                for j in 0..ns {
                    c_in += q[[j, l]] * bhat[[mc, j]];
                    if let Some(bo) = &bhat_out {
                        c_out += q[[j, l]] * bo[[mc, j]];
                    }
                }
                let g = radial_solve(
                    lam[l],
                    c_in,
                    bhat_out.as_ref().map(|_| c_out),
                    &rad,
                    &grid,
                    da,
                );
                for k in 0..=nr {
                    for j in 0..ns {
                        psihat[[mc, j, k]] += q[[j, l]] * g[k];
                    }
                }
            }
        }
    }

    // Back to physical phi for every rho level.
    let mut psi = Array3::<f64>::zeros((nphi, ns, nr + 1));
    for k in 0..=nr {
        let mut slice = Array2::<Complex64>::zeros((nphi, ns));
        for i in 0..nphi {
            for j in 0..ns {
                slice[[i, j]] = psihat[[i, j, k]];
            }
        }
        let real = ifft_phi_real(&slice);
        for i in 0..nphi {
            for j in 0..ns {
                psi[[i, j, k]] = real[[i, j]];
            }
        }
    }

    let (alr, als, alp) = vector_potential(&psi, &grid, &ang);
    let (br, bs, bp) = curl(&als, &alp, &grid, &rad);
    let bg = grid_field(&br, &bs, &bp, &grid);

    Ok(Output::from_parts(
        input.map().clone(),
        grid,
        alr,
        als,
        alp,
        br,
        bs,
        bp,
        bg,
    ))
}

/// Symmetric angular operator for one azimuthal wavenumber.
fn angular_matrix(km2: f64, ang: &AngularFactors) -> Array2<f64> {
    let ns = ang.fs.len();
    let mut a = Array2::<f64>::zeros((ns, ns));
    for j in 0..ns {
        a[[j, j]] = km2 * ang.fs[j] + ang.fp[j] + ang.fp[j + 1];
        if j + 1 < ns {
            a[[j, j + 1]] = -ang.fp[j + 1];
            a[[j + 1, j]] = -ang.fp[j + 1];
        }
    }
    a
}

/// Solve the radial recurrence for one eigenmode.
///
/// Returns the mode amplitude at every rho level. The inner row pins the
/// photospheric flux; the outer row is either the open (purely radial)
/// condition or a pinned source-surface flux.
fn radial_solve(
    lam: f64,
    c_in: Complex64,
    c_out: Option<Complex64>,
    rad: &RadialCoeffs,
    grid: &Grid,
    da: f64,
) -> Vec<Complex64> {
    let nr = grid.nr;
    let n = nr + 1;
    let mut sub = vec![0.0; n];
    let mut diag = vec![0.0; n];
    let mut sup = vec![0.0; n];
    let mut rhs_re = vec![0.0; n];
    let mut rhs_im = vec![0.0; n];

    diag[0] = 1.0;
    let g0 = c_in * (da / lam);
    rhs_re[0] = g0.re;
    rhs_im[0] = g0.im;

    for k in 1..nr {
        sub[k] = rad.alpha[k - 1];
        diag[k] = -(rad.alpha[k] + rad.alpha[k - 1] + lam * rad.beta[k]);
        sup[k] = rad.alpha[k];
    }

    match c_out {
        None => {
            sub[nr] = rad.alpha[nr - 1];
            diag[nr] = -(rad.alpha[nr - 1] + lam * rad.beta_outer);
        }
        Some(c) => {
            diag[nr] = 1.0;
            let gn = c * (da * (2.0 * grid.rg[nr]).exp() / lam);
            rhs_re[nr] = gn.re;
            rhs_im[nr] = gn.im;
        }
    }

    let re = thomas_solve(&sub, &diag, &sup, &rhs_re);
    let im = thomas_solve(&sub, &diag, &sup, &rhs_im);
    re.into_iter()
        .zip(im)
        .map(|(r, i)| Complex64::new(r, i))
        .collect()
}

/// Edge circulations of the vector potential from the stream function.
#[allow(clippy::type_complexity)]
fn vector_potential(
    psi: &Array3<f64>,
    grid: &Grid,
    ang: &AngularFactors,
) -> (Array3<f64>, Array3<f64>, Array3<f64>) {
    let (ns, nphi, nr) = (grid.ns, grid.nphi, grid.nr);
    // The rho component vanishes by gauge choice.
    let alr = Array3::<f64>::zeros((nphi + 1, ns + 1, nr));
    let mut als = Array3::<f64>::zeros((nphi + 1, ns, nr + 1));
    let mut alp = Array3::<f64>::zeros((nphi, ns + 1, nr + 1));
    for i in 0..=nphi {
        let i_hi = i % nphi;
        let i_lo = (i + nphi - 1) % nphi;
        for j in 0..ns {
            for k in 0..=nr {
                als[[i, j, k]] = -(psi[[i_hi, j, k]] - psi[[i_lo, j, k]]) * ang.fs[j];
            }
        }
    }
    for i in 0..nphi {
        for j in 1..ns {
            for k in 0..=nr {
                alp[[i, j, k]] = (psi[[i, j, k]] - psi[[i, j - 1, k]]) * ang.fp[j];
            }
        }
    }
    (alr, als, alp)
}

/// Face-centred field components as the discrete curl of the potential.
#[allow(clippy::type_complexity)]
fn curl(
    als: &Array3<f64>,
    alp: &Array3<f64>,
    grid: &Grid,
    rad: &RadialCoeffs,
) -> (Array3<f64>, Array3<f64>, Array3<f64>) {
    let (ns, nphi, nr) = (grid.ns, grid.nphi, grid.nr);
    let da = grid.ds * grid.dphi;

    let mut br = Array3::<f64>::zeros((nphi, ns, nr + 1));
    for k in 0..=nr {
        let area = (2.0 * grid.rg[k]).exp() * da;
        for i in 0..nphi {
            for j in 0..ns {
                let circ = (als[[i + 1, j, k]] - als[[i, j, k]])
                    - (alp[[i, j + 1, k]] - alp[[i, j, k]]);
                br[[i, j, k]] = circ / area;
            }
        }
    }

    let mut bs = Array3::<f64>::zeros((nphi, ns + 1, nr));
    for j in 1..ns {
        let sigma_g = (1.0 - grid.sg[j] * grid.sg[j]).sqrt();
        for k in 0..nr {
            let area = sigma_g * grid.dphi * rad.e2[k];
            for i in 0..nphi {
                bs[[i, j, k]] = (alp[[i, j, k + 1]] - alp[[i, j, k]]) / area;
            }
        }
    }

    let mut bp = Array3::<f64>::zeros((nphi + 1, ns, nr));
    for j in 0..ns {
        let dtheta = grid.sg[j + 1].asin() - grid.sg[j].asin();
        for k in 0..nr {
            let area = dtheta * rad.e2[k];
            for i in 0..=nphi {
                bp[[i, j, k]] = -(als[[i, j, k + 1]] - als[[i, j, k]]) / area;
            }
        }
    }

    (br, bs, bp)
}

/// Node-centred weighted field for interpolation and tracing.
///
/// Components are stored as (B_phi / sigma, sigma * B_s, B_r) so that a
/// trilinear sample divided by the grid spacings gives the tangent of a
/// field line in index space. Pole rows hold the azimuthal mean for B_r and
/// were copied from the adjacent ring for the phi component; the last phi
/// slice duplicates the first.
fn grid_field(br: &Array3<f64>, bs: &Array3<f64>, bp: &Array3<f64>, grid: &Grid) -> Array4<f64> {
    let (ns, nphi, nr) = (grid.ns, grid.nphi, grid.nr);
    let mut bg = Array4::<f64>::zeros((nphi + 1, ns + 1, nr + 1, 3));

    for k in 0..=nr {
        // one-sided averaging of the rho-centred components at the shells
        let (klo, khi) = if k == 0 {
            (0, 0)
        } else if k == nr {
            (nr - 1, nr - 1)
        } else {
            (k - 1, k)
        };

        for i in 0..nphi {
            let i_lo = (i + nphi - 1) % nphi;
            for j in 1..ns {
                let sigma_g = (1.0 - grid.sg[j] * grid.sg[j]).sqrt();
                let wr = 0.25
                    * (br[[i_lo, j - 1, k]]
                        + br[[i, j - 1, k]]
                        + br[[i_lo, j, k]]
                        + br[[i, j, k]]);
                let ws = 0.25
                    * (bs[[i_lo, j, klo]] + bs[[i, j, klo]] + bs[[i_lo, j, khi]]
                        + bs[[i, j, khi]]);
                let wp = 0.25
                    * (bp[[i, j - 1, klo]] + bp[[i, j, klo]] + bp[[i, j - 1, khi]]
                        + bp[[i, j, khi]]);
                bg[[i, j, k, 0]] = wp / sigma_g;
                bg[[i, j, k, 1]] = ws * sigma_g;
                bg[[i, j, k, 2]] = wr;
            }
        }

        // poles: B_r is the mean over the adjacent ring, tangential s
        // component vanishes with the ring area
        let mut mean_s = 0.0;
        let mut mean_n = 0.0;
        for i in 0..nphi {
            mean_s += br[[i, 0, k]];
            mean_n += br[[i, ns - 1, k]];
        }
        mean_s /= nphi as f64;
        mean_n /= nphi as f64;
        for i in 0..nphi {
            bg[[i, 0, k, 0]] = bg[[i, 1, k, 0]];
            bg[[i, 0, k, 2]] = mean_s;
            bg[[i, ns, k, 0]] = bg[[i, ns - 1, k, 0]];
            bg[[i, ns, k, 2]] = mean_n;
        }
    }

    for j in 0..=ns {
        for k in 0..=nr {
            for c in 0..3 {
                bg[[nphi, j, k, c]] = bg[[0, j, k, c]];
            }
        }
    }
    bg
}

/// All-zero output for an identically zero boundary.
fn zero_output(input: &Input, grid: Grid) -> Output {
    let (ns, nphi, nr) = (grid.ns, grid.nphi, grid.nr);
    Output::from_parts(
        input.map().clone(),
        grid,
        Array3::zeros((nphi + 1, ns + 1, nr)),
        Array3::zeros((nphi + 1, ns, nr + 1)),
        Array3::zeros((nphi, ns + 1, nr + 1)),
        Array3::zeros((nphi, ns, nr + 1)),
        Array3::zeros((nphi, ns + 1, nr)),
        Array3::zeros((nphi + 1, ns, nr)),
        Array4::zeros((nphi + 1, ns + 1, nr + 1, 3)),
    )
}
