//! Azimuthal FFT wrappers around rustfft.
//!
//! The PFSS arrays are laid out `(nphi, ns)`, so the transform runs down
//! axis 0 (one transform per s column). Convention matches numpy:
//! unnormalized forward, 1/nphi on the inverse.

use ndarray::Array2;
use num_complex::Complex64;
use rustfft::FftPlanner;

/// Forward FFT along the phi axis (axis 0) of a real `(nphi, ns)` array.
pub fn fft_phi(input: &Array2<f64>) -> Array2<Complex64> {
    let (nphi, ns) = input.dim();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(nphi);

    let mut out = Array2::zeros((nphi, ns));
    let mut column = vec![Complex64::new(0.0, 0.0); nphi];
    for j in 0..ns {
        for i in 0..nphi {
            column[i] = Complex64::new(input[[i, j]], 0.0);
        }
        fft.process(&mut column);
        for i in 0..nphi {
            out[[i, j]] = column[i];
        }
    }
    out
}

/// Inverse FFT along the phi axis of a `(nphi, ns)` spectrum, returning the
/// real part with 1/nphi normalization.
pub fn ifft_phi_real(input: &Array2<Complex64>) -> Array2<f64> {
    let (nphi, ns) = input.dim();
    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(nphi);
    let norm = 1.0 / nphi as f64;

    let mut out = Array2::zeros((nphi, ns));
    let mut column = vec![Complex64::new(0.0, 0.0); nphi];
    for j in 0..ns {
        for i in 0..nphi {
            column[i] = input[[i, j]];
        }
        ifft.process(&mut column);
        for i in 0..nphi {
            out[[i, j]] = column[i].re * norm;
        }
    }
    out
}
