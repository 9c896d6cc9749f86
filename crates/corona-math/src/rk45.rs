//! Adaptive Cash–Karp RK4(5) stepping for 3-vector ODEs.
//!
//! One embedded step with error estimate; the acceptance loop lives with the
//! caller (the reference field-line tracer), which also owns the stopping
//! conditions.

/// Cash–Karp tableau nodes and weights.
const A2: f64 = 1.0 / 5.0;
const A3: [f64; 2] = [3.0 / 40.0, 9.0 / 40.0];
const A4: [f64; 3] = [3.0 / 10.0, -9.0 / 10.0, 6.0 / 5.0];
const A5: [f64; 4] = [-11.0 / 54.0, 5.0 / 2.0, -70.0 / 27.0, 35.0 / 27.0];
const A6: [f64; 5] = [
    1631.0 / 55296.0,
    175.0 / 512.0,
    575.0 / 13824.0,
    44275.0 / 110592.0,
    253.0 / 4096.0,
];
const B5: [f64; 6] = [
    37.0 / 378.0,
    0.0,
    250.0 / 621.0,
    125.0 / 594.0,
    0.0,
    512.0 / 1771.0,
];
const B4: [f64; 6] = [
    2825.0 / 27648.0,
    0.0,
    18575.0 / 48384.0,
    13525.0 / 55296.0,
    277.0 / 14336.0,
    1.0 / 4.0,
];

fn axpy(y: &[f64; 3], h: f64, coeffs: &[f64], ks: &[[f64; 3]]) -> [f64; 3] {
    let mut out = *y;
    for (c, k) in coeffs.iter().zip(ks.iter()) {
        for d in 0..3 {
            out[d] += h * c * k[d];
        }
    }
    out
}

/// Take one Cash–Karp step of size `h` from `y`.
///
/// Returns the 5th-order solution and the embedded 4th/5th-order error
/// estimate (infinity norm of the component-wise difference).
pub fn ck45_step<F>(f: F, y: &[f64; 3], h: f64) -> ([f64; 3], f64)
where
    F: Fn(&[f64; 3]) -> [f64; 3],
{
    let k1 = f(y);
    let k2 = f(&axpy(y, h, &[A2], &[k1]));
    let k3 = f(&axpy(y, h, &A3, &[k1, k2]));
    let k4 = f(&axpy(y, h, &A4, &[k1, k2, k3]));
    let k5 = f(&axpy(y, h, &A5, &[k1, k2, k3, k4]));
    let k6 = f(&axpy(y, h, &A6, &[k1, k2, k3, k4, k5]));

    let ks = [k1, k2, k3, k4, k5, k6];
    let y5 = axpy(y, h, &B5, &ks);
    let y4 = axpy(y, h, &B4, &ks);

    let mut err = 0.0_f64;
    for d in 0..3 {
        err = err.max((y5[d] - y4[d]).abs());
    }
    (y5, err)
}

/// Step-size update with the usual 1/5-order controller and safety factor,
/// clamped to [0.2, 5.0] growth per step.
pub fn next_step_size(h: f64, err: f64, tol: f64) -> f64 {
    if err <= f64::MIN_POSITIVE {
        return h * 5.0;
    }
    let factor = (0.9 * (tol / err).powf(0.2)).clamp(0.2, 5.0);
    h * factor
}
