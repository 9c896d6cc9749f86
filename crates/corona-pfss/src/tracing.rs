//! Field-line tracing through a computed solution.
//!
//! Two tracers with the same interface: `BatchTracer` integrates with a
//! fixed step in grid-index space and is the fast default, `ReferenceTracer`
//! runs an adaptive Cash-Karp integration in Cartesian space and serves as
//! the accuracy yardstick.

use crate::coords::{cart2strum, strum2cart, CoordSequence};
use crate::fieldline::{FieldLine, FieldLines};
use crate::map::validation;
use crate::output::Output;
use corona_math::interp::trilinear_vec;
use corona_math::rk45::{ck45_step, next_step_size};
use corona_types::error::CoronaResult;

/// Field magnitudes below this stop the integration as a stagnation point.
const STAGNATION_TOL: f64 = 1e-12;

/// Tolerance, photospheric radii, for seed-domain checks.
const SEED_TOL: f64 = 1e-6;

/// Bisection iterations used to refine the boundary landing point.
const LANDING_ITERS: usize = 40;

/// Traces field lines from seed points through an `Output`.
pub trait FieldLineTracer {
    fn trace(&self, seeds: &CoordSequence, output: &Output) -> CoronaResult<FieldLines>;
}

fn check_seeds(seeds: &CoordSequence, output: &Output) -> CoronaResult<()> {
    if seeds.is_empty() {
        return Err(validation("at least one seed point is required"));
    }
    let frame = output.coordinate_frame();
    if !seeds.frame().same_epoch(&frame) {
        log::warn!(
            "seed epoch {} differs from the map epoch {}",
            seeds.frame().obstime,
            frame.obstime
        );
    }
    let rss = output.grid().rss;
    for (n, r) in seeds.radii().into_iter().enumerate() {
        if r < 1.0 - SEED_TOL || r > rss + SEED_TOL {
            return Err(validation(format!(
                "seed {n} has radius {r}, outside [1, {rss}]"
            )));
        }
    }
    Ok(())
}

/// Fixed-step tracer working in grid-index space.
///
/// The node field is stored pre-weighted so that a trilinear sample divided
/// by the grid spacings is directly proportional to the index-space tangent
/// of the field line.
#[derive(Debug, Clone)]
pub struct BatchTracer {
    /// Step length in grid cells.
    pub step_size: f64,
    /// Step budget per direction; 0 picks a budget from the grid size.
    pub max_steps: usize,
}

impl Default for BatchTracer {
    fn default() -> Self {
        BatchTracer {
            step_size: 1.0,
            max_steps: 0,
        }
    }
}

impl BatchTracer {
    pub fn new(step_size: f64, max_steps: usize) -> Self {
        BatchTracer {
            step_size,
            max_steps,
        }
    }

    fn step_budget(&self, output: &Output) -> usize {
        if self.max_steps > 0 {
            return self.max_steps;
        }
        let g = output.grid();
        let auto = 64.0 * (g.nr + g.ns + g.nphi) as f64 / self.step_size;
        auto.ceil() as usize
    }

    /// Normalised index-space velocity, None at stagnation points.
    fn velocity(output: &Output, p: [f64; 3]) -> Option<[f64; 3]> {
        let g = output.grid();
        let w = trilinear_vec(output.bg(), p[0], p[1], p[2]);
        let v = [w[0] / g.dphi, w[1] / g.ds, w[2] / g.drho];
        let n = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        if n < STAGNATION_TOL {
            None
        } else {
            Some([v[0] / n, v[1] / n, v[2] / n])
        }
    }

    /// One classical RK4 step of length `h` (signed), None on stagnation.
    fn rk4(output: &Output, p: [f64; 3], h: f64) -> Option<[f64; 3]> {
        let add = |p: [f64; 3], k: [f64; 3], c: f64| {
            [p[0] + c * k[0], p[1] + c * k[1], p[2] + c * k[2]]
        };
        let k1 = Self::velocity(output, p)?;
        let k2 = Self::velocity(output, add(p, k1, h / 2.0))?;
        let k3 = Self::velocity(output, add(p, k2, h / 2.0))?;
        let k4 = Self::velocity(output, add(p, k3, h))?;
        let mut out = p;
        for c in 0..3 {
            out[c] = p[c] + h / 6.0 * (k1[c] + 2.0 * k2[c] + 2.0 * k3[c] + k4[c]);
        }
        // the s index cannot leave the grid
        out[1] = out[1].clamp(0.0, output.grid().ns as f64);
        Some(out)
    }

    /// Trace one direction from `start`; returns points past the seed and
    /// whether the step budget ran out.
    fn trace_direction(
        output: &Output,
        start: [f64; 3],
        sign: f64,
        h: f64,
        budget: usize,
    ) -> (Vec<[f64; 3]>, bool) {
        let nr = output.grid().nr as f64;
        let mut points = Vec::new();
        let mut p = start;
        for _ in 0..budget {
            let Some(next) = Self::rk4(output, p, sign * h) else {
                return (points, false);
            };
            if next[2] < 0.0 || next[2] > nr {
                let target = if next[2] < 0.0 { 0.0 } else { nr };
                // bisect the step length until the endpoint sits on the shell
                let (mut lo, mut hi) = (0.0, h);
                let mut landed = next;
                for _ in 0..LANDING_ITERS {
                    let mid = (lo + hi) / 2.0;
                    match Self::rk4(output, p, sign * mid) {
                        Some(q) => {
                            if (q[2] - target) * (next[2] - target) > 0.0 {
                                hi = mid;
                            } else {
                                lo = mid;
                            }
                            landed = q;
                        }
                        None => break,
                    }
                }
                landed[2] = target;
                points.push(landed);
                return (points, false);
            }
            points.push(next);
            p = next;
        }
        (points, true)
    }
}

impl FieldLineTracer for BatchTracer {
    fn trace(&self, seeds: &CoordSequence, output: &Output) -> CoronaResult<FieldLines> {
        check_seeds(seeds, output)?;
        let g = output.grid();
        let budget = self.step_budget(output);
        let mut lines = Vec::with_capacity(seeds.len());
        for &[x, y, z] in seeds.points() {
            let (rho, s, phi) = cart2strum(x, y, z);
            let (fi, fj, fk) = output.grid_index(rho, s, phi);
            let seed = [fi, fj, fk.clamp(0.0, g.nr as f64)];
            let (back, trunc_b) =
                Self::trace_direction(output, seed, -1.0, self.step_size, budget);
            let (fwd, trunc_f) =
                Self::trace_direction(output, seed, 1.0, self.step_size, budget);
            let mut idx_points: Vec<[f64; 3]> = back.into_iter().rev().collect();
            idx_points.push(seed);
            idx_points.extend(fwd);
            let cart = idx_points
                .into_iter()
                .map(|p| {
                    let phi = p[0] * g.dphi;
                    let s = (-1.0 + p[1] * g.ds).clamp(-1.0, 1.0);
                    let rho = p[2] * g.drho;
                    let (x, y, z) = strum2cart(rho, s, phi);
                    [x, y, z]
                })
                .collect();
            let coords = CoordSequence::from_cartesian(output.coordinate_frame(), cart);
            lines.push(FieldLine::new(coords, trunc_b || trunc_f, g.rss));
        }
        let lines = FieldLines::new(lines);
        if lines.ran_out_of_steps() {
            log::warn!("at least one field line ran out of steps");
        }
        Ok(lines)
    }
}

/// Adaptive Cash-Karp tracer in Cartesian space.
///
/// Slower than `BatchTracer` by a wide margin, but its error is controlled
/// by the supplied tolerances instead of the grid resolution.
#[derive(Debug, Clone)]
pub struct ReferenceTracer {
    pub atol: f64,
    pub rtol: f64,
    /// Step-attempt budget per direction.
    pub max_steps: usize,
}

impl Default for ReferenceTracer {
    fn default() -> Self {
        ReferenceTracer {
            atol: 1e-6,
            rtol: 1e-6,
            max_steps: 200_000,
        }
    }
}

/// Field vector at a Cartesian point, Cartesian components.
fn bvec_cart(output: &Output, p: [f64; 3]) -> [f64; 3] {
    let (rho, s, phi) = cart2strum(p[0], p[1], p[2]);
    let [br, bs, bphi] = output.sample(rho, s, phi);
    let btheta = -bs;
    let sigma = (1.0 - s * s).max(0.0).sqrt();
    let (cp, sp) = (phi.cos(), phi.sin());
    [
        br * sigma * cp + btheta * s * cp - bphi * sp,
        br * sigma * sp + btheta * s * sp + bphi * cp,
        br * s - btheta * sigma,
    ]
}

impl ReferenceTracer {
    pub fn new(atol: f64, rtol: f64) -> Self {
        ReferenceTracer {
            atol,
            rtol,
            ..ReferenceTracer::default()
        }
    }

    const H_MIN: f64 = 1e-7;
    const H_MAX: f64 = 0.5;
    const H_INIT: f64 = 1e-2;

    /// Trace one direction from `start`; returns the points past the seed
    /// and whether the step budget ran out.
    fn trace_direction(
        output: &Output,
        start: [f64; 3],
        sign: f64,
        tol: f64,
        budget: usize,
    ) -> (Vec<[f64; 3]>, bool) {
        let rss = output.grid().rss;
        let radius = |p: &[f64; 3]| (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        let f = |p: &[f64; 3]| {
            let b = bvec_cart(output, *p);
            let n = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
            if n < STAGNATION_TOL {
                [0.0, 0.0, 0.0]
            } else {
                [sign * b[0] / n, sign * b[1] / n, sign * b[2] / n]
            }
        };

        let mut points = Vec::new();
        let mut p = start;
        let mut h = Self::H_INIT;
        let mut truncated = true;
        for _ in 0..budget {
            let b = bvec_cart(output, p);
            if (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt() < STAGNATION_TOL {
                truncated = false;
                break;
            }
            let (next, err) = ck45_step(&f, &p, h);
            if err > tol && h > Self::H_MIN {
                h = next_step_size(h, err, tol).clamp(Self::H_MIN, Self::H_MAX);
                continue;
            }
            let r_next = radius(&next);
            if r_next < 1.0 || r_next > rss {
                let target = if r_next < 1.0 { 1.0 } else { rss };
                let (mut lo, mut hi) = (0.0, h);
                let mut landed = next;
                for _ in 0..LANDING_ITERS {
                    let mid = (lo + hi) / 2.0;
                    let (q, _) = ck45_step(&f, &p, mid);
                    if (radius(&q) - target) * (r_next - target) > 0.0 {
                        hi = mid;
                    } else {
                        lo = mid;
                    }
                    landed = q;
                }
                // put the endpoint exactly on the boundary shell
                let rl = radius(&landed);
                if rl > 0.0 {
                    for c in &mut landed {
                        *c *= target / rl;
                    }
                }
                points.push(landed);
                truncated = false;
                break;
            }
            points.push(next);
            p = next;
            h = next_step_size(h, err, tol).clamp(Self::H_MIN, Self::H_MAX);
        }
        (points, truncated)
    }
}

impl FieldLineTracer for ReferenceTracer {
    fn trace(&self, seeds: &CoordSequence, output: &Output) -> CoronaResult<FieldLines> {
        check_seeds(seeds, output)?;
        let rss = output.grid().rss;
        let mut lines = Vec::with_capacity(seeds.len());
        for &seed in seeds.points() {
            let tol = self.atol + self.rtol * rss;
            let (back, trunc_b) =
                Self::trace_direction(output, seed, -1.0, tol, self.max_steps);
            let (fwd, trunc_f) =
                Self::trace_direction(output, seed, 1.0, tol, self.max_steps);
            let mut pts: Vec<[f64; 3]> = back.into_iter().rev().collect();
            pts.push(seed);
            pts.extend(fwd);
            let coords = CoordSequence::from_cartesian(output.coordinate_frame(), pts);
            lines.push(FieldLine::new(coords, trunc_b || trunc_f, rss));
        }
        let lines = FieldLines::new(lines);
        if lines.ran_out_of_steps() {
            log::warn!("at least one field line ran out of steps");
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Input, OuterBoundary};
    use crate::map::{MapMeta, SynopticMap};
    use chrono::TimeZone;
    use chrono::Utc;
    use ndarray::Array2;

    fn dipole_output() -> Output {
        let (ns, nphi) = (30, 20);
        let meta = MapMeta::carrington_cea(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            (ns, nphi),
        );
        let data = Array2::from_shape_fn((ns, nphi), |(j, _)| {
            let s = -1.0 + 2.0 * (j as f64 + 0.5) / ns as f64;
            2.0 * s
        });
        let input = Input::new(SynopticMap::new(data, meta), 10, 2.5, OuterBoundary::Radial)
            .unwrap();
        crate::solver::pfss(&input).unwrap()
    }

    fn seeds(output: &Output, lats: &[f64], r: f64) -> CoordSequence {
        let lons = vec![100.0; lats.len()];
        let rs = vec![r; lats.len()];
        CoordSequence::from_spherical(output.coordinate_frame(), &lons, lats, &rs).unwrap()
    }

    #[test]
    fn test_rejects_empty_seeds() {
        let out = dipole_output();
        let empty = CoordSequence::from_cartesian(out.coordinate_frame(), vec![]);
        assert!(BatchTracer::default().trace(&empty, &out).is_err());
    }

    #[test]
    fn test_rejects_seed_outside_domain() {
        let out = dipole_output();
        let s = seeds(&out, &[0.0], 3.0);
        assert!(BatchTracer::default().trace(&s, &out).is_err());
    }

    #[test]
    fn test_dipole_polar_lines_are_open() {
        let out = dipole_output();
        let s = seeds(&out, &[80.0, -80.0], 1.01);
        for tracer in [&BatchTracer::default() as &dyn FieldLineTracer,
                       &ReferenceTracer::default()] {
            let lines = tracer.trace(&s, &out).unwrap();
            assert_eq!(lines.polarities(), vec![1, -1]);
            assert_eq!(lines.connectivities(), vec![1, 1]);
            assert_eq!(lines.connectivity_counts(), (2, 0));
        }
    }

    #[test]
    fn test_dipole_equatorial_line_is_closed() {
        let out = dipole_output();
        let s = seeds(&out, &[2.0], 1.01);
        let lines = BatchTracer::default().trace(&s, &out).unwrap();
        assert_eq!(lines.connectivities(), vec![0]);
        let (a, b) = lines[0].closed_footpoints().unwrap();
        // a closed dipole loop straddles the equator
        assert!(a[2] * b[2] < 0.0);
    }

    #[test]
    fn test_step_budget_truncates_and_warns() {
        let out = dipole_output();
        let s = seeds(&out, &[45.0], 1.5);
        let tracer = BatchTracer::new(1.0, 2);
        let lines = tracer.trace(&s, &out).unwrap();
        assert!(lines.ran_out_of_steps());
        assert_eq!(lines.polarities(), vec![0]);
    }

    #[test]
    fn test_smaller_steps_give_more_points() {
        let out = dipole_output();
        let s = seeds(&out, &[60.0], 1.01);
        let coarse = BatchTracer::new(0.5, 0).trace(&s, &out).unwrap();
        let fine = BatchTracer::new(0.2, 0).trace(&s, &out).unwrap();
        let ratio = fine[0].coords().len() as f64 / coarse[0].coords().len() as f64;
        assert!((1.7..=2.8).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn test_reference_tracer_budget_truncates() {
        let out = dipole_output();
        let s = seeds(&out, &[45.0], 1.5);
        let mut tracer = ReferenceTracer::default();
        tracer.max_steps = 2;
        let lines = tracer.trace(&s, &out).unwrap();
        assert!(lines.ran_out_of_steps());
        assert_eq!(lines.polarities(), vec![0]);
        assert_eq!(lines.connectivities(), vec![0]);
    }

    #[test]
    fn test_field_values_along_traced_line() {
        let out = dipole_output();
        let s = seeds(&out, &[70.0], 1.2);
        let lines = BatchTracer::default().trace(&s, &out).unwrap();
        let b = lines[0].field_values(&out).unwrap();
        assert_eq!(b.dim(), (lines[0].coords().len(), 3));
        // an empty line reports the error instead of an empty array
        let empty = FieldLine::new(
            CoordSequence::from_cartesian(out.coordinate_frame(), vec![]),
            false,
            out.grid().rss,
        );
        assert!(empty.field_values(&out).is_err());
    }

    #[test]
    fn test_tracers_agree_on_footpoints() {
        let out = dipole_output();
        let s = seeds(&out, &[70.0], 1.2);
        let batch = BatchTracer::new(0.2, 0).trace(&s, &out).unwrap();
        let refr = ReferenceTracer::default().trace(&s, &out).unwrap();
        let fb = batch[0].solar_footpoint().unwrap();
        let fr = refr[0].solar_footpoint().unwrap();
        let d: f64 = (0..3)
            .map(|c| (fb[c] - fr[c]).powi(2))
            .sum::<f64>()
            .sqrt();
        assert!(d < 0.05, "footpoint distance {d}");
    }
}
