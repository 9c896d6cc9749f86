//! End-to-end solver tests against the analytic dipole solution.
//!
//! For a pure dipole boundary br = 2 s the continuum solution with a
//! radial source surface is separable,
//!     Br(r, s) = C (2 r^-3 + rss^-3) s,   C = 2 / (2 + rss^-3),
//! which pins down both the radial profile and the source-surface field.

use chrono::TimeZone;
use chrono::Utc;
use corona_pfss::{pfss, Input, MapMeta, OuterBoundary, SynopticMap};
use ndarray::Array2;

fn dipole_map(ns: usize, nphi: usize) -> SynopticMap {
    let meta = MapMeta::carrington_cea(
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        (ns, nphi),
    );
    let data = Array2::from_shape_fn((ns, nphi), |(j, _)| {
        let s = -1.0 + 2.0 * (j as f64 + 0.5) / ns as f64;
        2.0 * s
    });
    SynopticMap::new(data, meta)
}

fn analytic_br(r: f64, s: f64, rss: f64) -> f64 {
    let c = 2.0 / (2.0 + rss.powi(-3));
    c * (2.0 * r.powi(-3) + rss.powi(-3)) * s
}

#[test]
fn test_dipole_matches_analytic_solution() {
    let (ns, nphi, nr) = (60, 20, 30);
    let rss = 2.5;
    let input = Input::new(dipole_map(ns, nphi), nr, rss, OuterBoundary::Radial).unwrap();
    let out = pfss(&input).unwrap();
    let grid = out.grid();
    let (br, _, _) = out.bc();

    let mut max_err: f64 = 0.0;
    for k in 0..=nr {
        let r = grid.rg[k].exp();
        for j in 0..ns {
            let want = analytic_br(r, grid.sc[j], rss);
            for i in 0..nphi {
                max_err = max_err.max((br[[i, j, k]] - want).abs());
            }
        }
    }
    assert!(max_err < 0.05, "max |Br - analytic| = {max_err}");
}

#[test]
fn test_source_surface_field_is_scaled_dipole() {
    let (ns, nphi, nr) = (60, 20, 30);
    let rss = 2.5;
    let input = Input::new(dipole_map(ns, nphi), nr, rss, OuterBoundary::Radial).unwrap();
    let out = pfss(&input).unwrap();
    let ss = out.source_surface_br();
    assert_eq!(ss.shape(), (ns, nphi));

    let grid = out.grid();
    for j in 0..ns {
        let want = analytic_br(rss, grid.sc[j], rss);
        for i in 0..nphi {
            let got = ss.data[[j, i]];
            assert!((got - want).abs() < 0.01, "ss br {got} vs {want}");
        }
    }
}

#[test]
fn test_net_source_surface_flux_vanishes() {
    let (ns, nphi, nr) = (30, 20, 10);
    // a boundary with a non-trivial mean still yields zero net open flux
    let mut map = dipole_map(ns, nphi);
    map.data += 0.7;
    let input = Input::new(map, nr, 2.5, OuterBoundary::Radial).unwrap();
    let out = pfss(&input).unwrap();
    let (br, _, _) = out.bc();
    let net: f64 = (0..nphi)
        .flat_map(|i| (0..ns).map(move |j| (i, j)))
        .map(|(i, j)| br[[i, j, nr]])
        .sum();
    assert!(net.abs() < 1e-9, "net flux {net}");
}

#[test]
fn test_map_json_roundtrip() {
    let map = dipole_map(30, 20);
    let path = std::env::temp_dir().join("corona_pfss_test_map.json");
    let path = path.to_str().unwrap();
    map.to_file(path).unwrap();
    let back = SynopticMap::from_file(path).unwrap();
    assert_eq!(back.shape(), map.shape());
    assert_eq!(back.meta.obstime, map.meta.obstime);
    assert_eq!(back.data, map.data);
    std::fs::remove_file(path).ok();
}

#[test]
fn test_bg_npy_export() {
    let input = Input::new(dipole_map(30, 20), 10, 2.5, OuterBoundary::Radial).unwrap();
    let out = pfss(&input).unwrap();
    let path = std::env::temp_dir().join("corona_pfss_test_bg.npy");
    let path = path.to_str().unwrap();
    out.write_bg(path).unwrap();
    let meta = std::fs::metadata(path).unwrap();
    // 21 * 31 * 11 * 3 doubles plus the npy header
    assert!(meta.len() > 21 * 31 * 11 * 3 * 8);
    std::fs::remove_file(path).ok();
}

#[test]
fn test_higher_harmonics_decay_faster() {
    // a sectoral l = m = 5 boundary decays much faster with radius than a
    // dipole, so the source-surface field of the mixed boundary is close to
    // the dipole's alone
    let (ns, nphi, nr) = (60, 40, 30);
    let meta = MapMeta::carrington_cea(
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        (ns, nphi),
    );
    let data = Array2::from_shape_fn((ns, nphi), |(j, i)| {
        let s = -1.0 + 2.0 * (j as f64 + 0.5) / ns as f64;
        let phi = 2.0 * std::f64::consts::PI * (i as f64 + 0.5) / nphi as f64;
        2.0 * s + (1.0 - s * s).powf(2.5) * (5.0 * phi).cos()
    });
    let input = Input::new(SynopticMap::new(data, meta), nr, 2.5, OuterBoundary::Radial)
        .unwrap();
    let out = pfss(&input).unwrap();
    let grid = out.grid();
    let (br, _, _) = out.bc();
    for i in 0..nphi {
        for j in 0..ns {
            let want = analytic_br(2.5, grid.sc[j], 2.5);
            assert!(
                (br[[i, j, nr]] - want).abs() < 0.05,
                "non-dipole residual {} at ({i}, {j})",
                (br[[i, j, nr]] - want).abs()
            );
        }
    }
}
