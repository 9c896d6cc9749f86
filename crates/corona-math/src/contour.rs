//! Zero-level contour extraction (marching squares).
//!
//! Extracts the zero isolines of a scalar field sampled on a rectilinear
//! grid, as ordered polylines in the supplied axis coordinates. Used for
//! polarity-inversion lines of the source-surface field.

use ndarray::{Array1, Array2};
use std::collections::HashMap;

type Point = (f64, f64);
type Segment = (Point, Point);

/// Quantization used to match segment endpoints while stitching.
const STITCH_SCALE: f64 = 1.0e9;

fn crossing(a: f64, b: f64) -> f64 {
    // Position of the zero along an edge with endpoint values a, b of
    // opposite sign.
    a / (a - b)
}

fn key(p: Point) -> (i64, i64) {
    ((p.0 * STITCH_SCALE).round() as i64, (p.1 * STITCH_SCALE).round() as i64)
}

/// Trace the zero contours of `field` (shape `(y.len(), x.len())`, row index
/// along `y`). Returns polylines as `(x, y)` coordinate sequences; closed
/// loops repeat their first point at the end.
pub fn zero_contours(field: &Array2<f64>, x: &Array1<f64>, y: &Array1<f64>) -> Vec<Vec<Point>> {
    let (ny, nx) = field.dim();
    assert_eq!(ny, y.len());
    assert_eq!(nx, x.len());

    let mut segments: Vec<Segment> = Vec::new();

    for i in 0..ny.saturating_sub(1) {
        for j in 0..nx.saturating_sub(1) {
            let f00 = field[[i, j]];
            let f01 = field[[i, j + 1]];
            let f10 = field[[i + 1, j]];
            let f11 = field[[i + 1, j + 1]];

            // Case index from corner signs (treat 0 as positive).
            let c = ((f00 >= 0.0) as usize)
                | (((f01 >= 0.0) as usize) << 1)
                | (((f11 >= 0.0) as usize) << 2)
                | (((f10 >= 0.0) as usize) << 3);
            if c == 0 || c == 15 {
                continue;
            }

            // Edge crossing points in data coordinates.
            let bottom = || {
                let t = crossing(f00, f01);
                (x[j] + t * (x[j + 1] - x[j]), y[i])
            };
            let top = || {
                let t = crossing(f10, f11);
                (x[j] + t * (x[j + 1] - x[j]), y[i + 1])
            };
            let left = || {
                let t = crossing(f00, f10);
                (x[j], y[i] + t * (y[i + 1] - y[i]))
            };
            let right = || {
                let t = crossing(f01, f11);
                (x[j + 1], y[i] + t * (y[i + 1] - y[i]))
            };

            match c {
                1 | 14 => segments.push((left(), bottom())),
                2 | 13 => segments.push((bottom(), right())),
                3 | 12 => segments.push((left(), right())),
                4 | 11 => segments.push((right(), top())),
                6 | 9 => segments.push((bottom(), top())),
                7 | 8 => segments.push((left(), top())),
                5 | 10 => {
                    // Saddle: disambiguate with the cell-centre value.
                    let centre = 0.25 * (f00 + f01 + f10 + f11);
                    let flip = (c == 5) == (centre >= 0.0);
                    if flip {
                        segments.push((left(), bottom()));
                        segments.push((right(), top()));
                    } else {
                        segments.push((left(), top()));
                        segments.push((bottom(), right()));
                    }
                }
                _ => unreachable!(),
            }
        }
    }

    stitch(segments)
}

/// Join segments that share endpoints into ordered polylines.
fn stitch(segments: Vec<Segment>) -> Vec<Vec<Point>> {
    let mut adjacency: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (idx, seg) in segments.iter().enumerate() {
        adjacency.entry(key(seg.0)).or_default().push(idx);
        adjacency.entry(key(seg.1)).or_default().push(idx);
    }

    let mut used = vec![false; segments.len()];
    let mut lines = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut line = vec![segments[start].0, segments[start].1];

        // Extend forward from the tail, then backward from the head.
        for _pass in 0..2 {
            loop {
                let tail = *line.last().expect("line is non-empty");
                let Some(candidates) = adjacency.get(&key(tail)) else {
                    break;
                };
                let next = candidates.iter().copied().find(|&i| !used[i]);
                let Some(i) = next else { break };
                used[i] = true;
                let (a, b) = segments[i];
                if key(a) == key(tail) {
                    line.push(b);
                } else {
                    line.push(a);
                }
            }
            line.reverse();
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_contour_in_uniform_field() {
        let field = Array2::from_elem((5, 5), 1.0);
        let x = Array1::linspace(0.0, 4.0, 5);
        let y = Array1::linspace(0.0, 4.0, 5);
        assert!(zero_contours(&field, &x, &y).is_empty());
    }

    #[test]
    fn test_horizontal_line_of_linear_field() {
        // f(x, y) = y - 1.7 crosses zero on the horizontal line y = 1.7.
        let x = Array1::linspace(0.0, 6.0, 7);
        let y = Array1::linspace(0.0, 4.0, 5);
        let field = Array2::from_shape_fn((5, 7), |(i, _)| y[i] - 1.7);
        let lines = zero_contours(&field, &x, &y);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert!(line.len() >= 7, "line should span the grid: {}", line.len());
        for &(_, py) in line {
            assert!((py - 1.7).abs() < 1e-12, "y = {py}");
        }
        // Ordered sweep across x
        let xs: Vec<f64> = line.iter().map(|p| p.0).collect();
        let mut sorted = xs.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let increasing = xs.windows(2).all(|w| w[1] >= w[0]);
        let decreasing = xs.windows(2).all(|w| w[1] <= w[0]);
        assert!(increasing || decreasing, "polyline should be ordered");
        let _ = sorted;
    }

    #[test]
    fn test_circle_contour_closes() {
        let n = 41;
        let x: Array1<f64> = Array1::linspace(-2.0, 2.0, n);
        let y: Array1<f64> = Array1::linspace(-2.0, 2.0, n);
        let field = Array2::from_shape_fn((n, n), |(i, j)| x[j].powi(2) + y[i].powi(2) - 1.0);
        let lines = zero_contours(&field, &x, &y);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        // Every vertex lies close to the unit circle.
        for &(px, py) in line {
            let r = (px * px + py * py).sqrt();
            assert!((r - 1.0).abs() < 0.05, "contour point off circle: r = {r}");
        }
        // Loop closes on itself.
        let first = line.first().unwrap();
        let last = line.last().unwrap();
        assert!((first.0 - last.0).abs() < 1e-9 && (first.1 - last.1).abs() < 1e-9);
    }
}
