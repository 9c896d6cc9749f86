//! Traced field lines and their classification.

use crate::coords::CoordSequence;
use crate::output::Output;
use corona_types::error::CoronaResult;
use corona_types::frame::CarringtonFrame;
use ndarray::Array2;
use std::ops::Index;

/// Relative tolerance for deciding which boundary a line endpoint sits on.
const ENDPOINT_TOL: f64 = 1e-3;

/// One traced field line.
///
/// Points run from one end to the other in photospheric radii; the tracer
/// orders them from the anti-field direction endpoint to the field
/// direction endpoint.
#[derive(Debug, Clone)]
pub struct FieldLine {
    coords: CoordSequence,
    /// True when tracing stopped on the step budget instead of a boundary.
    truncated: bool,
    rss: f64,
}

impl FieldLine {
    pub(crate) fn new(coords: CoordSequence, truncated: bool, rss: f64) -> Self {
        FieldLine {
            coords,
            truncated,
            rss,
        }
    }

    pub fn coords(&self) -> &CoordSequence {
        &self.coords
    }

    pub fn frame(&self) -> &CarringtonFrame {
        self.coords.frame()
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    fn end_radii(&self) -> Option<(f64, f64)> {
        let pts = self.coords.points();
        let first = pts.first()?;
        let last = pts.last()?;
        let r = |p: &[f64; 3]| (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        Some((r(first), r(last)))
    }

    fn at_source_surface(&self, r: f64) -> bool {
        r > self.rss * (1.0 - ENDPOINT_TOL)
    }

    fn at_photosphere(&self, r: f64) -> bool {
        r < 1.0 + ENDPOINT_TOL
    }

    /// Whether the line reaches the source surface.
    ///
    /// Truncated lines count as closed since their far end is unknown.
    pub fn is_open(&self) -> bool {
        self.polarity() != 0
    }

    /// Sign of the radial field where the line crosses the source surface:
    /// +1 or -1 for open lines, 0 for closed or truncated ones.
    pub fn polarity(&self) -> i8 {
        if self.truncated {
            return 0;
        }
        let Some((r_first, r_last)) = self.end_radii() else {
            return 0;
        };
        let pts = self.coords.points();
        let open_end = if self.at_source_surface(r_last) {
            Some(pts[pts.len() - 1])
        } else if self.at_source_surface(r_first) {
            Some(pts[0])
        } else {
            None
        };
        // Points are ordered along the field direction, so reaching the
        // source surface at the last point means B_r points outward there.
        match open_end {
            Some(_) => {
                if self.at_source_surface(r_last) {
                    1
                } else {
                    -1
                }
            }
            None => 0,
        }
    }

    /// Endpoint on the photosphere, if the line has one.
    pub fn solar_footpoint(&self) -> Option<[f64; 3]> {
        let (r_first, r_last) = self.end_radii()?;
        let pts = self.coords.points();
        if self.at_photosphere(r_first) {
            Some(pts[0])
        } else if self.at_photosphere(r_last) {
            Some(pts[pts.len() - 1])
        } else {
            None
        }
    }

    /// Endpoint on the source surface, for open lines.
    pub fn source_surface_footpoint(&self) -> Option<[f64; 3]> {
        let (r_first, r_last) = self.end_radii()?;
        let pts = self.coords.points();
        if self.at_source_surface(r_last) {
            Some(pts[pts.len() - 1])
        } else if self.at_source_surface(r_first) {
            Some(pts[0])
        } else {
            None
        }
    }

    /// Both photospheric endpoints of a closed line.
    pub fn closed_footpoints(&self) -> Option<([f64; 3], [f64; 3])> {
        let (r_first, r_last) = self.end_radii()?;
        if self.at_photosphere(r_first) && self.at_photosphere(r_last) {
            let pts = self.coords.points();
            Some((pts[0], pts[pts.len() - 1]))
        } else {
            None
        }
    }

    /// Ratio of flux-tube cross sections between the photosphere and the
    /// source surface: |B_r(1)| / (|B_r(rss)| rss^2). NaN for closed lines.
    pub fn expansion_factor(&self, output: &Output) -> f64 {
        let (Some(foot), Some(top)) = (self.solar_footpoint(), self.source_surface_footpoint())
        else {
            return f64::NAN;
        };
        let frame = *self.coords.frame();
        let ends = CoordSequence::from_cartesian(frame, vec![foot, top]);
        let Ok(b) = output.get_bvec(&ends, "spherical") else {
            return f64::NAN;
        };
        let (br_foot, br_top) = (b[[0, 0]].abs(), b[[1, 0]].abs());
        if br_top == 0.0 {
            return f64::NAN;
        }
        br_foot / (br_top * self.rss * self.rss)
    }

    /// Field vectors along the line, spherical components.
    pub fn field_values(&self, output: &Output) -> CoronaResult<Array2<f64>> {
        output.get_bvec(&self.coords, "spherical")
    }
}

/// The result of tracing a batch of seed points.
#[derive(Debug, Clone, Default)]
pub struct FieldLines {
    lines: Vec<FieldLine>,
}

impl FieldLines {
    pub(crate) fn new(lines: Vec<FieldLine>) -> Self {
        FieldLines { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldLine> {
        self.lines.iter()
    }

    /// Per-line polarities: +1, -1, or 0 for closed lines.
    pub fn polarities(&self) -> Vec<i8> {
        self.lines.iter().map(FieldLine::polarity).collect()
    }

    /// Seed-ordered connectivity flags: 1 for open lines, 0 for closed.
    pub fn connectivities(&self) -> Vec<u8> {
        self.lines.iter().map(|l| l.is_open() as u8).collect()
    }

    /// Counts of (open, closed) lines.
    pub fn connectivity_counts(&self) -> (usize, usize) {
        let open = self.lines.iter().filter(|l| l.is_open()).count();
        (open, self.lines.len() - open)
    }

    pub fn open_field_lines(&self) -> Vec<&FieldLine> {
        self.lines.iter().filter(|l| l.is_open()).collect()
    }

    pub fn closed_field_lines(&self) -> Vec<&FieldLine> {
        self.lines.iter().filter(|l| !l.is_open()).collect()
    }

    /// Photospheric footpoints of all lines that have one.
    pub fn solar_feet(&self, frame: CarringtonFrame) -> CoordSequence {
        let pts = self
            .lines
            .iter()
            .filter_map(FieldLine::solar_footpoint)
            .collect();
        CoordSequence::from_cartesian(frame, pts)
    }

    /// Source-surface footpoints of the open lines.
    pub fn source_surface_feet(&self, frame: CarringtonFrame) -> CoordSequence {
        let pts = self
            .lines
            .iter()
            .filter_map(FieldLine::source_surface_footpoint)
            .collect();
        CoordSequence::from_cartesian(frame, pts)
    }

    /// Expansion factors of all lines, NaN for closed ones.
    pub fn expansion_factors(&self, output: &Output) -> Vec<f64> {
        self.lines
            .iter()
            .map(|l| l.expansion_factor(output))
            .collect()
    }

    /// True when any line stopped on its step budget.
    pub fn ran_out_of_steps(&self) -> bool {
        self.lines.iter().any(FieldLine::truncated)
    }
}

impl Index<usize> for FieldLines {
    type Output = FieldLine;

    fn index(&self, i: usize) -> &FieldLine {
        &self.lines[i]
    }
}

impl<'a> IntoIterator for &'a FieldLines {
    type Item = &'a FieldLine;
    type IntoIter = std::slice::Iter<'a, FieldLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
