//! Detection of sub-paths shared by two indexed chains.
//!
//! Two entries overlap when their segments are collinear lines or
//! co-circular arcs covering a common stretch. Overlaps are reported as
//! paired [`PathInterval`]s, optionally interleaved with gap intervals so
//! that each side covers its whole path.

use tracing::debug;

use crate::geometry::curve::{ArcSegment, CurveSegment, LineSegment, SegmentRef};
use crate::math::Point3;

use super::{DistanceIndex, PathLocation};

/// Distance within which geometry is considered coincident.
pub const COINCIDENCE_TOLERANCE: f64 = 1.0e-7;

/// Fraction slack used when clipping overlaps to entry runs.
const FRACTION_EPSILON: f64 = 1.0e-12;

/// Whether an interval is shared by both paths or lies between shared parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    Common,
    Gap,
}

/// A stretch of one path between two locations.
#[derive(Debug, Clone)]
pub struct PathInterval {
    pub start: PathLocation,
    pub end: PathLocation,
    pub kind: IntervalKind,
}

impl PathInterval {
    /// Absolute difference of the end distances.
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.end.distance() - self.start.distance()).abs()
    }
}

/// Matched interval lists; `path_a[i]` corresponds to `path_b[i]`.
#[derive(Debug, Clone, Default)]
pub struct CommonSubPaths {
    pub path_a: Vec<PathInterval>,
    pub path_b: Vec<PathInterval>,
}

impl CommonSubPaths {
    #[must_use]
    pub fn len(&self) -> usize {
        self.path_a.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path_a.is_empty()
    }

    /// Iterates over corresponding interval pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&PathInterval, &PathInterval)> {
        self.path_a.iter().zip(self.path_b.iter())
    }

    fn push(&mut self, a: PathInterval, b: PathInterval) {
        self.path_a.push(a);
        self.path_b.push(b);
    }
}

/// Corresponding fraction ranges on two segments.
///
/// `a0 < a1`; `b0`/`b1` are the fractions on the second segment at the same
/// points, so `b0 > b1` when the segments run in opposite directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractionOverlap {
    pub a0: f64,
    pub a1: f64,
    pub b0: f64,
    pub b1: f64,
}

impl FractionOverlap {
    fn at(&self, t: f64) -> (f64, f64) {
        (
            self.a0 + t * (self.a1 - self.a0),
            self.b0 + t * (self.b1 - self.b0),
        )
    }
}

/// Finds the shared stretch of two segments.
///
/// Only collinear lines and co-circular arcs can overlap; any other pairing
/// reports `None`, as do overlaps no longer than `tolerance`.
#[must_use]
pub fn segment_overlap(a: &SegmentRef, b: &SegmentRef, tolerance: f64) -> Option<FractionOverlap> {
    if let (Some(la), Some(lb)) = (a.as_line(), b.as_line()) {
        return line_overlap(la, lb, tolerance);
    }
    if let (Some(aa), Some(ab)) = (a.as_arc(), b.as_arc()) {
        return arc_overlap(aa, ab, tolerance);
    }
    None
}

fn carrier_distance(line: &LineSegment, p: &Point3) -> Option<f64> {
    let f = line.project_fraction(p)?;
    Some((line.fraction_to_point(f) - p).norm())
}

fn line_overlap(a: &LineSegment, b: &LineSegment, tolerance: f64) -> Option<FractionOverlap> {
    let on_carriers = [b.start(), b.end()]
        .into_iter()
        .map(|p| carrier_distance(a, p))
        .chain([a.start(), a.end()].into_iter().map(|p| carrier_distance(b, p)))
        .all(|d| d.is_some_and(|d| d <= tolerance));
    if !on_carriers {
        return None;
    }
    let fs = a.project_fraction(b.start())?;
    let fe = a.project_fraction(b.end())?;
    let lo = fs.min(fe).max(0.0);
    let hi = fs.max(fe).min(1.0);
    if (hi - lo) * a.delta().norm() <= tolerance {
        return None;
    }
    let to_b = |f: f64| (f - fs) / (fe - fs);
    Some(FractionOverlap {
        a0: lo,
        a1: hi,
        b0: to_b(lo),
        b1: to_b(hi),
    })
}

fn arc_overlap(a: &ArcSegment, b: &ArcSegment, tolerance: f64) -> Option<FractionOverlap> {
    if !a.is_same_circle(b, tolerance) {
        return None;
    }
    let mut candidates = Vec::with_capacity(4);
    for fb in [0.0, 1.0] {
        let point = b.fraction_to_point(fb);
        if let Some(fa) = a.fraction_of_angle(a.angle_of_point(&point)) {
            candidates.push((fa, fb));
        }
    }
    for fa in [0.0, 1.0] {
        let point = a.fraction_to_point(fa);
        if let Some(fb) = b.fraction_of_angle(b.angle_of_point(&point)) {
            candidates.push((fa, fb));
        }
    }
    let first = candidates
        .iter()
        .min_by(|x, y| x.0.total_cmp(&y.0))
        .copied()?;
    let last = candidates
        .iter()
        .max_by(|x, y| x.0.total_cmp(&y.0))
        .copied()?;
    if (last.0 - first.0) * a.sweep().abs() * a.radius() <= tolerance {
        return None;
    }
    Some(FractionOverlap {
        a0: first.0,
        a1: last.0,
        b0: first.1,
        b1: last.1,
    })
}

/// Parameter window in which `v0 + t (v1 - v0)` stays inside `[lo, hi]`.
fn param_window(v0: f64, v1: f64, lo: f64, hi: f64) -> Option<(f64, f64)> {
    let dv = v1 - v0;
    if dv.abs() < FRACTION_EPSILON {
        let inside = v0 >= lo - FRACTION_EPSILON && v0 <= hi + FRACTION_EPSILON;
        return inside.then_some((0.0, 1.0));
    }
    let t_lo = (lo - v0) / dv;
    let t_hi = (hi - v0) / dv;
    Some((t_lo.min(t_hi), t_lo.max(t_hi)))
}

fn entry_run(index: &DistanceIndex, k: usize) -> (f64, f64) {
    let f0 = index.entry_start_fraction(k);
    let f1 = index.entries()[k].fraction();
    (f0.min(f1), f0.max(f1))
}

/// Restricts a segment overlap to the fraction runs of entries `ia` and
/// `ib` and converts it to locations.
fn clip_to_entries(
    a: &DistanceIndex,
    ia: usize,
    b: &DistanceIndex,
    ib: usize,
    overlap: &FractionOverlap,
) -> Option<[PathLocation; 4]> {
    let (ra0, ra1) = entry_run(a, ia);
    let (rb0, rb1) = entry_run(b, ib);
    let wa = param_window(overlap.a0, overlap.a1, ra0, ra1)?;
    let wb = param_window(overlap.b0, overlap.b1, rb0, rb1)?;
    let t0 = wa.0.max(wb.0).max(0.0);
    let t1 = wa.1.min(wb.1).min(1.0);
    if t1 - t0 <= FRACTION_EPSILON {
        return None;
    }
    let (fa0, fb0) = overlap.at(t0);
    let (fa1, fb1) = overlap.at(t1);
    let a0 = a.indexed_fraction_to_location(ia, fa0, true)?;
    let a1 = a.indexed_fraction_to_location(ia, fa1, true)?;
    if (a1.distance() - a0.distance()).abs() <= COINCIDENCE_TOLERANCE {
        return None;
    }
    Some([
        a0,
        a1,
        b.indexed_fraction_to_location(ib, fb0, true)?,
        b.indexed_fraction_to_location(ib, fb1, true)?,
    ])
}

/// Accumulates interval pairs in path-A order.
struct Collector {
    include_gaps: bool,
    compress: bool,
    previous_a: PathLocation,
    previous_b: PathLocation,
    out: CommonSubPaths,
}

impl Collector {
    fn new(a: &DistanceIndex, b: &DistanceIndex, include_gaps: bool, compress: bool) -> Self {
        Self {
            include_gaps,
            compress,
            previous_a: a.at_start(),
            previous_b: b.at_start(),
            out: CommonSubPaths::default(),
        }
    }

    fn record(&mut self, [a0, a1, b0, b1]: [PathLocation; 4]) {
        let contiguous_a = touches(&self.previous_a, &a0);
        let contiguous_b = touches(&self.previous_b, &b0);
        let last_common = self
            .out
            .path_a
            .last()
            .is_some_and(|i| i.kind == IntervalKind::Common);

        if self.compress && last_common && contiguous_a && contiguous_b {
            if let (Some(ia), Some(ib)) = (self.out.path_a.last_mut(), self.out.path_b.last_mut()) {
                ia.end = a1.clone();
                ib.end = b1.clone();
            }
        } else {
            if self.include_gaps && !(contiguous_a && contiguous_b) {
                self.push_gap(a0.clone(), b0.clone());
            }
            self.out.push(
                PathInterval {
                    start: a0,
                    end: a1.clone(),
                    kind: IntervalKind::Common,
                },
                PathInterval {
                    start: b0,
                    end: b1.clone(),
                    kind: IntervalKind::Common,
                },
            );
        }
        self.previous_a = a1;
        self.previous_b = b1;
    }

    fn push_gap(&mut self, end_a: PathLocation, end_b: PathLocation) {
        self.out.push(
            PathInterval {
                start: self.previous_a.clone(),
                end: end_a,
                kind: IntervalKind::Gap,
            },
            PathInterval {
                start: self.previous_b.clone(),
                end: end_b,
                kind: IntervalKind::Gap,
            },
        );
    }

    fn finish(mut self, a: &DistanceIndex, b: &DistanceIndex) -> CommonSubPaths {
        if self.include_gaps {
            let (end_a, end_b) = (a.at_end(), b.at_end());
            if !touches(&self.previous_a, &end_a) || !touches(&self.previous_b, &end_b) {
                self.push_gap(end_a, end_b);
            }
        }
        self.out
    }
}

fn touches(previous: &PathLocation, next: &PathLocation) -> bool {
    (next.distance() - previous.distance()).abs() <= COINCIDENCE_TOLERANCE
}

/// Finds the sub-paths two indexed chains have in common.
///
/// With `include_gaps`, gap pairs are inserted wherever either path is not
/// covered by a common interval, so both lists span their whole paths. With
/// `compress`, a common interval contiguous on both paths with the previous
/// one extends it.
#[must_use]
pub fn find_common_sub_paths(
    a: &DistanceIndex,
    b: &DistanceIndex,
    include_gaps: bool,
    compress: bool,
) -> CommonSubPaths {
    let mut collector = Collector::new(a, b, include_gaps, compress);
    let mut overlaps = 0usize;
    let mut b_begin = 1;
    for ia in 1..a.len() {
        let entry_a = &a.entries()[ia];
        for ib in b_begin..b.len() {
            let entry_b = &b.entries()[ib];
            if !entry_a.range_intersects_xy(entry_b, COINCIDENCE_TOLERANCE) {
                continue;
            }
            let Some(overlap) =
                segment_overlap(entry_a.segment(), entry_b.segment(), COINCIDENCE_TOLERANCE)
            else {
                continue;
            };
            if let Some(locations) = clip_to_entries(a, ia, b, ib, &overlap) {
                collector.record(locations);
                overlaps += 1;
                b_begin = ib;
            }
        }
    }
    let result = collector.finish(a, b);
    debug!(overlaps, intervals = result.len(), "common sub-path search");
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::index::tests::{line_arc_line, p, polyline};
    use super::*;
    use crate::geometry::Chain;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
    use std::sync::Arc;

    fn kinds(result: &CommonSubPaths) -> Vec<IntervalKind> {
        result.path_a.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn disjoint_paths_give_one_gap() {
        let a = DistanceIndex::from_chain(&polyline(&[p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0)]));
        let b = DistanceIndex::from_chain(&polyline(&[p(0.0, 5.0, 0.0), p(8.0, 5.0, 0.0)]));
        let result = find_common_sub_paths(&a, &b, true, true);
        assert_eq!(kinds(&result), vec![IntervalKind::Gap]);
        let (ga, gb) = result.pairs().next().unwrap();
        assert_relative_eq!(ga.start.distance(), 0.0);
        assert_relative_eq!(ga.end.distance(), 10.0);
        assert_relative_eq!(gb.end.distance(), 8.0);
        assert!(find_common_sub_paths(&a, &b, false, true).is_empty());
    }

    #[test]
    fn identical_geometry_is_common() {
        let a = DistanceIndex::from_chain(&line_arc_line());
        let b = DistanceIndex::from_chain(&line_arc_line());
        let compressed = find_common_sub_paths(&a, &b, true, true);
        assert_eq!(kinds(&compressed), vec![IntervalKind::Common]);
        assert_relative_eq!(compressed.path_a[0].length(), a.total_length(), epsilon = 1e-9);
        assert_relative_eq!(compressed.path_b[0].length(), b.total_length(), epsilon = 1e-9);

        let separate = find_common_sub_paths(&a, &b, true, false);
        assert_eq!(separate.len(), 3);
        assert!(separate.pairs().all(|(x, y)| {
            x.kind == IntervalKind::Common && (x.length() - y.length()).abs() < 1e-9
        }));
    }

    #[test]
    fn partial_overlap_with_leading_and_trailing_gaps() {
        let a = DistanceIndex::from_chain(&polyline(&[
            p(0.0, 0.0, 0.0),
            p(10.0, 0.0, 0.0),
            p(20.0, 0.0, 0.0),
        ]));
        let b = DistanceIndex::from_chain(&polyline(&[
            p(5.0, 0.0, 0.0),
            p(15.0, 0.0, 0.0),
            p(15.0, 10.0, 0.0),
        ]));
        let result = find_common_sub_paths(&a, &b, true, true);
        assert_eq!(
            kinds(&result),
            vec![IntervalKind::Gap, IntervalKind::Common, IntervalKind::Gap]
        );
        let common_a = &result.path_a[1];
        let common_b = &result.path_b[1];
        assert_relative_eq!(common_a.start.distance(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(common_a.end.distance(), 15.0, epsilon = 1e-9);
        assert_relative_eq!(common_b.start.distance(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(common_b.end.distance(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(result.path_a[0].length(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(result.path_b[0].length(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.path_b[2].end.distance(), 20.0, epsilon = 1e-9);

        let uncompressed = find_common_sub_paths(&a, &b, false, false);
        assert_eq!(uncompressed.len(), 2);
    }

    #[test]
    fn opposite_lines_overlap_backward() {
        let a: SegmentRef = Arc::new(LineSegment::new(p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0)));
        let b: SegmentRef = Arc::new(LineSegment::new(p(8.0, 0.0, 0.0), p(2.0, 0.0, 0.0)));
        let overlap = segment_overlap(&a, &b, COINCIDENCE_TOLERANCE).unwrap();
        assert_relative_eq!(overlap.a0, 0.2, epsilon = 1e-12);
        assert_relative_eq!(overlap.a1, 0.8, epsilon = 1e-12);
        assert_relative_eq!(overlap.b0, 1.0, epsilon = 1e-12);
        assert_relative_eq!(overlap.b1, 0.0, epsilon = 1e-12);

        let offset: SegmentRef = Arc::new(LineSegment::new(p(2.0, 1e-3, 0.0), p(8.0, 1e-3, 0.0)));
        assert!(segment_overlap(&a, &offset, COINCIDENCE_TOLERANCE).is_none());
    }

    #[test]
    fn co_circular_arcs_overlap() {
        let a: SegmentRef = Arc::new(ArcSegment::xy(p(0.0, 0.0, 0.0), 10.0, 0.0, FRAC_PI_2).unwrap());
        let b: SegmentRef =
            Arc::new(ArcSegment::xy(p(0.0, 0.0, 0.0), 10.0, FRAC_PI_4, 3.0 * FRAC_PI_4).unwrap());
        let overlap = segment_overlap(&a, &b, COINCIDENCE_TOLERANCE).unwrap();
        assert_relative_eq!(overlap.a0, 0.5, epsilon = 1e-12);
        assert_relative_eq!(overlap.a1, 1.0, epsilon = 1e-12);
        assert_relative_eq!(overlap.b0, 0.0, epsilon = 1e-12);
        assert_relative_eq!(overlap.b1, 1.0 / 3.0, epsilon = 1e-12);

        let ia = DistanceIndex::from_chain(&Chain::from_segments([a]));
        let ib = DistanceIndex::from_chain(&Chain::from_segments([b]));
        let result = find_common_sub_paths(&ia, &ib, false, true);
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result.path_a[0].start.distance(), 2.5 * PI, epsilon = 1e-9);
        assert_relative_eq!(result.path_b[0].end.distance(), 2.5 * PI, epsilon = 1e-9);
    }

    #[test]
    fn line_and_arc_never_overlap() {
        let a: SegmentRef = Arc::new(LineSegment::new(p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0)));
        let b: SegmentRef = Arc::new(ArcSegment::xy(p(5.0, 5.0, 0.0), 5.0, -FRAC_PI_2, PI).unwrap());
        assert!(segment_overlap(&a, &b, COINCIDENCE_TOLERANCE).is_none());
    }
}
