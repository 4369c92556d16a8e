use std::sync::Arc;

use crate::geometry::Plane;
use crate::math::{Matrix3, Point3, Range3, Vector3, TOLERANCE};

use super::{CurveLocation, CurveSegment, SegmentRef};

/// A bounded straight segment from `start` to `end`.
///
/// The parametric form is: `P(f) = start + f * (end - start)`.
/// Zero-length segments are representable; they report a zero length and
/// are skipped by the distance index.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSegment {
    start: Point3,
    end: Point3,
}

impl LineSegment {
    /// Creates a new segment between two points.
    #[must_use]
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    /// Returns the start point.
    #[must_use]
    pub fn start(&self) -> &Point3 {
        &self.start
    }

    /// Returns the end point.
    #[must_use]
    pub fn end(&self) -> &Point3 {
        &self.end
    }

    /// Returns `end - start`.
    #[must_use]
    pub fn delta(&self) -> Vector3 {
        self.end - self.start
    }

    /// Fraction of the orthogonal projection of `p` onto the unbounded line.
    ///
    /// Returns `None` for a zero-length segment.
    #[must_use]
    pub fn project_fraction(&self, p: &Point3) -> Option<f64> {
        let d = self.delta();
        let len_sq = d.norm_squared();
        if len_sq < TOLERANCE * TOLERANCE {
            return None;
        }
        Some((p - self.start).dot(&d) / len_sq)
    }

    fn measured_length(&self, flatten: Option<&Matrix3>) -> f64 {
        let d = self.delta();
        match flatten {
            Some(m) => (m * d).norm(),
            None => d.norm(),
        }
    }
}

impl CurveSegment for LineSegment {
    fn fraction_to_point(&self, fraction: f64) -> Point3 {
        self.start + self.delta() * fraction
    }

    fn fraction_to_point_and_derivative(&self, fraction: f64) -> (Point3, Vector3) {
        (self.fraction_to_point(fraction), self.delta())
    }

    fn length(&self) -> Option<f64> {
        Some(self.delta().norm())
    }

    fn signed_distance_between_fractions(
        &self,
        f0: f64,
        f1: f64,
        flatten: Option<&Matrix3>,
    ) -> Option<f64> {
        Some((f1 - f0) * self.measured_length(flatten))
    }

    fn point_at_signed_distance_from_fraction(
        &self,
        flatten: Option<&Matrix3>,
        fraction: f64,
        signed_distance: f64,
        extrapolate: bool,
    ) -> Option<CurveLocation> {
        let len = self.measured_length(flatten);
        if len < TOLERANCE {
            return None;
        }
        let mut f = fraction + signed_distance / len;
        if !extrapolate {
            f = f.clamp(0.0, 1.0);
        }
        Some(CurveLocation::new(f, self.fraction_to_point(f)))
    }

    fn closest_point_bounded(&self, space_point: &Point3) -> Option<CurveLocation> {
        let f = self
            .project_fraction(space_point)
            .map_or(0.0, |f| f.clamp(0.0, 1.0));
        Some(CurveLocation::new(f, self.fraction_to_point(f)))
    }

    fn range(&self) -> Range3 {
        Range3::from_points(&[self.start, self.end])
    }

    fn clone_between_fractions(
        &self,
        f0: f64,
        f1: f64,
        allow_extrapolation: bool,
    ) -> Option<SegmentRef> {
        let (f0, f1) = if allow_extrapolation {
            (f0, f1)
        } else {
            (f0.clamp(0.0, 1.0), f1.clamp(0.0, 1.0))
        };
        Some(Arc::new(Self::new(
            self.fraction_to_point(f0),
            self.fraction_to_point(f1),
        )))
    }

    fn append_plane_intersections(&self, plane: &Plane, out: &mut Vec<CurveLocation>) {
        let d = self.delta();
        let denom = plane.normal().dot(&d);
        if denom.abs() < TOLERANCE {
            // Parallel to the plane (or lying in it): no isolated crossing.
            return;
        }
        let f = -plane.signed_distance(&self.start) / denom;
        if (-TOLERANCE..=1.0 + TOLERANCE).contains(&f) {
            let f = f.clamp(0.0, 1.0);
            out.push(CurveLocation::new(f, self.fraction_to_point(f)));
        }
    }

    fn append_view_circle_intersections(
        &self,
        flatten: &Matrix3,
        center: &Point3,
        radius: f64,
        out: &mut Vec<CurveLocation>,
    ) {
        // |F (start + f d - center)|^2 = r^2 is quadratic in f.
        let u = flatten * self.delta();
        let w = flatten * (self.start - center);
        let a = u.norm_squared();
        if a < TOLERANCE * TOLERANCE {
            return;
        }
        let b = 2.0 * u.dot(&w);
        let c = w.norm_squared() - radius * radius;
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return;
        }
        let root = disc.sqrt();
        let mut roots = vec![(-b - root) / (2.0 * a)];
        if root > 0.0 {
            roots.push((-b + root) / (2.0 * a));
        }
        for f in roots {
            if (-TOLERANCE..=1.0 + TOLERANCE).contains(&f) {
                let f = f.clamp(0.0, 1.0);
                out.push(CurveLocation::new(f, self.fraction_to_point(f)));
            }
        }
    }

    fn as_line(&self) -> Option<&LineSegment> {
        Some(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> LineSegment {
        LineSegment::new(Point3::new(x0, y0, 0.0), Point3::new(x1, y1, 0.0))
    }

    #[test]
    fn length_3_4_5() {
        assert_relative_eq!(seg(0.0, 0.0, 3.0, 4.0).length().unwrap(), 5.0);
    }

    #[test]
    fn projected_length_drops_z() {
        let line = LineSegment::new(Point3::origin(), Point3::new(3.0, 4.0, 12.0));
        let flatten = crate::math::flatten_of_view(&Matrix3::identity());
        assert_relative_eq!(line.length().unwrap(), 13.0);
        assert_relative_eq!(line.length_projected(&flatten).unwrap(), 5.0);
    }

    #[test]
    fn point_at_signed_distance_moves_backward() {
        let line = seg(0.0, 0.0, 10.0, 0.0);
        let loc = line
            .point_at_signed_distance_from_fraction(None, 1.0, -2.5, false)
            .unwrap();
        assert_relative_eq!(loc.fraction, 0.75);
        assert_relative_eq!(loc.point.x, 7.5);
    }

    #[test]
    fn point_at_signed_distance_clamps_without_extrapolation() {
        let line = seg(0.0, 0.0, 10.0, 0.0);
        let clamped = line
            .point_at_signed_distance_from_fraction(None, 0.5, 20.0, false)
            .unwrap();
        assert_relative_eq!(clamped.fraction, 1.0);
        let extended = line
            .point_at_signed_distance_from_fraction(None, 0.5, 20.0, true)
            .unwrap();
        assert_relative_eq!(extended.fraction, 2.5);
    }

    #[test]
    fn zero_length_has_no_distance_search() {
        let line = seg(1.0, 1.0, 1.0, 1.0);
        assert!(line
            .point_at_signed_distance_from_fraction(None, 0.0, 1.0, true)
            .is_none());
    }

    #[test]
    fn closest_point_perpendicular() {
        let loc = seg(0.0, 0.0, 10.0, 0.0)
            .closest_point_bounded(&Point3::new(5.0, 3.0, 0.0))
            .unwrap();
        assert_relative_eq!(loc.fraction, 0.5);
        assert!(loc.point.y.abs() < 1e-12);
    }

    #[test]
    fn closest_point_clamps_to_end() {
        let loc = seg(0.0, 0.0, 10.0, 0.0)
            .closest_point_bounded(&Point3::new(15.0, 0.0, 0.0))
            .unwrap();
        assert_relative_eq!(loc.fraction, 1.0);
    }

    #[test]
    fn clone_reversed() {
        let line = seg(0.0, 0.0, 10.0, 0.0);
        let part = line.clone_between_fractions(0.8, 0.2, false).unwrap();
        assert_relative_eq!(part.fraction_to_point(0.0).x, 8.0);
        assert_relative_eq!(part.fraction_to_point(1.0).x, 2.0);
    }

    #[test]
    fn plane_crossing() {
        let mut hits = Vec::new();
        seg(0.0, 0.0, 10.0, 5.0).append_plane_intersections(&Plane::constant_x(4.0), &mut hits);
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].fraction, 0.4);
        assert_relative_eq!(hits[0].point.y, 2.0);
    }

    #[test]
    fn view_circle_two_hits() {
        let mut hits = Vec::new();
        seg(-10.0, 0.0, 10.0, 0.0).append_view_circle_intersections(
            &Matrix3::identity(),
            &Point3::origin(),
            5.0,
            &mut hits,
        );
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0].fraction, 0.25);
        assert_relative_eq!(hits[1].fraction, 0.75);
    }
}
