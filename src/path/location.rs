use std::cmp::Ordering;
use std::sync::Arc;

use crate::geometry::curve::{same_segment, CurveLocation, SegmentRef};
use crate::math::{Point3, Ray3, SMALL_DISTANCE};

/// A position on an indexed chain.
///
/// Combines the segment and fraction within it, the ordinal of the index
/// entry that terminates the segment run (`None` when unanchored) and the
/// cumulative 3D distance from the chain start.
#[derive(Debug, Clone)]
pub struct PathLocation {
    segment: Option<SegmentRef>,
    fraction: f64,
    point: Point3,
    index: Option<usize>,
    distance: f64,
}

impl PathLocation {
    /// Creates a location on `segment` at `fraction`, evaluating its point.
    #[must_use]
    pub fn new(segment: SegmentRef, fraction: f64, index: Option<usize>, distance: f64) -> Self {
        let point = segment.fraction_to_point(fraction);
        Self {
            segment: Some(segment),
            fraction,
            point,
            index,
            distance,
        }
    }

    /// Creates a location from an already evaluated curve location.
    #[must_use]
    pub fn from_curve_location(
        segment: SegmentRef,
        location: CurveLocation,
        index: Option<usize>,
        distance: f64,
    ) -> Self {
        Self {
            segment: Some(segment),
            fraction: location.fraction,
            point: location.point,
            index,
            distance,
        }
    }

    /// Creates an unanchored location carrying only a distance,
    /// e.g. as a search key.
    #[must_use]
    pub fn from_distance(distance: f64) -> Self {
        Self {
            segment: None,
            fraction: 0.0,
            point: Point3::origin(),
            index: None,
            distance,
        }
    }

    /// Returns the segment, if any.
    #[must_use]
    pub fn segment(&self) -> Option<&SegmentRef> {
        self.segment.as_ref()
    }

    /// Returns whether this location references a segment.
    #[must_use]
    pub fn has_segment(&self) -> bool {
        self.segment.is_some()
    }

    /// Returns the fraction within the segment.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Returns the cached point.
    #[must_use]
    pub fn point(&self) -> &Point3 {
        &self.point
    }

    /// Returns the index entry ordinal, `None` when unanchored.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Returns the stored distance from the path start. Not a recompute.
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub(crate) fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    /// Returns a location at another fraction of the same segment and entry.
    ///
    /// With `evaluate_distance` the cumulative distance is advanced by the
    /// distance travelled along the segment; otherwise it is copied.
    #[must_use]
    pub fn fraction_to_location(&self, fraction: f64, evaluate_distance: bool) -> Option<Self> {
        let segment = self.segment.as_ref()?;
        let distance = if evaluate_distance {
            self.distance + segment.signed_distance_between_fractions(self.fraction, fraction, None)?
        } else {
            self.distance
        };
        Some(Self::new(Arc::clone(segment), fraction, self.index, distance))
    }

    /// Re-evaluates the segment to get the point and unit tangent.
    #[must_use]
    pub fn point_and_unit_tangent(&self) -> Option<Ray3> {
        let (point, derivative) = self.segment.as_ref()?.fraction_to_point_and_derivative(self.fraction);
        Ray3::new(point, derivative)
    }

    /// Tests whether both locations reference the same segment object.
    #[must_use]
    pub fn same_segment(&self, other: &Self) -> bool {
        match (&self.segment, &other.segment) {
            (Some(a), Some(b)) => same_segment(a, b),
            _ => false,
        }
    }

    /// If both locations are on the same segment, returns the fraction
    /// interval from this location to `other`.
    #[must_use]
    pub fn same_segment_interval(&self, other: &Self) -> Option<(f64, f64)> {
        self.same_segment(other).then_some((self.fraction, other.fraction))
    }

    /// Distance between the points of two locations.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        (self.point - other.point).norm()
    }

    /// Distance from this location's point to `p`.
    #[must_use]
    pub fn distance_to_point(&self, p: &Point3) -> f64 {
        (self.point - p).norm()
    }

    /// Squared distance from this location's point to `p`.
    #[must_use]
    pub fn distance_squared_to_point(&self, p: &Point3) -> f64 {
        (self.point - p).norm_squared()
    }

    /// Orders locations by stored distance only.
    #[must_use]
    pub fn cmp_by_distance(a: &Self, b: &Self) -> Ordering {
        a.distance.total_cmp(&b.distance)
    }

    #[must_use]
    pub fn almost_equal_point(a: &Self, b: &Self) -> bool {
        a.distance_to(b) <= SMALL_DISTANCE
    }

    #[must_use]
    pub fn almost_equal_point_distance(a: &Self, b: &Self) -> bool {
        Self::almost_equal_point(a, b) && (a.distance - b.distance).abs() <= SMALL_DISTANCE
    }

    #[must_use]
    pub fn almost_equal_point_distance_segment(a: &Self, b: &Self) -> bool {
        Self::almost_equal_point_distance(a, b) && a.same_segment(b)
    }

    /// Extracts the stored distances.
    #[must_use]
    pub fn distances(locations: &[Self]) -> Vec<f64> {
        locations.iter().map(Self::distance).collect()
    }
}

/// Two locations, usually on different paths, that belong together.
#[derive(Debug, Clone)]
pub struct PathLocationPair {
    pub a: PathLocation,
    pub b: PathLocation,
}

impl PathLocationPair {
    #[must_use]
    pub fn new(a: PathLocation, b: PathLocation) -> Self {
        Self { a, b }
    }

    /// Orders by distance on `a`, then on `b`.
    #[must_use]
    pub fn cmp_lexical_ab(x: &Self, y: &Self) -> Ordering {
        PathLocation::cmp_by_distance(&x.a, &y.a).then_with(|| PathLocation::cmp_by_distance(&x.b, &y.b))
    }

    /// Orders by distance on `b`, then on `a`.
    #[must_use]
    pub fn cmp_lexical_ba(x: &Self, y: &Self) -> Ordering {
        PathLocation::cmp_by_distance(&x.b, &y.b).then_with(|| PathLocation::cmp_by_distance(&x.a, &y.a))
    }

    /// Points with x and y taken from `a` and z from `b`.
    #[must_use]
    pub fn merge(pairs: &[Self]) -> Vec<Point3> {
        pairs
            .iter()
            .map(|p| Point3::new(p.a.point.x, p.a.point.y, p.b.point.z))
            .collect()
    }

    /// Stored distances of the `a` locations.
    #[must_use]
    pub fn distances_a(pairs: &[Self]) -> Vec<f64> {
        pairs.iter().map(|p| p.a.distance).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::curve::LineSegment;
    use approx::assert_relative_eq;

    fn segment() -> SegmentRef {
        Arc::new(LineSegment::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)))
    }

    #[test]
    fn unanchored_location_has_no_segment() {
        let loc = PathLocation::from_distance(4.0);
        assert!(!loc.has_segment());
        assert!(loc.index().is_none());
        assert!(loc.fraction_to_location(0.5, true).is_none());
        assert!(loc.point_and_unit_tangent().is_none());
    }

    #[test]
    fn fraction_to_location_advances_distance() {
        let loc = PathLocation::new(segment(), 0.2, Some(1), 7.0);
        let moved = loc.fraction_to_location(0.5, true).unwrap();
        assert_relative_eq!(moved.distance(), 10.0);
        assert_relative_eq!(moved.point().x, 5.0);
        assert_eq!(moved.index(), Some(1));
        let copied = loc.fraction_to_location(0.5, false).unwrap();
        assert_relative_eq!(copied.distance(), 7.0);
    }

    #[test]
    fn same_segment_needs_identity() {
        let s = segment();
        let a = PathLocation::new(Arc::clone(&s), 0.1, None, 1.0);
        let b = PathLocation::new(s, 0.9, None, 9.0);
        let c = PathLocation::new(segment(), 0.9, None, 9.0);
        assert_eq!(a.same_segment_interval(&b), Some((0.1, 0.9)));
        assert!(!b.same_segment(&c));
        assert!(PathLocation::almost_equal_point_distance(&b, &c));
        assert!(!PathLocation::almost_equal_point_distance_segment(&b, &c));
    }

    #[test]
    fn unit_tangent_is_normalized() {
        let ray = PathLocation::new(segment(), 0.5, None, 5.0)
            .point_and_unit_tangent()
            .unwrap();
        assert_relative_eq!(ray.direction.norm(), 1.0);
        assert_relative_eq!(ray.origin.x, 5.0);
    }

    #[test]
    fn merge_takes_xy_from_a_and_z_from_b() {
        let a = PathLocation::new(
            Arc::new(LineSegment::new(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 10.0, 0.0))),
            0.5,
            Some(1),
            5.0,
        );
        let b = PathLocation::new(
            Arc::new(LineSegment::new(Point3::new(0.0, 0.0, 2.0), Point3::new(10.0, 0.0, 4.0))),
            0.5,
            Some(1),
            5.0,
        );
        let merged = PathLocationPair::merge(&[PathLocationPair::new(a, b)]);
        assert_eq!(merged.len(), 1);
        assert_relative_eq!(merged[0].y, 5.0);
        assert_relative_eq!(merged[0].z, 3.0);
    }

    #[test]
    fn lexical_ordering() {
        let p = |da: f64, db: f64| {
            PathLocationPair::new(PathLocation::from_distance(da), PathLocation::from_distance(db))
        };
        let mut pairs = vec![p(2.0, 0.0), p(1.0, 5.0), p(1.0, 3.0)];
        pairs.sort_by(PathLocationPair::cmp_lexical_ab);
        assert_eq!(PathLocationPair::distances_a(&pairs), vec![1.0, 1.0, 2.0]);
        assert_relative_eq!(pairs[0].b.distance(), 3.0);
        pairs.sort_by(PathLocationPair::cmp_lexical_ba);
        assert_relative_eq!(pairs[0].b.distance(), 0.0);
    }
}
