use super::Point3;

/// An axis-aligned bounding box.
///
/// A freshly created range is null (`min > max`) and absorbs the first point
/// extended into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range3 {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Default for Range3 {
    fn default() -> Self {
        Self::null()
    }
}

impl Range3 {
    /// Returns a range containing nothing.
    #[must_use]
    pub fn null() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Returns the smallest range containing all `points`.
    #[must_use]
    pub fn from_points(points: &[Point3]) -> Self {
        let mut range = Self::null();
        for p in points {
            range.extend_point(p);
        }
        range
    }

    /// Returns whether the range contains no points.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grows the range to include `p`.
    pub fn extend_point(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Returns the range expanded by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        if self.is_null() {
            return *self;
        }
        Self {
            min: Point3::new(self.min.x - margin, self.min.y - margin, self.min.z - margin),
            max: Point3::new(self.max.x + margin, self.max.y + margin, self.max.z + margin),
        }
    }

    /// Squared distance from `p` to the box; zero when `p` is inside.
    #[must_use]
    pub fn distance_squared_outside(&self, p: &Point3) -> f64 {
        if self.is_null() {
            return f64::INFINITY;
        }
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        let dz = (self.min.z - p.z).max(0.0).max(p.z - self.max.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Tests whether the XY projections of two ranges overlap.
    #[must_use]
    pub fn intersects_xy(&self, other: &Self) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_range_absorbs_first_point() {
        let mut r = Range3::null();
        assert!(r.is_null());
        r.extend_point(&Point3::new(1.0, 2.0, 3.0));
        assert!(!r.is_null());
        assert_eq!(r.min, r.max);
    }

    #[test]
    fn distance_outside_is_zero_inside() {
        let r = Range3::from_points(&[Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 0.0)]);
        assert!(r.distance_squared_outside(&Point3::new(1.0, 1.0, 0.0)) < 1e-20);
        let d = r.distance_squared_outside(&Point3::new(5.0, 6.0, 0.0));
        assert!((d - 25.0).abs() < 1e-12);
    }

    #[test]
    fn xy_overlap_ignores_z() {
        let a = Range3::from_points(&[Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)]);
        let b = Range3::from_points(&[Point3::new(1.0, 0.5, 9.0), Point3::new(2.0, 2.0, 9.0)]);
        let c = Range3::from_points(&[Point3::new(3.0, 3.0, 0.0), Point3::new(4.0, 4.0, 0.0)]);
        assert!(a.intersects_xy(&b));
        assert!(!a.intersects_xy(&c));
    }
}
