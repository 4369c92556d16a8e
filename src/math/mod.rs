pub mod quadrature;
pub mod range;

pub use range::Range3;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 3x3 matrix type, used for view rotations and flatten transforms.
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Distances at or below this value are treated as zero length.
pub const SMALL_DISTANCE: f64 = 1e-8;

/// Relative tolerance used when comparing distances along a path.
pub const RELATIVE_TOLERANCE: f64 = 1e-12;

/// Returns whether two distances are equal up to [`RELATIVE_TOLERANCE`]
/// scaled by their magnitude.
#[must_use]
pub fn almost_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= RELATIVE_TOLERANCE * (1.0 + a.abs().max(b.abs()))
}

/// A point with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray3 {
    pub origin: Point3,
    pub direction: Vector3,
}

impl Ray3 {
    /// Creates a ray, normalizing `direction`.
    ///
    /// Returns `None` when the direction is zero-length.
    #[must_use]
    pub fn new(origin: Point3, direction: Vector3) -> Option<Self> {
        let len = direction.norm();
        if len < TOLERANCE {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / len,
        })
    }

    /// Evaluates `origin + t * direction`.
    #[must_use]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }
}

/// Returns the flatten transform for a view: `diag(1, 1, 0) * world_to_view`.
#[must_use]
pub fn flatten_of_view(world_to_view: &Matrix3) -> Matrix3 {
    let mut flatten = *world_to_view;
    flatten.row_mut(2).fill(0.0);
    flatten
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn almost_equal_scales_with_magnitude() {
        assert!(almost_equal(1.0e6, 1.0e6 + 1.0e-7));
        assert!(!almost_equal(1.0, 1.0 + 1.0e-9));
        assert!(almost_equal(0.0, 1.0e-13));
    }

    #[test]
    fn flatten_drops_view_z() {
        let flatten = flatten_of_view(&Matrix3::identity());
        let v = flatten * Vector3::new(3.0, 4.0, 12.0);
        assert!((v.norm() - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn ray_rejects_zero_direction() {
        assert!(Ray3::new(Point3::origin(), Vector3::zeros()).is_none());
        let ray = Ray3::new(Point3::origin(), Vector3::new(0.0, 2.0, 0.0)).unwrap();
        assert!((ray.at(3.0).y - 3.0).abs() < TOLERANCE);
    }
}
