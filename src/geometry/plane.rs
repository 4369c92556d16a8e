use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

/// An infinite plane in 3D space, stored as an origin and a unit normal.
#[derive(Debug, Clone)]
pub struct Plane {
    origin: Point3,
    normal: Vector3,
}

impl Plane {
    /// Creates a plane from an origin and a normal vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal vector is zero-length.
    pub fn from_normal(origin: Point3, normal: Vector3) -> Result<Self> {
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self {
            origin,
            normal: normal / len,
        })
    }

    /// The vertical plane `x = x`, used to slice elevation profiles.
    #[must_use]
    pub fn constant_x(x: f64) -> Self {
        Self {
            origin: Point3::new(x, 0.0, 0.0),
            normal: Vector3::x(),
        }
    }

    /// Returns the origin point of the plane.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the unit normal of the plane.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Signed distance from a point to the plane.
    /// Positive = on the normal side, negative = opposite.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3) -> f64 {
        self.normal.dot(&(point - self.origin))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_normal_rejected() {
        assert!(Plane::from_normal(Point3::origin(), Vector3::zeros()).is_err());
    }

    #[test]
    fn normal_is_unit() {
        let plane = Plane::from_normal(Point3::origin(), Vector3::new(0.0, 0.0, 4.0)).unwrap();
        assert!((plane.normal().norm() - 1.0).abs() < TOLERANCE);
        assert!((plane.signed_distance(&Point3::new(1.0, 1.0, -2.0)) + 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn constant_x_plane() {
        let plane = Plane::constant_x(3.0);
        assert!(plane.signed_distance(&Point3::new(3.0, 7.0, -1.0)).abs() < TOLERANCE);
        assert!(plane.signed_distance(&Point3::new(5.0, 0.0, 0.0)) > 0.0);
    }
}
