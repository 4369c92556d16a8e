use std::f64::consts::{FRAC_PI_8, TAU};
use std::sync::Arc;

use crate::error::{GeometryError, Result};
use crate::geometry::Plane;
use crate::math::quadrature::integrate;
use crate::math::{Matrix3, Point3, Range3, Vector3, TOLERANCE};
use crate::tessellation::StrokeOptions;

use super::{CurveLocation, CurveSegment, SegmentRef};

/// Slack allowed when mapping an angle back into the arc's fraction range.
const FRACTION_TOLERANCE: f64 = 1e-10;

/// Newton iteration cap for projected distance searches.
const MAX_NEWTON_STEPS: usize = 30;

/// A circular arc in 3D space.
///
/// Defined by a center, radius, normal axis, and a reference direction
/// for the zero-angle. Fraction `f` maps to the angle
/// `start_angle + f * (end_angle - start_angle)` around the normal axis, so
/// `end_angle < start_angle` describes a clockwise arc.
#[derive(Debug, Clone)]
pub struct ArcSegment {
    center: Point3,
    radius: f64,
    normal: Vector3,
    ref_dir: Vector3,
    start_angle: f64,
    end_angle: f64,
}

impl ArcSegment {
    /// Creates a new arc.
    ///
    /// # Arguments
    ///
    /// * `center` - Center of the arc circle
    /// * `radius` - Radius (must be positive)
    /// * `normal` - Normal vector defining the arc plane
    /// * `ref_dir` - Reference direction for angle = 0 (must be perpendicular to normal)
    /// * `start_angle` - Start angle in radians
    /// * `end_angle` - End angle in radians
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, the normal is zero-length,
    /// or the reference direction is not perpendicular to the normal.
    pub fn new(
        center: Point3,
        radius: f64,
        normal: Vector3,
        ref_dir: Vector3,
        start_angle: f64,
        end_angle: f64,
    ) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(GeometryError::Degenerate("arc radius must be positive".into()).into());
        }

        let normal_len = normal.norm();
        if normal_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / normal_len;

        let ref_len = ref_dir.norm();
        if ref_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let ref_dir = ref_dir / ref_len;

        if normal.dot(&ref_dir).abs() > TOLERANCE {
            return Err(GeometryError::Degenerate(
                "reference direction must be perpendicular to normal".into(),
            )
            .into());
        }

        Ok(Self {
            center,
            radius,
            normal,
            ref_dir,
            start_angle,
            end_angle,
        })
    }

    /// Creates an arc in the XY plane sweeping `sweep` radians
    /// (counter-clockwise when positive) from `start_angle`.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive.
    pub fn xy(center: Point3, radius: f64, start_angle: f64, sweep: f64) -> Result<Self> {
        Self::new(
            center,
            radius,
            Vector3::z(),
            Vector3::x(),
            start_angle,
            start_angle + sweep,
        )
    }

    /// Returns the center of the arc.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius of the arc.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the normal vector of the arc plane.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Returns the signed sweep angle in radians.
    #[must_use]
    pub fn sweep(&self) -> f64 {
        self.end_angle - self.start_angle
    }

    /// Computes the second axis direction (perpendicular to both normal and `ref_dir`).
    fn binormal(&self) -> Vector3 {
        self.normal.cross(&self.ref_dir)
    }

    fn angle_at(&self, fraction: f64) -> f64 {
        self.start_angle + fraction * self.sweep()
    }

    fn point_at_angle(&self, angle: f64) -> Point3 {
        let (s, c) = angle.sin_cos();
        self.center + self.ref_dir * (self.radius * c) + self.binormal() * (self.radius * s)
    }

    /// Angle of `p` around the normal, measured from `ref_dir`.
    #[must_use]
    pub fn angle_of_point(&self, p: &Point3) -> f64 {
        let v = p - self.center;
        v.dot(&self.binormal()).atan2(v.dot(&self.ref_dir))
    }

    /// Maps an angle to a fraction within `[0, 1]`, or `None` if the angle is
    /// outside the swept range.
    #[must_use]
    pub fn fraction_of_angle(&self, angle: f64) -> Option<f64> {
        let sweep = self.sweep();
        let abs_sweep = sweep.abs();
        if abs_sweep < TOLERANCE {
            return None;
        }
        let d = ((angle - self.start_angle) * sweep.signum()).rem_euclid(TAU);
        let f = d / abs_sweep;
        if f <= 1.0 + FRACTION_TOLERANCE {
            return Some(f.min(1.0));
        }
        // Just short of the start, wrapped around to ~TAU.
        if (d - TAU) / abs_sweep >= -FRACTION_TOLERANCE {
            return Some(0.0);
        }
        None
    }

    /// Tests whether both arcs lie on the same circle within `tolerance`.
    #[must_use]
    pub fn is_same_circle(&self, other: &Self, tolerance: f64) -> bool {
        (self.center - other.center).norm() <= tolerance
            && (self.radius - other.radius).abs() <= tolerance
            && self.normal.cross(&other.normal).norm() * self.radius <= tolerance
    }

    fn derivative(&self, fraction: f64) -> Vector3 {
        let (s, c) = self.angle_at(fraction).sin_cos();
        let k = self.radius * self.sweep();
        self.ref_dir * (-k * s) + self.binormal() * (k * c)
    }

    fn projected_speed(&self, flatten: &Matrix3, fraction: f64) -> f64 {
        (flatten * self.derivative(fraction)).norm()
    }

    fn quadrature_intervals(&self, f0: f64, f1: f64) -> u32 {
        let turn = (self.sweep() * (f1 - f0)).abs();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = (turn / (FRAC_PI_8 * 0.5)).ceil().min(4096.0) as u32;
        n.max(1)
    }
}

impl CurveSegment for ArcSegment {
    fn fraction_to_point(&self, fraction: f64) -> Point3 {
        self.point_at_angle(self.angle_at(fraction))
    }

    fn fraction_to_point_and_derivative(&self, fraction: f64) -> (Point3, Vector3) {
        (self.fraction_to_point(fraction), self.derivative(fraction))
    }

    fn length(&self) -> Option<f64> {
        Some(self.radius * self.sweep().abs())
    }

    fn signed_distance_between_fractions(
        &self,
        f0: f64,
        f1: f64,
        flatten: Option<&Matrix3>,
    ) -> Option<f64> {
        match flatten {
            None => Some((f1 - f0) * self.radius * self.sweep().abs()),
            Some(m) => {
                let n = self.quadrature_intervals(f0, f1);
                Some(integrate(f0, f1, n, |f| self.projected_speed(m, f)))
            }
        }
    }

    fn point_at_signed_distance_from_fraction(
        &self,
        flatten: Option<&Matrix3>,
        fraction: f64,
        signed_distance: f64,
        extrapolate: bool,
    ) -> Option<CurveLocation> {
        let mut f = match flatten {
            None => {
                let len = self.radius * self.sweep().abs();
                if len < TOLERANCE {
                    return None;
                }
                fraction + signed_distance / len
            }
            Some(m) => {
                let total = self.length_projected(m)?;
                if total < TOLERANCE {
                    return None;
                }
                let mut f = fraction + signed_distance / total;
                for _ in 0..MAX_NEWTON_STEPS {
                    let moved = self.signed_distance_between_fractions(fraction, f, Some(m))?;
                    let speed = self.projected_speed(m, f);
                    if speed < TOLERANCE {
                        return None;
                    }
                    let step = (moved - signed_distance) / speed;
                    f -= step;
                    if step.abs() < 1e-14 {
                        break;
                    }
                }
                f
            }
        };
        if !extrapolate {
            f = f.clamp(0.0, 1.0);
        }
        Some(CurveLocation::new(f, self.fraction_to_point(f)))
    }

    fn closest_point_bounded(&self, space_point: &Point3) -> Option<CurveLocation> {
        let to_point = space_point - self.center;
        let in_plane = to_point - self.normal * to_point.dot(&self.normal);

        let mut candidates = vec![0.0, 1.0];
        if in_plane.norm() >= TOLERANCE {
            if let Some(f) = self.fraction_of_angle(self.angle_of_point(space_point)) {
                candidates.push(f);
            }
        }

        candidates
            .into_iter()
            .map(|f| CurveLocation::new(f, self.fraction_to_point(f)))
            .min_by(|a, b| {
                let da = (a.point - space_point).norm_squared();
                let db = (b.point - space_point).norm_squared();
                da.total_cmp(&db)
            })
    }

    fn range(&self) -> Range3 {
        let mut range = Range3::from_points(&[self.fraction_to_point(0.0), self.fraction_to_point(1.0)]);
        let binormal = self.binormal();
        for axis in 0..3 {
            let a = self.ref_dir[axis];
            let b = binormal[axis];
            if a.abs() < TOLERANCE && b.abs() < TOLERANCE {
                continue;
            }
            let theta = b.atan2(a);
            for angle in [theta, theta + std::f64::consts::PI] {
                if let Some(f) = self.fraction_of_angle(angle) {
                    range.extend_point(&self.fraction_to_point(f));
                }
            }
        }
        range
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
        Some(Arc::new(Self {
            start_angle: self.angle_at(f0),
            end_angle: self.angle_at(f1),
            ..self.clone()
        }))
    }

    fn append_plane_intersections(&self, plane: &Plane, out: &mut Vec<CurveLocation>) {
        // n.(P(theta) - o) = A cos(theta) + B sin(theta) + C
        let a = self.radius * plane.normal().dot(&self.ref_dir);
        let b = self.radius * plane.normal().dot(&self.binormal());
        let c = plane.signed_distance(&self.center);
        let r = a.hypot(b);
        if r < TOLERANCE {
            return;
        }
        let ratio = -c / r;
        if ratio.abs() > 1.0 + TOLERANCE {
            return;
        }
        let phi = b.atan2(a);
        let alpha = ratio.clamp(-1.0, 1.0).acos();

        let mut hits: Vec<f64> = Vec::with_capacity(2);
        for angle in [phi - alpha, phi + alpha] {
            if let Some(f) = self.fraction_of_angle(angle) {
                if hits.iter().all(|h| (h - f).abs() > FRACTION_TOLERANCE) {
                    hits.push(f);
                }
            }
        }
        hits.sort_by(f64::total_cmp);
        out.extend(
            hits.into_iter()
                .map(|f| CurveLocation::new(f, self.fraction_to_point(f))),
        );
    }

    fn add_strokes(&self, f0: f64, f1: f64, options: &StrokeOptions, out: &mut Vec<CurveLocation>) {
        let n = options.arc_count(self.radius, (self.sweep() * (f1 - f0)).abs());
        for i in 0..=n {
            let f = f0 + (f1 - f0) * f64::from(i) / f64::from(n);
            out.push(CurveLocation::new(f, self.fraction_to_point(f)));
        }
    }

    fn as_arc(&self) -> Option<&ArcSegment> {
        Some(self)
    }
}
