mod arc;
mod line;

pub use arc::ArcSegment;
pub use line::LineSegment;

use std::fmt;
use std::sync::Arc;

use crate::geometry::Plane;
use crate::math::{Matrix3, Point3, Range3, Vector3};
use crate::tessellation::StrokeOptions;

/// Shared handle to a curve segment.
///
/// Chains, distance indexes and path locations all hold segments through
/// this handle, so a segment lives as long as anything still refers to it.
pub type SegmentRef = Arc<dyn CurveSegment>;

/// A fractional position on a single curve segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveLocation {
    /// Fractional position, `0` at the segment start and `1` at its end.
    pub fraction: f64,
    /// Point at `fraction`.
    pub point: Point3,
}

impl CurveLocation {
    /// Creates a new curve location.
    #[must_use]
    pub fn new(fraction: f64, point: Point3) -> Self {
        Self { fraction, point }
    }
}

/// Number of sample intervals used by the default view-circle intersection.
const CIRCLE_SAMPLES: u32 = 64;

/// Trait for bounded curve primitives parameterized by fraction in `[0, 1]`.
///
/// Methods taking a `flatten` matrix measure distances after applying it to
/// the curve's derivative, i.e. as seen in a projected view.
pub trait CurveSegment: fmt::Debug + Send + Sync {
    /// Evaluates the point at `fraction`.
    fn fraction_to_point(&self, fraction: f64) -> Point3;

    /// Evaluates the point and the derivative with respect to fraction.
    fn fraction_to_point_and_derivative(&self, fraction: f64) -> (Point3, Vector3);

    /// True 3D length, or `None` if it cannot be computed.
    fn length(&self) -> Option<f64>;

    /// Length measured after applying `flatten`.
    fn length_projected(&self, flatten: &Matrix3) -> Option<f64> {
        self.signed_distance_between_fractions(0.0, 1.0, Some(flatten))
    }

    /// Signed distance travelled from `f0` to `f1`, negative when `f1 < f0`.
    fn signed_distance_between_fractions(
        &self,
        f0: f64,
        f1: f64,
        flatten: Option<&Matrix3>,
    ) -> Option<f64>;

    /// Finds the location reached by moving `signed_distance` from `fraction`.
    ///
    /// With `extrapolate == false` the result is clamped to the segment.
    fn point_at_signed_distance_from_fraction(
        &self,
        flatten: Option<&Matrix3>,
        fraction: f64,
        signed_distance: f64,
        extrapolate: bool,
    ) -> Option<CurveLocation>;

    /// Closest point to `space_point` with fraction restricted to `[0, 1]`.
    fn closest_point_bounded(&self, space_point: &Point3) -> Option<CurveLocation>;

    /// Axis-aligned bounding box of the segment.
    fn range(&self) -> Range3;

    /// Creates a new segment covering `[f0, f1]` of this one.
    /// `f1 < f0` yields a reversed segment.
    fn clone_between_fractions(
        &self,
        f0: f64,
        f1: f64,
        allow_extrapolation: bool,
    ) -> Option<SegmentRef>;

    /// Appends every crossing of the segment with `plane`.
    fn append_plane_intersections(&self, plane: &Plane, out: &mut Vec<CurveLocation>);

    /// Appends every location whose flattened distance from the flattened
    /// `center` equals `radius`.
    fn append_view_circle_intersections(
        &self,
        flatten: &Matrix3,
        center: &Point3,
        radius: f64,
        out: &mut Vec<CurveLocation>,
    ) {
        let flat_center = flatten * center.coords;
        let g = |f: f64| {
            let d = flatten * self.fraction_to_point(f).coords - flat_center;
            d.norm_squared() - radius * radius
        };
        let step = 1.0 / f64::from(CIRCLE_SAMPLES);
        let mut f0 = 0.0;
        let mut g0 = g(f0);
        if g0 == 0.0 {
            out.push(CurveLocation::new(f0, self.fraction_to_point(f0)));
        }
        for i in 1..=CIRCLE_SAMPLES {
            let f1 = step * f64::from(i);
            let g1 = g(f1);
            if g1 == 0.0 {
                out.push(CurveLocation::new(f1, self.fraction_to_point(f1)));
            } else if g0 * g1 < 0.0 {
                let (mut lo, mut hi, mut glo) = (f0, f1, g0);
                for _ in 0..60 {
                    let mid = 0.5 * (lo + hi);
                    let gm = g(mid);
                    if gm * glo <= 0.0 {
                        hi = mid;
                    } else {
                        lo = mid;
                        glo = gm;
                    }
                }
                let f = 0.5 * (lo + hi);
                out.push(CurveLocation::new(f, self.fraction_to_point(f)));
            }
            f0 = f1;
            g0 = g1;
        }
    }

    /// Appends stroke points from `f0` to `f1`, both ends included.
    fn add_strokes(&self, f0: f64, f1: f64, options: &StrokeOptions, out: &mut Vec<CurveLocation>) {
        let length = self
            .signed_distance_between_fractions(f0, f1, None)
            .map_or(0.0, f64::abs);
        let n = options.line_count(length);
        for i in 0..=n {
            let f = f0 + (f1 - f0) * f64::from(i) / f64::from(n);
            out.push(CurveLocation::new(f, self.fraction_to_point(f)));
        }
    }

    /// Downcast to a straight line segment.
    fn as_line(&self) -> Option<&LineSegment> {
        None
    }

    /// Downcast to a circular arc.
    fn as_arc(&self) -> Option<&ArcSegment> {
        None
    }
}

/// Returns whether two handles refer to the same segment object.
#[must_use]
pub fn same_segment(a: &SegmentRef, b: &SegmentRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
