use std::sync::Arc;

use tracing::trace;

use crate::geometry::CurveLocation;
use crate::math::Point3;

use super::{DistanceIndex, PathDiagnostic, PathLocation, SegmentQuery};

impl DistanceIndex {
    /// Finds the location on the path nearest to `space_point`.
    ///
    /// With `compute_distance` the cumulative distance is measured along
    /// the segment; otherwise it is interpolated within the entry.
    /// An empty index yields its unanchored start location.
    #[must_use]
    pub fn closest_point(&self, space_point: &Point3, compute_distance: bool) -> PathLocation {
        self.closest_point_with_diagnostics(space_point, compute_distance, &mut Vec::new())
    }

    /// Like [`closest_point`](Self::closest_point), reporting segments whose
    /// closest-point query failed.
    pub fn closest_point_with_diagnostics(
        &self,
        space_point: &Point3,
        compute_distance: bool,
        diagnostics: &mut Vec<PathDiagnostic>,
    ) -> PathLocation {
        let Some(anchor) = self.entries().first() else {
            return self.at_start();
        };
        let mut best_entry = 0;
        let mut best_fraction = anchor.fraction();
        let mut best_point = *anchor.location().point();
        let mut best_d2 = (best_point - space_point).norm_squared();
        let mut pruned = 0usize;

        for (k, entry) in self.entries().iter().enumerate().skip(1) {
            if entry.range().distance_squared_outside(space_point) >= best_d2 {
                pruned += 1;
                continue;
            }
            let Some(found) = entry.segment().closest_point_bounded(space_point) else {
                diagnostics.push(PathDiagnostic::SegmentQueryFailed {
                    entry: k,
                    query: SegmentQuery::ClosestPoint,
                });
                continue;
            };
            let f0 = self.entry_start_fraction(k);
            let f1 = entry.fraction();
            let (lo, hi) = (f0.min(f1), f0.max(f1));
            let (fraction, point) = if (lo..=hi).contains(&found.fraction) {
                (found.fraction, found.point)
            } else {
                let f = found.fraction.clamp(lo, hi);
                (f, entry.segment().fraction_to_point(f))
            };
            let d2 = (point - space_point).norm_squared();
            if d2 < best_d2 {
                best_entry = k;
                best_fraction = fraction;
                best_point = point;
                best_d2 = d2;
            }
        }
        trace!(entry = best_entry, pruned, "closest point search");

        if best_entry == 0 {
            return anchor.location().clone();
        }
        let distance = if compute_distance {
            self.exact_distance(best_entry, best_fraction)
                .unwrap_or_else(|| self.estimate_distance(best_entry, best_fraction))
        } else {
            self.estimate_distance(best_entry, best_fraction)
        };
        let segment = Arc::clone(self.entries()[best_entry].segment());
        PathLocation::from_curve_location(
            segment,
            CurveLocation::new(best_fraction, best_point),
            Some(best_entry),
            distance,
        )
    }
}
