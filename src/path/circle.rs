use std::sync::Arc;

use tracing::trace;

use crate::geometry::curve::{same_segment, SegmentRef};
use crate::math::almost_equal;

use super::{DistanceIndex, PathLocation, SearchResult};

/// Minimum fraction advance past the start location on its own segment.
const START_SLACK: f64 = 1e-10;

impl DistanceIndex {
    /// Finds the first point along the path, from `start`, at view-plane
    /// distance `|signed_radius|` from `start`'s point.
    ///
    /// A positive radius scans toward the path end, a negative one toward
    /// the start. Returns `start` unchanged and not exact when the radius is
    /// zero, `start` is not on this path, or the circle never meets the path.
    #[must_use]
    pub fn first_intersection_with_circle(
        &self,
        start: &PathLocation,
        signed_radius: f64,
    ) -> SearchResult {
        if almost_equal(signed_radius, 0.0) {
            return SearchResult::fallback(start.clone());
        }
        let Some((anchor, k0)) = self
            .validate_location(start)
            .and_then(|loc| self.normalized_index(&loc).map(|k| (loc, k)))
        else {
            return SearchResult::fallback(start.clone());
        };
        let Some(start_segment) = anchor.segment() else {
            return SearchResult::fallback(start.clone());
        };

        let forward = signed_radius > 0.0;
        let radius = signed_radius.abs();
        let center = *anchor.point();
        let order: Vec<usize> = if forward {
            (k0..self.len()).collect()
        } else {
            (1..=k0).rev().collect()
        };

        let mut previous: Option<&SegmentRef> = None;
        let mut hits = Vec::new();
        for k in order {
            let segment = self.entries()[k].segment();
            if previous.is_some_and(|p| same_segment(p, segment)) {
                continue;
            }
            previous = Some(segment);

            hits.clear();
            segment.append_view_circle_intersections(self.flatten(), &center, radius, &mut hits);
            let on_start = same_segment(segment, start_segment);
            let candidates = hits.iter().filter(|h| {
                !on_start
                    || if forward {
                        h.fraction > anchor.fraction() + START_SLACK
                    } else {
                        h.fraction < anchor.fraction() - START_SLACK
                    }
            });
            let best = if forward {
                candidates.min_by(|a, b| a.fraction.total_cmp(&b.fraction))
            } else {
                candidates.max_by(|a, b| a.fraction.total_cmp(&b.fraction))
            };
            if let Some(hit) = best {
                let entry = self.locate_entry(segment, hit.fraction).unwrap_or(k);
                let distance = self
                    .exact_distance(entry, hit.fraction)
                    .unwrap_or_else(|| self.estimate_distance(entry, hit.fraction));
                trace!(entry, fraction = hit.fraction, "circle intersection");
                return SearchResult::hit(PathLocation::from_curve_location(
                    Arc::clone(segment),
                    *hit,
                    Some(entry),
                    distance,
                ));
            }
        }
        SearchResult::fallback(start.clone())
    }
}
