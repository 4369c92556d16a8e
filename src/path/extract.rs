use tracing::trace;

use crate::geometry::curve::{same_segment, SegmentRef};
use crate::geometry::Chain;
use crate::math::SMALL_DISTANCE;

use super::{DistanceIndex, DistanceMode, PathLocation};

impl DistanceIndex {
    /// Extracts the part of the path between two locations.
    ///
    /// Locations not anchored in this index are resolved by their stored
    /// distance. When `b` precedes `a` the result runs backward. Fragments
    /// no longer than [`SMALL_DISTANCE`] are dropped; `None` is returned
    /// when nothing is left or the index is empty.
    #[must_use]
    pub fn clone_between(&self, a: &PathLocation, b: &PathLocation) -> Option<Chain> {
        if self.len() < 2 {
            return None;
        }
        let a = self.resolve_location(a);
        let b = self.resolve_location(b);
        let ka = self.normalized_index(&a)?;
        let kb = self.normalized_index(&b)?;
        if ka > kb {
            return self.clone_between(&b, &a).map(|chain| chain.reversed());
        }

        let entries = self.entries();
        let mut chain = Chain::new();
        if ka == kb {
            push_fragment(&mut chain, entries[ka].segment(), a.fraction(), b.fraction());
            return (!chain.is_empty()).then_some(chain);
        }

        let mut segment = entries[ka].segment();
        let mut f0 = a.fraction();
        let mut f1 = entries[ka].fraction();
        for k in ka + 1..=kb {
            let entry = &entries[k];
            let end = if k == kb { b.fraction() } else { entry.fraction() };
            if same_segment(entry.segment(), segment) {
                f1 = end;
                continue;
            }
            push_fragment(&mut chain, segment, f0, f1);
            segment = entry.segment();
            f0 = 0.0;
            f1 = end;
        }
        push_fragment(&mut chain, segment, f0, f1);
        (!chain.is_empty()).then_some(chain)
    }

    /// Extracts the part of the path between two cumulative 3D distances.
    #[must_use]
    pub fn clone_between_distances(&self, d0: f64, d1: f64) -> Option<Chain> {
        let a = self.search_by_distance(d0, DistanceMode::Spatial).location;
        let b = self.search_by_distance(d1, DistanceMode::Spatial).location;
        self.clone_between(&a, &b)
    }

    /// Extracts the part of the path between two cumulative projected distances.
    #[must_use]
    pub fn clone_between_distances_xy(&self, d0: f64, d1: f64) -> Option<Chain> {
        let a = self.search_by_distance(d0, DistanceMode::Projected).location;
        let b = self.search_by_distance(d1, DistanceMode::Projected).location;
        self.clone_between(&a, &b)
    }

    fn resolve_location(&self, location: &PathLocation) -> PathLocation {
        self.validate_location(location).unwrap_or_else(|| {
            trace!(distance = location.distance(), "resolving location by distance");
            self.search_by_distance(location.distance(), DistanceMode::Spatial)
                .location
        })
    }
}

fn push_fragment(chain: &mut Chain, segment: &SegmentRef, f0: f64, f1: f64) {
    let length = segment
        .signed_distance_between_fractions(f0, f1, None)
        .map_or(0.0, f64::abs);
    if length <= SMALL_DISTANCE {
        return;
    }
    if let Some(fragment) = segment.clone_between_fractions(f0, f1, false) {
        chain.push_segment(fragment);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::index::tests::{line_arc_line, p, polyline};
    use super::*;
    use crate::math::Point3;
    use approx::assert_relative_eq;

    fn ends(chain: &Chain) -> (Point3, Point3) {
        let leaves: Vec<&SegmentRef> = chain.leaves().collect();
        (
            leaves[0].fraction_to_point(0.0),
            leaves[leaves.len() - 1].fraction_to_point(1.0),
        )
    }

    #[test]
    fn forward_extraction_spans_entries() {
        let index = DistanceIndex::from_chain(&line_arc_line());
        let a = index.search_by_distance(5.0, DistanceMode::Spatial).location;
        let b = index.search_by_distance(30.0, DistanceMode::Spatial).location;
        let chain = index.clone_between(&a, &b).unwrap();
        assert_eq!(chain.leaf_count(), 3);
        assert_relative_eq!(chain.length(), 25.0, epsilon = 1e-9);
        let (start, end) = ends(&chain);
        assert_relative_eq!(start.x, 5.0, epsilon = 1e-12);
        assert_relative_eq!(end.x, b.point().x, epsilon = 1e-12);
        assert_relative_eq!(end.y, b.point().y, epsilon = 1e-12);
    }

    #[test]
    fn reverse_extraction_mirrors_forward() {
        let index = DistanceIndex::from_chain(&line_arc_line());
        let a = index.search_by_distance(5.0, DistanceMode::Spatial).location;
        let b = index.search_by_distance(30.0, DistanceMode::Spatial).location;
        let forward = index.clone_between(&a, &b).unwrap();
        let backward = index.clone_between(&b, &a).unwrap();
        assert_eq!(forward.leaf_count(), backward.leaf_count());
        assert_relative_eq!(forward.length(), backward.length(), epsilon = 1e-9);

        let forward_leaves: Vec<&SegmentRef> = forward.leaves().collect();
        let backward_leaves: Vec<&SegmentRef> = backward.leaves().collect();
        for (f, r) in forward_leaves.iter().zip(backward_leaves.iter().rev()) {
            for t in [0.0, 0.3, 1.0] {
                let fp = f.fraction_to_point(t);
                let rp = r.fraction_to_point(1.0 - t);
                assert_relative_eq!((fp - rp).norm(), 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn same_entry_extraction() {
        let index = DistanceIndex::from_chain(&line_arc_line());
        let chain = index.clone_between_distances(2.0, 4.0).unwrap();
        assert_eq!(chain.leaf_count(), 1);
        assert_relative_eq!(chain.length(), 2.0, epsilon = 1e-12);
        let (start, end) = ends(&chain);
        assert_relative_eq!(start.x, 2.0);
        assert_relative_eq!(end.x, 4.0);
    }

    #[test]
    fn empty_fragments_are_dropped() {
        let index = DistanceIndex::from_chain(&line_arc_line());
        let chain = index.clone_between_distances(10.0, 30.0).unwrap();
        assert_eq!(chain.leaf_count(), 2);
        assert!(index.clone_between_distances(3.0, 3.0).is_none());
    }

    #[test]
    fn foreign_locations_resolve_by_distance() {
        let index = DistanceIndex::from_chain(&polyline(&[p(0.0, 0.0, 0.0), p(10.0, 0.0, 0.0)]));
        let other = DistanceIndex::from_chain(&polyline(&[p(0.0, 5.0, 0.0), p(10.0, 5.0, 0.0)]));
        let a = other.search_by_distance(2.0, DistanceMode::Spatial).location;
        let b = PathLocation::from_distance(7.0);
        let chain = index.clone_between(&a, &b).unwrap();
        let (start, end) = ends(&chain);
        assert_relative_eq!(start.y, 0.0);
        assert_relative_eq!(start.x, 2.0);
        assert_relative_eq!(end.x, 7.0);
    }

    #[test]
    fn projected_extraction_on_climbing_line() {
        let index = DistanceIndex::from_chain(&polyline(&[p(0.0, 0.0, 0.0), p(3.0, 4.0, 12.0)]));
        let chain = index.clone_between_distances_xy(0.0, 2.5).unwrap();
        assert_relative_eq!(chain.length(), 6.5, epsilon = 1e-12);
        assert!(DistanceIndex::new().clone_between_distances(0.0, 1.0).is_none());
    }
}
