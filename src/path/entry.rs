use crate::geometry::curve::SegmentRef;
use crate::math::Range3;

use super::{DistanceMode, PathLocation};

/// One record of a distance index: the location where a segment run ends,
/// with cumulative distances and the segment's bounding box.
#[derive(Debug, Clone)]
pub struct PathEntry {
    segment: SegmentRef,
    location: PathLocation,
    projected_distance: f64,
    range: Range3,
}

impl PathEntry {
    pub(crate) fn new(
        segment: SegmentRef,
        location: PathLocation,
        projected_distance: f64,
        range: Range3,
    ) -> Self {
        Self {
            segment,
            location,
            projected_distance,
            range,
        }
    }

    /// The segment this entry terminates.
    #[must_use]
    pub fn segment(&self) -> &SegmentRef {
        &self.segment
    }

    /// The terminating location.
    #[must_use]
    pub fn location(&self) -> &PathLocation {
        &self.location
    }

    /// Fraction of the terminating location.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.location.fraction()
    }

    /// Cumulative distance measured as `mode` says.
    #[must_use]
    pub fn distance(&self, mode: DistanceMode) -> f64 {
        match mode {
            DistanceMode::Spatial => self.location.distance(),
            DistanceMode::Projected => self.projected_distance,
        }
    }

    /// Cumulative projected distance.
    #[must_use]
    pub fn projected_distance(&self) -> f64 {
        self.projected_distance
    }

    /// Bounding box of the segment.
    #[must_use]
    pub fn range(&self) -> &Range3 {
        &self.range
    }

    /// Tests whether the XY projections of the two entries' ranges overlap.
    #[must_use]
    pub fn range_intersects_xy(&self, other: &Self, margin: f64) -> bool {
        self.range.expanded(margin).intersects_xy(&other.range)
    }
}
