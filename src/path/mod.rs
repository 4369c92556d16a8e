//! Distance-along indexing of curve chains.
//!
//! A [`DistanceIndex`] flattens a [`Chain`](crate::geometry::Chain) into
//! [`PathEntry`] records ordered by cumulative distance and answers queries
//! by distance, by nearest point, by circle intersection, and extracts
//! sub-paths between locations.

mod circle;
mod closest;
pub mod common;
mod entry;
mod extract;
mod index;
mod location;
mod stroke;

pub use common::{find_common_sub_paths, CommonSubPaths, IntervalKind, PathInterval};
pub use entry::PathEntry;
pub use index::{DistanceIndex, ExtendedBounds, ExtensionOptions};
pub use location::{PathLocation, PathLocationPair};
pub use stroke::{stroke_horizontal_and_vertical, PathStrokes};

/// Which cumulative distance a query measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMode {
    /// True 3D arc length.
    #[default]
    Spatial,
    /// Arc length after applying the index's flatten transform.
    Projected,
}

/// Outcome of a search that always produces a location.
///
/// `exact` is `false` when the location is a fallback: a clamp to the path
/// start or end, or the nearest index entry after a segment query failed.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub location: PathLocation,
    pub exact: bool,
}

impl SearchResult {
    pub(crate) fn hit(location: PathLocation) -> Self {
        Self {
            location,
            exact: true,
        }
    }

    pub(crate) fn fallback(location: PathLocation) -> Self {
        Self {
            location,
            exact: false,
        }
    }
}

/// Segment service a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentQuery {
    DistanceBetweenFractions,
    PointAtDistance,
    PlaneIntersection,
    ClosestPoint,
}

/// Non-fatal conditions met while building or querying an index.
#[derive(Debug, Clone, PartialEq)]
pub enum PathDiagnostic {
    /// A leaf with zero, negative or unknown length was not indexed.
    SkippedSegment { leaf: usize, length: Option<f64> },
    /// A segment service failed and the query fell back to an entry.
    SegmentQueryFailed { entry: usize, query: SegmentQuery },
}
