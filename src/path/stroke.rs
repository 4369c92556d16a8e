use std::sync::Arc;
use std::vec;

use tracing::debug;

use crate::math::SMALL_DISTANCE;
use crate::tessellation::StrokeOptions;

use super::{DistanceIndex, DistanceMode, PathLocation, PathLocationPair};

/// Lazy iterator over stroke points of an indexed path.
///
/// Yields the strokes of each entry in path order. An entry whose first
/// stroke coincides with the previous entry's end skips that point.
#[derive(Debug)]
pub struct PathStrokes<'a> {
    index: &'a DistanceIndex,
    options: StrokeOptions,
    next_entry: usize,
    buffer: vec::IntoIter<PathLocation>,
}

impl<'a> PathStrokes<'a> {
    fn new(index: &'a DistanceIndex, options: StrokeOptions) -> Self {
        Self {
            index,
            options,
            next_entry: 1,
            buffer: Vec::new().into_iter(),
        }
    }

    fn stroke_entry(&self, k: usize) -> Vec<PathLocation> {
        let index = self.index;
        let entry = &index.entries()[k];
        let segment = entry.segment();
        let f0 = index.entry_start_fraction(k);
        let previous = index.entries()[k - 1].location();
        let base = previous.distance();

        let mut points = Vec::new();
        segment.add_strokes(f0, entry.fraction(), &self.options, &mut points);
        let shared_start = k > 1
            && points
                .first()
                .is_some_and(|first| (first.point - previous.point()).norm() <= SMALL_DISTANCE);
        points
            .into_iter()
            .skip(usize::from(shared_start))
            .map(|point| {
                let distance = segment
                    .signed_distance_between_fractions(f0, point.fraction, None)
                    .map_or_else(|| index.estimate_distance(k, point.fraction), |d| base + d);
                PathLocation::from_curve_location(Arc::clone(segment), point, Some(k), distance)
            })
            .collect()
    }
}

impl Iterator for PathStrokes<'_> {
    type Item = PathLocation;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(location) = self.buffer.next() {
                return Some(location);
            }
            if self.next_entry >= self.index.len() {
                return None;
            }
            self.buffer = self.stroke_entry(self.next_entry).into_iter();
            self.next_entry += 1;
        }
    }
}

impl DistanceIndex {
    /// Strokes the whole path.
    #[must_use]
    pub fn stroke(&self, options: &StrokeOptions) -> PathStrokes<'_> {
        PathStrokes::new(self, *options)
    }
}

/// Pairs a plan-view path with an elevation profile.
///
/// Every stroke of `xy` is paired with the point of `z` whose x coordinate
/// equals the stroke's projected distance along `xy`. With `z_options`, the
/// strokes of `z` are also mapped back onto `xy` by projected distance; the
/// combined pairs are sorted by distance along `xy` and deduplicated.
#[must_use]
pub fn stroke_horizontal_and_vertical(
    xy_options: &StrokeOptions,
    z_options: Option<&StrokeOptions>,
    xy: &DistanceIndex,
    z: &DistanceIndex,
) -> Vec<PathLocationPair> {
    let mut pairs: Vec<PathLocationPair> = xy
        .stroke(xy_options)
        .filter_map(|a| {
            let distance_xy = xy.distance_xy_from_path_start(&a)?;
            let b = z.search_by_elevation_map(distance_xy).location;
            Some(PathLocationPair::new(a, b))
        })
        .collect();

    if let Some(z_options) = z_options {
        pairs.extend(z.stroke(z_options).map(|b| {
            let a = xy
                .search_by_distance(b.point().x, DistanceMode::Projected)
                .location;
            PathLocationPair::new(a, b)
        }));
        pairs.sort_by(PathLocationPair::cmp_lexical_ab);
        pairs.dedup_by(|later, earlier| {
            (later.a.distance() - earlier.a.distance()).abs() <= SMALL_DISTANCE
        });
    }
    debug!(pairs = pairs.len(), "merged plan and profile strokes");
    pairs
}
