use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{ChainEnd, IndexError, Result};
use crate::geometry::curve::{same_segment, LineSegment, SegmentRef};
use crate::geometry::{Chain, Plane};
use crate::math::{
    almost_equal, flatten_of_view, Matrix3, Point3, Range3, Ray3, Vector3, TOLERANCE,
};

use super::{
    DistanceMode, PathDiagnostic, PathEntry, PathLocation, SearchResult, SegmentQuery,
};

/// Shortest true extension produced when measuring in view.
const MIN_EXTENSION: f64 = 0.001;

/// Slack when testing whether a fraction lies inside an entry's run.
const FRACTION_SLACK: f64 = 1e-10;

/// Controls for [`DistanceIndex::set_extended_path`].
#[derive(Debug, Clone, Copy)]
pub struct ExtensionOptions {
    /// Length of each extension.
    pub distance: f64,
    /// Measure `distance` in the projected view rather than in 3D.
    pub measure_in_view: bool,
    /// Upper bound of the true extension, as a multiple of `distance`,
    /// when the tangent is nearly perpendicular to the view plane.
    pub max_factor: f64,
}

impl ExtensionOptions {
    /// Extension of `distance` measured in 3D, with the default factor of 4.
    #[must_use]
    pub fn new(distance: f64) -> Self {
        Self {
            distance,
            measure_in_view: false,
            max_factor: 4.0,
        }
    }

    /// Same options measured in the projected view.
    #[must_use]
    pub fn in_view(self) -> Self {
        Self {
            measure_in_view: true,
            ..self
        }
    }
}

/// Locations of the caller's chain ends inside an extended index.
#[derive(Debug, Clone)]
pub struct ExtendedBounds {
    pub start: PathLocation,
    pub end: PathLocation,
}

/// Index over a chain of curve segments, searchable by cumulative distance.
///
/// Entry 0 is an anchor at fraction 0 of the first segment; entry `i > 0`
/// marks the end of the `i`-th indexed segment. Cumulative distances are
/// non-decreasing along the entries.
#[derive(Debug, Clone)]
pub struct DistanceIndex {
    chain: Chain,
    entries: Vec<PathEntry>,
    world_to_view: Matrix3,
    view_to_world: Matrix3,
    flatten: Matrix3,
}

impl Default for DistanceIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceIndex {
    /// Creates an empty index viewing along the world Z axis.
    #[must_use]
    pub fn new() -> Self {
        let identity = Matrix3::identity();
        Self {
            chain: Chain::new(),
            entries: Vec::new(),
            world_to_view: identity,
            view_to_world: identity,
            flatten: flatten_of_view(&identity),
        }
    }

    /// Creates an empty index with the given world-to-view rotation.
    ///
    /// # Errors
    ///
    /// Returns an error if the rotation is not invertible.
    pub fn with_view(world_to_view: Matrix3) -> Result<Self> {
        let view_to_world = world_to_view
            .try_inverse()
            .ok_or(IndexError::SingularView)?;
        Ok(Self {
            chain: Chain::new(),
            entries: Vec::new(),
            world_to_view,
            view_to_world,
            flatten: flatten_of_view(&world_to_view),
        })
    }

    /// Convenience: builds an identity-view index over `chain`.
    #[must_use]
    pub fn from_chain(chain: &Chain) -> Self {
        let mut index = Self::new();
        index.set_path(chain);
        index
    }

    #[must_use]
    pub fn world_to_view(&self) -> &Matrix3 {
        &self.world_to_view
    }

    #[must_use]
    pub fn view_to_world(&self) -> &Matrix3 {
        &self.view_to_world
    }

    /// The flatten transform: world-to-view with the view Z row zeroed.
    #[must_use]
    pub fn flatten(&self) -> &Matrix3 {
        &self.flatten
    }

    /// The chain currently indexed, including extension segments.
    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// The index entries, anchor first.
    #[must_use]
    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    /// Number of entries, including the start anchor.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no indexed segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears all curve and index data; the view is kept.
    pub fn clear(&mut self) {
        self.chain = Chain::new();
        self.entries.clear();
    }

    /// Rebuilds the index over `chain`.
    ///
    /// Leaves with zero or negative length are skipped.
    pub fn set_path(&mut self, chain: &Chain) {
        self.set_path_with_diagnostics(chain, &mut Vec::new());
    }

    /// Like [`set_path`](Self::set_path), reporting skipped leaves.
    pub fn set_path_with_diagnostics(
        &mut self,
        chain: &Chain,
        diagnostics: &mut Vec<PathDiagnostic>,
    ) {
        self.clear();
        self.chain = chain.clone();
        let mut skipped = 0usize;
        for (leaf, segment) in chain.leaves().enumerate() {
            if !self.append_segment(segment, leaf, diagnostics) {
                skipped += 1;
            }
        }
        debug!(
            entries = self.entries.len(),
            skipped,
            length = self.total_length(),
            "distance index rebuilt"
        );
    }

    fn append_segment(
        &mut self,
        segment: &SegmentRef,
        leaf: usize,
        diagnostics: &mut Vec<PathDiagnostic>,
    ) -> bool {
        let reported = segment.length();
        let Some(length) = reported.filter(|l| *l > 0.0) else {
            trace!(leaf, ?reported, "skipping degenerate segment");
            diagnostics.push(PathDiagnostic::SkippedSegment {
                leaf,
                length: reported,
            });
            return false;
        };
        let projected = segment
            .length_projected(&self.flatten)
            .filter(|l| l.is_finite())
            .map_or(0.0, |l| l.max(0.0));

        if self.entries.is_empty() {
            let anchor = PathLocation::new(Arc::clone(segment), 0.0, Some(0), 0.0);
            let range = Range3::from_points(&[*anchor.point()]);
            self.entries
                .push(PathEntry::new(Arc::clone(segment), anchor, 0.0, range));
        }

        let (distance, projected_distance) = self.entries.last().map_or((0.0, 0.0), |last| {
            (last.location().distance(), last.projected_distance())
        });
        let index = self.entries.len();
        let location = PathLocation::new(Arc::clone(segment), 1.0, Some(index), distance + length);
        self.entries.push(PathEntry::new(
            Arc::clone(segment),
            location,
            projected_distance + projected,
            segment.range(),
        ));
        true
    }

    /// Indexes `chain` with straight extensions before its start and after
    /// its end, along the end tangents.
    ///
    /// Returns the locations of the chain's own start and end inside the
    /// extended index.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain has no segment with positive length,
    /// the extension distance is not positive, or an end tangent is
    /// degenerate. The index is left unchanged on error.
    pub fn set_extended_path(
        &mut self,
        chain: &Chain,
        options: &ExtensionOptions,
    ) -> Result<ExtendedBounds> {
        if !options.distance.is_finite() || options.distance <= 0.0 {
            return Err(IndexError::InvalidExtension(options.distance).into());
        }
        if !options.max_factor.is_finite() || options.max_factor <= 0.0 {
            return Err(IndexError::InvalidExtensionFactor(options.max_factor).into());
        }
        let mut valid = chain
            .leaves()
            .filter(|s| s.length().is_some_and(|l| l > 0.0));
        let first = valid.next().ok_or(IndexError::EmptyChain)?;
        let last = valid.last().unwrap_or(first);

        let (start, start_derivative) = first.fraction_to_point_and_derivative(0.0);
        let (end, end_derivative) = last.fraction_to_point_and_derivative(1.0);
        let start_tangent = unit_vector(&start_derivative)
            .ok_or(IndexError::DegenerateTangent(ChainEnd::Start))?;
        let end_tangent =
            unit_vector(&end_derivative).ok_or(IndexError::DegenerateTangent(ChainEnd::End))?;

        let start_length = self.extension_length(&start_tangent, options);
        let end_length = self.extension_length(&end_tangent, options);
        debug!(start_length, end_length, "extending path");

        let mut extended = Chain::new();
        extended.push(LineSegment::new(start - start_tangent * start_length, start));
        extended.push_chain(chain.clone());
        extended.push(LineSegment::new(end, end + end_tangent * end_length));
        let mut rebuilt = Self {
            chain: Chain::new(),
            entries: Vec::new(),
            world_to_view: self.world_to_view,
            view_to_world: self.view_to_world,
            flatten: self.flatten,
        };
        rebuilt.set_path(&extended);
        // Both extension lines plus at least one chain entry.
        let n = rebuilt.entries.len();
        if n < 4 {
            return Err(IndexError::EmptyChain.into());
        }
        let bounds = ExtendedBounds {
            start: rebuilt.entries[1].location().clone(),
            end: rebuilt.entries[n - 2].location().clone(),
        };
        *self = rebuilt;
        Ok(bounds)
    }

    fn extension_length(&self, unit_tangent: &Vector3, options: &ExtensionOptions) -> f64 {
        if !options.measure_in_view {
            return options.distance;
        }
        let scale = (self.flatten * unit_tangent).norm();
        let raw = if scale > TOLERANCE {
            options.distance / scale
        } else {
            f64::INFINITY
        };
        raw.min(options.max_factor * options.distance).max(MIN_EXTENSION)
    }

    /// Total 3D length of the indexed path.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.entries
            .last()
            .map_or(0.0, |e| e.distance(DistanceMode::Spatial))
    }

    /// Total length of the indexed path as flattened into the view.
    #[must_use]
    pub fn total_length_xy(&self) -> f64 {
        self.entries
            .last()
            .map_or(0.0, |e| e.distance(DistanceMode::Projected))
    }

    /// The start anchor, or an unanchored zero-distance location if empty.
    #[must_use]
    pub fn at_start(&self) -> PathLocation {
        self.entries
            .first()
            .map_or_else(|| PathLocation::from_distance(0.0), |e| e.location().clone())
    }

    /// The final location, or an unanchored zero-distance location if empty.
    #[must_use]
    pub fn at_end(&self) -> PathLocation {
        self.entries
            .last()
            .map_or_else(|| PathLocation::from_distance(0.0), |e| e.location().clone())
    }

    /// Distance between two points after flattening into the view.
    #[must_use]
    pub fn distance_between_points_xy(&self, a: &Point3, b: &Point3) -> f64 {
        (self.flatten * (b - a)).norm()
    }

    /// Fraction at which entry `k` starts on its segment: the previous
    /// entry's fraction when it shares the segment, else 0.
    pub(crate) fn entry_start_fraction(&self, k: usize) -> f64 {
        if k == 0 || k >= self.entries.len() {
            return 0.0;
        }
        let previous = &self.entries[k - 1];
        if same_segment(previous.segment(), self.entries[k].segment()) {
            previous.fraction()
        } else {
            0.0
        }
    }

    /// Entry ordinal usable for segment work: the anchor maps to entry 1.
    pub(crate) fn normalized_index(&self, location: &PathLocation) -> Option<usize> {
        match location.index()? {
            0 if self.entries.len() > 1 => Some(1),
            i if i > 0 && i < self.entries.len() => Some(i),
            _ => None,
        }
    }

    fn fraction_in_entry(&self, k: usize, fraction: f64) -> bool {
        let f0 = self.entry_start_fraction(k);
        let f1 = self.entries[k].fraction();
        fraction >= f0.min(f1) - FRACTION_SLACK && fraction <= f0.max(f1) + FRACTION_SLACK
    }

    /// Finds the entry whose segment run contains `fraction` of `segment`.
    pub(crate) fn locate_entry(&self, segment: &SegmentRef, fraction: f64) -> Option<usize> {
        (1..self.entries.len()).find(|&k| {
            same_segment(self.entries[k].segment(), segment) && self.fraction_in_entry(k, fraction)
        })
    }

    /// Cumulative distance at `fraction` of entry `k`, interpolated linearly
    /// between the entry's end distances.
    pub(crate) fn estimate_distance(&self, k: usize, fraction: f64) -> f64 {
        let d0 = self.entries[k - 1].location().distance();
        let d1 = self.entries[k].location().distance();
        let f0 = self.entry_start_fraction(k);
        let f1 = self.entries[k].fraction();
        if (f1 - f0).abs() < TOLERANCE {
            return d1;
        }
        d0 + (fraction - f0) / (f1 - f0) * (d1 - d0)
    }

    /// Cumulative distance at `fraction` of entry `k` via the segment.
    pub(crate) fn exact_distance(&self, k: usize, fraction: f64) -> Option<f64> {
        let entry = &self.entries[k];
        let moved = entry.segment().signed_distance_between_fractions(
            self.entry_start_fraction(k),
            fraction,
            None,
        )?;
        Some(self.entries[k - 1].location().distance() + moved)
    }

    /// Builds the location at `fraction` of entry `k`'s segment.
    ///
    /// Without `compute_distance` the distance is interpolated within the
    /// entry. Returns `None` if `k` is not an entry.
    #[must_use]
    pub fn indexed_fraction_to_location(
        &self,
        k: usize,
        fraction: f64,
        compute_distance: bool,
    ) -> Option<PathLocation> {
        let k = if k == 0 { 1 } else { k };
        let entry = self.entries.get(k)?;
        let distance = if compute_distance {
            self.exact_distance(k, fraction)
                .unwrap_or_else(|| self.estimate_distance(k, fraction))
        } else {
            self.estimate_distance(k, fraction)
        };
        Some(PathLocation::new(
            Arc::clone(entry.segment()),
            fraction,
            Some(k),
            distance,
        ))
    }

    /// Checks that `location` belongs to this index.
    ///
    /// A location whose entry ordinal is stale but whose segment and
    /// fraction are found in the index is re-anchored with a recomputed
    /// distance. Returns `None` for unanchored or foreign locations.
    #[must_use]
    pub fn validate_location(&self, location: &PathLocation) -> Option<PathLocation> {
        let segment = location.segment()?;
        if let Some(k) = self.normalized_index(location) {
            if same_segment(self.entries[k].segment(), segment)
                && self.fraction_in_entry(k, location.fraction())
            {
                return Some(location.clone());
            }
        }
        let k = self.locate_entry(segment, location.fraction())?;
        trace!(entry = k, "re-anchored stale path location");
        let distance = self
            .exact_distance(k, location.fraction())
            .unwrap_or_else(|| self.estimate_distance(k, location.fraction()));
        Some(location.clone().with_index(k).with_distance(distance))
    }

    /// Searches for the location at `target` cumulative distance.
    #[must_use]
    pub fn search_by_distance(&self, target: f64, mode: DistanceMode) -> SearchResult {
        self.search_by_distance_with_diagnostics(target, mode, &mut Vec::new())
    }

    /// Like [`search_by_distance`](Self::search_by_distance), reporting
    /// segment failures.
    pub fn search_by_distance_with_diagnostics(
        &self,
        target: f64,
        mode: DistanceMode,
        diagnostics: &mut Vec<PathDiagnostic>,
    ) -> SearchResult {
        let k = match self.bracket(target, mode) {
            Ok(k) => k,
            Err(boundary) => return boundary,
        };
        let entry = &self.entries[k];
        let segment = entry.segment();
        let flatten = match mode {
            DistanceMode::Spatial => None,
            DistanceMode::Projected => Some(&self.flatten),
        };
        let found = segment.point_at_signed_distance_from_fraction(
            flatten,
            entry.fraction(),
            target - entry.distance(mode),
            false,
        );
        let distance = found.and_then(|loc| match mode {
            DistanceMode::Spatial => Some(target),
            // The segment moved by projected distance; re-derive 3D distance.
            DistanceMode::Projected => segment
                .signed_distance_between_fractions(entry.fraction(), loc.fraction, None)
                .map(|moved| entry.location().distance() + moved),
        });
        match (found, distance) {
            (Some(loc), Some(distance)) => SearchResult::hit(PathLocation::from_curve_location(
                Arc::clone(segment),
                loc,
                Some(k),
                distance,
            )),
            (found, _) => {
                let query = if found.is_some() {
                    SegmentQuery::DistanceBetweenFractions
                } else {
                    SegmentQuery::PointAtDistance
                };
                debug!(entry = k, target, ?mode, ?query, "distance search fell back to entry");
                diagnostics.push(PathDiagnostic::SegmentQueryFailed { entry: k, query });
                SearchResult::fallback(entry.location().clone())
            }
        }
    }

    /// Searches an elevation profile whose projected distance is its x
    /// coordinate: slices the bracketing segment with the plane
    /// `x = target` and takes the first crossing.
    ///
    /// The profile must start at `x = 0` and advance monotonically in x.
    #[must_use]
    pub fn search_by_elevation_map(&self, target: f64) -> SearchResult {
        self.search_by_elevation_map_with_diagnostics(target, &mut Vec::new())
    }

    /// Like [`search_by_elevation_map`](Self::search_by_elevation_map),
    /// reporting segment failures.
    pub fn search_by_elevation_map_with_diagnostics(
        &self,
        target: f64,
        diagnostics: &mut Vec<PathDiagnostic>,
    ) -> SearchResult {
        let k = match self.bracket(target, DistanceMode::Projected) {
            Ok(k) => k,
            Err(boundary) => return boundary,
        };
        let entry = &self.entries[k];
        let mut hits = Vec::new();
        entry
            .segment()
            .append_plane_intersections(&Plane::constant_x(target), &mut hits);
        let first = hits
            .into_iter()
            .filter(|h| self.fraction_in_entry(k, h.fraction))
            .min_by(|a, b| a.fraction.total_cmp(&b.fraction));
        if let Some(hit) = first {
            let distance = self
                .exact_distance(k, hit.fraction)
                .unwrap_or_else(|| self.estimate_distance(k, hit.fraction));
            return SearchResult::hit(PathLocation::from_curve_location(
                Arc::clone(entry.segment()),
                hit,
                Some(k),
                distance,
            ));
        }
        debug!(entry = k, target, "elevation search fell back to entry");
        diagnostics.push(PathDiagnostic::SegmentQueryFailed {
            entry: k,
            query: SegmentQuery::PlaneIntersection,
        });
        SearchResult::fallback(entry.location().clone())
    }

    /// Applies the boundary policy of distance searches.
    ///
    /// `Ok(k)` is the first entry whose distance is `>= target`, with
    /// `k >= 1`; `Err` carries the finished result for empty, boundary and
    /// out-of-range targets.
    fn bracket(&self, target: f64, mode: DistanceMode) -> std::result::Result<usize, SearchResult> {
        let (Some(first), Some(last)) = (self.entries.first(), self.entries.last()) else {
            return Err(SearchResult::fallback(PathLocation::from_distance(0.0)));
        };
        if !target.is_finite() {
            let boundary = if target > 0.0 { last } else { first };
            return Err(SearchResult::fallback(boundary.location().clone()));
        }
        let max = last.distance(mode);
        if almost_equal(target, 0.0) {
            return Err(SearchResult::hit(first.location().clone()));
        }
        if almost_equal(target, max) {
            return Err(SearchResult::hit(last.location().clone()));
        }
        if target < 0.0 {
            return Err(SearchResult::fallback(first.location().clone()));
        }
        if target > max {
            return Err(SearchResult::fallback(last.location().clone()));
        }
        let k = self.entries.partition_point(|e| e.distance(mode) < target);
        if k == 0 {
            return Err(SearchResult::hit(first.location().clone()));
        }
        Ok(k.min(self.entries.len() - 1))
    }

    /// Projected distance from the path start to `location`.
    #[must_use]
    pub fn distance_xy_from_path_start(&self, location: &PathLocation) -> Option<f64> {
        let location = self.validate_location(location)?;
        let k = self.normalized_index(&location)?;
        let entry = &self.entries[k];
        let moved = entry.segment().signed_distance_between_fractions(
            self.entry_start_fraction(k),
            location.fraction(),
            Some(&self.flatten),
        )?;
        Some(self.entries[k - 1].projected_distance() + moved)
    }

    /// Point and unit tangent at `distance` along the path.
    ///
    /// Outside the path, `extrapolate` continues linearly along the end
    /// tangent; without it the result is `None`.
    #[must_use]
    pub fn distance_along_to_point_and_unit_tangent(
        &self,
        distance: f64,
        extrapolate: bool,
    ) -> Option<Ray3> {
        let total = self.total_length();
        if self.entries.len() < 2 {
            return None;
        }
        let beyond = if distance < 0.0 && !almost_equal(distance, 0.0) {
            Some((self.at_start(), distance))
        } else if distance > total && !almost_equal(distance, total) {
            Some((self.at_end(), distance - total))
        } else {
            None
        };
        match beyond {
            Some((anchor, excess)) => {
                if !extrapolate {
                    return None;
                }
                let ray = anchor.point_and_unit_tangent()?;
                Some(Ray3 {
                    origin: ray.at(excess),
                    direction: ray.direction,
                })
            }
            None => self
                .search_by_distance(distance, DistanceMode::Spatial)
                .location
                .point_and_unit_tangent(),
        }
    }

    /// All entry boundaries in path order.
    ///
    /// With `replicate_end_start`, each interior boundary appears twice: as
    /// the end of one entry and as the start of the next.
    #[must_use]
    pub fn break_points(&self, replicate_end_start: bool) -> Vec<PathLocation> {
        let mut locations = Vec::with_capacity(self.entries.len() * 2);
        let n = self.entries.len();
        for (k, entry) in self.entries.iter().enumerate() {
            locations.push(entry.location().clone());
            if replicate_end_start && k > 0 && k + 1 < n {
                let next = &self.entries[k + 1];
                locations.push(PathLocation::new(
                    Arc::clone(next.segment()),
                    self.entry_start_fraction(k + 1),
                    Some(k + 1),
                    entry.location().distance(),
                ));
            }
        }
        locations
    }

    /// Locations at projected distances `distance_a` and `distance_b` with
    /// every entry boundary strictly between them, in travel order.
    #[must_use]
    pub fn break_points_between_distances_xy(
        &self,
        distance_a: f64,
        distance_b: f64,
    ) -> Vec<PathLocation> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        let lo = distance_a.min(distance_b);
        let hi = distance_a.max(distance_b);
        let mut interior: Vec<PathLocation> = self
            .entries
            .iter()
            .filter(|e| e.projected_distance() > lo && e.projected_distance() < hi)
            .map(|e| e.location().clone())
            .collect();
        if distance_b < distance_a {
            interior.reverse();
        }
        let mut locations = Vec::with_capacity(interior.len() + 2);
        locations.push(self.search_by_distance(distance_a, DistanceMode::Projected).location);
        locations.extend(interior);
        locations.push(self.search_by_distance(distance_b, DistanceMode::Projected).location);
        locations
    }
}

fn unit_vector(v: &Vector3) -> Option<Vector3> {
    let len = v.norm();
    (len > TOLERANCE).then(|| v / len)
}
