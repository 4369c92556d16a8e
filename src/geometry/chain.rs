use std::sync::Arc;

use super::curve::{CurveSegment, SegmentRef};

/// One element of a [`Chain`]: a leaf segment or a nested sub-chain.
#[derive(Debug, Clone)]
pub enum ChainElement {
    /// A single curve segment.
    Segment(SegmentRef),
    /// A nested chain, traversed in place.
    Chain(Chain),
}

/// An ordered, possibly nested sequence of curve segments forming a path.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    elements: Vec<ChainElement>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flat chain from segments.
    #[must_use]
    pub fn from_segments<I>(segments: I) -> Self
    where
        I: IntoIterator<Item = SegmentRef>,
    {
        Self {
            elements: segments.into_iter().map(ChainElement::Segment).collect(),
        }
    }

    /// Appends a segment.
    pub fn push_segment(&mut self, segment: SegmentRef) {
        self.elements.push(ChainElement::Segment(segment));
    }

    /// Appends a primitive by value.
    pub fn push<S: CurveSegment + 'static>(&mut self, segment: S) {
        self.push_segment(Arc::new(segment));
    }

    /// Appends a nested sub-chain.
    pub fn push_chain(&mut self, chain: Chain) {
        self.elements.push(ChainElement::Chain(chain));
    }

    /// Returns the direct children of this chain.
    #[must_use]
    pub fn elements(&self) -> &[ChainElement] {
        &self.elements
    }

    /// Returns whether the chain has no direct children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterates over leaf segments depth-first, expanding sub-chains in place.
    #[must_use]
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            stack: vec![self.elements.iter()],
        }
    }

    /// Number of leaf segments at every depth.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Sum of leaf lengths; leaves whose length cannot be computed count as zero.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.leaves().filter_map(|s| s.length()).sum()
    }

    /// Returns a flat chain traversing the same geometry backward.
    ///
    /// Leaves that cannot be cloned are dropped.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut leaves: Vec<SegmentRef> = self
            .leaves()
            .filter_map(|s| s.clone_between_fractions(1.0, 0.0, false))
            .collect();
        leaves.reverse();
        Self::from_segments(leaves)
    }
}

/// Depth-first iterator over the leaf segments of a [`Chain`].
#[derive(Debug)]
pub struct Leaves<'a> {
    stack: Vec<std::slice::Iter<'a, ChainElement>>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a SegmentRef;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(ChainElement::Segment(segment)) => return Some(segment),
                Some(ChainElement::Chain(chain)) => self.stack.push(chain.elements.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::curve::LineSegment;
    use crate::math::Point3;

    fn line(x0: f64, x1: f64) -> LineSegment {
        LineSegment::new(Point3::new(x0, 0.0, 0.0), Point3::new(x1, 0.0, 0.0))
    }

    #[test]
    fn leaves_expand_nested_chains_in_order() {
        let mut inner = Chain::new();
        inner.push(line(1.0, 2.0));
        inner.push(line(2.0, 3.0));

        let mut deeper = Chain::new();
        deeper.push(line(3.0, 4.0));
        inner.push_chain(deeper);

        let mut outer = Chain::new();
        outer.push(line(0.0, 1.0));
        outer.push_chain(inner);
        outer.push_chain(Chain::new());
        outer.push(line(4.0, 5.0));

        let starts: Vec<f64> = outer.leaves().map(|s| s.fraction_to_point(0.0).x).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(outer.leaf_count(), 5);
        assert!((outer.length() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn reversed_walks_backward() {
        let mut chain = Chain::new();
        chain.push(line(0.0, 1.0));
        chain.push(line(1.0, 3.0));
        let rev = chain.reversed();
        let leaves: Vec<&SegmentRef> = rev.leaves().collect();
        assert_eq!(leaves.len(), 2);
        assert!((leaves[0].fraction_to_point(0.0).x - 3.0).abs() < 1e-12);
        assert!((leaves[1].fraction_to_point(1.0).x).abs() < 1e-12);
    }
}
