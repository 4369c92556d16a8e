pub mod chain;
pub mod curve;
pub mod plane;

pub use chain::{Chain, ChainElement};
pub use curve::{ArcSegment, CurveLocation, CurveSegment, LineSegment, SegmentRef};
pub use plane::Plane;
