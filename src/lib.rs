pub mod error;
pub mod geometry;
pub mod math;
pub mod path;
pub mod tessellation;

pub use error::{PathdexError, Result};
pub use path::{DistanceIndex, DistanceMode, PathLocation, SearchResult};
