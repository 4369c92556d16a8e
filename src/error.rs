use thiserror::Error;

/// Top-level error type for the path distance index.
#[derive(Debug, Error)]
pub enum PathdexError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Errors related to geometric primitives.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Which end of a chain an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEnd {
    Start,
    End,
}

impl std::fmt::Display for ChainEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::End => f.write_str("end"),
        }
    }
}

/// Errors raised while building a distance index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("chain has no segment with positive length")]
    EmptyChain,

    #[error("cannot compute {0} tangent of chain")]
    DegenerateTangent(ChainEnd),

    #[error("extension distance {0} must be positive")]
    InvalidExtension(f64),

    #[error("extension factor {0} must be positive and finite")]
    InvalidExtensionFactor(f64),

    #[error("view rotation is singular")]
    SingularView,
}

/// Convenience type alias for results using [`PathdexError`].
pub type Result<T> = std::result::Result<T, PathdexError>;
