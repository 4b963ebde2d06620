use thiserror::Error;

/// Top-level error type for the emboss cut engine.
#[derive(Debug, Error)]
pub enum EmbossError {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Cut(#[from] CutError),
}

/// Errors related to the 2D input shape.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("shape has no contour points")]
    Empty,

    #[error("contour {contour} of shape {shape} has {points} points, at least 3 are required")]
    DegenerateContour {
        shape: usize,
        contour: usize,
        points: usize,
    },

    #[error("contour {contour} of shape {shape} is wound the wrong way")]
    WrongWinding { shape: usize, contour: usize },
}

/// Errors related to mesh connectivity.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("invalid triangle {index}: {reason}")]
    InvalidTriangle { index: usize, reason: String },

    #[error("non-manifold edge: directed half-edge between vertices is already used")]
    NonManifoldEdge,

    #[error("vertex index overflows u32 after {vertices} vertices")]
    IndexOverflow { vertices: usize },
}

/// Errors raised by the cut pipeline itself.
///
/// Apart from [`CutError::InvalidInput`] and [`CutError::NotImplemented`] these
/// indicate a broken provenance invariant; the operation is aborted instead of
/// producing a corrupt mesh.
#[derive(Debug, Error)]
pub enum CutError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no provenance cached for intersection point {id}")]
    MissingProvenance { id: usize },

    #[error("intersection point {id} resolved to conflicting provenance")]
    ConflictingProvenance { id: usize },

    #[error("intersection against a shape element without provenance")]
    UnresolvedShapeElement,

    #[error("constrained edge joins contour records {from} and {to}")]
    MismatchedContours { from: usize, to: usize },

    #[error("constrained edge endpoint has no shape provenance")]
    MissingVertexProvenance,

    #[error("face retriangulation failed: {0}")]
    Triangulation(String),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

/// Convenience type alias for results using [`EmbossError`].
pub type Result<T> = std::result::Result<T, EmbossError>;
