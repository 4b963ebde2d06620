pub mod error;
pub mod math;
pub mod mesh;
pub mod operations;
pub mod shape;

pub use error::{EmbossError, Result};
pub use mesh::IndexedTriangleSet;
pub use operations::cut::{CutParams, EmbossCut};
pub use shape::{Contour, ExPolygon, Project, ProjectZ};
