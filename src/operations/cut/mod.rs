mod classify;
mod convert;
mod corefine;
mod engine;
mod fill;
mod provenance;
mod reconstruct;
mod visitor;

pub use classify::{classify, winding_side, Winding};
pub use convert::{convert_object, convert_shape, ObjectMesh, ShapeMesh};
pub use corefine::{corefine, CorefineVisitor, IntersectionEvent, ShapeElement};
pub use engine::{cut_shape, cut_surface, Classification, EmbossCut};
pub use fill::flood_fill;
pub use provenance::{
    ContourVertexId, CutParams, ElementKind, FaceState, IntersectingElement, SideType,
};
pub use reconstruct::{reconstruct, Emitter};
pub use visitor::ProvenanceVisitor;
