use slotmap::SecondaryMap;
use tracing::{trace, warn};

use crate::error::{CutError, Result};
use crate::mesh::{FaceId, VertexId};

use super::convert::ShapeMesh;
use super::corefine::{CorefineVisitor, IntersectionEvent, ShapeElement};
use super::provenance::IntersectingElement;

/// Carries shape provenance onto the object mesh while it is refined.
///
/// Keeps the source-face table valid across face splits and tags every object
/// vertex lying on the cut with the shape element it came from.
pub struct ProvenanceVisitor<'s> {
    shape: &'s ShapeMesh,
    source_face: SecondaryMap<FaceId, usize>,
    vertex_provenance: SecondaryMap<VertexId, IntersectingElement>,
    /// Provenance per intersection point id.
    cache: Vec<Option<IntersectingElement>>,
    /// Source triangle of the face currently being split.
    current: Option<usize>,
}

impl<'s> ProvenanceVisitor<'s> {
    /// Creates a visitor for `shape`, taking over the object's source-face
    /// table.
    #[must_use]
    pub fn new(shape: &'s ShapeMesh, source_face: SecondaryMap<FaceId, usize>) -> Self {
        Self {
            shape,
            source_face,
            vertex_provenance: SecondaryMap::new(),
            cache: Vec::new(),
            current: None,
        }
    }

    /// Provenance of a shape element.
    ///
    /// # Errors
    ///
    /// Returns [`CutError::UnresolvedShapeElement`] if the element carries no
    /// tag.
    pub fn resolve(&self, element: ShapeElement) -> Result<IntersectingElement> {
        let resolved = match element {
            ShapeElement::Edge(edge) => self.shape.edge_element(edge),
            ShapeElement::Face(face) => self.shape.face_provenance.get(face).copied(),
        };
        resolved.ok_or_else(|| CutError::UnresolvedShapeElement.into())
    }

    /// Cached provenance of intersection point `id`.
    #[must_use]
    pub fn cached(&self, id: usize) -> Option<IntersectingElement> {
        self.cache.get(id).copied().flatten()
    }

    /// Releases the source-face and vertex-provenance tables.
    #[must_use]
    pub fn into_tables(
        self,
    ) -> (
        SecondaryMap<FaceId, usize>,
        SecondaryMap<VertexId, IntersectingElement>,
    ) {
        (self.source_face, self.vertex_provenance)
    }

    fn tag_vertex(&mut self, vertex: VertexId, element: IntersectingElement) {
        match self.vertex_provenance.insert(vertex, element) {
            Some(previous) if previous != element => {
                warn!(?vertex, ?previous, ?element, "object vertex lies on two shape elements");
            }
            _ => {}
        }
    }
}

impl CorefineVisitor for ProvenanceVisitor<'_> {
    fn before_subface_creations(&mut self, face: FaceId) {
        self.current = self.source_face.get(face).copied();
        if self.current.is_none() {
            warn!(?face, "split face has no source triangle");
        }
    }

    fn after_subface_created(&mut self, face: FaceId) {
        if let Some(source) = self.current {
            self.source_face.insert(face, source);
        }
    }

    fn after_subface_creations(&mut self) {
        self.current = None;
    }

    fn intersection_point_detected(&mut self, event: &IntersectionEvent) -> Result<()> {
        let element = self.resolve(event.shape)?;
        let id = event.id;
        if id >= self.cache.len() {
            let len = (id + 1).max(self.cache.len() + self.cache.len() / 2);
            self.cache.resize(len, None);
        }
        match self.cache[id] {
            Some(existing) if existing != element => {
                return Err(CutError::ConflictingProvenance { id }.into());
            }
            Some(_) => {}
            None => {
                trace!(id, ?element, "intersection point provenance");
                self.cache[id] = Some(element);
            }
        }
        if let Some(vertex) = event.object_vertex {
            self.tag_vertex(vertex, element);
        }
        Ok(())
    }

    fn new_vertex_added(&mut self, id: usize, vertex: VertexId) -> Result<()> {
        let element = self
            .cached(id)
            .ok_or(CutError::MissingProvenance { id })?;
        self.tag_vertex(vertex, element);
        Ok(())
    }
}
