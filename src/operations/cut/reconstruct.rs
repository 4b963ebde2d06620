use slotmap::SecondaryMap;
use tracing::debug;

use crate::error::{CutError, Result, TopologyError};
use crate::math::{Point3, Vector3};
use crate::mesh::{FaceId, HalfEdgeMesh, IndexedTriangleSet, VertexId};

use super::provenance::{FaceState, SideType};

/// Output slots of one refined-mesh vertex.
#[derive(Debug, Clone, Copy, Default)]
struct Remap {
    original: Option<u32>,
    extruded: Option<u32>,
}

/// Output mesh under construction.
///
/// Each refined-mesh vertex is written at most once in its original position
/// and once moved by the extrusion vector.
pub struct Emitter<'m> {
    mesh: &'m HalfEdgeMesh,
    extrusion: Vector3,
    remap: SecondaryMap<VertexId, Remap>,
    output: IndexedTriangleSet,
}

impl<'m> Emitter<'m> {
    #[must_use]
    pub fn new(mesh: &'m HalfEdgeMesh, extrusion: Vector3) -> Self {
        Self {
            mesh,
            extrusion,
            remap: SecondaryMap::new(),
            output: IndexedTriangleSet::default(),
        }
    }

    fn push_vertex(&mut self, point: Point3) -> Result<u32> {
        let index = u32::try_from(self.output.vertices.len())
            .map_err(|_| CutError::InvalidInput("output mesh exceeds u32 indices".into()))?;
        self.output.vertices.push(point);
        Ok(index)
    }

    fn slots(&mut self, vertex: VertexId) -> Result<&mut Remap> {
        if !self.remap.contains_key(vertex) {
            self.mesh.point(vertex)?;
            self.remap.insert(vertex, Remap::default());
        }
        self.remap
            .get_mut(vertex)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()).into())
    }

    /// Output index of `vertex` at its own position.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex is not in the mesh.
    pub fn original(&mut self, vertex: VertexId) -> Result<u32> {
        if let Some(index) = self.slots(vertex)?.original {
            return Ok(index);
        }
        let index = self.push_vertex(*self.mesh.point(vertex)?)?;
        self.slots(vertex)?.original = Some(index);
        Ok(index)
    }

    /// Output index of `vertex` moved by the extrusion vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex is not in the mesh.
    pub fn extruded(&mut self, vertex: VertexId) -> Result<u32> {
        if let Some(index) = self.slots(vertex)?.extruded {
            return Ok(index);
        }
        let index = self.push_vertex(self.mesh.point(vertex)? + self.extrusion)?;
        self.slots(vertex)?.extruded = Some(index);
        Ok(index)
    }

    /// Emits a triangle at original positions.
    ///
    /// # Errors
    ///
    /// Returns an error if a corner is not in the mesh.
    pub fn copy(&mut self, corners: [VertexId; 3]) -> Result<()> {
        let triangle = [
            self.original(corners[0])?,
            self.original(corners[1])?,
            self.original(corners[2])?,
        ];
        self.output.indices.push(triangle);
        Ok(())
    }

    /// Emits a triangle moved by the extrusion vector.
    ///
    /// # Errors
    ///
    /// Returns an error if a corner is not in the mesh.
    pub fn extrude(&mut self, corners: [VertexId; 3]) -> Result<()> {
        let triangle = [
            self.extruded(corners[0])?,
            self.extruded(corners[1])?,
            self.extruded(corners[2])?,
        ];
        self.output.indices.push(triangle);
        Ok(())
    }

    /// Emits the side wall below the extruded edge `a -> b` of an inside face.
    ///
    /// # Errors
    ///
    /// Returns an error if a corner is not in the mesh.
    pub fn wall(&mut self, a: VertexId, b: VertexId) -> Result<()> {
        let (oa, ob) = (self.original(a)?, self.original(b)?);
        let (ea, eb) = (self.extruded(a)?, self.extruded(b)?);
        self.output.indices.push([oa, ob, ea]);
        self.output.indices.push([ea, ob, eb]);
        Ok(())
    }

    #[must_use]
    pub fn finish(self) -> IndexedTriangleSet {
        self.output
    }
}

fn source_of(source_face: &SecondaryMap<FaceId, usize>, face: FaceId) -> Result<usize> {
    source_face
        .get(face)
        .copied()
        .ok_or_else(|| TopologyError::EntityNotFound("source triangle of face".into()).into())
}

/// Whether all three sides of a source triangle survived refinement unsplit.
fn source_edges_intact(mesh: &HalfEdgeMesh, corners: &[VertexId; 3]) -> bool {
    (0..3).all(|k| mesh.find_halfedge(corners[k], corners[(k + 1) % 3]).is_some())
}

/// Builds the output mesh from the classified refined mesh.
///
/// Source triangles with only outside pieces are emitted once as the original
/// triangle when their sides were not split, piece by piece otherwise. Inside
/// faces are emitted moved by `extrusion`, with a side wall along every edge
/// whose neighbour is not inside.
///
/// # Errors
///
/// Returns a topology error when a face has no source triangle or a vertex is
/// missing.
pub fn reconstruct(
    mesh: &HalfEdgeMesh,
    source_face: &SecondaryMap<FaceId, usize>,
    source_triangles: &[[VertexId; 3]],
    sides: &SecondaryMap<FaceId, SideType>,
    extrusion: &Vector3,
) -> Result<IndexedTriangleSet> {
    let is_inside = |face: FaceId| sides.get(face) == Some(&SideType::Inside);

    // Summarize each source triangle over its pieces.
    let mut states = vec![FaceState::Unknown; source_triangles.len()];
    for face in mesh.faces() {
        let source = source_of(source_face, face)?;
        let state = states.get_mut(source).ok_or_else(|| {
            TopologyError::EntityNotFound(format!("source triangle {source}"))
        })?;
        *state = state.merge(is_inside(face));
    }

    let mut emitter = Emitter::new(mesh, *extrusion);
    let (mut whole, mut walls) = (0usize, 0usize);
    for face in mesh.faces() {
        let source = source_of(source_face, face)?;
        let state = states[source];
        if state == FaceState::Emitted {
            continue;
        }
        let corners = mesh.face_vertices(face)?;
        // Unsplit outside sources go out as the original triangle.
        if state.is_unmarked() {
            let original = source_triangles[source];
            if state == FaceState::Unmarked || source_edges_intact(mesh, &original) {
                emitter.copy(original)?;
                states[source] = FaceState::Emitted;
                whole += 1;
                continue;
            }
        }
        // Outside piece of a split source.
        if !is_inside(face) {
            emitter.copy(corners)?;
            continue;
        }

        // Raised cap, walled along every border with a non-inside neighbour.
        emitter.extrude(corners)?;
        for h in mesh.face_halfedges(face)? {
            if !matches!(mesh.opposite_face(h)?, Some(n) if is_inside(n)) {
                let he = mesh.halfedge(h)?;
                emitter.wall(he.source, he.target)?;
                walls += 1;
            }
        }
    }

    let output = emitter.finish();
    debug!(
        triangles = output.indices.len(),
        whole_sources = whole,
        walls,
        "reconstructed mesh"
    );
    Ok(output)
}
