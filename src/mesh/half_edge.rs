use std::collections::HashMap;

use slotmap::SlotMap;

use crate::error::TopologyError;
use crate::math::Point3;

slotmap::new_key_type! {
    /// Unique identifier for a vertex in a half-edge mesh.
    pub struct VertexId;
}

slotmap::new_key_type! {
    /// Unique identifier for a directed half-edge in a half-edge mesh.
    pub struct HalfedgeId;
}

slotmap::new_key_type! {
    /// Unique identifier for an undirected edge (a pair of half-edges).
    pub struct EdgeId;
}

slotmap::new_key_type! {
    /// Unique identifier for a triangular face in a half-edge mesh.
    pub struct FaceId;
}

/// Data associated with a mesh vertex.
#[derive(Debug, Clone)]
pub struct VertexData {
    /// The 3D position of the vertex.
    pub point: Point3,
}

/// Data associated with a directed half-edge.
///
/// Half-edges always exist in twin pairs. A half-edge without a face is a
/// border half-edge.
#[derive(Debug, Clone)]
pub struct HalfedgeData {
    pub source: VertexId,
    pub target: VertexId,
    pub twin: HalfedgeId,
    /// Next half-edge around the face; `None` on border half-edges.
    pub next: Option<HalfedgeId>,
    pub face: Option<FaceId>,
    pub edge: EdgeId,
}

/// Data associated with an undirected edge.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub halfedges: [HalfedgeId; 2],
}

/// Data associated with a triangular face.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// One of the three half-edges bounding the face.
    pub halfedge: HalfedgeId,
}

/// Triangle mesh with half-edge connectivity.
///
/// Elements live in generational arenas, so handles stay valid (or are
/// detectably stale) while faces are split and replaced. Auxiliary per-element
/// data is kept outside the mesh in `slotmap::SecondaryMap` side tables keyed
/// by these handles.
#[derive(Debug, Default, Clone)]
pub struct HalfEdgeMesh {
    vertices: SlotMap<VertexId, VertexData>,
    halfedges: SlotMap<HalfedgeId, HalfedgeData>,
    edges: SlotMap<EdgeId, EdgeData>,
    faces: SlotMap<FaceId, FaceData>,
    directed: HashMap<(VertexId, VertexId), HalfedgeId>,
}

impl HalfEdgeMesh {
    /// Creates a new, empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Vertex operations ---

    /// Inserts a vertex and returns its ID.
    pub fn add_vertex(&mut self, point: Point3) -> VertexId {
        self.vertices.insert(VertexData { point })
    }

    /// Returns the position of a vertex, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex is not in the mesh.
    pub fn point(&self, id: VertexId) -> Result<&Point3, TopologyError> {
        self.vertices
            .get(id)
            .map(|v| &v.point)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()))
    }

    /// Iterates over all vertex IDs.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.keys()
    }

    /// Number of vertices.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    // --- Half-edge and edge operations ---

    /// Returns a half-edge, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the half-edge is not in the mesh.
    pub fn halfedge(&self, id: HalfedgeId) -> Result<&HalfedgeData, TopologyError> {
        self.halfedges
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("half-edge".into()))
    }

    /// Returns the half-edge running from `from` to `to`, if any.
    #[must_use]
    pub fn find_halfedge(&self, from: VertexId, to: VertexId) -> Option<HalfedgeId> {
        self.directed.get(&(from, to)).copied()
    }

    /// Returns an edge, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is not in the mesh.
    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData, TopologyError> {
        self.edges
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()))
    }

    /// End vertices of an edge, in the direction of its first half-edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge is not in the mesh.
    pub fn edge_vertices(&self, id: EdgeId) -> Result<[VertexId; 2], TopologyError> {
        let he = self.halfedge(self.edge(id)?.halfedges[0])?;
        Ok([he.source, he.target])
    }

    /// Iterates over all edge IDs.
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.keys()
    }

    /// Number of edges.
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    // --- Face operations ---

    /// Adds a triangle `a -> b -> c`, linking it to existing border half-edges.
    ///
    /// # Errors
    ///
    /// Returns an error if a vertex is missing or repeated, or if one of the
    /// directed edges already bounds another face.
    pub fn add_face(&mut self, corners: [VertexId; 3]) -> Result<FaceId, TopologyError> {
        for v in corners {
            self.point(v)?;
        }
        if corners[0] == corners[1] || corners[1] == corners[2] || corners[2] == corners[0] {
            return Err(TopologyError::InvalidTriangle {
                index: self.faces.len(),
                reason: "repeated vertex".into(),
            });
        }
        for i in 0..3 {
            if let Some(h) = self.find_halfedge(corners[i], corners[(i + 1) % 3]) {
                if self.halfedges[h].face.is_some() {
                    return Err(TopologyError::NonManifoldEdge);
                }
            }
        }

        let hs: [HalfedgeId; 3] =
            std::array::from_fn(|i| self.halfedge_or_insert(corners[i], corners[(i + 1) % 3]));
        let face = self.faces.insert(FaceData { halfedge: hs[0] });
        for i in 0..3 {
            let he = &mut self.halfedges[hs[i]];
            he.face = Some(face);
            he.next = Some(hs[(i + 1) % 3]);
        }
        Ok(face)
    }

    /// Returns the border half-edge `from -> to`, creating the edge if needed.
    fn halfedge_or_insert(&mut self, from: VertexId, to: VertexId) -> HalfedgeId {
        if let Some(h) = self.find_halfedge(from, to) {
            return h;
        }
        let edge = self.edges.insert(EdgeData {
            halfedges: [HalfedgeId::default(); 2],
        });
        let h = self.halfedges.insert(HalfedgeData {
            source: from,
            target: to,
            twin: HalfedgeId::default(),
            next: None,
            face: None,
            edge,
        });
        let t = self.halfedges.insert(HalfedgeData {
            source: to,
            target: from,
            twin: h,
            next: None,
            face: None,
            edge,
        });
        self.halfedges[h].twin = t;
        self.edges[edge].halfedges = [h, t];
        self.directed.insert((from, to), h);
        self.directed.insert((to, from), t);
        h
    }

    /// Removes a face. Edges left without any incident face are removed too;
    /// vertices are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is not in the mesh.
    pub fn remove_face(&mut self, id: FaceId) -> Result<(), TopologyError> {
        let hs = self.face_halfedges(id)?;
        self.faces.remove(id);
        for h in hs {
            let he = &mut self.halfedges[h];
            he.face = None;
            he.next = None;
        }
        for h in hs {
            let Some(he) = self.halfedges.get(h) else {
                continue;
            };
            let twin = he.twin;
            if self.halfedges[twin].face.is_some() {
                continue;
            }
            let (source, target, edge) = (he.source, he.target, he.edge);
            self.halfedges.remove(h);
            self.halfedges.remove(twin);
            self.edges.remove(edge);
            self.directed.remove(&(source, target));
            self.directed.remove(&(target, source));
        }
        Ok(())
    }

    /// Returns a face, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is not in the mesh.
    pub fn face(&self, id: FaceId) -> Result<&FaceData, TopologyError> {
        self.faces
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("face".into()))
    }

    /// The three half-edges of a face, starting at the face's half-edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the face or its half-edge cycle is broken.
    pub fn face_halfedges(&self, id: FaceId) -> Result<[HalfedgeId; 3], TopologyError> {
        let h0 = self.face(id)?.halfedge;
        let h1 = self.next(h0)?;
        let h2 = self.next(h1)?;
        Ok([h0, h1, h2])
    }

    /// The three corners of a face, `source` of each face half-edge in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the face or its half-edge cycle is broken.
    pub fn face_vertices(&self, id: FaceId) -> Result<[VertexId; 3], TopologyError> {
        let hs = self.face_halfedges(id)?;
        let mut corners = [VertexId::default(); 3];
        for (corner, h) in corners.iter_mut().zip(hs) {
            *corner = self.halfedge(h)?.source;
        }
        Ok(corners)
    }

    /// Corner positions of a face, in the order of [`Self::face_vertices`].
    ///
    /// # Errors
    ///
    /// Returns an error if the face or one of its vertices is missing.
    pub fn face_points(&self, id: FaceId) -> Result<[Point3; 3], TopologyError> {
        let vs = self.face_vertices(id)?;
        Ok([*self.point(vs[0])?, *self.point(vs[1])?, *self.point(vs[2])?])
    }

    /// Next half-edge around the face of `h`.
    ///
    /// # Errors
    ///
    /// Returns an error if `h` is missing or a border half-edge.
    pub fn next(&self, h: HalfedgeId) -> Result<HalfedgeId, TopologyError> {
        self.halfedge(h)?
            .next
            .ok_or_else(|| TopologyError::EntityNotFound("next of border half-edge".into()))
    }

    /// Face on the other side of `h`, or `None` across a border.
    ///
    /// # Errors
    ///
    /// Returns an error if `h` or its twin is missing.
    pub fn opposite_face(&self, h: HalfedgeId) -> Result<Option<FaceId>, TopologyError> {
        let twin = self.halfedge(h)?.twin;
        Ok(self.halfedge(twin)?.face)
    }

    /// Iterates over all face IDs.
    pub fn faces(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces.keys()
    }

    /// Number of faces.
    #[must_use]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }
}
