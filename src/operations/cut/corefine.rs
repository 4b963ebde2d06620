use std::collections::{BTreeMap, HashMap};

use slotmap::SecondaryMap;
use spade::handles::FixedVertexHandle;
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};
use tracing::{debug, trace, warn};

use crate::error::{CutError, Result};
use crate::math::intersect_3d::{barycentric, segment_triangle, SegmentTriangle, TriangleLocation};
use crate::math::Point3;
use crate::mesh::{EdgeId, FaceId, HalfEdgeMesh, VertexId};

use super::provenance::CutParams;

/// Element of the shape mesh an intersection point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeElement {
    Edge(EdgeId),
    Face(FaceId),
}

/// Report of one intersection point.
///
/// The same point may be reported several times, once per pair of elements
/// that produces it; `id` is stable across reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEvent {
    /// Dense point id, starting at `0`.
    pub id: usize,
    /// Dimension of the simplex hit by the intersecting edge: `0` vertex,
    /// `1` edge, `2` face interior.
    pub dimension: u8,
    /// Shape element the point lies on.
    pub shape: ShapeElement,
    /// Existing object vertex the point coincides with, if any.
    pub object_vertex: Option<VertexId>,
}

/// Callbacks fired by [`corefine`].
pub trait CorefineVisitor {
    /// An object face is about to be replaced by sub-faces.
    fn before_subface_creations(&mut self, _face: FaceId) {}

    /// A sub-face of the face announced by the last
    /// [`Self::before_subface_creations`] was added.
    fn after_subface_created(&mut self, _face: FaceId) {}

    /// All sub-faces of the current face were added.
    fn after_subface_creations(&mut self) {}

    /// An intersection point was found.
    ///
    /// # Errors
    ///
    /// Errors abort the refinement.
    fn intersection_point_detected(&mut self, event: &IntersectionEvent) -> Result<()>;

    /// A new object vertex was created for intersection point `id`.
    ///
    /// # Errors
    ///
    /// Errors abort the refinement.
    fn new_vertex_added(&mut self, id: usize, vertex: VertexId) -> Result<()>;
}

/// Identity of an intersection point in terms of the elements producing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NodeKey {
    /// Object edge through a shape face interior.
    EdgeFace(EdgeId, FaceId),
    /// Object edge through a shape edge.
    EdgeEdge(EdgeId, EdgeId),
    /// Shape edge through an object face interior.
    FaceEdge(FaceId, EdgeId),
    /// Object vertex on a shape element.
    Vertex(VertexId, ShapeElement),
}

/// Where an intersection point lies on the object mesh.
#[derive(Debug, Clone, Copy)]
enum Site {
    Vertex(VertexId),
    /// At parameter `t` along `from -> to`.
    Edge {
        edge: EdgeId,
        from: VertexId,
        to: VertexId,
        t: f64,
    },
    Face(FaceId),
}

#[derive(Debug, Clone, Copy)]
struct Node {
    position: Point3,
    site: Site,
    shape: ShapeElement,
}

#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Point3,
    max: Point3,
}

impl Aabb {
    fn from_points(points: &[Point3]) -> Self {
        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min = min.inf(p);
            max = max.sup(p);
        }
        Self { min, max }
    }

    fn overlaps(&self, other: &Self, margin: f64) -> bool {
        self.min.x <= other.max.x + margin
            && self.max.x >= other.min.x - margin
            && self.min.y <= other.max.y + margin
            && self.max.y >= other.min.y - margin
            && self.min.z <= other.max.z + margin
            && self.max.z >= other.min.z - margin
    }
}

fn boxed_faces(mesh: &HalfEdgeMesh) -> Result<Vec<(FaceId, [Point3; 3], Aabb)>> {
    mesh.faces()
        .map(|face| {
            let points = mesh.face_points(face)?;
            Ok((face, points, Aabb::from_points(&points)))
        })
        .collect()
}

/// Faces incident to an edge (one on a border, two otherwise).
fn edge_faces(mesh: &HalfEdgeMesh, edge: EdgeId) -> Result<Vec<FaceId>> {
    let mut faces = Vec::with_capacity(2);
    for h in mesh.edge(edge)?.halfedges {
        if let Some(face) = mesh.halfedge(h)?.face {
            faces.push(face);
        }
    }
    Ok(faces)
}

/// Shape element touched at `location` of shape face `face`; `None` for a
/// shape vertex.
fn shape_element(
    shape: &HalfEdgeMesh,
    face: FaceId,
    location: TriangleLocation,
) -> Result<Option<ShapeElement>> {
    Ok(match location {
        TriangleLocation::Interior => Some(ShapeElement::Face(face)),
        TriangleLocation::Edge(k) => {
            let h = shape.face_halfedges(face)?[k];
            Some(ShapeElement::Edge(shape.halfedge(h)?.edge))
        }
        TriangleLocation::Vertex(_) => None,
    })
}

struct Context<'m> {
    object: &'m HalfEdgeMesh,
    shape: &'m HalfEdgeMesh,
    vertex_faces: HashMap<VertexId, Vec<FaceId>>,
}

#[derive(Default)]
struct Intersections {
    nodes: Vec<Node>,
    keys: HashMap<NodeKey, usize>,
    /// Points on the edges or in the interior of each object face.
    face_nodes: HashMap<FaceId, Vec<usize>>,
    /// Points shared by an (object face, shape face) pair.
    pairs: BTreeMap<(FaceId, FaceId), Vec<usize>>,
    /// Object vertex of each point, once materialized.
    vertices: Vec<VertexId>,
}

impl Intersections {
    fn record(
        &mut self,
        ctx: &Context<'_>,
        key: NodeKey,
        node: Node,
        dimension: u8,
        visitor: &mut impl CorefineVisitor,
    ) -> Result<()> {
        let id = if let Some(&id) = self.keys.get(&key) {
            id
        } else {
            let id = self.nodes.len();
            self.register(ctx, id, &node)?;
            self.nodes.push(node);
            self.keys.insert(key, id);
            id
        };
        let object_vertex = match node.site {
            Site::Vertex(v) => Some(v),
            _ => None,
        };
        trace!(id, dimension, ?key, "intersection point");
        visitor.intersection_point_detected(&IntersectionEvent {
            id,
            dimension,
            shape: node.shape,
            object_vertex,
        })
    }

    fn register(&mut self, ctx: &Context<'_>, id: usize, node: &Node) -> Result<()> {
        let object_faces = match node.site {
            Site::Vertex(v) => ctx.vertex_faces.get(&v).cloned().unwrap_or_default(),
            Site::Edge { edge, .. } => edge_faces(ctx.object, edge)?,
            Site::Face(face) => vec![face],
        };
        let shape_faces = match node.shape {
            ShapeElement::Face(face) => vec![face],
            ShapeElement::Edge(edge) => edge_faces(ctx.shape, edge)?,
        };
        for &face in &object_faces {
            if !matches!(node.site, Site::Vertex(_)) {
                self.face_nodes.entry(face).or_default().push(id);
            }
            for &wall in &shape_faces {
                self.pairs.entry((face, wall)).or_default().push(id);
            }
        }
        Ok(())
    }

    /// Cut segments per object face: pairs of faces meeting in exactly two
    /// points.
    fn segments(&self) -> HashMap<FaceId, Vec<[usize; 2]>> {
        let mut segments: HashMap<FaceId, Vec<[usize; 2]>> = HashMap::new();
        for (&(face, wall), ids) in &self.pairs {
            match ids.as_slice() {
                &[a, b] => segments.entry(face).or_default().push([a, b]),
                [_] => trace!(?face, ?wall, "faces touch in a single point"),
                _ => warn!(?face, ?wall, points = ids.len(), "degenerate face pair, no cut segment"),
            }
        }
        segments
    }

    fn materialize(
        &mut self,
        object: &mut HalfEdgeMesh,
        visitor: &mut impl CorefineVisitor,
    ) -> Result<()> {
        self.vertices = Vec::with_capacity(self.nodes.len());
        for (id, node) in self.nodes.iter().enumerate() {
            let vertex = if let Site::Vertex(v) = node.site {
                v
            } else {
                let v = object.add_vertex(node.position);
                visitor.new_vertex_added(id, v)?;
                v
            };
            self.vertices.push(vertex);
        }
        Ok(())
    }

    /// Replaces `face` by a constrained triangulation of its corners and cut
    /// points.
    fn split_face(
        &self,
        object: &mut HalfEdgeMesh,
        face: FaceId,
        segments: &[[usize; 2]],
        visitor: &mut impl CorefineVisitor,
        params: &CutParams,
    ) -> Result<usize> {
        let corners = object.face_vertices(face)?;
        let triangle = object.face_points(face)?;

        let mut cdt = FaceTriangulation::default();
        for (&corner, (x, y)) in corners.iter().zip([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]) {
            cdt.insert(corner, x, y)?;
        }
        for &id in self.face_nodes.get(&face).map_or(&[][..], Vec::as_slice) {
            let (x, y) = frame_coordinates(&self.nodes[id], &corners, &triangle, params)?;
            cdt.insert(self.vertices[id], x, y)?;
        }
        for &[a, b] in segments {
            if !cdt.constrain(self.vertices[a], self.vertices[b]) {
                warn!(?face, a, b, "cut segment crosses another one, left unconstrained");
            }
        }
        let pieces = cdt.triangles()?;

        visitor.before_subface_creations(face);
        object.remove_face(face)?;
        for piece in &pieces {
            let sub = object.add_face(*piece)?;
            visitor.after_subface_created(sub);
        }
        visitor.after_subface_creations();
        trace!(?face, pieces = pieces.len(), "split object face");
        Ok(pieces.len())
    }
}

/// Coordinates of a cut point in the frame where the face corners are
/// `(0, 0)`, `(1, 0)` and `(0, 1)`.
///
/// Points on a face edge are placed exactly on the frame edge, so the
/// triangulation never creates slivers outside the face and neighbouring
/// faces agree on the order of shared points.
fn frame_coordinates(
    node: &Node,
    corners: &[VertexId; 3],
    triangle: &[Point3; 3],
    params: &CutParams,
) -> Result<(f64, f64)> {
    let margin = params.barycentric_margin;
    match node.site {
        Site::Edge { from, to, t, .. } => {
            for k in 0..3 {
                let (c0, c1) = (corners[k], corners[(k + 1) % 3]);
                let s = if (c0, c1) == (from, to) {
                    t
                } else if (c0, c1) == (to, from) {
                    1.0 - t
                } else {
                    continue;
                };
                let s = s.clamp(margin, 1.0 - margin);
                return Ok(match k {
                    0 => (s, 0.0),
                    // Keep x + y == 1 exactly.
                    1 if s <= 0.5 => {
                        let x = 1.0 - s;
                        (x, 1.0 - x)
                    }
                    1 => (1.0 - s, s),
                    _ => (0.0, 1.0 - s),
                });
            }
            Err(CutError::Triangulation("cut point is not on an edge of its face".into()).into())
        }
        Site::Face(_) => {
            let (u, v) = barycentric(triangle, &node.position);
            let (u, v) = (u.max(margin), v.max(margin));
            let limit = 1.0 - 2.0 * margin;
            if u + v > limit {
                let k = limit / (u + v);
                Ok((u * k, v * k))
            } else {
                Ok((u, v))
            }
        }
        Site::Vertex(_) => {
            Err(CutError::Triangulation("face corner inserted as a cut point".into()).into())
        }
    }
}

#[derive(Default)]
struct FaceTriangulation {
    cdt: ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    vertex_of: HashMap<FixedVertexHandle, VertexId>,
    handle_of: HashMap<VertexId, FixedVertexHandle>,
}

impl FaceTriangulation {
    fn insert(&mut self, vertex: VertexId, x: f64, y: f64) -> Result<()> {
        let handle = self
            .cdt
            .insert(SpadePoint2::new(x, y))
            .map_err(|e: InsertionError| CutError::Triangulation(format!("CDT insert: {e}")))?;
        if let Some(&existing) = self.vertex_of.get(&handle) {
            if existing != vertex {
                return Err(CutError::Triangulation(
                    "two cut points collapse onto one position".into(),
                )
                .into());
            }
        }
        self.vertex_of.insert(handle, vertex);
        self.handle_of.insert(vertex, handle);
        Ok(())
    }

    fn constrain(&mut self, a: VertexId, b: VertexId) -> bool {
        let (Some(&from), Some(&to)) = (self.handle_of.get(&a), self.handle_of.get(&b)) else {
            return false;
        };
        if from == to || !self.cdt.can_add_constraint(from, to) {
            return false;
        }
        self.cdt.add_constraint(from, to);
        true
    }

    fn triangles(&self) -> Result<Vec<[VertexId; 3]>> {
        self.cdt
            .inner_faces()
            .map(|face| {
                let mut triangle = [VertexId::default(); 3];
                for (slot, handle) in triangle.iter_mut().zip(face.vertices()) {
                    *slot = *self.vertex_of.get(&handle.fix()).ok_or_else(|| {
                        CutError::Triangulation("unknown triangulation vertex".into())
                    })?;
                }
                Ok(triangle)
            })
            .collect()
    }
}

/// Finds every intersection point of the object and shape meshes.
fn detect(
    object: &HalfEdgeMesh,
    shape: &HalfEdgeMesh,
    visitor: &mut impl CorefineVisitor,
    params: &CutParams,
) -> Result<Intersections> {
    let object_faces = boxed_faces(object)?;
    let shape_faces = boxed_faces(shape)?;
    // Faces around each object vertex, for vertex hits.
    let mut vertex_faces: HashMap<VertexId, Vec<FaceId>> = HashMap::new();
    for &(face, _, _) in &object_faces {
        for v in object.face_vertices(face)? {
            vertex_faces.entry(v).or_default().push(face);
        }
    }
    let ctx = Context {
        object,
        shape,
        vertex_faces,
    };
    let mut found = Intersections::default();

    // Object edges against shape faces.
    for edge in object.edges() {
        let ends = object.edge_vertices(edge)?;
        let (a, b) = (*object.point(ends[0])?, *object.point(ends[1])?);
        let bounds = Aabb::from_points(&[a, b]);
        for (wall, triangle, wall_box) in &shape_faces {
            if !bounds.overlaps(wall_box, params.aabb_margin) {
                continue;
            }
            match segment_triangle(&a, &b, triangle) {
                SegmentTriangle::Disjoint => {}
                SegmentTriangle::Coplanar => {
                    trace!(?edge, ?wall, "object edge in the plane of a shape face");
                }
                SegmentTriangle::Endpoint { endpoint, location } => {
                    let Some(element) = shape_element(shape, *wall, location)? else {
                        warn!(?edge, "object vertex on a shape vertex, skipped");
                        continue;
                    };
                    let v = ends[endpoint];
                    let node = Node {
                        position: *object.point(v)?,
                        site: Site::Vertex(v),
                        shape: element,
                    };
                    found.record(&ctx, NodeKey::Vertex(v, element), node, location.dimension(), visitor)?;
                }
                SegmentTriangle::Crossing { t, point, location } => {
                    let Some(element) = shape_element(shape, *wall, location)? else {
                        warn!(?edge, "object edge through a shape vertex, skipped");
                        continue;
                    };
                    let key = match element {
                        ShapeElement::Face(face) => NodeKey::EdgeFace(edge, face),
                        ShapeElement::Edge(shape_edge) => NodeKey::EdgeEdge(edge, shape_edge),
                    };
                    let node = Node {
                        position: point,
                        site: Site::Edge {
                            edge,
                            from: ends[0],
                            to: ends[1],
                            t,
                        },
                        shape: element,
                    };
                    found.record(&ctx, key, node, location.dimension(), visitor)?;
                }
            }
        }
    }

    // Shape edges against object faces.
    for shape_edge in shape.edges() {
        let ends = shape.edge_vertices(shape_edge)?;
        let (p, q) = (*shape.point(ends[0])?, *shape.point(ends[1])?);
        let bounds = Aabb::from_points(&[p, q]);
        let element = ShapeElement::Edge(shape_edge);
        for (face, triangle, face_box) in &object_faces {
            if !bounds.overlaps(face_box, params.aabb_margin) {
                continue;
            }
            match segment_triangle(&p, &q, triangle) {
                SegmentTriangle::Disjoint => {}
                SegmentTriangle::Coplanar => {
                    trace!(?shape_edge, ?face, "shape edge in the plane of an object face");
                }
                SegmentTriangle::Endpoint { .. } => {
                    warn!(?shape_edge, ?face, "shape vertex on the object surface, skipped");
                }
                SegmentTriangle::Crossing { point, location, .. } => match location {
                    TriangleLocation::Interior => {
                        let node = Node {
                            position: point,
                            site: Site::Face(*face),
                            shape: element,
                        };
                        found.record(&ctx, NodeKey::FaceEdge(*face, shape_edge), node, 2, visitor)?;
                    }
                    // Also found as an object edge crossing this shape edge.
                    TriangleLocation::Edge(_) => {}
                    TriangleLocation::Vertex(k) => {
                        let v = object.face_vertices(*face)?[k];
                        let node = Node {
                            position: *object.point(v)?,
                            site: Site::Vertex(v),
                            shape: element,
                        };
                        found.record(&ctx, NodeKey::Vertex(v, element), node, 0, visitor)?;
                    }
                },
            }
        }
    }

    Ok(found)
}

/// Splits `object` along its intersection with `shape`.
///
/// On return every edge of `object` has an entry in `constrained`, `true`
/// exactly for the edges lying on the cut. Degenerate contacts (coplanar
/// elements, hits through a shape vertex) are logged and skipped.
///
/// # Errors
///
/// Returns an error raised by the visitor, a [`CutError::Triangulation`] when a
/// face cannot be re-triangulated, or a topology error on broken connectivity.
pub fn corefine(
    object: &mut HalfEdgeMesh,
    shape: &HalfEdgeMesh,
    visitor: &mut impl CorefineVisitor,
    constrained: &mut SecondaryMap<EdgeId, bool>,
    params: &CutParams,
) -> Result<()> {
    let mut found = detect(object, shape, visitor, params)?;
    let segments = found.segments();
    // New vertices first so split faces can refer to them.
    found.materialize(object, visitor)?;

    // Re-triangulate every face holding an intersection point.
    let faces: Vec<FaceId> = object.faces().collect();
    let mut split = 0;
    let mut pieces = 0;
    for face in faces {
        if !found.face_nodes.contains_key(&face) {
            continue;
        }
        let face_segments = segments.get(&face).map_or(&[][..], Vec::as_slice);
        pieces += found.split_face(object, face, face_segments, visitor, params)?;
        split += 1;
    }

    // Mark the cut segments, then default the rest to unconstrained.
    let mut cut_edges = 0;
    for (face, face_segments) in &segments {
        for &[a, b] in face_segments {
            let Some(h) = object.find_halfedge(found.vertices[a], found.vertices[b]) else {
                warn!(?face, a, b, "cut segment is not an edge of the refined face");
                continue;
            };
            let edge = object.halfedge(h)?.edge;
            if constrained.insert(edge, true) != Some(true) {
                cut_edges += 1;
            }
        }
    }
    for edge in object.edges() {
        if !constrained.contains_key(edge) {
            constrained.insert(edge, false);
        }
    }

    debug!(
        points = found.nodes.len(),
        split_faces = split,
        sub_faces = pieces,
        cut_edges,
        "corefined object mesh"
    );
    Ok(())
}
