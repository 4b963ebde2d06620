use slotmap::SecondaryMap;
use tracing::debug;

use crate::error::{Result, TopologyError};
use crate::math::Point3;
use crate::mesh::{EdgeId, FaceId, HalfEdgeMesh, IndexedTriangleSet, VertexId};
use crate::shape::{self, ExPolygon, Project};

use super::provenance::{ContourVertexId, ElementKind, IntersectingElement};

/// The object to cut, as a half-edge mesh remembering where each face came
/// from.
#[derive(Debug, Clone)]
pub struct ObjectMesh {
    pub mesh: HalfEdgeMesh,
    /// Index of the input triangle each face descends from.
    pub source_face: SecondaryMap<FaceId, usize>,
    /// Corners of every input triangle, as mesh vertices.
    pub source_triangles: Vec<[VertexId; 3]>,
}

/// The cutting curtain built from the 2D shape.
#[derive(Debug, Clone)]
pub struct ShapeMesh {
    pub mesh: HalfEdgeMesh,
    /// Mesh vertices in creation order; [`ContourVertexId`] indexes into this.
    pub vertices: Vec<VertexId>,
    pub edge_provenance: SecondaryMap<EdgeId, IntersectingElement>,
    pub face_provenance: SecondaryMap<FaceId, IntersectingElement>,
    pub contours: Vec<ContourVertexId>,
}

impl ShapeMesh {
    /// Provenance of a shape edge.
    ///
    /// The vertical and diagonal wall edges carry their own tag; the front and
    /// rear rims fall back to the tag of their only wall face.
    #[must_use]
    pub fn edge_element(&self, edge: EdgeId) -> Option<IntersectingElement> {
        if let Some(&element) = self.edge_provenance.get(edge) {
            return Some(element);
        }
        let halves = self.mesh.edge(edge).ok()?.halfedges;
        halves.iter().find_map(|&h| {
            let face = self.mesh.halfedge(h).ok()?.face?;
            self.face_provenance.get(face).copied()
        })
    }

    /// Positions of the corners of the wall triangle named by `element`, in
    /// the winding the shape mesh uses for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the contour record or a vertex is missing.
    pub fn wall_triangle(
        &self,
        element: &IntersectingElement,
    ) -> Result<[Point3; 3]> {
        let record = self.contours.get(element.contour).ok_or_else(|| {
            TopologyError::EntityNotFound(format!("contour record {}", element.contour))
        })?;
        let i = element.point;
        let j = record.next_point(i);
        let corners = match element.kind {
            ElementKind::Face1 => [record.front(i), record.rear(i), record.front(j)],
            _ => [record.front(j), record.rear(i), record.rear(j)],
        };
        let mut points = [Point3::origin(); 3];
        for (point, index) in points.iter_mut().zip(corners) {
            let vertex = self.vertices.get(index).ok_or_else(|| {
                TopologyError::EntityNotFound(format!("shape vertex {index}"))
            })?;
            *point = *self.mesh.point(*vertex)?;
        }
        Ok(points)
    }
}

/// Converts an indexed triangle set into a half-edge mesh, tagging each face
/// with the index of its input triangle.
///
/// # Errors
///
/// Returns [`TopologyError::InvalidTriangle`] for out of range or repeated
/// indices and [`TopologyError::NonManifoldEdge`] when a directed edge is used
/// by two triangles.
pub fn convert_object(input: &IndexedTriangleSet) -> Result<ObjectMesh> {
    let mut mesh = HalfEdgeMesh::new();
    let vertices: Vec<VertexId> = input.vertices.iter().map(|p| mesh.add_vertex(*p)).collect();

    let mut source_face = SecondaryMap::new();
    let mut source_triangles = Vec::with_capacity(input.indices.len());
    for (index, triangle) in input.indices.iter().enumerate() {
        let mut corners = [VertexId::default(); 3];
        for (corner, &vi) in corners.iter_mut().zip(triangle) {
            *corner = *vertices.get(vi as usize).ok_or_else(|| TopologyError::InvalidTriangle {
                index,
                reason: format!("vertex index {vi} out of range"),
            })?;
        }
        let face = mesh.add_face(corners).map_err(|e| match e {
            TopologyError::InvalidTriangle { reason, .. } => {
                TopologyError::InvalidTriangle { index, reason }
            }
            other => other,
        })?;
        source_face.insert(face, index);
        source_triangles.push(corners);
    }

    debug!(
        vertices = mesh.num_vertices(),
        faces = mesh.num_faces(),
        "converted object mesh"
    );
    Ok(ObjectMesh {
        mesh,
        source_face,
        source_triangles,
    })
}

/// Walls every contour of `shapes` into a curtain of triangles.
///
/// Each contour point `k` is projected to a front and a rear vertex. Between
/// points `i` and `j = i + 1` the wall quad gets the faces `F_i R_i F_j`
/// ([`ElementKind::Face1`]) and `F_j R_i R_j` ([`ElementKind::Face2`]); the
/// edges `F_i R_i` and `R_i F_j` are tagged [`ElementKind::Edge1`] and
/// [`ElementKind::Edge2`].
///
/// # Errors
///
/// Returns a shape error for an empty shape or a contour with fewer than three
/// points, and a topology error if two walls share a directed edge.
pub fn convert_shape(shapes: &[ExPolygon], projection: &impl Project) -> Result<ShapeMesh> {
    shape::validate(shapes)?;

    let mut mesh = HalfEdgeMesh::new();
    let mut vertices = Vec::with_capacity(2 * shape::count_points(shapes));
    let mut edge_provenance = SecondaryMap::new();
    let mut face_provenance = SecondaryMap::new();
    let mut contours = Vec::new();

    for (shape_index, polygon) in shapes.iter().enumerate() {
        for (contour_index, contour) in polygon.contours().enumerate() {
            let record = ContourVertexId {
                shape: shape_index,
                contour: contour_index,
                vertex_base: vertices.len(),
                len: contour.len(),
            };
            let record_index = contours.len();
            contours.push(record);

            for point in &contour.points {
                let (front, rear) = projection.project(point);
                vertices.push(mesh.add_vertex(front));
                vertices.push(mesh.add_vertex(rear));
            }

            for i in 0..record.len {
                let j = record.next_point(i);
                let (fi, ri) = (vertices[record.front(i)], vertices[record.rear(i)]);
                let (fj, rj) = (vertices[record.front(j)], vertices[record.rear(j)]);
                let tag = |kind| IntersectingElement {
                    contour: record_index,
                    point: i,
                    kind,
                };

                let face_1 = mesh.add_face([fi, ri, fj])?;
                let face_2 = mesh.add_face([fj, ri, rj])?;
                face_provenance.insert(face_1, tag(ElementKind::Face1));
                face_provenance.insert(face_2, tag(ElementKind::Face2));

                for (from, to, kind) in [(fi, ri, ElementKind::Edge1), (ri, fj, ElementKind::Edge2)] {
                    let h = mesh.find_halfedge(from, to).ok_or_else(|| {
                        TopologyError::EntityNotFound("wall edge".into())
                    })?;
                    edge_provenance.insert(mesh.halfedge(h)?.edge, tag(kind));
                }
            }
        }
    }

    debug!(
        contours = contours.len(),
        vertices = mesh.num_vertices(),
        faces = mesh.num_faces(),
        "converted shape curtain"
    );
    Ok(ShapeMesh {
        mesh,
        vertices,
        edge_provenance,
        face_provenance,
        contours,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{EmbossError, ShapeError};
    use crate::math::Point2;
    use crate::shape::{Contour, ProjectZ};

    fn square() -> ExPolygon {
        ExPolygon::new(Contour::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ]))
    }

    #[test]
    fn object_faces_remember_their_triangle() {
        let cube = IndexedTriangleSet::cube(1.0, 1.0, 1.0);
        let object = convert_object(&cube).unwrap();
        assert_eq!(object.mesh.num_faces(), 12);
        assert_eq!(object.mesh.num_edges(), 18);
        let mut sources: Vec<usize> = object.mesh.faces().map(|f| object.source_face[f]).collect();
        sources.sort_unstable();
        assert_eq!(sources, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn object_with_bad_index_is_rejected() {
        let bad = IndexedTriangleSet::new(vec![Point3::origin(); 3], vec![[0, 1, 5]]);
        let err = convert_object(&bad).unwrap_err();
        assert!(matches!(
            err,
            EmbossError::Topology(TopologyError::InvalidTriangle { index: 0, .. })
        ));
        let repeated = IndexedTriangleSet::new(vec![Point3::origin(); 3], vec![[0, 1, 2], [1, 1, 2]]);
        let err = convert_object(&repeated).unwrap_err();
        assert!(matches!(
            err,
            EmbossError::Topology(TopologyError::InvalidTriangle { index: 1, .. })
        ));
    }

    #[test]
    fn square_becomes_closed_curtain() {
        let shape = convert_shape(&[square()], &ProjectZ::new(1.0)).unwrap();
        assert_eq!(shape.vertices.len(), 8);
        assert_eq!(shape.mesh.num_faces(), 8);
        assert_eq!(shape.contours.len(), 1);
        // Vertical, diagonal, front rim and rear rim edge per segment.
        assert_eq!(shape.mesh.num_edges(), 16);
        assert_eq!(shape.edge_provenance.len(), 8);

        let front_0 = shape.mesh.point(shape.vertices[0]).unwrap();
        let rear_0 = shape.mesh.point(shape.vertices[1]).unwrap();
        assert_eq!(*front_0, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(*rear_0, Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn wall_faces_point_into_the_shape() {
        let shape = convert_shape(&[square()], &ProjectZ::new(1.0)).unwrap();
        let center = Point3::new(1.0, 1.0, 0.5);
        for face in shape.mesh.faces() {
            let [a, b, c] = shape.mesh.face_points(face).unwrap();
            let normal = (b - a).cross(&(c - a));
            assert!(normal.dot(&(center - a)) > 0.0);
        }
    }

    #[test]
    fn rim_edges_fall_back_to_face_tag() {
        let shape = convert_shape(&[square()], &ProjectZ::new(1.0)).unwrap();
        let (f0, f1) = (shape.vertices[0], shape.vertices[2]);
        let h = shape.mesh.find_halfedge(f1, f0).unwrap();
        let rim = shape.mesh.halfedge(h).unwrap().edge;
        let element = shape.edge_element(rim).unwrap();
        assert_eq!(element.kind, ElementKind::Face1);
        assert_eq!(element.point, 0);

        let h = shape.mesh.find_halfedge(shape.vertices[1], f1).unwrap();
        let diagonal = shape.mesh.halfedge(h).unwrap().edge;
        assert_eq!(shape.edge_element(diagonal).unwrap().kind, ElementKind::Edge2);
    }

    #[test]
    fn holes_get_their_own_record() {
        let hole = Contour::new(vec![
            Point2::new(0.5, 0.5),
            Point2::new(0.5, 1.5),
            Point2::new(1.5, 1.5),
            Point2::new(1.5, 0.5),
        ]);
        let shape = convert_shape(&[square().with_hole(hole)], &ProjectZ::new(1.0)).unwrap();
        assert_eq!(shape.contours.len(), 2);
        assert_eq!(shape.contours[1].vertex_base, 8);
        assert_eq!(shape.contours[1].contour, 1);
        let triangle = shape
            .wall_triangle(&IntersectingElement {
                contour: 1,
                point: 3,
                kind: ElementKind::Face2,
            })
            .unwrap();
        // Wraps to the first point of the hole.
        assert_eq!(triangle[0], Point3::new(0.5, 0.5, 0.0));
        assert_eq!(triangle[2], Point3::new(0.5, 0.5, 1.0));
    }

    #[test]
    fn only_face_1_names_the_lower_wall_triangle() {
        let shape = convert_shape(&[square()], &ProjectZ::new(1.0)).unwrap();
        let wall = |kind| {
            shape
                .wall_triangle(&IntersectingElement { contour: 0, point: 0, kind })
                .unwrap()
        };
        let lower = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let upper = [
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(2.0, 0.0, 1.0),
        ];
        assert_eq!(wall(ElementKind::Face1), lower);
        for kind in [ElementKind::Edge1, ElementKind::Edge2, ElementKind::Face2] {
            assert_eq!(wall(kind), upper);
        }
    }

    #[test]
    fn empty_shape_is_rejected() {
        let err = convert_shape(&[], &ProjectZ::new(1.0)).unwrap_err();
        assert!(matches!(err, EmbossError::Shape(ShapeError::Empty)));
    }
}
