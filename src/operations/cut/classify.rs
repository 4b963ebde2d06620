use slotmap::SecondaryMap;
use tracing::debug;

use crate::error::{CutError, Result, TopologyError};
use crate::math::predicates::{orientation, Orientation};
use crate::math::Vector3;
use crate::mesh::{EdgeId, FaceId, HalfEdgeMesh, HalfedgeId, VertexId};

use super::convert::ShapeMesh;
use super::provenance::{ContourVertexId, IntersectingElement, SideType};

/// What the contour winding says about the face left of a cut edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    Inside,
    Outside,
    /// Both ends are on the same wall triangle; only geometry can tell.
    Pinch,
}

/// Side of the face on the left of a cut edge running from `from` to `to`.
///
/// Contours keep the filled region on their left, so walking forward along the
/// contour (increasing point index, then element kind) means the face is
/// inside. The closing step from the last point back to `0` counts as forward.
#[must_use]
pub fn winding_side(
    from: &IntersectingElement,
    to: &IntersectingElement,
    record: &ContourVertexId,
) -> Winding {
    if from.point == to.point && from.kind == to.kind {
        return Winding::Pinch;
    }
    let forward = if from.point < to.point || (from.point == to.point && from.kind < to.kind) {
        !record.is_wrap(to.point, from.point)
    } else {
        record.is_wrap(from.point, to.point)
    };
    if forward {
        Winding::Inside
    } else {
        Winding::Outside
    }
}

/// Classifies the face left of the constrained half-edge `h`.
fn classify_edge(
    mesh: &HalfEdgeMesh,
    h: HalfedgeId,
    vertex_provenance: &SecondaryMap<VertexId, IntersectingElement>,
    shape: &ShapeMesh,
) -> Result<bool> {
    let he = mesh.halfedge(h)?;
    let from = vertex_provenance
        .get(he.source)
        .ok_or(CutError::MissingVertexProvenance)?;
    let to = vertex_provenance
        .get(he.target)
        .ok_or(CutError::MissingVertexProvenance)?;
    if from.contour != to.contour {
        return Err(CutError::MismatchedContours {
            from: from.contour,
            to: to.contour,
        }
        .into());
    }
    let record = shape.contours.get(from.contour).ok_or_else(|| {
        TopologyError::EntityNotFound(format!("contour record {}", from.contour))
    })?;

    Ok(match winding_side(from, to, record) {
        Winding::Inside => true,
        Winding::Outside => false,
        Winding::Pinch => {
            let third = mesh.halfedge(mesh.next(h)?)?.target;
            let [a, b, c] = shape.wall_triangle(from)?;
            orientation(&a, &b, &c, mesh.point(third)?) == Orientation::Positive
        }
    })
}

/// Classifies every face that has a constrained edge.
///
/// The first constrained edge of a face decides. A face the contours call
/// inside is kept inside only if its normal points along `extrusion`.
/// All other faces are returned as [`SideType::NotConstrained`].
///
/// # Errors
///
/// Returns [`CutError::MissingVertexProvenance`] or
/// [`CutError::MismatchedContours`] when the tags on a cut edge are
/// inconsistent.
pub fn classify(
    mesh: &HalfEdgeMesh,
    constrained: &SecondaryMap<EdgeId, bool>,
    vertex_provenance: &SecondaryMap<VertexId, IntersectingElement>,
    shape: &ShapeMesh,
    extrusion: &Vector3,
) -> Result<SecondaryMap<FaceId, SideType>> {
    let mut sides = SecondaryMap::new();
    let (mut inside, mut outside) = (0usize, 0usize);

    for face in mesh.faces() {
        let mut side = SideType::NotConstrained;
        for h in mesh.face_halfedges(face)? {
            let edge = mesh.halfedge(h)?.edge;
            if !constrained.get(edge).copied().unwrap_or(false) {
                continue;
            }
            side = if classify_edge(mesh, h, vertex_provenance, shape)? {
                let [a, b, c] = mesh.face_points(face)?;
                if orientation(&a, &b, &c, &(a + extrusion)) == Orientation::Positive {
                    SideType::Inside
                } else {
                    SideType::Outside
                }
            } else {
                SideType::Outside
            };
            break;
        }
        match side {
            SideType::Inside => inside += 1,
            SideType::Outside => outside += 1,
            SideType::NotConstrained => {}
        }
        sides.insert(face, side);
    }

    debug!(inside, outside, "classified faces along the cut");
    Ok(sides)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::EmbossError;
    use crate::math::{Point2, Point3};
    use crate::operations::cut::convert::convert_shape;
    use crate::operations::cut::provenance::ElementKind;
    use crate::shape::{Contour, ExPolygon, ProjectZ};

    fn tag(contour: usize, point: usize, kind: ElementKind) -> IntersectingElement {
        IntersectingElement {
            contour,
            point,
            kind,
        }
    }

    fn record(len: usize) -> ContourVertexId {
        ContourVertexId {
            shape: 0,
            contour: 0,
            vertex_base: 0,
            len,
        }
    }

    fn square_shape() -> ShapeMesh {
        let square = Contour::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ]);
        convert_shape(&[ExPolygon::new(square)], &ProjectZ::new(1.0)).unwrap()
    }

    /// One object triangle with its first two corners tagged and edge
    /// `corners[0] -> corners[1]` constrained.
    fn tagged_triangle(
        corners: [Point3; 3],
        tags: [IntersectingElement; 2],
    ) -> (
        HalfEdgeMesh,
        FaceId,
        SecondaryMap<EdgeId, bool>,
        SecondaryMap<VertexId, IntersectingElement>,
    ) {
        let mut mesh = HalfEdgeMesh::new();
        let vs = corners.map(|c| mesh.add_vertex(c));
        let face = mesh.add_face(vs).unwrap();
        let mut constrained = SecondaryMap::new();
        for e in mesh.edges() {
            constrained.insert(e, false);
        }
        let h = mesh.find_halfedge(vs[0], vs[1]).unwrap();
        constrained.insert(mesh.halfedge(h).unwrap().edge, true);
        let mut provenance = SecondaryMap::new();
        provenance.insert(vs[0], tags[0]);
        provenance.insert(vs[1], tags[1]);
        (mesh, face, constrained, provenance)
    }

    #[test]
    fn forward_along_contour_is_inside() {
        let r = record(4);
        let face_1 = tag(0, 0, ElementKind::Face1);
        let edge_2 = tag(0, 0, ElementKind::Edge2);
        assert_eq!(winding_side(&face_1, &edge_2, &r), Winding::Inside);
        assert_eq!(winding_side(&edge_2, &face_1, &r), Winding::Outside);

        let a = tag(0, 1, ElementKind::Face2);
        let b = tag(0, 2, ElementKind::Edge1);
        assert_eq!(winding_side(&a, &b, &r), Winding::Inside);
        assert_eq!(winding_side(&b, &a, &r), Winding::Outside);
    }

    #[test]
    fn closing_step_counts_as_forward() {
        let r = record(4);
        let last = tag(0, 3, ElementKind::Face2);
        let first = tag(0, 0, ElementKind::Edge1);
        assert_eq!(winding_side(&last, &first, &r), Winding::Inside);
        assert_eq!(winding_side(&first, &last, &r), Winding::Outside);
    }

    #[test]
    fn same_wall_triangle_is_a_pinch() {
        let r = record(4);
        let a = tag(0, 2, ElementKind::Face1);
        assert_eq!(winding_side(&a, &a, &r), Winding::Pinch);
    }

    #[test]
    fn pinch_resolved_by_third_corner() {
        let shape = square_shape();
        let tags = [tag(0, 0, ElementKind::Face1), tag(0, 0, ElementKind::Face1)];
        let up = Vector3::new(0.0, 0.0, 1.0);

        // Third corner on the filled side of the bottom wall.
        let (mesh, face, constrained, provenance) = tagged_triangle(
            [Point3::new(0.2, 0.0, 0.5), Point3::new(0.6, 0.0, 0.5), Point3::new(0.4, 1.0, 0.5)],
            tags,
        );
        let sides = classify(&mesh, &constrained, &provenance, &shape, &up).unwrap();
        assert_eq!(sides[face], SideType::Inside);

        // Third corner outside the square.
        let (mesh, face, constrained, provenance) = tagged_triangle(
            [Point3::new(0.6, 0.0, 0.5), Point3::new(0.2, 0.0, 0.5), Point3::new(0.4, -1.0, 0.5)],
            tags,
        );
        let sides = classify(&mesh, &constrained, &provenance, &shape, &up).unwrap();
        assert_eq!(sides[face], SideType::Outside);
    }

    #[test]
    fn upper_wall_pinch_resolved_by_third_corner() {
        let shape = square_shape();
        let tags = [tag(0, 0, ElementKind::Face2), tag(0, 0, ElementKind::Face2)];
        let up = Vector3::new(0.0, 0.0, 1.0);

        // Both cut points above the wall diagonal.
        let (mesh, face, constrained, provenance) = tagged_triangle(
            [Point3::new(1.0, 0.0, 0.8), Point3::new(1.5, 0.0, 0.8), Point3::new(1.2, 1.0, 0.8)],
            tags,
        );
        let sides = classify(&mesh, &constrained, &provenance, &shape, &up).unwrap();
        assert_eq!(sides[face], SideType::Inside);

        let (mesh, face, constrained, provenance) = tagged_triangle(
            [Point3::new(1.5, 0.0, 0.8), Point3::new(1.0, 0.0, 0.8), Point3::new(1.2, -1.0, 0.8)],
            tags,
        );
        let sides = classify(&mesh, &constrained, &provenance, &shape, &up).unwrap();
        assert_eq!(sides[face], SideType::Outside);
    }

    #[test]
    fn face_against_extrusion_is_outside() {
        let shape = square_shape();
        let tags = [tag(0, 0, ElementKind::Face1), tag(0, 0, ElementKind::Face2)];
        let corners = [Point3::new(0.5, 0.0, 0.5), Point3::new(1.5, 0.0, 0.5), Point3::new(1.0, 1.0, 0.5)];
        let (mesh, face, constrained, provenance) = tagged_triangle(corners, tags);

        let up = Vector3::new(0.0, 0.0, 1.0);
        let sides = classify(&mesh, &constrained, &provenance, &shape, &up).unwrap();
        assert_eq!(sides[face], SideType::Inside);
        let down = Vector3::new(0.0, 0.0, -1.0);
        let sides = classify(&mesh, &constrained, &provenance, &shape, &down).unwrap();
        assert_eq!(sides[face], SideType::Outside);
    }

    #[test]
    fn unconstrained_faces_are_left_open() {
        let shape = square_shape();
        let tags = [tag(0, 0, ElementKind::Face1), tag(0, 0, ElementKind::Face2)];
        let corners = [Point3::new(0.5, 0.0, 0.5), Point3::new(1.5, 0.0, 0.5), Point3::new(1.0, 1.0, 0.5)];
        let (mesh, face, mut constrained, provenance) = tagged_triangle(corners, tags);
        for e in mesh.edges() {
            constrained.insert(e, false);
        }
        let up = Vector3::new(0.0, 0.0, 1.0);
        let sides = classify(&mesh, &constrained, &provenance, &shape, &up).unwrap();
        assert_eq!(sides[face], SideType::NotConstrained);
    }

    #[test]
    fn inconsistent_tags_are_fatal() {
        let shape = square_shape();
        let up = Vector3::new(0.0, 0.0, 1.0);
        let corners = [Point3::new(0.5, 0.0, 0.5), Point3::new(1.5, 0.0, 0.5), Point3::new(1.0, 1.0, 0.5)];

        let tags = [tag(0, 0, ElementKind::Face1), tag(1, 0, ElementKind::Face2)];
        let (mesh, _, constrained, provenance) = tagged_triangle(corners, tags);
        let err = classify(&mesh, &constrained, &provenance, &shape, &up).unwrap_err();
        assert!(matches!(
            err,
            EmbossError::Cut(CutError::MismatchedContours { from: 0, to: 1 })
        ));

        let tags = [tag(0, 0, ElementKind::Face1), tag(0, 0, ElementKind::Face2)];
        let (mesh, _, constrained, mut provenance) = tagged_triangle(corners, tags);
        let first = mesh.vertices().next().unwrap();
        provenance.remove(first);
        let err = classify(&mesh, &constrained, &provenance, &shape, &up).unwrap_err();
        assert!(matches!(err, EmbossError::Cut(CutError::MissingVertexProvenance)));
    }
}
