use slotmap::SecondaryMap;
use tracing::debug;

use crate::error::{CutError, Result};
use crate::math::{Vector3, TOLERANCE};
use crate::mesh::{EdgeId, FaceId, HalfEdgeMesh, IndexedTriangleSet, VertexId};
use crate::shape::{self, ExPolygon, Project};

use super::classify::classify;
use super::convert::{convert_object, convert_shape, ObjectMesh};
use super::corefine::corefine;
use super::fill::flood_fill;
use super::provenance::{CutParams, IntersectingElement, SideType};
use super::reconstruct::reconstruct;
use super::visitor::ProvenanceVisitor;

/// The refined object mesh with every face settled inside or outside.
#[derive(Debug, Clone)]
pub struct Classification {
    pub mesh: HalfEdgeMesh,
    /// Input triangle of every refined face.
    pub source_face: SecondaryMap<FaceId, usize>,
    /// Corners of every input triangle, in input order.
    pub source_triangles: Vec<[VertexId; 3]>,
    pub sides: SecondaryMap<FaceId, SideType>,
    /// `true` for the edges lying on the cut.
    pub constrained: SecondaryMap<EdgeId, bool>,
    pub vertex_provenance: SecondaryMap<VertexId, IntersectingElement>,
}

/// Cuts the footprint of `shapes` into an object surface and extrudes it.
pub struct EmbossCut<'a, P> {
    shapes: &'a [ExPolygon],
    projection: P,
    extrusion: Vector3,
    params: CutParams,
}

impl<'a, P: Project> EmbossCut<'a, P> {
    /// Creates a new `EmbossCut` operation.
    ///
    /// `projection` maps shape points onto the front and rear of the cutting
    /// curtain; the region cut out is moved by `extrusion`.
    #[must_use]
    pub fn new(shapes: &'a [ExPolygon], projection: P, extrusion: Vector3) -> Self {
        Self {
            shapes,
            projection,
            extrusion,
            params: CutParams::default(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: CutParams) -> Self {
        self.params = params;
        self
    }

    /// Runs the cut up to the face classification.
    ///
    /// # Errors
    ///
    /// Returns [`CutError::InvalidInput`] for a zero extrusion or an empty
    /// object, a shape error for degenerate contours, and any error of the
    /// corefinement or classification stages.
    pub fn classify(&self, object: &IndexedTriangleSet) -> Result<Classification> {
        if self.extrusion.norm() < TOLERANCE {
            return Err(CutError::InvalidInput("extrusion vector must be non-zero".into()).into());
        }
        if object.is_empty() {
            return Err(CutError::InvalidInput("object mesh has no triangles".into()).into());
        }

        let shape = convert_shape(self.shapes, &self.projection)?;
        let ObjectMesh {
            mut mesh,
            source_face,
            source_triangles,
        } = convert_object(object)?;

        let mut visitor = ProvenanceVisitor::new(&shape, source_face);
        let mut constrained = SecondaryMap::new();
        corefine(&mut mesh, &shape.mesh, &mut visitor, &mut constrained, &self.params)?;
        let (source_face, vertex_provenance) = visitor.into_tables();

        let mut sides = classify(&mesh, &constrained, &vertex_provenance, &shape, &self.extrusion)?;
        flood_fill(&mesh, &mut sides)?;

        Ok(Classification {
            mesh,
            source_face,
            source_triangles,
            sides,
            constrained,
            vertex_provenance,
        })
    }

    /// Executes the cut, returning the object with the footprint extruded.
    ///
    /// # Errors
    ///
    /// See [`EmbossCut::classify`].
    pub fn execute(&self, object: &IndexedTriangleSet) -> Result<IndexedTriangleSet> {
        let classification = self.classify(object)?;
        let output = reconstruct(
            &classification.mesh,
            &classification.source_face,
            &classification.source_triangles,
            &classification.sides,
            &self.extrusion,
        )?;
        debug!(
            input = object.indices.len(),
            output = output.indices.len(),
            "emboss cut finished"
        );
        Ok(output)
    }
}

/// Cuts one shape into the surface of `source` without extruding.
///
/// # Errors
///
/// Always returns [`CutError::NotImplemented`].
pub fn cut_shape(
    source: &IndexedTriangleSet,
    shape: &ExPolygon,
    projection: &impl Project,
) -> Result<IndexedTriangleSet> {
    let _ = (source, shape, projection);
    Err(CutError::NotImplemented("surface cut of a single shape").into())
}

/// Cuts every shape into the surface of `source` and merges the pieces.
///
/// # Errors
///
/// Returns a shape error for empty input, otherwise the error of
/// [`cut_shape`].
pub fn cut_surface(
    source: &IndexedTriangleSet,
    shapes: &[ExPolygon],
    projection: &impl Project,
) -> Result<IndexedTriangleSet> {
    shape::validate(shapes)?;
    let mut result = IndexedTriangleSet::default();
    for shape in shapes {
        result.merge(cut_shape(source, shape, projection)?)?;
    }
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use approx::assert_relative_eq;

    use super::*;
    use crate::error::{EmbossError, ShapeError};
    use crate::math::{Point2, Point3};
    use crate::shape::{Contour, ProjectZ};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Contour {
        Contour::new(vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ])
    }

    /// A 10 x 10 plane at `z = 0.5` whose diagonal `y = x - 0.3` misses every
    /// contour point used below.
    fn plane() -> IndexedTriangleSet {
        IndexedTriangleSet::new(
            vec![
                Point3::new(-4.0, -4.3, 0.5),
                Point3::new(6.0, -4.3, 0.5),
                Point3::new(6.0, 5.7, 0.5),
                Point3::new(-4.0, 5.7, 0.5),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    fn up() -> Vector3 {
        Vector3::new(0.0, 0.0, 1.0)
    }

    /// Directed edge use counts of an output mesh.
    fn directed_edges(mesh: &IndexedTriangleSet) -> HashMap<(u32, u32), usize> {
        let mut edges = HashMap::new();
        for t in &mesh.indices {
            for k in 0..3 {
                *edges.entry((t[k], t[(k + 1) % 3])).or_insert(0) += 1;
            }
        }
        edges
    }

    fn open_edges(mesh: &IndexedTriangleSet) -> usize {
        let edges = directed_edges(mesh);
        assert!(edges.values().all(|&n| n == 1), "directed edge used twice");
        edges.keys().filter(|(a, b)| !edges.contains_key(&(*b, *a))).count()
    }

    struct Areas {
        base: f64,
        cap: f64,
        walls: f64,
    }

    /// Splits the output area into horizontal faces at base height, horizontal
    /// faces above it, and the rest.
    fn areas(mesh: &IndexedTriangleSet, base_z: f64) -> Areas {
        let mut areas = Areas {
            base: 0.0,
            cap: 0.0,
            walls: 0.0,
        };
        for i in 0..mesh.indices.len() {
            let [a, b, c] = mesh.triangle(i).unwrap();
            let normal = (b - a).cross(&(c - a));
            let area = normal.norm() * 0.5;
            if normal.z.abs() < 0.9 * normal.norm() {
                areas.walls += area;
            } else if (a.z - base_z).abs() < 1e-9 {
                areas.base += area;
            } else {
                areas.cap += area;
            }
        }
        areas
    }

    #[test]
    fn square_is_cut_and_raised() {
        init_tracing();
        let shapes = [ExPolygon::new(rect(0.0, 0.0, 2.0, 2.0))];
        let out = EmbossCut::new(&shapes, ProjectZ::new(1.0), up())
            .execute(&plane())
            .unwrap();

        let areas = areas(&out, 0.5);
        assert_relative_eq!(areas.base, 96.0, epsilon = 1e-6);
        assert_relative_eq!(areas.cap, 4.0, epsilon = 1e-6);
        assert_relative_eq!(areas.walls, 8.0, epsilon = 1e-6);
        assert_eq!(open_edges(&out), 4);

        for i in 0..out.indices.len() {
            let [a, b, c] = out.triangle(i).unwrap();
            let normal = (b - a).cross(&(c - a));
            if normal.z.abs() >= 0.9 * normal.norm() {
                assert!(normal.z > 0.0, "triangle {i} flipped");
                if a.z > 1.0 {
                    assert_relative_eq!(a.z, 1.5, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn cut_edges_carry_consistent_provenance() {
        init_tracing();
        let shapes = [ExPolygon::new(rect(0.0, 0.0, 2.0, 2.0))];
        let cut = EmbossCut::new(&shapes, ProjectZ::new(1.0), up())
            .classify(&plane())
            .unwrap();

        let cut_edges: Vec<EdgeId> = cut
            .constrained
            .iter()
            .filter_map(|(e, &on_cut)| on_cut.then_some(e))
            .collect();
        assert_eq!(cut_edges.len(), 10);
        for edge in cut_edges {
            let [a, b] = cut.mesh.edge_vertices(edge).unwrap();
            assert_eq!(
                cut.vertex_provenance[a].contour,
                cut.vertex_provenance[b].contour
            );
        }

        assert!(cut
            .mesh
            .faces()
            .all(|f| cut.sides[f] != SideType::NotConstrained));
        assert!(cut.mesh.faces().all(|f| cut.source_face.contains_key(f)));
        let inside = cut
            .mesh
            .faces()
            .filter(|&f| cut.sides[f] == SideType::Inside)
            .count();
        assert!(inside >= 2);

        // Only the four rim edges of the plane have a single face.
        let rim = cut
            .mesh
            .edges()
            .filter(|&e| {
                let halves = cut.mesh.edge(e).unwrap().halfedges;
                halves
                    .iter()
                    .any(|&h| cut.mesh.halfedge(h).unwrap().face.is_none())
            })
            .count();
        assert_eq!(rim, 4);
    }

    #[test]
    fn shape_beside_object_leaves_it_untouched() {
        init_tracing();
        let shapes = [ExPolygon::new(rect(20.0, 20.0, 22.0, 22.0))];
        let object = IndexedTriangleSet::cube(3.0, 2.0, 1.0);
        let cut = EmbossCut::new(&shapes, ProjectZ::new(5.0), up());

        let classification = cut.classify(&object).unwrap();
        assert!(classification.constrained.values().all(|&on_cut| !on_cut));

        let out = cut.execute(&object).unwrap();
        assert_eq!(out.indices.len(), object.indices.len());
        assert_eq!(out.vertices.len(), object.vertices.len());
        for i in 0..out.indices.len() {
            let corners = out.triangle(i).unwrap();
            let found = (0..object.indices.len()).any(|j| {
                let other = object.triangle(j).unwrap();
                (0..3).any(|r| (0..3).all(|k| corners[k] == other[(k + r) % 3]))
            });
            assert!(found, "triangle {i} is not in the input");
        }
    }

    #[test]
    fn hole_keeps_its_floor() {
        init_tracing();
        let hole = Contour::new(vec![
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 3.0),
            Point2::new(3.0, 3.0),
            Point2::new(3.0, 1.0),
        ]);
        let shapes = [ExPolygon::new(rect(0.0, 0.0, 4.0, 4.0)).with_hole(hole)];
        let out = EmbossCut::new(&shapes, ProjectZ::new(1.0), up())
            .execute(&plane())
            .unwrap();

        let areas = areas(&out, 0.5);
        assert_relative_eq!(areas.cap, 12.0, epsilon = 1e-6);
        assert_relative_eq!(areas.walls, 24.0, epsilon = 1e-6);
        assert_relative_eq!(areas.base, 100.0 - 16.0 + 4.0, epsilon = 1e-6);
        assert_eq!(open_edges(&out), 4);

        let mut floor = 0.0;
        for i in 0..out.indices.len() {
            let [a, b, c] = out.triangle(i).unwrap();
            let centroid = Point3::from((a.coords + b.coords + c.coords) / 3.0);
            let in_hole = (1.0..3.0).contains(&centroid.x) && (1.0..3.0).contains(&centroid.y);
            if in_hole && (centroid.z - 0.5).abs() < 1e-9 {
                floor += (b - a).cross(&(c - a)).norm() * 0.5;
            }
        }
        assert_relative_eq!(floor, 4.0, epsilon = 1e-6);
    }

    #[test]
    fn slab_stays_closed_and_bottom_stays_outside() {
        init_tracing();
        let mut slab = IndexedTriangleSet::cube(10.0, 10.0, 1.0);
        slab.translate(&Vector3::new(-4.0, -4.3, -0.5));
        let shapes = [ExPolygon::new(rect(0.0, 0.0, 2.0, 2.0))];
        let cut = EmbossCut::new(&shapes, ProjectZ::new(1.0), up());

        let classification = cut.classify(&slab).unwrap();
        for face in classification.mesh.faces() {
            let [a, b, c] = classification.mesh.face_points(face).unwrap();
            if (b - a).cross(&(c - a)).z < 0.0 {
                assert_eq!(classification.sides[face], SideType::Outside);
            }
        }

        let out = cut.execute(&slab).unwrap();
        assert_eq!(open_edges(&out), 0);
        let areas = areas(&out, 0.5);
        assert_relative_eq!(areas.cap, 4.0 + 100.0, epsilon = 1e-6);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let shapes = [ExPolygon::new(rect(0.0, 0.0, 2.0, 2.0))];
        let err = EmbossCut::new(&shapes, ProjectZ::new(1.0), Vector3::zeros())
            .execute(&plane())
            .unwrap_err();
        assert!(matches!(err, EmbossError::Cut(CutError::InvalidInput(_))));

        let err = EmbossCut::new(&shapes, ProjectZ::new(1.0), up())
            .execute(&IndexedTriangleSet::default())
            .unwrap_err();
        assert!(matches!(err, EmbossError::Cut(CutError::InvalidInput(_))));

        let err = EmbossCut::new(&[], ProjectZ::new(1.0), up())
            .execute(&plane())
            .unwrap_err();
        assert!(matches!(err, EmbossError::Shape(ShapeError::Empty)));

        let mut clockwise = rect(0.0, 0.0, 2.0, 2.0);
        clockwise.points.reverse();
        let err = EmbossCut::new(&[ExPolygon::new(clockwise)], ProjectZ::new(1.0), up())
            .execute(&plane())
            .unwrap_err();
        assert!(matches!(
            err,
            EmbossError::Shape(ShapeError::WrongWinding { shape: 0, contour: 0 })
        ));
    }

    #[test]
    fn surface_cut_is_not_implemented() {
        let shapes = [ExPolygon::new(rect(0.0, 0.0, 2.0, 2.0))];
        let projection = ProjectZ::new(1.0);
        let err = cut_shape(&plane(), &shapes[0], &projection).unwrap_err();
        assert!(matches!(err, EmbossError::Cut(CutError::NotImplemented(_))));
        let err = cut_surface(&plane(), &shapes, &projection).unwrap_err();
        assert!(matches!(err, EmbossError::Cut(CutError::NotImplemented(_))));
    }
}
