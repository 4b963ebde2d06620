mod half_edge;

pub use half_edge::{EdgeId, FaceId, HalfEdgeMesh, HalfedgeId, VertexId};

use crate::error::TopologyError;
use crate::math::{Point3, Vector3};

/// An indexed triangle mesh: shared vertex positions plus index triples.
///
/// This is the exchange format of the engine; both the object to cut and the
/// cut result use it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedTriangleSet {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangle indices (each triple defines a counter-clockwise triangle).
    pub indices: Vec<[u32; 3]>,
}

impl IndexedTriangleSet {
    /// Creates a mesh from vertices and triangles.
    #[must_use]
    pub fn new(vertices: Vec<Point3>, indices: Vec<[u32; 3]>) -> Self {
        Self { vertices, indices }
    }

    /// Axis-aligned box spanning `[0, x] × [0, y] × [0, z]` with outward-facing triangles.
    #[must_use]
    pub fn cube(x: f64, y: f64, z: f64) -> Self {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(x, 0.0, 0.0),
            Point3::new(x, y, 0.0),
            Point3::new(0.0, y, 0.0),
            Point3::new(0.0, 0.0, z),
            Point3::new(x, 0.0, z),
            Point3::new(x, y, z),
            Point3::new(0.0, y, z),
        ];
        let indices = vec![
            // bottom
            [0, 2, 1],
            [0, 3, 2],
            // top
            [4, 5, 6],
            [4, 6, 7],
            // front (y = 0)
            [0, 1, 5],
            [0, 5, 4],
            // right (x = max)
            [1, 2, 6],
            [1, 6, 5],
            // back (y = max)
            [2, 3, 7],
            [2, 7, 6],
            // left (x = 0)
            [3, 0, 4],
            [3, 4, 7],
        ];
        Self { vertices, indices }
    }

    /// Returns `true` if the mesh has no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Moves every vertex by `offset`.
    pub fn translate(&mut self, offset: &Vector3) {
        for v in &mut self.vertices {
            *v += *offset;
        }
    }

    /// Appends `other`, re-indexing its triangles. On error `self` is left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::IndexOverflow`] if a re-indexed triangle no
    /// longer fits in `u32`.
    pub fn merge(&mut self, other: Self) -> Result<(), TopologyError> {
        let vertices = self.vertices.len();
        let overflow = || TopologyError::IndexOverflow { vertices };
        let base = u32::try_from(vertices).map_err(|_| overflow())?;
        let indices = other
            .indices
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| i.checked_add(base));
                Some([a?, b?, c?])
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(overflow)?;
        self.vertices.extend(other.vertices);
        self.indices.extend(indices);
        Ok(())
    }

    /// Corner positions of triangle `index`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidTriangle`] if the triangle or one of its
    /// vertex indices is out of range.
    pub fn triangle(&self, index: usize) -> Result<[Point3; 3], TopologyError> {
        let tri = self.indices.get(index).ok_or_else(|| TopologyError::InvalidTriangle {
            index,
            reason: "triangle index out of range".into(),
        })?;
        let mut corners = [Point3::origin(); 3];
        for (corner, &vi) in corners.iter_mut().zip(tri) {
            *corner = *self.vertices.get(vi as usize).ok_or_else(|| {
                TopologyError::InvalidTriangle {
                    index,
                    reason: format!("vertex index {vi} out of range"),
                }
            })?;
        }
        Ok(corners)
    }

    /// Total surface area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.indices
            .iter()
            .filter_map(|t| {
                let a = self.vertices.get(t[0] as usize)?;
                let b = self.vertices.get(t[1] as usize)?;
                let c = self.vertices.get(t[2] as usize)?;
                Some((b - a).cross(&(c - a)).norm() * 0.5)
            })
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn cube_has_outward_normals() {
        let cube = IndexedTriangleSet::cube(2.0, 3.0, 4.0);
        assert_eq!(cube.indices.len(), 12);
        let center = Point3::new(1.0, 1.5, 2.0);
        for i in 0..cube.indices.len() {
            let [a, b, c] = cube.triangle(i).unwrap();
            let normal = (b - a).cross(&(c - a));
            assert!(normal.dot(&(a - center)) > 0.0, "triangle {i} faces inward");
        }
        assert_relative_eq!(cube.area(), 2.0 * (6.0 + 8.0 + 12.0));
    }

    #[test]
    fn merge_reindexes_appended_triangles() {
        let mut a = IndexedTriangleSet::cube(1.0, 1.0, 1.0);
        let mut b = IndexedTriangleSet::cube(1.0, 1.0, 1.0);
        b.translate(&Vector3::new(5.0, 0.0, 0.0));
        a.merge(b).unwrap();
        assert_eq!(a.vertices.len(), 16);
        assert_eq!(a.indices.len(), 24);
        assert!(a.indices[12..].iter().all(|t| t.iter().all(|&i| i >= 8)));
        assert_relative_eq!(a.triangle(12).unwrap()[0].x, 5.0);
    }

    #[test]
    fn merge_overflow_leaves_mesh_untouched() {
        let mut a = IndexedTriangleSet::cube(1.0, 1.0, 1.0);
        let b = IndexedTriangleSet::new(vec![Point3::origin()], vec![[0, 0, u32::MAX]]);
        let err = a.merge(b).unwrap_err();
        assert!(matches!(err, TopologyError::IndexOverflow { vertices: 8 }));
        assert_eq!(a, IndexedTriangleSet::cube(1.0, 1.0, 1.0));
    }

    #[test]
    fn triangle_out_of_range_is_an_error() {
        let mesh = IndexedTriangleSet::new(vec![Point3::origin()], vec![[0, 1, 2]]);
        assert!(mesh.triangle(0).is_err());
        assert!(mesh.triangle(7).is_err());
    }
}
