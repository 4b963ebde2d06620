use super::predicates::{drop_axis, orientation, orientation_2d, Orientation};
use super::{Point3, Vector3};

/// Where a point touches a triangle.
///
/// Edge `i` runs from corner `i` to corner `(i + 1) % 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangleLocation {
    Interior,
    Edge(usize),
    Vertex(usize),
}

impl TriangleLocation {
    /// Dimension of the touched simplex: 0 vertex, 1 edge, 2 face interior.
    #[must_use]
    pub fn dimension(self) -> u8 {
        match self {
            Self::Vertex(_) => 0,
            Self::Edge(_) => 1,
            Self::Interior => 2,
        }
    }
}

/// Relationship of a segment `a -> b` with a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentTriangle {
    /// No common point.
    Disjoint,
    /// The segment lies in the triangle's plane.
    Coplanar,
    /// Exactly one endpoint (`0` for `a`, `1` for `b`) lies on the triangle.
    Endpoint {
        endpoint: usize,
        location: TriangleLocation,
    },
    /// The segment crosses the triangle's plane strictly between its endpoints.
    Crossing {
        t: f64,
        point: Point3,
        location: TriangleLocation,
    },
}

/// Classifies how a coplanar point sits relative to a triangle.
///
/// The caller guarantees `p` lies in the triangle's plane; the test then runs
/// in 2D after dropping the dominant normal axis, which keeps it exact.
/// Returns `None` when the point is outside or the triangle is degenerate.
#[must_use]
pub fn locate_coplanar_point(triangle: &[Point3; 3], p: &Point3) -> Option<TriangleLocation> {
    let normal = (triangle[1] - triangle[0]).cross(&(triangle[2] - triangle[0]));
    let axis = normal.iamax();
    let flip = normal[axis] < 0.0;

    let t2 = triangle.map(|c| drop_axis(&c, axis));
    let p2 = drop_axis(p, axis);
    let signs: [Orientation; 3] = std::array::from_fn(|i| {
        let s = orientation_2d(&t2[i], &t2[(i + 1) % 3], &p2);
        if flip {
            s.flip()
        } else {
            s
        }
    });
    locate_from_edge_signs(signs)
}

/// Interprets the three per-edge orientation signs of a point or line.
fn locate_from_edge_signs(signs: [Orientation; 3]) -> Option<TriangleLocation> {
    let positive = signs.iter().filter(|&&s| s == Orientation::Positive).count();
    let negative = signs.iter().filter(|&&s| s == Orientation::Negative).count();
    if positive > 0 && negative > 0 {
        return None;
    }
    let zeros: Vec<usize> = (0..3).filter(|&i| signs[i] == Orientation::Zero).collect();
    match zeros.as_slice() {
        [] => Some(TriangleLocation::Interior),
        [edge] => Some(TriangleLocation::Edge(*edge)),
        // Edges i and i + 1 share corner i + 1.
        [0, 1] => Some(TriangleLocation::Vertex(1)),
        [1, 2] => Some(TriangleLocation::Vertex(2)),
        [0, 2] => Some(TriangleLocation::Vertex(0)),
        _ => None,
    }
}

/// Exact segment/triangle intersection classification.
///
/// All decisions use exact orientation predicates; only the crossing
/// parameter `t` and the crossing point are computed in floating point.
#[must_use]
pub fn segment_triangle(a: &Point3, b: &Point3, triangle: &[Point3; 3]) -> SegmentTriangle {
    let [p, q, r] = triangle;
    let sa = orientation(p, q, r, a);
    let sb = orientation(p, q, r, b);

    match (sa, sb) {
        (Orientation::Zero, Orientation::Zero) => SegmentTriangle::Coplanar,
        (Orientation::Zero, _) => locate_coplanar_point(triangle, a).map_or(
            SegmentTriangle::Disjoint,
            |location| SegmentTriangle::Endpoint { endpoint: 0, location },
        ),
        (_, Orientation::Zero) => locate_coplanar_point(triangle, b).map_or(
            SegmentTriangle::Disjoint,
            |location| SegmentTriangle::Endpoint { endpoint: 1, location },
        ),
        _ if sa == sb => SegmentTriangle::Disjoint,
        _ => {
            // a and b straddle the plane; the line through them passes inside
            // the triangle iff it turns the same way around all three edges.
            let mut signs = [
                orientation(a, b, p, q),
                orientation(a, b, q, r),
                orientation(a, b, r, p),
            ];
            if sa == Orientation::Negative {
                signs = signs.map(Orientation::flip);
            }
            let Some(location) = locate_from_edge_signs(signs) else {
                return SegmentTriangle::Disjoint;
            };
            let t = crossing_parameter(a, b, triangle);
            SegmentTriangle::Crossing {
                t,
                point: a + (b - a) * t,
                location,
            }
        }
    }
}

/// Parameter along `a -> b` where the segment meets the triangle's plane.
fn crossing_parameter(a: &Point3, b: &Point3, triangle: &[Point3; 3]) -> f64 {
    let normal = (triangle[1] - triangle[0]).cross(&(triangle[2] - triangle[0]));
    let da = normal.dot(&(a - triangle[0]));
    let db = normal.dot(&(b - triangle[0]));
    let denom = da - db;
    if denom == 0.0 {
        return 0.5;
    }
    (da / denom).clamp(0.0, 1.0)
}

/// Barycentric coordinates `(u, v)` of `p` in `triangle`, such that
/// `p = (1 - u - v) * a + u * b + v * c` for a point in the triangle's plane.
#[must_use]
pub fn barycentric(triangle: &[Point3; 3], p: &Point3) -> (f64, f64) {
    let e1: Vector3 = triangle[1] - triangle[0];
    let e2: Vector3 = triangle[2] - triangle[0];
    let ep: Vector3 = p - triangle[0];
    let d11 = e1.dot(&e1);
    let d12 = e1.dot(&e2);
    let d22 = e2.dot(&e2);
    let dp1 = ep.dot(&e1);
    let dp2 = ep.dot(&e2);
    let denom = d11 * d22 - d12 * d12;
    if denom == 0.0 {
        return (0.0, 0.0);
    }
    let u = (d22 * dp1 - d12 * dp2) / denom;
    let v = (d11 * dp2 - d12 * dp1) / denom;
    (u, v)
}

/// Point at barycentric coordinates `(u, v)` of `triangle`.
#[must_use]
pub fn barycentric_point(triangle: &[Point3; 3], u: f64, v: f64) -> Point3 {
    let w = 1.0 - u - v;
    Point3::from(triangle[0].coords * w + triangle[1].coords * u + triangle[2].coords * v)
}
