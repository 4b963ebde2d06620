use robust::{Coord, Coord3D};

use super::{Point2, Point3};

/// Sign of an orientation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Negative,
    Zero,
    Positive,
}

impl Orientation {
    fn from_determinant(det: f64) -> Self {
        if det > 0.0 {
            Self::Positive
        } else if det < 0.0 {
            Self::Negative
        } else {
            Self::Zero
        }
    }

    /// Returns the opposite orientation.
    #[must_use]
    pub fn flip(self) -> Self {
        match self {
            Self::Negative => Self::Positive,
            Self::Zero => Self::Zero,
            Self::Positive => Self::Negative,
        }
    }
}

fn coord3(p: &Point3) -> Coord3D<f64> {
    Coord3D {
        x: p.x,
        y: p.y,
        z: p.z,
    }
}

fn coord2(x: f64, y: f64) -> Coord<f64> {
    Coord { x, y }
}

/// Orientation of `d` relative to the oriented plane through `a`, `b`, `c`.
///
/// [`Orientation::Positive`] when `d` lies on the side the normal
/// `(b - a) × (c - a)` points to, i.e. `det(b - a, c - a, d - a) > 0`.
#[must_use]
pub fn orientation(a: &Point3, b: &Point3, c: &Point3, d: &Point3) -> Orientation {
    // orient3d is positive when d lies below a counter-clockwise a, b, c.
    let det = robust::orient3d(coord3(a), coord3(b), coord3(c), coord3(d));
    Orientation::from_determinant(det).flip()
}

/// Orientation of `c` relative to the directed line `a -> b`.
///
/// [`Orientation::Positive`] when `a`, `b`, `c` are counter-clockwise.
#[must_use]
pub fn orientation_2d(a: &Point2, b: &Point2, c: &Point2) -> Orientation {
    let det = robust::orient2d(coord2(a.x, a.y), coord2(b.x, b.y), coord2(c.x, c.y));
    Orientation::from_determinant(det)
}

/// Drops one coordinate of `p`, keeping the remaining two in cyclic order.
///
/// Projection by dropping a coordinate is exact, so 2D predicates evaluated on
/// the result keep the exactness of the 3D input.
#[must_use]
pub fn drop_axis(p: &Point3, axis: usize) -> Point2 {
    match axis {
        0 => Point2::new(p.y, p.z),
        1 => Point2::new(p.z, p.x),
        _ => Point2::new(p.x, p.y),
    }
}
