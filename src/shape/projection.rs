use crate::math::{Point2, Point3};

/// Maps a 2D shape point to a pair of 3D points, `(front, rear)`.
///
/// The segment between front and rear is the wall of the cutting curtain at
/// that point, so it must pass through the object surface to be cut.
/// Implementations must be deterministic.
pub trait Project {
    fn project(&self, point: &Point2) -> (Point3, Point3);
}

impl<F> Project for F
where
    F: Fn(&Point2) -> (Point3, Point3),
{
    fn project(&self, point: &Point2) -> (Point3, Point3) {
        self(point)
    }
}

/// Straight projection along +Z: front at `z = 0`, rear at `z = depth`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectZ {
    depth: f64,
}

impl ProjectZ {
    #[must_use]
    pub fn new(depth: f64) -> Self {
        Self { depth }
    }
}

impl Project for ProjectZ {
    fn project(&self, point: &Point2) -> (Point3, Point3) {
        (
            Point3::new(point.x, point.y, 0.0),
            Point3::new(point.x, point.y, self.depth),
        )
    }
}

/// Scales the output of another projection, e.g. from font units to mm.
#[derive(Debug, Clone)]
pub struct ProjectScale<P> {
    inner: P,
    scale: f64,
}

impl<P: Project> ProjectScale<P> {
    #[must_use]
    pub fn new(inner: P, scale: f64) -> Self {
        Self { inner, scale }
    }
}

impl<P: Project> Project for ProjectScale<P> {
    fn project(&self, point: &Point2) -> (Point3, Point3) {
        let (front, rear) = self.inner.project(point);
        (front * self.scale, rear * self.scale)
    }
}
