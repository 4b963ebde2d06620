mod projection;

pub use projection::{Project, ProjectScale, ProjectZ};

use crate::error::ShapeError;
use crate::math::Point2;

/// A closed polygonal loop. The edge from the last point back to the first is
/// implicit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contour {
    pub points: Vec<Point2>,
}

impl Contour {
    /// Creates a contour from its points.
    #[must_use]
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Number of points (and of edges, counting the closing one).
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the contour has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Twice the signed area; positive for counter-clockwise contours.
    #[must_use]
    pub fn signed_area2(&self) -> f64 {
        let n = self.points.len();
        (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum()
    }
}

/// Polygon with holes: an outer contour plus zero or more hole contours.
///
/// The outer contour is expected counter-clockwise and holes clockwise, so
/// that walking any contour forward keeps the filled region on the left.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExPolygon {
    pub contour: Contour,
    pub holes: Vec<Contour>,
}

impl ExPolygon {
    /// Creates a polygon without holes.
    #[must_use]
    pub fn new(contour: Contour) -> Self {
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    /// Adds a hole contour.
    #[must_use]
    pub fn with_hole(mut self, hole: Contour) -> Self {
        self.holes.push(hole);
        self
    }

    /// Outer contour followed by the holes.
    pub fn contours(&self) -> impl Iterator<Item = &Contour> {
        std::iter::once(&self.contour).chain(&self.holes)
    }
}

/// Total number of contour points over all polygons.
#[must_use]
pub fn count_points(shapes: &[ExPolygon]) -> usize {
    shapes
        .iter()
        .flat_map(ExPolygon::contours)
        .map(Contour::len)
        .sum()
}

/// Checks that the shape is usable for cutting.
///
/// # Errors
///
/// Returns [`ShapeError::Empty`] if there are no points at all,
/// [`ShapeError::DegenerateContour`] for a contour with fewer than 3 points,
/// and [`ShapeError::WrongWinding`] for a clockwise outer contour or a
/// counter-clockwise hole.
pub fn validate(shapes: &[ExPolygon]) -> Result<(), ShapeError> {
    if count_points(shapes) == 0 {
        return Err(ShapeError::Empty);
    }
    for (shape, polygon) in shapes.iter().enumerate() {
        for (contour, c) in polygon.contours().enumerate() {
            if c.len() < 3 {
                return Err(ShapeError::DegenerateContour {
                    shape,
                    contour,
                    points: c.len(),
                });
            }
            let area = c.signed_area2();
            let wound_right = if contour == 0 { area > 0.0 } else { area < 0.0 };
            if !wound_right {
                return Err(ShapeError::WrongWinding { shape, contour });
            }
        }
    }
    Ok(())
}
