use crate::math::TOLERANCE;

/// One contour (outer boundary or hole) of one shape, located in the shape
/// mesh.
///
/// Point `k` of the contour became shape mesh vertices `vertex_base + 2k`
/// (front) and `vertex_base + 2k + 1` (rear).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourVertexId {
    /// Index of the polygon-with-holes in the input.
    pub shape: usize,
    /// `0` for the outer contour, `1..` for holes.
    pub contour: usize,
    pub vertex_base: usize,
    /// Number of points of the contour.
    pub len: usize,
}

impl ContourVertexId {
    /// Index of the point following `point`, wrapping to `0`.
    #[must_use]
    pub fn next_point(&self, point: usize) -> usize {
        if point + 1 == self.len {
            0
        } else {
            point + 1
        }
    }

    /// Shape mesh index of the front vertex of `point`.
    #[must_use]
    pub fn front(&self, point: usize) -> usize {
        self.vertex_base + 2 * point
    }

    /// Shape mesh index of the rear vertex of `point`.
    #[must_use]
    pub fn rear(&self, point: usize) -> usize {
        self.front(point) + 1
    }

    /// Whether `from -> to` is the closing step from the last point to `0`.
    #[must_use]
    pub fn is_wrap(&self, from: usize, to: usize) -> bool {
        to == 0 && from + 1 == self.len
    }
}

/// Which element of a wall segment a tag refers to.
///
/// For contour points `i -> j` the wall is the quad `F_i R_i R_j F_j` split
/// into two triangles. The variants are declared in the order they are met
/// when walking the wall from point `i` to point `j`, and that order is the
/// tie-break between tags of the same point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKind {
    /// Vertical edge `F_i R_i` at the contour point itself.
    Edge1,
    /// Triangle `F_i R_i F_j`.
    Face1,
    /// Diagonal edge `R_i F_j`.
    Edge2,
    /// Triangle `F_j R_i R_j`.
    Face2,
}

/// Provenance of a shape mesh edge or face, and of every object mesh vertex
/// created where the shape cuts the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntersectingElement {
    /// Index into the contour records of the shape mesh.
    pub contour: usize,
    /// Index of the contour point starting the wall segment.
    pub point: usize,
    pub kind: ElementKind,
}

/// Classification of an object face against the cut footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideType {
    Inside,
    Outside,
    #[default]
    NotConstrained,
}

/// Aggregated state of one source triangle over its sub-faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaceState {
    #[default]
    Unknown,
    /// One sub-face, outside.
    Unmarked,
    /// Several sub-faces, all outside.
    UnmarkedSplit,
    /// One sub-face, inside.
    Marked,
    /// Several sub-faces, at least one inside.
    MarkedSplit,
    /// Already written to the output as a whole.
    Emitted,
}

impl FaceState {
    /// Folds the verdict of one more sub-face into the state.
    #[must_use]
    pub fn merge(self, inside: bool) -> Self {
        match (self, inside) {
            (Self::Unknown, true) => Self::Marked,
            (Self::Unknown, false) => Self::Unmarked,
            (Self::Unmarked | Self::UnmarkedSplit, true)
            | (Self::Marked | Self::MarkedSplit, _) => Self::MarkedSplit,
            (Self::Unmarked | Self::UnmarkedSplit, false) => Self::UnmarkedSplit,
            (Self::Emitted, _) => Self::Emitted,
        }
    }

    /// Whether every sub-face of the source triangle is outside.
    #[must_use]
    pub fn is_unmarked(self) -> bool {
        matches!(self, Self::Unmarked | Self::UnmarkedSplit)
    }
}

/// Numeric parameters of a cut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutParams {
    /// Padding added to bounding boxes before the overlap pre-filter.
    pub aabb_margin: f64,
    /// Minimum barycentric distance of a face-interior cut point from the
    /// face's edges when the face is re-triangulated.
    pub barycentric_margin: f64,
}

impl Default for CutParams {
    fn default() -> Self {
        Self {
            aabb_margin: TOLERANCE,
            barycentric_margin: 1e-12,
        }
    }
}
