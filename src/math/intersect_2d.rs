use super::{Point2, Vector2};

/// 2D cross product (determinant of the two column vectors).
fn cross(v0: &Vector2, v1: &Vector2) -> f64 {
    v0.x * v1.y - v1.x * v0.y
}

/// Intersection of the ray `r_point + t * r_dir` with the segment `s0 - s1`.
///
/// Returns the multiplier `t` of `r_dir`; it is the distance from the ray
/// origin when `r_dir` is normalized. Returns `None` when the ray is collinear
/// with the segment, hits the segment's line outside the segment, or the hit
/// lies behind the ray origin. The result does not depend on the segment's
/// orientation.
#[must_use]
pub fn ray_segment_intersection(
    r_point: &Point2,
    r_dir: &Vector2,
    s0: &Point2,
    s1: &Point2,
) -> Option<f64> {
    let segment_dir = s1 - s0;
    let mut d = cross(&segment_dir, r_dir);
    if d.abs() < f64::EPSILON {
        return None;
    }

    let s12 = s0 - r_point;
    let mut s_number = cross(r_dir, &s12);
    let change_sign = d < 0.0;
    if change_sign {
        d = -d;
        s_number = -s_number;
    }

    if s_number < 0.0 || s_number > d {
        return None;
    }

    let mut r_number = cross(&segment_dir, &s12);
    if change_sign {
        r_number = -r_number;
    }
    if r_number < 0.0 {
        return None;
    }

    Some(r_number / d)
}

/// Point where the ray `point + t * dir` leaves a triangle.
///
/// Tests all three sides and keeps the farthest hit, so a hit that is only
/// marginally in front of the origin because of rounding does not win.
#[must_use]
pub fn ray_triangle_exit(point: &Point2, dir: &Vector2, triangle: &[Point2; 3]) -> Option<Point2> {
    let t = (0..3)
        .filter_map(|i| ray_segment_intersection(point, dir, &triangle[i], &triangle[(i + 1) % 3]))
        .fold(None, |best: Option<f64>, t| Some(best.map_or(t, |b| b.max(t))))?;
    Some(point + dir * t)
}
