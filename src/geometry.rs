//! Planar polygon tests used by the localization pipeline.
//!
//! All polygons are given as corner points in clockwise order. Lane geometry
//! elements and object bounding boxes are always quadrilaterals, so the
//! intersection vertex count is bounded by construction: at most one point
//! per edge pair plus the corners of either quad.

use crate::math::{Point2d, Vector2d, EPSILON};
use arrayvec::ArrayVec;
use itertools::iproduct;
use rstar::AABB;

/// Tolerance for the boundary-inclusive barycentric containment test.
const BARY_EPSILON: f64 = 1e-9;

/// The edge vectors of a polygon, edge `i` running from corner `i` to corner `i + 1`.
fn edges(corners: &[Point2d; 4]) -> [Vector2d; 4] {
    [0, 1, 2, 3].map(|i| corners[(i + 1) % 4] - corners[i])
}

/// Barycentric containment test for a single triangle, inclusive of the boundary.
///
/// A degenerate triangle (collinear or coincident corners) contains nothing.
fn is_within_triangle(p1: Point2d, p2: Point2d, p3: Point2d, point: Point2d) -> bool {
    let v0 = p2 - p1;
    let v1 = p3 - p1;
    let v2 = point - p1;

    let d00 = v0.x * v0.x + v0.y * v0.y;
    let d01 = v0.x * v1.x + v0.y * v1.y;
    let d11 = v1.x * v1.x + v1.y * v1.y;
    let d20 = v2.x * v0.x + v2.y * v0.y;
    let d21 = v2.x * v1.x + v2.y * v1.y;

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < BARY_EPSILON {
        return false;
    }

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    let u = 1.0 - v - w;

    u >= -BARY_EPSILON && v >= -BARY_EPSILON && w >= -BARY_EPSILON
}

/// Determines whether `point` lies within (or exactly on the boundary of) the
/// quadrilateral spanned by the four corner points.
///
/// `a` and `b` span the left edge, `c` and `d` the right edge. The quad is
/// split along the `b`-`c` diagonal into two triangles which are tested
/// individually.
pub fn is_within_quad(a: Point2d, b: Point2d, c: Point2d, d: Point2d, point: Point2d) -> bool {
    is_within_triangle(a, b, c, point) || is_within_triangle(b, d, c, point)
}

/// Calculates the intersection polygon of a lane geometry element with an
/// object bounding box.
///
/// Both quads must be convex with corners in clockwise order. For every pair
/// of edges the linear system `boundary point + lambda * boundary edge =
/// element point + kappa * element edge` is solved; a pair intersects when
/// both scalars are strictly inside (0, 1). Corners of either quad lying
/// inside the other are part of the intersection polygon as well. Edge pairs
/// with a determinant below [EPSILON] are parallel; no intersection point is
/// computed for them, but their parametrization still feeds the corner tests.
///
/// Fewer than 3 returned points means the polygons do not actually overlap.
pub fn intersection_points(
    element: &[Point2d; 4],
    boundary: &[Point2d; 4],
) -> ArrayVec<Point2d, 24> {
    let element_edges = edges(element);
    let boundary_edges = edges(boundary);

    let mut points = ArrayVec::new();
    let mut lambda = [[0.0_f64; 4]; 4];
    let mut kappa = [[0.0_f64; 4]; 4];
    let mut parallel = [[false; 4]; 4];

    for (i, k) in iproduct!(0..4, 0..4) {
        let det = boundary_edges[i].x * element_edges[k].y - boundary_edges[i].y * element_edges[k].x;
        parallel[i][k] = det.abs() < EPSILON;
        lambda[i][k] = (-boundary[i].x * element_edges[k].y + boundary[i].y * element_edges[k].x
            + element[k].x * element_edges[k].y
            - element[k].y * element_edges[k].x)
            / det;
        kappa[i][k] = (-boundary[i].x * boundary_edges[i].y + boundary[i].y * boundary_edges[i].x
            + element[k].x * boundary_edges[i].y
            - element[k].y * boundary_edges[i].x)
            / det;
        if lambda[i][k] > 0.0 && lambda[i][k] < 1.0 && kappa[i][k] > 0.0 && kappa[i][k] < 1.0 {
            points.push(boundary[i] + lambda[i][k] * boundary_edges[i]);
        }
    }

    // An element corner is inside the boundary box iff it lies between both
    // pairs of opposing boundary edges. For a parallel pair the edge through
    // the previous corner provides the parametrization instead.
    for k in 0..4 {
        let prev = (k + 3) % 4;
        let between_02 = if !parallel[0][k] {
            kappa[0][k] * kappa[2][k] < 0.0
        } else {
            (1.0 - kappa[0][prev]) * (1.0 - kappa[2][prev]) < 0.0
        };
        let between_13 = if !parallel[1][k] {
            kappa[1][k] * kappa[3][k] < 0.0
        } else {
            (1.0 - kappa[1][prev]) * (1.0 - kappa[3][prev]) < 0.0
        };
        if between_02 && between_13 {
            points.push(element[k]);
        }
    }

    // A boundary corner inside the element polygon is part of the
    // intersection polygon as well.
    for corner in boundary {
        if is_within_quad(element[1], element[2], element[0], element[3], *corner) {
            points.push(*corner);
        }
    }

    points
}

/// Constructs the oriented bounding polygon of an object in clockwise order.
///
/// The box extends from `center - length` to `center` along the local
/// x-axis and `width / 2` to either side, rotated by `rotation` and
/// translated to `(x, y)`.
pub fn bounding_box(
    x: f64,
    y: f64,
    length: f64,
    width: f64,
    rotation: f64,
    center: f64,
) -> [Point2d; 4] {
    let half_width = width / 2.0;
    let corners = [
        Point2d::new(center - length, -half_width),
        Point2d::new(center - length, half_width),
        Point2d::new(center, half_width),
        Point2d::new(center, -half_width),
    ];

    let (sin, cos) = rotation.sin_cos();
    corners.map(|p| Point2d::new(p.x * cos - p.y * sin + x, p.x * sin + p.y * cos + y))
}

/// The coarse axis-aligned envelope of a point set, used for broad-phase
/// spatial index queries.
pub fn search_box(points: &[Point2d]) -> AABB<[f64; 2]> {
    let mut min = [f64::MAX; 2];
    let mut max = [f64::MIN; 2];
    for point in points {
        min[0] = min[0].min(point.x);
        min[1] = min[1].min(point.y);
        max[0] = max[0].max(point.x);
        max[1] = max[1].max(point.y);
    }
    AABB::from_corners(min, max)
}

/// The area of a simple polygon via the shoelace formula.
pub fn polygon_area(points: &[Point2d]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let p1 = points[i];
        let p2 = points[(i + 1) % n];
        sum += p1.x * p2.y - p2.x * p1.y;
    }
    sum.abs() / 2.0
}
