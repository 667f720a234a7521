use super::{Point2d, Vector2d, EPSILON};
use cgmath::prelude::*;
use std::f64::consts::PI;

/// Projects a point onto a local coordinate system.
///
/// # Parameters
/// * `point` - The point to project
/// * `origin` - The origin of the coordinate system
/// * `x_axis` - The basis vector pointing in the positive x-axis.
/// * `y_axis` - The basis vector pointing in the positive y-axis.
pub fn project_local(
    point: Point2d,
    origin: Point2d,
    x_axis: Vector2d,
    y_axis: Vector2d,
) -> Point2d {
    let point = point - origin;
    Point2d::new(point.dot(x_axis), point.dot(y_axis))
}

/// Rotates a vector 90 degrees clockwise.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}

/// The 2D cross product, positive if `b` points to the left of `a`.
pub fn cross(a: Vector2d, b: Vector2d) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Converts an angle in radians to degrees.
pub fn radian_to_degree(radian: f64) -> f64 {
    radian * 180.0 / PI
}

/// Converts an angle in degrees to radians.
pub fn degree_to_radian(degree: f64) -> f64 {
    degree / 180.0 * PI
}

/// Normalizes an angle into the range (-pi, pi].
pub fn wrap_angle(angle: f64) -> f64 {
    PI - (PI - angle).rem_euclid(2.0 * PI)
}

/// Compares two values for equality within the geometric [EPSILON].
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn wrap_angle_shifts_into_valid_range() {
        assert_approx_eq!(wrap_angle(3.0 * PI), PI);
        assert_approx_eq!(wrap_angle(-PI), PI);
        assert_approx_eq!(wrap_angle(0.5), 0.5);
        assert_approx_eq!(wrap_angle(-0.5), -0.5);
        assert_approx_eq!(wrap_angle(2.0 * PI), 0.0);
    }

    #[test]
    fn degree_conversion_round_trips() {
        assert_approx_eq!(radian_to_degree(PI), 180.0);
        assert_approx_eq!(degree_to_radian(radian_to_degree(1.234)), 1.234);
    }

    #[test]
    fn local_projection_uses_the_given_axes() {
        let origin = Point2d::new(1.0, 1.0);
        let x_axis = Vector2d::new(0.0, 1.0);
        let y_axis = Vector2d::new(-1.0, 0.0);
        let projected = project_local(Point2d::new(1.0, 3.0), origin, x_axis, y_axis);
        assert_approx_eq!(projected.x, 2.0);
        assert_approx_eq!(projected.y, 0.0);
    }

    #[test]
    fn cross_is_positive_for_left_turns() {
        assert_approx_eq!(cross(Vector2d::new(1.0, 0.0), Vector2d::new(0.0, 1.0)), 1.0);
        assert_approx_eq!(cross(Vector2d::new(1.0, 0.0), Vector2d::new(0.0, -1.0)), -1.0);
        assert!(approx_eq(cross(Vector2d::new(1.0, 0.0), Vector2d::new(2.0, 0.0)), 0.0));
    }
}
