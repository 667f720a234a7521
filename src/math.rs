//! Mathematical structs and functions.

use cgmath::{Point2, Vector2};
pub use util::*;

mod util;

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;

/// Values smaller than this are treated as zero in geometric calculations.
pub const EPSILON: f64 = 1e-3;
