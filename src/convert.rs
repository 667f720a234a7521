use crate::geometry::is_within_quad;
use crate::lane::LaneGeometryElement;
use crate::math::{cross, rot90, wrap_angle, Point2d, Vector2d, EPSILON};
use crate::LaneId;
use cgmath::prelude::*;
use rstar::{RTreeObject, AABB};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A road-relative pose: longitudinal position, lateral offset and heading.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoadPosition {
    /// The longitudinal position along the road in m.
    pub s: f64,
    /// The lateral offset from the lane reference line in m,
    /// positive to the left.
    pub t: f64,
    /// The heading relative to the lane direction in rad.
    pub hdg: f64,
}

/// One lane geometry element prepared for coordinate conversion and spatial
/// indexing.
///
/// The reference axis (the chord between the two joints' reference points),
/// its arc-length scale and the optional t-axis center are precomputed at
/// scenery load; localization touches thousands of these per tick.
#[derive(Clone, Debug)]
pub struct LocalizationElement {
    /// The lane this element belongs to.
    lane: LaneId,
    /// The element corner points in clockwise order:
    /// current right, current left, next left, next right.
    polygon: [Point2d; 4],
    /// The coarse envelope used as the spatial index key.
    search_box: AABB<[f64; 2]>,
    /// The arc-length of the element's first joint in m.
    s_offset: f64,
    /// The reference point of the element's first joint.
    reference: Point2d,
    /// The chord from the first to the second joint's reference point.
    reference_vector: Vector2d,
    /// Arc-length per chord-length; compensates the chord approximation of
    /// curved elements.
    reference_scale: f64,
    /// The common intersection of the two joint cross-sections. Present for
    /// curved elements, where lateral offsets run radially through it.
    t_axis_center: Option<Point2d>,
}

impl LocalizationElement {
    /// Prepares a lane geometry element for localization queries.
    pub fn new(lane: LaneId, element: &LaneGeometryElement) -> Self {
        let current = &element.current;
        let next = &element.next;
        let reference = current.points.reference;
        let reference_vector = next.points.reference - reference;
        let chord_length = reference_vector.magnitude();
        let reference_scale = if chord_length > 0.0 {
            (next.s_offset - current.s_offset) / chord_length
        } else {
            1.0
        };

        Self {
            lane,
            polygon: *element.polygon(),
            search_box: element.search_box(),
            s_offset: current.s_offset,
            reference,
            reference_vector,
            reference_scale,
            t_axis_center: Self::t_axis_center(element),
        }
    }

    /// The intersection of the two joint cross-section lines, if the
    /// cross-sections are not parallel.
    fn t_axis_center(element: &LaneGeometryElement) -> Option<Point2d> {
        let current = &element.current.points;
        let next = &element.next.points;
        let d1 = current.left - current.right;
        let d2 = next.left - next.right;

        let det = cross(d1, d2);
        if det.abs() < EPSILON {
            return None;
        }

        let offset = next.right - current.right;
        let u = cross(offset, d2) / det;
        Some(current.right + d1 * u)
    }

    /// The lane this element belongs to.
    pub fn lane(&self) -> LaneId {
        self.lane
    }

    /// The element corner points in clockwise order.
    pub fn polygon(&self) -> &[Point2d; 4] {
        &self.polygon
    }

    /// Determines whether the point lies within this element, which is the
    /// precondition for a meaningful coordinate conversion.
    pub fn contains(&self, point: Point2d) -> bool {
        is_within_quad(
            self.polygon[1],
            self.polygon[2],
            self.polygon[0],
            self.polygon[3],
            point,
        )
    }
}

impl RTreeObject for LocalizationElement {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.search_box
    }
}

/// Converts world coordinates into road coordinates on one geometry element
/// and back.
pub struct WorldToRoadCoordinateConverter<'a> {
    element: &'a LocalizationElement,
}

impl<'a> WorldToRoadCoordinateConverter<'a> {
    /// Creates a converter for the given element.
    pub fn new(element: &'a LocalizationElement) -> Self {
        Self { element }
    }

    /// Determines whether the point can be converted on this element.
    ///
    /// Road coordinates are only meaningful for points within the element
    /// polygon; callers must check this before trusting [Self::road_coordinate].
    pub fn is_convertible(&self, point: Point2d) -> bool {
        self.element.contains(point)
    }

    /// Converts a world point and heading into road coordinates.
    pub fn road_coordinate(&self, point: Point2d, hdg: f64) -> RoadPosition {
        RoadPosition {
            s: self.s(point),
            t: self.t(point),
            hdg: self.yaw(hdg),
        }
    }

    /// The longitudinal road position of the point in m.
    pub fn s(&self, point: Point2d) -> f64 {
        let element = self.element;
        let intersection = self.intersection_point(point);
        let offset = intersection - element.reference;
        let direction = if offset.dot(element.reference_vector) >= 0.0 {
            1.0
        } else {
            -1.0
        };
        element.s_offset + direction * offset.magnitude() * element.reference_scale
    }

    /// The signed lateral distance of the point from the reference axis in m,
    /// positive to the left.
    pub fn t(&self, point: Point2d) -> f64 {
        let intersection = self.intersection_point(point);
        let offset = point - intersection;
        let side = if offset.dot(self.left_normal()) >= 0.0 {
            1.0
        } else {
            -1.0
        };
        side * offset.magnitude()
    }

    /// The heading of an object relative to the local lane heading,
    /// normalized into (-pi, pi].
    pub fn yaw(&self, hdg: f64) -> f64 {
        let axis = self.element.reference_vector;
        wrap_angle(hdg - axis.y.atan2(axis.x))
    }

    /// Reconstructs the world point at the given road coordinates on this
    /// element's axis.
    pub fn world_coordinate(&self, s: f64, t: f64) -> Point2d {
        let element = self.element;
        let axis = element.reference_vector.normalize();
        let on_axis = element.reference + axis * ((s - element.s_offset) / element.reference_scale);

        let lateral = match element.t_axis_center {
            Some(center) => {
                let radial = (on_axis - center).normalize();
                if radial.dot(self.left_normal()) >= 0.0 {
                    radial
                } else {
                    -radial
                }
            }
            None => self.left_normal(),
        };
        on_axis + lateral * t
    }

    /// The foot point of the conversion: for curved elements the intersection
    /// of the ray from the t-axis center through the point with the reference
    /// axis, for straight elements the orthogonal projection onto it.
    fn intersection_point(&self, point: Point2d) -> Point2d {
        let element = self.element;
        let reference_vector = element.reference_vector;

        if let Some(center) = element.t_axis_center {
            let ray = point - center;
            let det = cross(reference_vector, ray);
            if det.abs() >= EPSILON {
                let lambda = cross(center - element.reference, ray) / det;
                return element.reference + reference_vector * lambda;
            }
            // Ray parallel to the axis; fall through to the projection.
        }

        let projection =
            reference_vector.dot(point - element.reference) / reference_vector.magnitude2();
        element.reference + reference_vector * projection
    }

    /// Unit vector pointing to the left of the reference axis.
    fn left_normal(&self) -> Vector2d {
        rot90(self.element.reference_vector).normalize()
    }
}
