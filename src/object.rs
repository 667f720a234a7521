use crate::geometry;
use crate::math::Point2d;
use crate::{LaneId, ObjectId};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kind of a world object.
///
/// Moving objects carry the offset of their leading edge, which places the
/// main lane locator ahead of the reference point; a stationary object is
/// located by its reference point alone.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ObjectKind {
    Moving {
        /// Distance from the reference point to the leading edge in m.
        distance_ref_to_leading_edge: f64,
    },
    Stationary,
}

/// The attributes of a world object.
#[derive(Clone, Copy, Debug)]
pub struct WorldObjectAttributes {
    /// The object length in m.
    pub length: f64,
    /// The object width in m.
    pub width: f64,
    /// The world position of the reference point.
    pub position: Point2d,
    /// The heading in rad.
    pub yaw: f64,
    /// Whether the object moves or is stationary.
    pub kind: ObjectKind,
}

/// An object in the world that can be localized onto lanes: a vehicle, a
/// pedestrian or a static obstacle.
///
/// The object is owned by the world's object arena; lanes refer to it by its
/// id only.
#[derive(Clone, Debug)]
pub struct WorldObject {
    /// The object's ID.
    id: ObjectId,
    /// The object length in m.
    length: f64,
    /// The object width in m.
    width: f64,
    /// The world position of the reference point.
    position: Point2d,
    /// The heading in rad.
    yaw: f64,
    /// Whether the object moves or is stationary.
    kind: ObjectKind,
    /// The lanes the object is currently assigned to.
    assigned_lanes: Vec<LaneId>,
}

impl WorldObject {
    /// Creates a new world object.
    pub(crate) fn new(id: ObjectId, attribs: &WorldObjectAttributes) -> Self {
        Self {
            id,
            length: attribs.length,
            width: attribs.width,
            position: attribs.position,
            yaw: attribs.yaw,
            kind: attribs.kind,
            assigned_lanes: vec![],
        }
    }

    /// Gets the object's ID.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The object length in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The object width in m.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// The world position of the object's reference point.
    pub fn position(&self) -> Point2d {
        self.position
    }

    /// The heading of the object in rad.
    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    /// The kind of the object.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Whether this is a moving object.
    pub fn is_moving(&self) -> bool {
        matches!(self.kind, ObjectKind::Moving { .. })
    }

    /// Updates the object's pose. Called by the dynamics layer before the
    /// object is localized again.
    pub fn set_pose(&mut self, position: Point2d, yaw: f64) {
        self.position = position;
        self.yaw = yaw;
    }

    /// The world point of the main lane locator: the leading edge projected
    /// along the current heading for moving objects, the reference point
    /// itself for stationary objects.
    pub fn main_lane_locator(&self) -> Point2d {
        match self.kind {
            ObjectKind::Moving {
                distance_ref_to_leading_edge,
            } => {
                let (sin, cos) = self.yaw.sin_cos();
                self.position + cgmath::Vector2::new(cos, sin) * distance_ref_to_leading_edge
            }
            ObjectKind::Stationary => self.position,
        }
    }

    /// The object's oriented bounding polygon in clockwise order.
    pub fn bounding_polygon(&self) -> [Point2d; 4] {
        let front = match self.kind {
            ObjectKind::Moving {
                distance_ref_to_leading_edge,
            } => distance_ref_to_leading_edge,
            ObjectKind::Stationary => self.length / 2.0,
        };
        geometry::bounding_box(
            self.position.x,
            self.position.y,
            self.length,
            self.width,
            self.yaw,
            front,
        )
    }

    /// Records an assignment to a lane for the current tick.
    pub(crate) fn add_lane_assignment(&mut self, lane: LaneId) {
        self.assigned_lanes.push(lane);
    }

    /// Removes all lane assignments.
    pub(crate) fn clear_lane_assignments(&mut self) {
        self.assigned_lanes.clear();
    }

    /// The lanes the object was assigned to by the last localization.
    pub fn lane_assignments(&self) -> &[LaneId] {
        &self.assigned_lanes
    }
}
