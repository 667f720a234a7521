use crate::geometry::{self, is_within_quad};
use crate::math::Point2d;
use crate::{LaneId, ObjectId, SectionId};
use cgmath::prelude::*;
use rstar::AABB;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The left, reference and right boundary points of a lane cross-section.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointPoints {
    pub left: Point2d,
    pub reference: Point2d,
    pub right: Point2d,
}

impl JointPoints {
    /// Linearly interpolates between two cross-sections.
    fn lerp(&self, other: &JointPoints, factor: f64) -> JointPoints {
        let lerp = |a: Point2d, b: Point2d| a + (b - a) * factor;
        JointPoints {
            left: lerp(self.left, other.left),
            reference: lerp(self.reference, other.reference),
            right: lerp(self.right, other.right),
        }
    }
}

/// A cross-section of the lane geometry at a given arc-length.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneGeometryJoint {
    /// The boundary points of the cross-section.
    pub points: JointPoints,
    /// The lane curvature at this cross-section in 1/m.
    pub curvature: f64,
    /// The heading of the lane at this cross-section in rad.
    pub s_hdg: f64,
    /// The arc-length at which this cross-section is placed, in m.
    pub s_offset: f64,
}

/// The quadrilateral strip between two consecutive geometry joints.
///
/// The corner polygon and its axis-aligned envelope are precomputed once at
/// construction; they are queried for every candidate element of every
/// localization call.
#[derive(Clone, Debug)]
pub struct LaneGeometryElement {
    /// The joint at the lower arc-length end of the strip.
    pub current: LaneGeometryJoint,
    /// The joint at the upper arc-length end of the strip.
    pub next: LaneGeometryJoint,
    /// Corner points in clockwise order:
    /// current right, current left, next left, next right.
    polygon: [Point2d; 4],
    /// The coarse envelope used as the spatial index key.
    search_box: AABB<[f64; 2]>,
}

impl LaneGeometryElement {
    pub(crate) fn new(current: LaneGeometryJoint, next: LaneGeometryJoint) -> Self {
        let polygon = [
            current.points.right,
            current.points.left,
            next.points.left,
            next.points.right,
        ];
        let search_box = geometry::search_box(&polygon);
        Self {
            current,
            next,
            polygon,
            search_box,
        }
    }

    /// The corner points of the element in clockwise order.
    pub fn polygon(&self) -> &[Point2d; 4] {
        &self.polygon
    }

    /// The axis-aligned envelope of the element.
    pub fn search_box(&self) -> AABB<[f64; 2]> {
        self.search_box
    }

    /// Determines whether the point lies within (or exactly on the boundary
    /// of) this element.
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

/// The OpenDRIVE type of a lane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LaneType {
    #[default]
    Undefined,
    Driving,
    Stop,
    Shoulder,
    Biking,
    Sidewalk,
    Border,
    Restricted,
    Parking,
    Median,
    Entry,
    Exit,
    OffRamp,
    OnRamp,
}

/// Reference points for distance queries along a road.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasurementPoint {
    RoadStart,
    RoadEnd,
}

/// The intersection of an object with a lane: the longitudinal extent of the
/// overlap and the smallest lateral distance to either lane edge seen across
/// all intersection vertices.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneOverlap {
    pub s_min: f64,
    pub s_max: f64,
    pub min_delta_left: f64,
    pub min_delta_right: f64,
}

impl Default for LaneOverlap {
    fn default() -> Self {
        Self {
            s_min: f64::MAX,
            s_max: 0.0,
            min_delta_left: f64::MAX,
            min_delta_right: f64::MAX,
        }
    }
}

impl LaneOverlap {
    /// Grows the overlap by one intersection vertex at arc-length `s` with
    /// lateral offset `t`, on a lane of the given width.
    ///
    /// The lateral remainders track the minimum distance to the constraining
    /// lane edge; negative candidates are clamped to zero.
    pub(crate) fn grow(&mut self, s: f64, t: f64, width: f64) {
        self.s_min = self.s_min.min(s);
        self.s_max = self.s_max.max(s);
        self.min_delta_left = self.min_delta_left.min((width / 2.0 - t).max(0.0));
        self.min_delta_right = self.min_delta_right.min((width / 2.0 + t).max(0.0));
    }
}

/// The attributes of a lane.
#[derive(Clone, Copy, Debug)]
pub struct LaneAttributes {
    /// The OpenDRIVE lane id within its section.
    pub od_id: i64,
    /// The OpenDRIVE lane type.
    pub lane_type: LaneType,
}

/// A single lane of a road section.
///
/// Carries the discretized strip geometry, the adjacency within the road
/// network, and the set of world objects currently assigned to it. Occupancy
/// is refreshed every simulation tick by the localizer.
#[derive(Clone, Debug)]
pub struct Lane {
    /// The lane ID.
    id: LaneId,
    /// The OpenDRIVE lane id.
    od_id: i64,
    /// The OpenDRIVE lane type.
    lane_type: LaneType,
    /// The section this lane belongs to.
    section: SectionId,
    /// The adjacent lane to the left, if any.
    left: Option<LaneId>,
    /// The adjacent lane to the right, if any.
    right: Option<LaneId>,
    /// The lanes this lane continues from.
    predecessors: Vec<LaneId>,
    /// The lanes this lane continues into.
    successors: Vec<LaneId>,
    /// The ids of the lane boundaries on the left side, innermost first.
    left_boundaries: Vec<u64>,
    /// The ids of the lane boundaries on the right side, innermost first.
    right_boundaries: Vec<u64>,
    /// The geometry cross-sections, ordered by strictly increasing arc-length.
    joints: Vec<LaneGeometryJoint>,
    /// The geometry strips between consecutive joints.
    elements: Vec<LaneGeometryElement>,
    /// The arc-length covered by the joints in m.
    length: f64,
    /// Moving objects currently on the lane, ordered by overlap start.
    moving: Vec<(ObjectId, LaneOverlap)>,
    /// Stationary objects currently on the lane, ordered by overlap start.
    stationary: Vec<(ObjectId, LaneOverlap)>,
    /// All objects currently on the lane, ordered by overlap start.
    objects: Vec<(ObjectId, LaneOverlap)>,
}

impl Lane {
    /// Creates a new lane.
    pub(crate) fn new(id: LaneId, section: SectionId, attribs: &LaneAttributes) -> Self {
        Self {
            id,
            od_id: attribs.od_id,
            lane_type: attribs.lane_type,
            section,
            left: None,
            right: None,
            predecessors: vec![],
            successors: vec![],
            left_boundaries: vec![],
            right_boundaries: vec![],
            joints: vec![],
            elements: vec![],
            length: 0.0,
            moving: vec![],
            stationary: vec![],
            objects: vec![],
        }
    }

    /// Gets the lane's ID.
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Gets the OpenDRIVE lane id.
    pub fn od_id(&self) -> i64 {
        self.od_id
    }

    /// Gets the OpenDRIVE lane type.
    pub fn lane_type(&self) -> LaneType {
        self.lane_type
    }

    /// Gets the section this lane belongs to.
    pub fn section(&self) -> SectionId {
        self.section
    }

    /// Gets the adjacent lane to the left, if any.
    pub fn left_lane(&self) -> Option<LaneId> {
        self.left
    }

    /// Gets the adjacent lane to the right, if any.
    pub fn right_lane(&self) -> Option<LaneId> {
        self.right
    }

    /// Gets the lanes this lane continues from.
    pub fn predecessors(&self) -> &[LaneId] {
        &self.predecessors
    }

    /// Gets the lanes this lane continues into.
    pub fn successors(&self) -> &[LaneId] {
        &self.successors
    }

    /// Gets the ids of the lane boundaries on the left side.
    pub fn left_boundaries(&self) -> &[u64] {
        &self.left_boundaries
    }

    /// Gets the ids of the lane boundaries on the right side.
    pub fn right_boundaries(&self) -> &[u64] {
        &self.right_boundaries
    }

    /// The arc-length covered by the lane geometry in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Gets the geometry cross-sections in arc-length order.
    pub fn joints(&self) -> &[LaneGeometryJoint] {
        &self.joints
    }

    /// Gets the geometry strips in arc-length order.
    pub fn elements(&self) -> &[LaneGeometryElement] {
        &self.elements
    }

    pub(crate) fn set_left_lane(&mut self, lane: LaneId) {
        self.left = Some(lane);
    }

    pub(crate) fn set_right_lane(&mut self, lane: LaneId) {
        self.right = Some(lane);
    }

    pub(crate) fn add_predecessor(&mut self, lane: LaneId) {
        self.predecessors.push(lane);
    }

    pub(crate) fn add_successor(&mut self, lane: LaneId) {
        self.successors.push(lane);
    }

    pub(crate) fn add_left_boundary(&mut self, boundary: u64) {
        self.left_boundaries.push(boundary);
    }

    pub(crate) fn add_right_boundary(&mut self, boundary: u64) {
        self.right_boundaries.push(boundary);
    }

    /// Appends a geometry joint at the given arc-length and constructs the
    /// geometry element spanning from the previous joint.
    ///
    /// Joints must be added in strictly increasing arc-length order; a joint
    /// whose `s_offset` does not exceed the previous one is silently ignored
    /// so that zero-length geometry elements can never be formed.
    pub(crate) fn add_geometry_joint(
        &mut self,
        points: JointPoints,
        s_offset: f64,
        curvature: f64,
        heading: f64,
    ) {
        let joint = LaneGeometryJoint {
            points,
            curvature,
            s_hdg: heading,
            s_offset,
        };

        let previous = match self.joints.last() {
            Some(previous) => previous,
            None => {
                self.joints.push(joint);
                return;
            }
        };

        if previous.s_offset >= s_offset {
            return;
        }

        self.length = s_offset - self.joints[0].s_offset;
        self.elements.push(LaneGeometryElement::new(*previous, joint));
        self.joints.push(joint);
    }

    /// Locates the two joints bracketing the given arc-length: the first
    /// joint beyond `distance` and its immediate predecessor.
    pub(crate) fn neighbouring_joints(
        &self,
        distance: f64,
    ) -> (Option<&LaneGeometryJoint>, Option<&LaneGeometryJoint>) {
        match self.joints.iter().position(|j| j.s_offset > distance) {
            Some(0) => (None, Some(&self.joints[0])),
            Some(idx) => (Some(&self.joints[idx - 1]), Some(&self.joints[idx])),
            // Past the last joint nothing brackets the distance; the last
            // joint itself still answers queries at exactly its offset.
            None => (self.joints.last().filter(|j| distance <= j.s_offset), None),
        }
    }

    /// The lane width at the given arc-length in m, linearly interpolated
    /// between the bracketing joints. Falls back to 0.0 beyond the geometry.
    pub fn width_at(&self, distance: f64) -> f64 {
        let width = |j: &LaneGeometryJoint| (j.points.left - j.points.right).magnitude();
        match self.neighbouring_joints(distance) {
            (None, None) => 0.0,
            (Some(prev), None) => width(prev),
            (None, Some(_)) => 0.0,
            (Some(prev), Some(next)) => {
                let factor = (distance - prev.s_offset) / (next.s_offset - prev.s_offset);
                (1.0 - factor) * width(prev) + factor * width(next)
            }
        }
    }

    /// The lane curvature at the given arc-length in 1/m, linearly
    /// interpolated between the bracketing joints.
    pub fn curvature_at(&self, distance: f64) -> f64 {
        match self.neighbouring_joints(distance) {
            (None, None) => 0.0,
            (Some(prev), None) => prev.curvature,
            (None, Some(_)) => 0.0,
            (Some(prev), Some(next)) => {
                let factor = (distance - prev.s_offset) / (next.s_offset - prev.s_offset);
                (1.0 - factor) * prev.curvature + factor * next.curvature
            }
        }
    }

    /// The lane heading at the given arc-length in rad, linearly
    /// interpolated between the bracketing joints.
    pub fn direction_at(&self, distance: f64) -> f64 {
        match self.neighbouring_joints(distance) {
            (None, None) => 0.0,
            (Some(prev), None) => prev.s_hdg,
            (None, Some(_)) => 0.0,
            (Some(prev), Some(next)) => {
                let factor = (distance - prev.s_offset) / (next.s_offset - prev.s_offset);
                (1.0 - factor) * prev.s_hdg + factor * next.s_hdg
            }
        }
    }

    /// The interpolated boundary points at the given arc-length.
    pub fn interpolated_points_at(&self, distance: f64) -> Option<JointPoints> {
        match self.neighbouring_joints(distance) {
            (None, None) => None,
            (Some(prev), None) => Some(prev.points),
            (None, Some(next)) => Some(next.points),
            (Some(prev), Some(next)) => {
                let factor = (distance - prev.s_offset) / (next.s_offset - prev.s_offset);
                Some(prev.points.lerp(&next.points, factor))
            }
        }
    }

    /// The arc-length at which the lane geometry starts or ends on its road.
    ///
    /// # Panics
    /// Panics if the lane has no geometry elements; such a lane indicates a
    /// corrupt imported network and cannot be queried.
    pub fn distance(&self, point: MeasurementPoint) -> f64 {
        if self.elements.is_empty() {
            panic!(
                "lane {} has no geometry elements; the imported network is malformed",
                self.od_id
            );
        }
        match point {
            MeasurementPoint::RoadStart => self.elements[0].current.s_offset,
            MeasurementPoint::RoadEnd => self.elements[self.elements.len() - 1].next.s_offset,
        }
    }

    /// Determines whether the lane geometry covers the given arc-length.
    ///
    /// The upper bound is inclusive only for a lane without successors, so
    /// that consecutive lanes partition the s-axis without double-counting
    /// their shared seam.
    pub fn covers(&self, distance: f64) -> bool {
        if self.distance(MeasurementPoint::RoadStart) > distance {
            return false;
        }
        let end = self.distance(MeasurementPoint::RoadEnd);
        if self.successors.is_empty() {
            distance <= end
        } else {
            distance < end
        }
    }

    /// Assigns a moving object to this lane for the current tick.
    pub(crate) fn add_moving_object(&mut self, object: ObjectId, overlap: LaneOverlap) {
        Self::insert_by_overlap(&mut self.moving, object, overlap);
        Self::insert_by_overlap(&mut self.objects, object, overlap);
    }

    /// Assigns a stationary object to this lane for the current tick.
    pub(crate) fn add_stationary_object(&mut self, object: ObjectId, overlap: LaneOverlap) {
        Self::insert_by_overlap(&mut self.stationary, object, overlap);
        Self::insert_by_overlap(&mut self.objects, object, overlap);
    }

    /// Inserts an assignment keeping the list ordered by ascending overlap
    /// start; ties keep their insertion order.
    fn insert_by_overlap(
        list: &mut Vec<(ObjectId, LaneOverlap)>,
        object: ObjectId,
        overlap: LaneOverlap,
    ) {
        let idx = list
            .iter()
            .position(|(_, o)| o.s_min > overlap.s_min)
            .unwrap_or(list.len());
        list.insert(idx, (object, overlap));
    }

    /// Removes a single object's assignment from the lane.
    pub(crate) fn remove_object(&mut self, object: ObjectId) {
        self.moving.retain(|(id, _)| *id != object);
        self.stationary.retain(|(id, _)| *id != object);
        self.objects.retain(|(id, _)| *id != object);
    }

    /// Removes all object assignments from the lane.
    pub(crate) fn clear_assignments(&mut self) {
        self.moving.clear();
        self.stationary.clear();
        self.objects.clear();
    }

    /// The moving objects on this lane, ordered by ascending overlap start.
    pub fn moving_objects(&self) -> &[(ObjectId, LaneOverlap)] {
        &self.moving
    }

    /// The stationary objects on this lane, ordered by ascending overlap start.
    pub fn stationary_objects(&self) -> &[(ObjectId, LaneOverlap)] {
        &self.stationary
    }

    /// All objects on this lane, ordered by ascending overlap start.
    pub fn world_objects(&self) -> &[(ObjectId, LaneOverlap)] {
        &self.objects
    }

    /// All objects on this lane in downstream order (ascending overlap start).
    pub fn objects_downstream(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.iter().map(|(id, _)| *id)
    }

    /// All objects on this lane in upstream order (descending overlap start).
    pub fn objects_upstream(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.iter().rev().map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use slotmap::{Key, KeyData};

    fn straight_lane(joints: &[(f64, f64)]) -> Lane {
        // joints are (s_offset, width) pairs along the x-axis
        let mut lane = Lane::new(
            LaneId::null(),
            SectionId::null(),
            &LaneAttributes {
                od_id: -1,
                lane_type: LaneType::Driving,
            },
        );
        for (s, width) in joints {
            lane.add_geometry_joint(
                JointPoints {
                    left: Point2d::new(*s, width / 2.0),
                    reference: Point2d::new(*s, 0.0),
                    right: Point2d::new(*s, -width / 2.0),
                },
                *s,
                0.0,
                0.0,
            );
        }
        lane
    }

    #[test]
    fn width_is_interpolated_between_joints() {
        let lane = straight_lane(&[(0.0, 4.0), (100.0, 4.0)]);
        assert_approx_eq!(lane.width_at(50.0), 4.0);
        assert_approx_eq!(lane.direction_at(50.0), 0.0);

        let lane = straight_lane(&[(0.0, 2.0), (100.0, 4.0)]);
        assert_approx_eq!(lane.width_at(50.0), 3.0);
        assert_approx_eq!(lane.width_at(0.0), 2.0);
        assert_approx_eq!(lane.width_at(100.0), 4.0);
    }

    #[test]
    fn boundary_points_are_interpolated() {
        let lane = straight_lane(&[(0.0, 2.0), (100.0, 4.0)]);
        let points = lane.interpolated_points_at(50.0).unwrap();
        assert_approx_eq!(points.left.y, 1.5);
        assert_approx_eq!(points.right.y, -1.5);
        assert_approx_eq!(points.reference.x, 50.0);
        assert!(lane.interpolated_points_at(100.1).is_none());
    }

    #[test]
    fn width_beyond_last_joint_falls_back_to_zero() {
        let lane = straight_lane(&[(0.0, 4.0), (100.0, 4.0)]);
        assert_approx_eq!(lane.width_at(100.0), 4.0);
        assert_approx_eq!(lane.width_at(100.1), 0.0);
        assert_approx_eq!(lane.curvature_at(101.0), 0.0);
    }

    #[test]
    fn non_increasing_joints_are_rejected() {
        let mut lane = straight_lane(&[(0.0, 4.0), (10.0, 4.0)]);
        assert_eq!(lane.joints().len(), 2);
        assert_eq!(lane.elements().len(), 1);

        lane.add_geometry_joint(
            JointPoints {
                left: Point2d::new(10.0, 2.0),
                reference: Point2d::new(10.0, 0.0),
                right: Point2d::new(10.0, -2.0),
            },
            10.0,
            0.0,
            0.0,
        );
        assert_eq!(lane.joints().len(), 2);
        assert_eq!(lane.elements().len(), 1);
        assert_approx_eq!(lane.length(), 10.0);
    }

    #[test]
    fn covers_is_end_inclusive_without_successor() {
        let mut lane = straight_lane(&[(0.0, 4.0), (100.0, 4.0)]);
        assert!(lane.covers(0.0));
        assert!(lane.covers(99.9));
        assert!(lane.covers(100.0));
        assert!(!lane.covers(100.1));
        assert!(!lane.covers(-0.1));

        lane.add_successor(LaneId::null());
        assert!(!lane.covers(100.0));
        assert!(lane.covers(99.9));
    }

    #[test]
    #[should_panic(expected = "no geometry elements")]
    fn distance_on_empty_lane_panics() {
        let lane = straight_lane(&[]);
        lane.distance(MeasurementPoint::RoadStart);
    }

    #[test]
    fn assignments_are_ordered_by_overlap_start() {
        let mut lane = straight_lane(&[(0.0, 4.0), (100.0, 4.0)]);
        let overlap = |s_min: f64| LaneOverlap {
            s_min,
            s_max: s_min + 5.0,
            min_delta_left: 0.0,
            min_delta_right: 0.0,
        };

        let a = ObjectId::from(KeyData::from_ffi(1));
        let b = ObjectId::from(KeyData::from_ffi(2));
        let c = ObjectId::from(KeyData::from_ffi(3));
        lane.add_moving_object(a, overlap(50.0));
        lane.add_moving_object(b, overlap(10.0));
        lane.add_stationary_object(c, overlap(30.0));

        let downstream: Vec<_> = lane.objects_downstream().collect();
        assert_eq!(downstream, vec![b, c, a]);
        let upstream: Vec<_> = lane.objects_upstream().collect();
        assert_eq!(upstream, vec![a, c, b]);
        assert_eq!(lane.moving_objects().len(), 2);
        assert_eq!(lane.stationary_objects().len(), 1);

        lane.clear_assignments();
        assert!(lane.world_objects().is_empty());
    }
}
