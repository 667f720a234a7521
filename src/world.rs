use crate::graph::Route;
use crate::lane::{JointPoints, LaneAttributes};
use crate::localizer::{create_lane_assignments, Localizer, Location};
use crate::math::Point2d;
use crate::object::{WorldObject, WorldObjectAttributes};
use crate::road::{Road, RoadAttributes, Section};
use crate::{
    GlobalRoadPosition, Lane, LaneId, LaneSet, ObjectId, ObjectSet, RoadId, RoadSet, SectionId,
    SectionSet,
};
use log::debug;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// The world model: the road network with its lane geometry, the world
/// objects moving through it, and the localization engine binding the two.
///
/// The network is populated once by the scenery import, then frozen by
/// [World::finalize]; objects are (un)located once per tick from a single
/// thread.
#[derive(Default)]
pub struct World {
    /// The roads in the network.
    roads: RoadSet,
    /// The sections in the network.
    sections: SectionSet,
    /// The lanes in the network.
    lanes: LaneSet,
    /// The objects in the world.
    objects: ObjectSet,
    /// Lookup from OpenDRIVE road id to road key; bijective with the roads'
    /// own od ids.
    road_ids: HashMap<String, RoadId>,
    /// The localization engine.
    localizer: Localizer,
}

impl World {
    /// Creates an empty world.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a road to the network.
    ///
    /// # Panics
    /// Panics if a road with the same OpenDRIVE id already exists; road ids
    /// must be unique within a loaded scenery.
    pub fn add_road(&mut self, attribs: &RoadAttributes) -> RoadId {
        let road = self.roads.insert_with_key(|id| Road::new(id, attribs));
        let previous = self.road_ids.insert(attribs.od_id.clone(), road);
        assert!(
            previous.is_none(),
            "duplicate road id {} in imported network",
            attribs.od_id
        );
        road
    }

    /// Adds a section to a road, starting at the given arc-length.
    pub fn add_section(&mut self, road: RoadId, s_offset: f64) -> SectionId {
        let section = self
            .sections
            .insert_with_key(|id| Section::new(id, road, s_offset));
        self.roads[road].add_section(section);
        section
    }

    /// Adds a lane to a section.
    pub fn add_lane(&mut self, section: SectionId, attribs: &LaneAttributes) -> LaneId {
        let lane = self
            .lanes
            .insert_with_key(|id| Lane::new(id, section, attribs));
        self.sections[section].add_lane(lane);
        lane
    }

    /// Appends a geometry joint to a lane. Joints must arrive in strictly
    /// increasing arc-length order; a non-increasing joint is ignored.
    pub fn add_lane_joint(
        &mut self,
        lane: LaneId,
        points: JointPoints,
        s_offset: f64,
        curvature: f64,
        heading: f64,
    ) {
        self.lanes[lane].add_geometry_joint(points, s_offset, curvature, heading);
    }

    /// Declares `left` and `right` as laterally adjacent lanes,
    /// `left` being the left neighbour of `right`.
    pub fn set_adjacent_lanes(&mut self, left: LaneId, right: LaneId) {
        self.lanes[right].set_left_lane(left);
        self.lanes[left].set_right_lane(right);
    }

    /// Declares that `from` continues into `to`.
    pub fn add_lane_pairing(&mut self, from: LaneId, to: LaneId) {
        self.lanes[from].add_successor(to);
        self.lanes[to].add_predecessor(from);
    }

    /// Adds a lane boundary id to the left side of a lane.
    pub fn add_left_lane_boundary(&mut self, lane: LaneId, boundary: u64) {
        self.lanes[lane].add_left_boundary(boundary);
    }

    /// Adds a lane boundary id to the right side of a lane.
    pub fn add_right_lane_boundary(&mut self, lane: LaneId, boundary: u64) {
        self.lanes[lane].add_right_boundary(boundary);
    }

    /// Declares that `from` continues into `to`.
    pub fn connect_sections(&mut self, from: SectionId, to: SectionId) {
        self.sections[from].add_next(to);
        self.sections[to].add_previous(from);
    }

    /// Sets the predecessor road of a road by OpenDRIVE id.
    pub fn set_road_predecessor(&mut self, road: RoadId, predecessor: &str) {
        self.roads[road].set_predecessor(predecessor.to_string());
    }

    /// Sets the successor road of a road by OpenDRIVE id.
    pub fn set_road_successor(&mut self, road: RoadId, successor: &str) {
        self.roads[road].set_successor(successor.to_string());
    }

    /// Freezes the network and builds the localization index.
    ///
    /// Must be called after the network is fully populated and before the
    /// first [World::locate] call. May be called again after the network
    /// changed, which rebuilds the index.
    pub fn finalize(&mut self) {
        self.localizer.init(&self.lanes);
        debug!(
            "world finalized: {} roads, {} sections, {} lanes",
            self.roads.len(),
            self.sections.len(),
            self.lanes.len()
        );
    }

    /// Adds an object to the world.
    pub fn add_object(&mut self, attribs: &WorldObjectAttributes) -> ObjectId {
        self.objects
            .insert_with_key(|id| WorldObject::new(id, attribs))
    }

    /// Removes an object from the world and from all lanes it occupies.
    pub fn remove_object(&mut self, id: ObjectId) {
        self.unlocate(id);
        self.objects.remove(id);
    }

    /// Updates an object's pose. Called by the dynamics layer between ticks.
    pub fn set_object_pose(&mut self, id: ObjectId, position: Point2d, yaw: f64) {
        self.objects[id].set_pose(position, yaw);
    }

    /// Localizes an object onto the road network and assigns it to the lanes
    /// it overlaps.
    ///
    /// Finding no overlap at all is an expected outcome and produces an
    /// invalid [Location] with empty collections.
    pub fn locate(&mut self, id: ObjectId, route: &Route) -> Location {
        let object = &self.objects[id];
        let bounding_polygon = object.bounding_polygon();
        let (location, overlaps) = self.localizer.locate(
            &bounding_polygon,
            object,
            route,
            &self.lanes,
            &self.sections,
            &self.roads,
        );
        create_lane_assignments(&mut self.objects[id], &overlaps, &mut self.lanes);
        location
    }

    /// Removes an object's lane assignments, from the object and from the
    /// lanes' occupancy lists. Called before each tick's fresh [World::locate].
    pub fn unlocate(&mut self, id: ObjectId) {
        let object = match self.objects.get_mut(id) {
            Some(object) => object,
            None => return,
        };
        for lane in object.lane_assignments() {
            self.lanes[*lane].remove_object(id);
        }
        object.clear_lane_assignments();
    }

    /// Removes every lane assignment of every object at once, in preparation
    /// for a new tick's localization pass.
    pub fn clear_all_assignments(&mut self) {
        for lane in self.lanes.values_mut() {
            lane.clear_assignments();
        }
        for object in self.objects.values_mut() {
            object.clear_lane_assignments();
        }
    }

    /// Localizes a single world point onto all roads covering it.
    pub fn locate_point(&self, point: Point2d, hdg: f64) -> BTreeMap<String, GlobalRoadPosition> {
        self.localizer
            .locate_point(point, hdg, &self.lanes, &self.sections, &self.roads)
    }

    /// Gets a reference to the road with the given ID.
    pub fn get_road(&self, id: RoadId) -> &Road {
        &self.roads[id]
    }

    /// Gets a reference to the section with the given ID.
    pub fn get_section(&self, id: SectionId) -> &Section {
        &self.sections[id]
    }

    /// Gets a reference to the lane with the given ID.
    pub fn get_lane(&self, id: LaneId) -> &Lane {
        &self.lanes[id]
    }

    /// Gets a reference to the object with the given ID.
    pub fn get_object(&self, id: ObjectId) -> &WorldObject {
        &self.objects[id]
    }

    /// Looks up a road by its OpenDRIVE id.
    pub fn road_by_od_id(&self, od_id: &str) -> Option<&Road> {
        self.road_ids.get(od_id).map(|id| &self.roads[*id])
    }

    /// The arena of lanes in the network.
    pub fn lanes(&self) -> &LaneSet {
        &self.lanes
    }

    /// The arena of sections in the network.
    pub fn sections(&self) -> &SectionSet {
        &self.sections
    }

    /// The arena of roads in the network.
    pub fn roads(&self) -> &RoadSet {
        &self.roads
    }

    /// Returns an iterator over all objects in the world.
    pub fn iter_objects(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.values()
    }

    /// The localization engine.
    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }
}
