use crate::convert::{RoadPosition, WorldToRoadCoordinateConverter};
use crate::geometry;
use crate::graph::Route;
use crate::lane::LaneOverlap;
use crate::math::{wrap_angle, Point2d};
use crate::object::{ObjectKind, WorldObject};
use crate::{LaneId, LaneSet, LocalizationElement, RoadSet, SectionSet};
use log::debug;
use rstar::RTree;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;

/// The road-relative pose of a point on a specific lane of a specific road.
///
/// This is the central currency exchanged between the coordinate converter,
/// the localizer and all downstream consumers. Road and lane are identified
/// by their OpenDRIVE ids.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlobalRoadPosition {
    /// The OpenDRIVE road id.
    pub road_id: String,
    /// The OpenDRIVE lane id.
    pub lane_id: i64,
    /// The road-relative pose.
    pub road_position: RoadPosition,
}

/// The longitudinal extent of an object on one road, together with the
/// OpenDRIVE ids of the touched lanes.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoadInterval {
    /// The OpenDRIVE ids of the touched lanes.
    pub lanes: Vec<i64>,
    /// The smallest touched arc-length in m.
    pub s_start: f64,
    /// The largest touched arc-length in m.
    pub s_end: f64,
}

impl Default for RoadInterval {
    fn default() -> Self {
        Self {
            lanes: vec![],
            s_start: f64::MAX,
            s_end: 0.0,
        }
    }
}

/// The per-tick road position snapshot of an object.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectPosition {
    /// The road position of the object's reference point.
    pub reference_point: GlobalRoadPosition,
    /// The road position of the object's main lane locator.
    pub main_lane_locator: GlobalRoadPosition,
    /// The touched interval per touched road, keyed by OpenDRIVE road id.
    pub touched_roads: BTreeMap<String, RoadInterval>,
}

/// The free lateral distance between an object and the constraining edges of
/// its on-route lanes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Remainder {
    pub left: f64,
    pub right: f64,
}

/// The result of localizing one object for one tick.
///
/// A new value is produced by every [Localizer::locate] call and supersedes
/// the previous tick's value; it is never mutated in place.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Location {
    /// The object's road positions and touched roads.
    pub position: ObjectPosition,
    /// The lateral remainders towards the constraining lane edges.
    pub remainder: Remainder,
    /// Whether the main lane locator lies on a road of the supplied route.
    pub is_on_route: bool,
    /// Whether the object touches more than one lane.
    pub spans_multiple_lanes: bool,
    /// The OpenDRIVE ids of all touched on-route lanes.
    pub touched_lane_ids: BTreeSet<i64>,
}

impl Location {
    /// A location carrying no position at all.
    pub fn invalid() -> Self {
        Default::default()
    }
}

/// The intermediate result of matching an object against all candidate
/// geometry elements.
#[derive(Debug, Default)]
struct LocatedObject {
    /// The accumulated overlap per touched lane.
    lane_overlaps: BTreeMap<LaneId, LaneOverlap>,
    /// The reference point position per touched road.
    reference_point: BTreeMap<String, GlobalRoadPosition>,
    /// The main lane locator position per touched road.
    main_lane_locator: BTreeMap<String, GlobalRoadPosition>,
}

/// Localizes world objects onto the lanes of a road network.
///
/// The spatial index over all lane geometry elements is built once per
/// scenery by [Localizer::init] and is read-only afterwards; a [locate]
/// call per object per tick matches the object's bounding polygon against
/// the candidate elements.
///
/// [locate]: Localizer::locate
#[derive(Default)]
pub struct Localizer {
    elements: RTree<LocalizationElement>,
}

impl Localizer {
    /// Creates a localizer with an empty spatial index.
    pub fn new() -> Self {
        Default::default()
    }

    /// Builds the spatial index over all geometry elements of all lanes.
    ///
    /// Must be called once after the road network is fully populated; calling
    /// it again replaces the index, which allows reloading a scenery.
    pub fn init(&mut self, lanes: &LaneSet) {
        let elements: Vec<LocalizationElement> = lanes
            .iter()
            .flat_map(|(id, lane)| {
                lane.elements()
                    .iter()
                    .map(move |element| LocalizationElement::new(id, element))
            })
            .collect();
        debug!("building spatial index over {} lane geometry elements", elements.len());
        self.elements = RTree::bulk_load(elements);
    }

    /// The number of indexed geometry elements.
    pub fn element_count(&self) -> usize {
        self.elements.size()
    }

    /// Localizes an object onto the road network.
    ///
    /// Returns the object's [Location] and the overlap of every touched
    /// lane. Absence of any overlap is an expected outcome and yields an
    /// invalid location with empty collections, never an error.
    pub fn locate(
        &self,
        bounding_polygon: &[Point2d; 4],
        object: &WorldObject,
        route: &Route,
        lanes: &LaneSet,
        sections: &SectionSet,
        roads: &RoadSet,
    ) -> (Location, BTreeMap<LaneId, LaneOverlap>) {
        let reference_point = object.position();
        let main_lane_locator = object.main_lane_locator();
        let hdg = object.yaw();

        let search_box = geometry::search_box(bounding_polygon);
        let mut located = LocatedObject::default();
        for element in self.elements.locate_in_envelope_intersecting(&search_box) {
            let intersection = geometry::intersection_points(element.polygon(), bounding_polygon);
            if intersection.len() < 3 {
                // The actual polygons do not overlap; skip this element.
                continue;
            }

            let converter = WorldToRoadCoordinateConverter::new(element);
            let lane = &lanes[element.lane()];
            let road_id = road_od_id(element.lane(), lanes, sections, roads);

            if converter.is_convertible(reference_point) {
                located.reference_point.insert(
                    road_id.clone(),
                    GlobalRoadPosition {
                        road_id: road_id.clone(),
                        lane_id: lane.od_id(),
                        road_position: converter.road_coordinate(reference_point, hdg),
                    },
                );
            }

            if converter.is_convertible(main_lane_locator) {
                located.main_lane_locator.insert(
                    road_id.clone(),
                    GlobalRoadPosition {
                        road_id: road_id.clone(),
                        lane_id: lane.od_id(),
                        road_position: converter.road_coordinate(main_lane_locator, hdg),
                    },
                );
            }

            let overlap = located.lane_overlaps.entry(element.lane()).or_default();
            for point in &intersection {
                let position = converter.road_coordinate(*point, hdg);
                debug_assert!(position.s >= 0.0);
                let width = lane.width_at(position.s);
                overlap.grow(position.s, position.t, width);
            }
        }

        let location = self.build_result(&located, route, lanes, sections, roads);
        (location, located.lane_overlaps)
    }

    /// Localizes a single world point onto all roads whose geometry covers it.
    pub fn locate_point(
        &self,
        point: Point2d,
        hdg: f64,
        lanes: &LaneSet,
        sections: &SectionSet,
        roads: &RoadSet,
    ) -> BTreeMap<String, GlobalRoadPosition> {
        let search_box = geometry::search_box(&[point]);
        let mut result = BTreeMap::new();
        for element in self.elements.locate_in_envelope_intersecting(&search_box) {
            let converter = WorldToRoadCoordinateConverter::new(element);
            if !converter.is_convertible(point) {
                continue;
            }
            let lane = &lanes[element.lane()];
            let road_id = road_od_id(element.lane(), lanes, sections, roads);
            result.insert(
                road_id.clone(),
                GlobalRoadPosition {
                    road_id,
                    lane_id: lane.od_id(),
                    road_position: converter.road_coordinate(point, hdg),
                },
            );
        }
        result
    }

    /// Aggregates the per-element matches into the final [Location].
    fn build_result(
        &self,
        located: &LocatedObject,
        route: &Route,
        lanes: &LaneSet,
        sections: &SectionSet,
        roads: &RoadSet,
    ) -> Location {
        let mut touched_lane_ids = BTreeSet::new();
        let mut touched_roads: BTreeMap<String, RoadInterval> = BTreeMap::new();
        let mut remainder_left = 0.0_f64;
        let mut remainder_right = 0.0_f64;
        let mut is_on_route = true;

        for (lane_id, overlap) in &located.lane_overlaps {
            let lane = &lanes[*lane_id];
            let road_id = road_od_id(*lane_id, lanes, sections, roads);
            let interval = touched_roads.entry(road_id.clone()).or_default();
            interval.lanes.push(lane.od_id());
            interval.s_start = interval.s_start.min(overlap.s_min);
            interval.s_end = interval.s_end.max(overlap.s_max);
            if route.contains_road(&road_id) {
                touched_lane_ids.insert(lane.od_id());
                remainder_left = remainder_left.max(overlap.min_delta_left);
                remainder_right = remainder_right.max(overlap.min_delta_right);
            }
        }

        let mut main_lane_locator = GlobalRoadPosition::default();
        match route
            .roads
            .iter()
            .find(|element| located.main_lane_locator.contains_key(&element.road))
        {
            Some(element) => {
                main_lane_locator = located.main_lane_locator[&element.road].clone();
                incorporate_road_direction(route, &mut main_lane_locator);
            }
            None => {
                // The main lane locator is not on the route; fall back to an
                // arbitrary touched road.
                is_on_route = false;
                if let Some(position) = located.main_lane_locator.values().next() {
                    main_lane_locator = position.clone();
                }
            }
        }

        let mut reference_point = GlobalRoadPosition::default();
        match route
            .roads
            .iter()
            .find(|element| located.reference_point.contains_key(&element.road))
        {
            Some(element) => {
                reference_point = located.reference_point[&element.road].clone();
                incorporate_road_direction(route, &mut reference_point);
            }
            None => {
                if located.reference_point.is_empty() {
                    is_on_route = false;
                } else {
                    reference_point = located.reference_point.values().next().unwrap().clone();
                }
            }
        }

        Location {
            position: ObjectPosition {
                reference_point,
                main_lane_locator,
                touched_roads,
            },
            remainder: Remainder {
                left: remainder_left,
                right: remainder_right,
            },
            is_on_route,
            spans_multiple_lanes: touched_lane_ids.len() > 1,
            touched_lane_ids,
        }
    }
}

/// Assigns the object to every lane it overlaps, so that the lanes' occupancy
/// lists contain it until the next [Localizer::locate] call.
pub(crate) fn create_lane_assignments(
    object: &mut WorldObject,
    overlaps: &BTreeMap<LaneId, LaneOverlap>,
    lanes: &mut LaneSet,
) {
    for (lane_id, overlap) in overlaps {
        let lane = &mut lanes[*lane_id];
        match object.kind() {
            ObjectKind::Moving { .. } => lane.add_moving_object(object.id(), *overlap),
            ObjectKind::Stationary => lane.add_stationary_object(object.id(), *overlap),
        }
        object.add_lane_assignment(*lane_id);
    }
}

/// Flips the lateral offset and renormalizes the heading of a road position
/// when its route traverses the road against the OpenDRIVE direction.
fn incorporate_road_direction(route: &Route, position: &mut GlobalRoadPosition) {
    let element = match route.element_for_road(&position.road_id) {
        Some(element) => element,
        None => return,
    };
    if element.in_od_direction {
        return;
    }
    position.road_position.t = -position.road_position.t;
    position.road_position.hdg = wrap_angle(position.road_position.hdg + PI);
}

/// The OpenDRIVE id of the road a lane belongs to.
fn road_od_id(lane: LaneId, lanes: &LaneSet, sections: &SectionSet, roads: &RoadSet) -> String {
    let section = &sections[lanes[lane].section()];
    roads[section.road()].od_id().to_string()
}
