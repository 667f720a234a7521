//! Tests that localize objects on a small road network.

use assert_approx_eq::assert_approx_eq;
use road_locate::{
    geometry,
    math::{wrap_angle, Point2d},
    JointPoints, LaneAttributes, LaneId, LaneType, MeasurementPoint, ObjectKind, RoadAttributes,
    Route, RouteElement, World, WorldObjectAttributes,
};
use std::f64::consts::PI;

/// Builds a single road "r1" with two adjacent 4 m wide lanes running
/// 100 m along the x-axis: lane -1 covering y in [0, 4] and lane -2
/// covering y in [-4, 0].
fn two_lane_world() -> (World, LaneId, LaneId) {
    let mut world = World::new();
    let road = world.add_road(&RoadAttributes {
        od_id: "r1".into(),
        in_stream_direction: true,
    });
    let section = world.add_section(road, 0.0);

    let attribs = |od_id| LaneAttributes {
        od_id,
        lane_type: LaneType::Driving,
    };
    let left = world.add_lane(section, &attribs(-1));
    let right = world.add_lane(section, &attribs(-2));
    world.set_adjacent_lanes(left, right);

    for s in [0.0, 100.0] {
        world.add_lane_joint(
            left,
            JointPoints {
                left: Point2d::new(s, 4.0),
                reference: Point2d::new(s, 2.0),
                right: Point2d::new(s, 0.0),
            },
            s,
            0.0,
            0.0,
        );
        world.add_lane_joint(
            right,
            JointPoints {
                left: Point2d::new(s, 0.0),
                reference: Point2d::new(s, -2.0),
                right: Point2d::new(s, -4.0),
            },
            s,
            0.0,
            0.0,
        );
    }

    world.finalize();
    (world, left, right)
}

fn route() -> Route {
    Route::new(vec![RouteElement::new("r1", true)])
}

#[test]
fn lane_width_and_direction_are_interpolated() {
    let (world, left, _) = two_lane_world();
    let lane = world.get_lane(left);
    assert_approx_eq!(lane.width_at(50.0), 4.0);
    assert_approx_eq!(lane.direction_at(50.0), 0.0);
    assert_approx_eq!(lane.distance(MeasurementPoint::RoadStart), 0.0);
    assert_approx_eq!(lane.distance(MeasurementPoint::RoadEnd), 100.0);
}

#[test]
fn object_straddling_two_lanes_touches_both() {
    let (mut world, _, _) = two_lane_world();
    let object = world.add_object(&WorldObjectAttributes {
        length: 5.0,
        width: 2.0,
        position: Point2d::new(50.0, 0.0),
        yaw: 0.0,
        kind: ObjectKind::Moving {
            distance_ref_to_leading_edge: 2.5,
        },
    });

    let location = world.locate(object, &route());

    assert!(location.is_on_route);
    assert!(location.spans_multiple_lanes);
    assert_eq!(location.touched_lane_ids.len(), 2);
    assert!(location.touched_lane_ids.contains(&-1));
    assert!(location.touched_lane_ids.contains(&-2));

    let interval = &location.position.touched_roads["r1"];
    assert_approx_eq!(interval.s_start, 47.5);
    assert_approx_eq!(interval.s_end, 52.5);

    // the two-lane corridor spans y in [-4, 4], the object y in [-1, 1]
    assert_approx_eq!(location.remainder.left, 3.0);
    assert_approx_eq!(location.remainder.right, 3.0);
}

#[test]
fn main_lane_locator_leads_the_reference_point() {
    let (mut world, _, _) = two_lane_world();
    let object = world.add_object(&WorldObjectAttributes {
        length: 4.0,
        width: 2.0,
        position: Point2d::new(30.0, 2.0),
        yaw: 0.0,
        kind: ObjectKind::Moving {
            distance_ref_to_leading_edge: 2.0,
        },
    });

    let location = world.locate(object, &route());

    assert!(location.is_on_route);
    assert_eq!(location.position.reference_point.lane_id, -1);
    assert_approx_eq!(location.position.reference_point.road_position.s, 30.0);
    assert_approx_eq!(location.position.reference_point.road_position.t, 0.0);
    assert_approx_eq!(location.position.main_lane_locator.road_position.s, 32.0);
}

#[test]
fn locate_is_idempotent() {
    let (mut world, _, _) = two_lane_world();
    let object = world.add_object(&WorldObjectAttributes {
        length: 5.0,
        width: 2.0,
        position: Point2d::new(50.0, 1.0),
        yaw: 0.1,
        kind: ObjectKind::Moving {
            distance_ref_to_leading_edge: 2.5,
        },
    });

    let first = world.locate(object, &route());
    world.unlocate(object);
    let second = world.locate(object, &route());

    assert_eq!(first, second);
}

#[test]
fn no_overlap_is_not_an_error() {
    let (mut world, _, _) = two_lane_world();
    let object = world.add_object(&WorldObjectAttributes {
        length: 2.0,
        width: 2.0,
        position: Point2d::new(50.0, 40.0),
        yaw: 0.0,
        kind: ObjectKind::Stationary,
    });

    let location = world.locate(object, &route());

    assert!(!location.is_on_route);
    assert!(location.touched_lane_ids.is_empty());
    assert!(location.position.touched_roads.is_empty());
    assert!(world.get_object(object).lane_assignments().is_empty());
}

#[test]
fn occupancy_lists_reflect_the_current_tick() {
    let (mut world, left, right) = two_lane_world();
    let add_vehicle = |world: &mut World, x: f64| {
        world.add_object(&WorldObjectAttributes {
            length: 4.0,
            width: 1.5,
            position: Point2d::new(x, 2.0),
            yaw: 0.0,
            kind: ObjectKind::Moving {
                distance_ref_to_leading_edge: 2.0,
            },
        })
    };
    let rear = add_vehicle(&mut world, 20.0);
    let front = add_vehicle(&mut world, 60.0);

    // insertion order must not matter for the downstream ordering
    world.locate(front, &route());
    world.locate(rear, &route());

    let downstream: Vec<_> = world.get_lane(left).objects_downstream().collect();
    assert_eq!(downstream, vec![rear, front]);
    let upstream: Vec<_> = world.get_lane(left).objects_upstream().collect();
    assert_eq!(upstream, vec![front, rear]);
    assert!(world.get_lane(right).world_objects().is_empty());
    assert_eq!(world.get_object(rear).lane_assignments(), &[left]);

    world.unlocate(rear);
    let remaining: Vec<_> = world.get_lane(left).objects_downstream().collect();
    assert_eq!(remaining, vec![front]);

    world.clear_all_assignments();
    assert!(world.get_lane(left).world_objects().is_empty());
}

#[test]
fn intersection_polygon_area_of_shifted_squares() {
    // two 20 x 20 squares shifted by (5, 5) overlap on a 15 x 15 square
    let element = [
        Point2d::new(-10.0, -10.0),
        Point2d::new(-10.0, 10.0),
        Point2d::new(10.0, 10.0),
        Point2d::new(10.0, -10.0),
    ];
    let boundary = [
        Point2d::new(-5.0, -5.0),
        Point2d::new(-5.0, 15.0),
        Point2d::new(15.0, 15.0),
        Point2d::new(15.0, -5.0),
    ];

    let points = geometry::intersection_points(&element, &boundary);
    assert!(points.len() >= 3 && points.len() <= 8);

    // the vertex list is unordered; sort it by angle around the centroid
    // before applying the shoelace formula
    let n = points.len() as f64;
    let centroid = Point2d::new(
        points.iter().map(|p| p.x).sum::<f64>() / n,
        points.iter().map(|p| p.y).sum::<f64>() / n,
    );
    let mut ordered: Vec<Point2d> = points.to_vec();
    ordered.sort_by(|a, b| {
        let angle = |p: &Point2d| (p.y - centroid.y).atan2(p.x - centroid.x);
        angle(a).partial_cmp(&angle(b)).unwrap()
    });

    assert_approx_eq!(geometry::polygon_area(&ordered), 225.0);
}

#[test]
fn angles_wrap_into_the_valid_range() {
    assert_approx_eq!(wrap_angle(3.0 * PI), PI);
    assert_approx_eq!(wrap_angle(-3.0 * PI), PI);
    assert_approx_eq!(wrap_angle(0.25), 0.25);
}

#[test]
fn point_queries_resolve_road_coordinates() {
    let (world, _, _) = two_lane_world();
    let positions = world.locate_point(Point2d::new(10.0, 1.0), 0.0);
    assert_eq!(positions.len(), 1);
    let position = &positions["r1"];
    assert_eq!(position.road_id, "r1");
    assert_eq!(position.lane_id, -1);
    assert_approx_eq!(position.road_position.s, 10.0);
    assert_approx_eq!(position.road_position.t, -1.0);

    assert!(world.locate_point(Point2d::new(10.0, 40.0), 0.0).is_empty());
}
