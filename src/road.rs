use crate::lane::MeasurementPoint;
use crate::{LaneId, LaneSet, RoadId, SectionId};

/// An ordered set of parallel lanes sharing an s-interval on a road.
#[derive(Clone, Debug)]
pub struct Section {
    /// The section ID.
    id: SectionId,
    /// The arc-length at which the section starts on its road, in m.
    s_offset: f64,
    /// The road this section belongs to.
    road: RoadId,
    /// The lanes of the section, ordered from left to right.
    lanes: Vec<LaneId>,
    /// The sections preceding this one.
    previous: Vec<SectionId>,
    /// The sections following this one.
    next: Vec<SectionId>,
}

impl Section {
    /// Creates a new section.
    pub(crate) fn new(id: SectionId, road: RoadId, s_offset: f64) -> Self {
        Self {
            id,
            s_offset,
            road,
            lanes: vec![],
            previous: vec![],
            next: vec![],
        }
    }

    /// Gets the section's ID.
    pub fn id(&self) -> SectionId {
        self.id
    }

    /// Gets the road this section belongs to.
    pub fn road(&self) -> RoadId {
        self.road
    }

    /// The arc-length at which the section starts on its road, in m.
    pub fn s_offset(&self) -> f64 {
        self.s_offset
    }

    /// Gets the lanes of the section, ordered from left to right.
    pub fn lanes(&self) -> &[LaneId] {
        &self.lanes
    }

    /// Gets the sections preceding this one.
    pub fn previous_sections(&self) -> &[SectionId] {
        &self.previous
    }

    /// Gets the sections following this one.
    pub fn next_sections(&self) -> &[SectionId] {
        &self.next
    }

    pub(crate) fn add_lane(&mut self, lane: LaneId) {
        self.lanes.push(lane);
    }

    pub(crate) fn add_previous(&mut self, section: SectionId) {
        self.previous.push(section);
    }

    pub(crate) fn add_next(&mut self, section: SectionId) {
        self.next.push(section);
    }

    /// The length of the section: the average of its lanes' individual
    /// lengths. Lanes of one section may differ slightly in length; the
    /// average is the value downstream range queries are calibrated against.
    pub fn length(&self, lanes: &LaneSet) -> f64 {
        if self.lanes.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.lanes.iter().map(|id| lanes[*id].length()).sum();
        sum / self.lanes.len() as f64
    }

    /// The arc-length at which the section starts or ends on its road.
    pub fn distance(&self, point: MeasurementPoint, lanes: &LaneSet) -> f64 {
        match point {
            MeasurementPoint::RoadStart => self.s_offset,
            MeasurementPoint::RoadEnd => self.s_offset + self.length(lanes),
        }
    }

    /// Determines whether the section covers the given arc-length.
    ///
    /// The upper bound is inclusive only for the road's last section.
    pub fn covers(&self, distance: f64, lanes: &LaneSet) -> bool {
        if self.distance(MeasurementPoint::RoadStart, lanes) > distance {
            return false;
        }
        let end = self.distance(MeasurementPoint::RoadEnd, lanes);
        if self.next.is_empty() {
            distance <= end
        } else {
            distance < end
        }
    }

    /// Determines whether the section overlaps the interval
    /// `[start_distance, end_distance]`.
    ///
    /// Interior section seams are exclusive on the shared boundary while the
    /// road's outermost bounds are inclusive, so an object straddling a seam
    /// is counted by exactly one of the adjoining sections' outer neighbours.
    pub fn covers_interval(&self, start_distance: f64, end_distance: f64, lanes: &LaneSet) -> bool {
        let section_start = self.distance(MeasurementPoint::RoadStart, lanes);
        let section_end = self.distance(MeasurementPoint::RoadEnd, lanes);

        let starts_before_section_end = if self.next.is_empty() {
            start_distance <= section_end
        } else {
            start_distance < section_end
        };
        let ends_after_section_start = if self.previous.is_empty() {
            end_distance >= section_start
        } else {
            end_distance > section_start
        };

        starts_before_section_end && ends_after_section_start
    }
}

/// The attributes of a road.
#[derive(Clone, Debug)]
pub struct RoadAttributes {
    /// The OpenDRIVE road id.
    pub od_id: String,
    /// Whether the road runs in the stream direction of its road network.
    pub in_stream_direction: bool,
}

/// An ordered set of sections forming one road of the network.
#[derive(Clone, Debug)]
pub struct Road {
    /// The road ID.
    id: RoadId,
    /// The OpenDRIVE road id.
    od_id: String,
    /// Whether the road runs in the stream direction of its road network.
    in_stream_direction: bool,
    /// The sections of the road in arc-length order.
    sections: Vec<SectionId>,
    /// The OpenDRIVE id of the predecessor road, if any.
    predecessor: Option<String>,
    /// The OpenDRIVE id of the successor road, if any.
    successor: Option<String>,
}

impl Road {
    /// Creates a new road.
    pub(crate) fn new(id: RoadId, attribs: &RoadAttributes) -> Self {
        Self {
            id,
            od_id: attribs.od_id.clone(),
            in_stream_direction: attribs.in_stream_direction,
            sections: vec![],
            predecessor: None,
            successor: None,
        }
    }

    /// Gets the road's ID.
    pub fn id(&self) -> RoadId {
        self.id
    }

    /// Gets the OpenDRIVE road id.
    pub fn od_id(&self) -> &str {
        &self.od_id
    }

    /// Whether the road runs in the stream direction of its road network.
    pub fn is_in_stream_direction(&self) -> bool {
        self.in_stream_direction
    }

    /// Gets the sections of the road in arc-length order.
    pub fn sections(&self) -> &[SectionId] {
        &self.sections
    }

    /// Gets the OpenDRIVE id of the predecessor road, if any.
    pub fn predecessor(&self) -> Option<&str> {
        self.predecessor.as_deref()
    }

    /// Gets the OpenDRIVE id of the successor road, if any.
    pub fn successor(&self) -> Option<&str> {
        self.successor.as_deref()
    }

    pub(crate) fn add_section(&mut self, section: SectionId) {
        self.sections.push(section);
    }

    pub(crate) fn set_predecessor(&mut self, road: String) {
        self.predecessor = Some(road);
    }

    pub(crate) fn set_successor(&mut self, road: String) {
        self.successor = Some(road);
    }

    /// The global length of the road: the sum of its section lengths.
    pub fn length(&self, sections: &crate::SectionSet, lanes: &LaneSet) -> f64 {
        self.sections
            .iter()
            .map(|id| sections[*id].length(lanes))
            .sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lane::{JointPoints, LaneAttributes, LaneType};
    use crate::math::Point2d;
    use crate::{Lane, LaneSet, SectionSet};
    use assert_approx_eq::assert_approx_eq;
    use slotmap::Key;

    fn lane_with_length(lanes: &mut LaneSet, start: f64, end: f64, width: f64) -> crate::LaneId {
        lanes.insert_with_key(|id| {
            let mut lane = Lane::new(
                id,
                SectionId::null(),
                &LaneAttributes {
                    od_id: -1,
                    lane_type: LaneType::Driving,
                },
            );
            for s in [start, end] {
                lane.add_geometry_joint(
                    JointPoints {
                        left: Point2d::new(s, width / 2.0),
                        reference: Point2d::new(s, 0.0),
                        right: Point2d::new(s, -width / 2.0),
                    },
                    s,
                    0.0,
                    0.0,
                );
            }
            lane
        })
    }

    #[test]
    fn section_length_is_the_average_of_its_lanes() {
        let mut lanes = LaneSet::default();
        let a = lane_with_length(&mut lanes, 0.0, 100.0, 4.0);
        let b = lane_with_length(&mut lanes, 0.0, 90.0, 4.0);

        let mut section = Section::new(SectionId::null(), crate::RoadId::null(), 0.0);
        assert_approx_eq!(section.length(&lanes), 0.0);
        section.add_lane(a);
        section.add_lane(b);
        assert_approx_eq!(section.length(&lanes), 95.0);
    }

    #[test]
    fn covers_interval_respects_seam_semantics() {
        let mut lanes = LaneSet::default();
        let a = lane_with_length(&mut lanes, 0.0, 100.0, 4.0);

        let mut first = Section::new(SectionId::null(), crate::RoadId::null(), 0.0);
        first.add_lane(a);

        // sole section of its road: outer bounds are inclusive
        assert!(first.covers(0.0, &lanes));
        assert!(first.covers(100.0, &lanes));
        assert!(!first.covers(100.1, &lanes));
        assert!(first.covers_interval(-10.0, 0.0, &lanes));
        assert!(first.covers_interval(100.0, 110.0, &lanes));
        assert!(first.covers_interval(20.0, 60.0, &lanes));
        assert!(!first.covers_interval(100.1, 110.0, &lanes));

        // interior section: the seam belongs to the neighbour
        first.add_next(SectionId::null());
        first.add_previous(SectionId::null());
        assert!(!first.covers_interval(100.0, 110.0, &lanes));
        assert!(!first.covers_interval(-10.0, 0.0, &lanes));
        assert!(first.covers_interval(99.9, 110.0, &lanes));
    }

    #[test]
    fn road_length_sums_its_sections() {
        let mut lanes = LaneSet::default();
        let mut sections = SectionSet::default();
        let mut road = Road::new(
            crate::RoadId::null(),
            &RoadAttributes {
                od_id: "road".into(),
                in_stream_direction: true,
            },
        );

        for (start, end) in [(0.0, 40.0), (40.0, 100.0)] {
            let lane = lane_with_length(&mut lanes, start, end, 4.0);
            let section = sections.insert_with_key(|id| {
                let mut section = Section::new(id, road.id(), start);
                section.add_lane(lane);
                section
            });
            road.add_section(section);
        }

        assert_approx_eq!(road.length(&sections, &lanes), 100.0);
    }
}
