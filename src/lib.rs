pub use cgmath;
pub use convert::{LocalizationElement, RoadPosition, WorldToRoadCoordinateConverter};
pub use graph::{RoadGraph, Route, RouteElement};
pub use lane::{
    JointPoints, Lane, LaneAttributes, LaneGeometryElement, LaneGeometryJoint, LaneOverlap,
    LaneType, MeasurementPoint,
};
pub use localizer::{
    GlobalRoadPosition, Localizer, Location, ObjectPosition, Remainder, RoadInterval,
};
pub use object::{ObjectKind, WorldObject, WorldObjectAttributes};
pub use road::{Road, RoadAttributes, Section};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use world::World;

mod convert;
pub mod geometry;
mod graph;
mod lane;
mod localizer;
pub mod math;
mod object;
mod road;
mod world;

new_key_type! {
    /// Unique ID of a [Lane].
    pub struct LaneId;
    /// Unique ID of a [Section].
    pub struct SectionId;
    /// Unique ID of a [Road].
    pub struct RoadId;
    /// Unique ID of a [WorldObject].
    pub struct ObjectId;
}

/// The arena of lanes in a world.
pub type LaneSet = SlotMap<LaneId, Lane>;
/// The arena of sections in a world.
pub type SectionSet = SlotMap<SectionId, Section>;
/// The arena of roads in a world.
pub type RoadSet = SlotMap<RoadId, Road>;
/// The arena of world objects in a world.
pub type ObjectSet = SlotMap<ObjectId, WorldObject>;
