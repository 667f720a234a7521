use pathfinding::directed::dijkstra::dijkstra;
use smallvec::SmallVec;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One step of a route: a road traversed either in or against its OpenDRIVE
/// reference direction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteElement {
    /// The OpenDRIVE road id.
    pub road: String,
    /// Whether the road is traversed in its OpenDRIVE reference direction.
    pub in_od_direction: bool,
}

impl RouteElement {
    /// Creates a new route element.
    pub fn new(road: impl Into<String>, in_od_direction: bool) -> Self {
        Self {
            road: road.into(),
            in_od_direction,
        }
    }
}

/// The ordered list of road traversals an agent intends to follow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Route {
    /// The roads of the route in traversal order.
    pub roads: Vec<RouteElement>,
}

impl Route {
    /// Creates a new route.
    pub fn new(roads: Vec<RouteElement>) -> Self {
        Self { roads }
    }

    /// Gets the route element for the given road, if the route contains it.
    pub fn element_for_road(&self, road_id: &str) -> Option<&RouteElement> {
        self.roads.iter().find(|element| element.road == road_id)
    }

    /// Determines whether the route traverses the given road.
    pub fn contains_road(&self, road_id: &str) -> bool {
        self.element_for_road(road_id).is_some()
    }
}

/// A vertex of the [RoadGraph].
pub type RoadGraphVertex = usize;

/// The directed graph of road traversals reachable from an agent's position.
///
/// A vertex is one road traversed in one direction; an edge means the target
/// traversal is reachable from the source traversal. The graph handed to an
/// agent is expected to be acyclic along any walk, so every route is a finite
/// walk ending at a leaf or target vertex.
#[derive(Clone, Debug, Default)]
pub struct RoadGraph {
    vertices: Vec<RouteElement>,
    edges: Vec<(RoadGraphVertex, RoadGraphVertex)>,
}

impl RoadGraph {
    /// Creates an empty road graph.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a vertex for the given road traversal.
    pub fn add_vertex(&mut self, element: RouteElement) -> RoadGraphVertex {
        self.vertices.push(element);
        self.vertices.len() - 1
    }

    /// Adds a directed edge between two vertices.
    pub fn add_edge(&mut self, from: RoadGraphVertex, to: RoadGraphVertex) {
        self.edges.push((from, to));
    }

    /// Gets the road traversal of a vertex.
    pub fn element(&self, vertex: RoadGraphVertex) -> &RouteElement {
        &self.vertices[vertex]
    }

    /// The number of vertices in the graph.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the graph has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The vertices directly reachable from the given vertex.
    pub fn successors(&self, vertex: RoadGraphVertex) -> impl Iterator<Item = RoadGraphVertex> + '_ {
        self.edges
            .iter()
            .filter(move |(from, _)| *from == vertex)
            .map(|(_, to)| *to)
    }

    /// The vertices without outgoing edges: the ends of all route alternatives.
    pub fn leaves(&self) -> Vec<RoadGraphVertex> {
        (0..self.vertices.len())
            .filter(|vertex| self.successors(*vertex).next().is_none())
            .collect()
    }

    /// Builds the planned route from `current` to the chosen `target` vertex
    /// by walking the unique reverse edges backwards from the target.
    ///
    /// Returns `None` if no backward walk from `target` reaches `current`.
    /// Range and distance queries operate on the returned linear route, which
    /// decouples their cost from the size of the full network.
    pub fn way_to_target(
        &self,
        current: RoadGraphVertex,
        target: RoadGraphVertex,
    ) -> Option<Route> {
        let mut way: SmallVec<[RoadGraphVertex; 8]> = SmallVec::new();
        let mut way_point = target;
        way.push(way_point);
        while way_point != current {
            // a walk longer than the vertex count means the graph has a cycle
            if way.len() > self.vertices.len() {
                return None;
            }
            let previous = self
                .edges
                .iter()
                .find(|(_, to)| *to == way_point)
                .map(|(from, _)| *from)?;
            way_point = previous;
            way.push(way_point);
        }
        Some(Route::new(
            way.iter()
                .rev()
                .map(|vertex| self.vertices[*vertex].clone())
                .collect(),
        ))
    }

    /// Finds a shortest route between two vertices, measured in traversal steps.
    pub fn shortest_route(
        &self,
        from: RoadGraphVertex,
        to: RoadGraphVertex,
    ) -> Option<Route> {
        let (path, _) = dijkstra(
            &from,
            |vertex| {
                self.successors(*vertex)
                    .map(|successor| (successor, 1_u32))
                    .collect::<Vec<_>>()
            },
            |vertex| *vertex == to,
        )?;
        Some(Route::new(
            path.iter()
                .map(|vertex| self.vertices[*vertex].clone())
                .collect(),
        ))
    }
}
