//! Adapts a [`Graph`] to the search by adding the route ends.
//!
//! Start and finish rarely sit on a joint. When they do not, a virtual joint
//! is placed at the projected position (`start` gets id `joint_count`,
//! `finish` gets `joint_count + 1`) with virtual edges to the neighbouring
//! joints of its feature.
//!
//! The search itself runs over pairs of joints, [`SearchVertex`], so that a
//! turn restriction can be checked at the moment a joint is left: from
//! `(p, c)` one may reach `(c, n)` only if the transition `p -> c -> n` is
//! allowed. `(j, j)` marks the start or finish pseudo vertex.

pub mod error;


#[doc(inline)]
pub use error::StarterError;

use geo::{Distance, Haversine, Point};
use log::debug;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::codec::{FeatureId, Road, RoadPoint};
use crate::estimator::{EdgeEstimator, Weight};
use crate::graph::{Graph, JointId, Junction, RoadWeights};
use crate::model::VehicleModel;
use crate::route::RoutePoint;
use crate::search::SearchGraph;

/// A resolved route end: the segment it lies on and its exact position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    /// Feature and segment index.
    pub road_point: RoadPoint,
    pub junction: Junction,
}

impl Anchor {
    pub fn new(road_point: RoadPoint, point: Point) -> Self {
        Anchor {
            road_point,
            junction: Junction::new(point),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchVertex {
    pub prev: JointId,
    pub curr: JointId,
}

impl SearchVertex {
    pub const fn new(prev: JointId, curr: JointId) -> Self {
        SearchVertex { prev, curr }
    }

    pub const fn pseudo(joint: JointId) -> Self {
        SearchVertex {
            prev: joint,
            curr: joint,
        }
    }

    #[inline]
    pub fn is_pseudo(&self) -> bool {
        self.prev == self.curr
    }
}

#[derive(Debug, Clone, Copy)]
struct Endpoint {
    joint: JointId,
    road_point: RoadPoint,
    junction: Junction,
    position: Position,
    is_virtual: bool,
    /// Nearest joints of the feature at or before, and after, the anchor.
    bounds: (Bound, Bound),
}

/// A joint of a feature and the vertex of the feature it sits at. Closed
/// features reach the same joint at their first and last vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bound {
    point: u32,
    joint: JointId,
}

#[derive(Debug, Clone, Copy)]
struct VirtualEdge {
    from: JointId,
    to: JointId,
    from_point: RoadPoint,
    to_point: RoadPoint,
    weight: Weight,
}

impl VirtualEdge {
    fn feature(&self) -> FeatureId {
        self.from_point.feature
    }
}

/// A location along a feature: a segment and the share of it already covered.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
struct Position {
    segment: u32,
    fraction: f64,
}

impl Position {
    fn at_vertex(road: &Road, point: u32) -> Self {
        if point as usize >= road.segment_count() {
            Position {
                segment: point.saturating_sub(1),
                fraction: 1.0,
            }
        } else {
            Position {
                segment: point,
                fraction: 0.0,
            }
        }
    }

    fn on_segment(road: &Road, segment: u32, point: Point) -> Self {
        let fraction = match (road.point(segment), road.point(segment + 1)) {
            (Some(from), Some(to)) => {
                let length = Haversine.distance(from, to);
                if length > 0.0 {
                    (Haversine.distance(from, point) / length).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        Position { segment, fraction }
    }
}

type Neighbours = SmallVec<[(JointId, Weight); 8]>;

pub struct Starter<'a> {
    graph: &'a Graph,
    model: &'a dyn VehicleModel,
    estimator: &'a dyn EdgeEstimator,
    start: Endpoint,
    finish: Endpoint,
    virtual_edges: SmallVec<[VirtualEdge; 5]>,
    blocked: FxHashSet<(JointId, JointId, JointId)>,
}

impl<'a> Starter<'a> {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all))]
    pub fn new(
        graph: &'a Graph,
        model: &'a dyn VehicleModel,
        estimator: &'a dyn EdgeEstimator,
        start: Anchor,
        finish: Anchor,
    ) -> Result<Self, StarterError> {
        let start_id = graph.joint_count();

        let start_point = endpoint(graph, &start, start_id)?;
        let finish_point = if start == finish {
            start_point
        } else {
            endpoint(graph, &finish, start_id + 1)?
        };

        let mut starter = Starter {
            graph,
            model,
            estimator,
            start: start_point,
            finish: finish_point,
            virtual_edges: SmallVec::new(),
            blocked: FxHashSet::default(),
        };

        starter.attach_start()?;
        starter.attach_finish()?;
        starter.attach_direct()?;
        starter.block_restricted();

        debug!(
            "Starter: start joint {} (virtual: {}), finish joint {} (virtual: {}), {} virtual edges, {} blocked virtual transitions",
            starter.start.joint,
            starter.start.is_virtual,
            starter.finish.joint,
            starter.finish.is_virtual,
            starter.virtual_edges.len(),
            starter.blocked.len()
        );

        Ok(starter)
    }

    pub fn start_joint(&self) -> JointId {
        self.start.joint
    }

    pub fn finish_joint(&self) -> JointId {
        self.finish.joint
    }

    pub fn start_vertex(&self) -> SearchVertex {
        SearchVertex::pseudo(self.start.joint)
    }

    pub fn finish_vertex(&self) -> SearchVertex {
        SearchVertex::pseudo(self.finish.joint)
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Junction of a real or virtual joint.
    pub fn point(&self, joint: JointId) -> Option<Junction> {
        if self.start.is_virtual && joint == self.start.joint {
            Some(self.start.junction)
        } else if self.finish.is_virtual && joint == self.finish.joint {
            Some(self.finish.junction)
        } else {
            self.graph.junction(joint)
        }
    }

    pub fn is_transition_allowed(&self, prev: JointId, via: JointId, next: JointId) -> bool {
        !self.blocked.contains(&(prev, via, next))
            && self.graph.is_transition_allowed(prev, via, next)
    }

    /// Joints reachable from `joint` by one edge, with the cheapest weight to each.
    pub fn joint_outgoing(&self, joint: JointId) -> Neighbours {
        let mut neighbours = Neighbours::new();

        for (next, edge) in self.graph.outgoing(joint) {
            keep_cheapest(&mut neighbours, next, edge.weight);
        }

        for edge in self.virtual_edges.iter().filter(|edge| edge.from == joint) {
            keep_cheapest(&mut neighbours, edge.to, edge.weight);
        }

        neighbours
    }

    /// Joints reaching `joint` by one edge, with the cheapest weight from each.
    pub fn joint_ingoing(&self, joint: JointId) -> Neighbours {
        let mut neighbours = Neighbours::new();

        for (prev, edge) in self.graph.ingoing(joint) {
            keep_cheapest(&mut neighbours, prev, edge.weight);
        }

        for edge in self.virtual_edges.iter().filter(|edge| edge.to == joint) {
            keep_cheapest(&mut neighbours, edge.from, edge.weight);
        }

        neighbours
    }

    /// Expands a joint sequence into road points, both ends of every edge,
    /// stamped with the elapsed time at each.
    pub fn redress_route(&self, joints: &[JointId]) -> Result<Vec<RoutePoint>, StarterError> {
        let Some(&first) = joints.first() else {
            return Err(StarterError::EmptyRoute);
        };

        if joints.len() == 1 {
            let road_point = if first == self.start.joint {
                self.start.road_point
            } else {
                self.graph
                    .joint(first)
                    .and_then(|joint| joint.road_points.first().copied())
                    .ok_or(StarterError::UnknownJoint(first))?
            };

            let junction = self.point(first).ok_or(StarterError::UnknownJoint(first))?;
            return Ok(vec![RoutePoint::new(road_point, junction, 0.0)]);
        }

        let mut points = Vec::with_capacity(joints.len() * 2);
        let mut time = 0.0;

        for pair in joints.windows(2) {
            let &[from, to] = pair else {
                continue;
            };

            let (from_point, to_point, weight) = self
                .cheapest_edge(from, to)
                .ok_or(StarterError::MissingEdge { from, to })?;

            let from_junction = self.point(from).ok_or(StarterError::UnknownJoint(from))?;
            let to_junction = self.point(to).ok_or(StarterError::UnknownJoint(to))?;

            points.push(RoutePoint::new(from_point, from_junction, time));
            time += weight;
            points.push(RoutePoint::new(to_point, to_junction, time));
        }

        Ok(points)
    }

    fn cheapest_edge(&self, from: JointId, to: JointId) -> Option<(RoadPoint, RoadPoint, Weight)> {
        let real = self
            .graph
            .edges_between(from, to)
            .map(|edge| (edge.from, edge.to, edge.weight));

        let synthetic = self
            .virtual_edges
            .iter()
            .filter(|edge| edge.from == from && edge.to == to)
            .map(|edge| (edge.from_point, edge.to_point, edge.weight));

        real.chain(synthetic)
            .min_by(|a, b| a.2.total_cmp(&b.2))
    }

    fn weights(&self, feature: FeatureId) -> Result<(&'a Road, &'a RoadWeights), StarterError> {
        let graph: &'a Graph = self.graph;
        match (graph.road(feature), graph.road_weights(feature)) {
            (Some(road), Some(weights)) => Ok((road, weights)),
            _ => Err(StarterError::InaccessibleRoad(feature)),
        }
    }

    fn attach_start(&mut self) -> Result<(), StarterError> {
        if !self.start.is_virtual {
            return Ok(());
        }

        let start = self.start;
        let feature = start.road_point.feature;
        let (road, weights) = self.weights(feature)?;
        let (before, after) = start.bounds;

        self.add_virtual(VirtualEdge {
            from: start.joint,
            to: after.joint,
            from_point: start.road_point,
            to_point: RoadPoint::new(feature, after.point),
            weight: travel_forward(&weights.forward, start.position, Position::at_vertex(road, after.point)),
        });

        if let Some(backward) = &weights.backward {
            self.add_virtual(VirtualEdge {
                from: start.joint,
                to: before.joint,
                from_point: start.road_point,
                to_point: RoadPoint::new(feature, before.point),
                weight: travel_backward(backward, start.position, Position::at_vertex(road, before.point)),
            });
        }

        Ok(())
    }

    fn attach_finish(&mut self) -> Result<(), StarterError> {
        if !self.finish.is_virtual || self.finish.joint == self.start.joint {
            return Ok(());
        }

        let finish = self.finish;
        let feature = finish.road_point.feature;
        let (road, weights) = self.weights(feature)?;
        let (before, after) = finish.bounds;

        self.add_virtual(VirtualEdge {
            from: before.joint,
            to: finish.joint,
            from_point: RoadPoint::new(feature, before.point),
            to_point: finish.road_point,
            weight: travel_forward(&weights.forward, Position::at_vertex(road, before.point), finish.position),
        });

        if let Some(backward) = &weights.backward {
            self.add_virtual(VirtualEdge {
                from: after.joint,
                to: finish.joint,
                from_point: RoadPoint::new(feature, after.point),
                to_point: finish.road_point,
                weight: travel_backward(backward, Position::at_vertex(road, after.point), finish.position),
            });
        }

        Ok(())
    }

    // Both ends between the same two joints of one feature: the route may stay on it.
    fn attach_direct(&mut self) -> Result<(), StarterError> {
        let (start, finish) = (self.start, self.finish);
        if !start.is_virtual
            || !finish.is_virtual
            || start.joint == finish.joint
            || start.road_point.feature != finish.road_point.feature
            || start.bounds != finish.bounds
        {
            return Ok(());
        }

        let (_, weights) = self.weights(start.road_point.feature)?;
        let weight = if start.position < finish.position {
            Some(travel_forward(&weights.forward, start.position, finish.position))
        } else {
            weights
                .backward
                .as_ref()
                .map(|backward| travel_backward(backward, start.position, finish.position))
        };

        if let Some(weight) = weight {
            self.add_virtual(VirtualEdge {
                from: start.joint,
                to: finish.joint,
                from_point: start.road_point,
                to_point: finish.road_point,
                weight,
            });
        }

        Ok(())
    }

    fn add_virtual(&mut self, edge: VirtualEdge) {
        if edge.weight.is_finite() {
            self.virtual_edges.push(edge);
        } else {
            debug!("Dropping impassable virtual edge {} -> {}", edge.from, edge.to);
        }
    }

    // Turn restrictions hold through the virtual joints as well.
    fn block_restricted(&mut self) {
        let graph = self.graph;
        let mut blocked = FxHashSet::default();

        for leaving in self.virtual_edges.iter().filter(|edge| edge.from == self.start.joint) {
            let via = leaving.to;

            for (next, edge) in graph.outgoing(via) {
                if !graph.is_turn_allowed(leaving.feature(), via, edge.feature()) {
                    blocked.insert((self.start.joint, via, next));
                }
            }

            for arriving in self.virtual_edges.iter().filter(|edge| edge.from == via) {
                if !graph.is_turn_allowed(leaving.feature(), via, arriving.feature()) {
                    blocked.insert((self.start.joint, via, arriving.to));
                }
            }
        }

        for arriving in self.virtual_edges.iter().filter(|edge| edge.to == self.finish.joint) {
            let via = arriving.from;

            let mut sources = graph.ingoing(via).map(|(prev, _)| prev).collect::<SmallVec<[JointId; 8]>>();
            sources.sort_unstable();
            sources.dedup();

            for prev in sources {
                let allowed = graph
                    .edges_between(prev, via)
                    .any(|edge| graph.is_turn_allowed(edge.feature(), via, arriving.feature()));

                if !allowed {
                    blocked.insert((prev, via, self.finish.joint));
                }
            }
        }

        self.blocked = blocked;
    }

    fn location(&self, joint: JointId) -> Option<Point> {
        self.point(joint).map(|junction| junction.point)
    }
}

impl SearchGraph for Starter<'_> {
    type Vertex = SearchVertex;

    fn outgoing(&self, vertex: &SearchVertex, out: &mut Vec<(SearchVertex, Weight)>) {
        out.clear();

        let reached_finish = vertex.curr == self.finish.joint;
        if vertex.is_pseudo() && reached_finish && vertex.curr != self.start.joint {
            return;
        }

        for (next, weight) in self.joint_outgoing(vertex.curr) {
            if vertex.is_pseudo() || self.is_transition_allowed(vertex.prev, vertex.curr, next) {
                out.push((SearchVertex::new(vertex.curr, next), weight));
            }
        }

        if reached_finish && !vertex.is_pseudo() {
            out.push((SearchVertex::pseudo(vertex.curr), 0.0));
        }
    }

    fn ingoing(&self, vertex: &SearchVertex, out: &mut Vec<(SearchVertex, Weight)>) {
        out.clear();

        if vertex.is_pseudo() {
            if vertex.curr == self.finish.joint && vertex.curr != self.start.joint {
                for (prev, _) in self.joint_ingoing(vertex.curr) {
                    out.push((SearchVertex::new(prev, vertex.curr), 0.0));
                }
            }
            return;
        }

        let (via, next) = (vertex.prev, vertex.curr);
        let Some(weight) = self
            .joint_outgoing(via)
            .iter()
            .find(|(joint, _)| *joint == next)
            .map(|(_, weight)| *weight)
        else {
            return;
        };

        for (prev, _) in self.joint_ingoing(via) {
            if self.is_transition_allowed(prev, via, next) {
                out.push((SearchVertex::new(prev, via), weight));
            }
        }

        if via == self.start.joint {
            out.push((SearchVertex::pseudo(via), weight));
        }
    }

    fn heuristic(&self, from: &SearchVertex, to: &SearchVertex) -> Weight {
        match (self.location(from.curr), self.location(to.curr)) {
            (Some(from), Some(to)) => self.estimator.heuristic(from, to, self.model),
            _ => 0.0,
        }
    }
}

fn keep_cheapest(neighbours: &mut Neighbours, joint: JointId, weight: Weight) {
    match neighbours.iter_mut().find(|(id, _)| *id == joint) {
        Some((_, existing)) => *existing = existing.min(weight),
        None => neighbours.push((joint, weight)),
    }
}

fn endpoint(graph: &Graph, anchor: &Anchor, virtual_id: JointId) -> Result<Endpoint, StarterError> {
    let RoadPoint { feature, point: segment } = anchor.road_point;
    let road = graph
        .road(feature)
        .filter(|road| (segment as usize) < road.segment_count())
        .ok_or(StarterError::InvalidAnchor(anchor.road_point))?;

    let joints = graph.road_joints(feature);
    let before = joints.iter().rev().find(|(point, _)| *point <= segment);
    let after = joints.iter().find(|(point, _)| *point > segment);
    let (Some(&(before_point, before)), Some(&(after_point, after))) = (before, after) else {
        return Err(StarterError::InvalidAnchor(anchor.road_point));
    };

    let position = Position::on_segment(road, segment, anchor.junction.point);

    let on_joint = [segment, segment + 1].into_iter().find_map(|vertex| {
        road.point(vertex)
            .filter(|point| *point == anchor.junction.point)
            .and_then(|_| graph.joint_at(RoadPoint::new(feature, vertex)))
    });

    Ok(Endpoint {
        joint: on_joint.unwrap_or(virtual_id),
        road_point: anchor.road_point,
        junction: anchor.junction,
        position,
        is_virtual: on_joint.is_none(),
        bounds: (
            Bound {
                point: before_point,
                joint: before,
            },
            Bound {
                point: after_point,
                joint: after,
            },
        ),
    })
}

#[inline]
fn share(weight: Weight, fraction: f64) -> Weight {
    if fraction <= 0.0 {
        0.0
    } else {
        weight * fraction
    }
}

/// Time to travel along increasing vertex order, `from` lying before `to`.
fn travel_forward(weights: &[Weight], from: Position, to: Position) -> Weight {
    let (first, last) = (from.segment as usize, to.segment as usize);
    if first == last {
        return share(weights[first], to.fraction - from.fraction);
    }

    share(weights[first], 1.0 - from.fraction)
        + weights[first + 1..last].iter().sum::<Weight>()
        + share(weights[last], to.fraction)
}

/// Time to travel against the vertex order, `from` lying after `to`.
fn travel_backward(weights: &[Weight], from: Position, to: Position) -> Weight {
    let (first, last) = (from.segment as usize, to.segment as usize);
    if first == last {
        return share(weights[first], from.fraction - to.fraction);
    }

    share(weights[first], from.fraction)
        + weights[last + 1..first].iter().sum::<Weight>()
        + share(weights[last], 1.0 - to.fraction)
}
