//! The road network of one tile as a graph of joints.
//!
//! A joint is a location where road points coincide: every road end and
//! every vertex shared by several roads. Edges run between neighbouring
//! joints of one feature and weigh the travel time along it. Turn
//! restrictions are kept beside the adjacency in a [`RestrictionSet`] so the
//! graph itself stays restriction agnostic.

pub mod error;
pub mod restriction;


#[doc(inline)]
pub use error::GraphError;
#[doc(inline)]
pub use restriction::RestrictionSet;

use std::fmt::{Debug, Formatter};
use std::time::Instant;

use geo::Point;
use log::debug;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::codec::{FeatureId, Restriction, Road, RoadPoint, RoutingSection};
use crate::estimator::{EdgeEstimator, Weight};
use crate::model::VehicleModel;
use crate::traffic::TrafficColoring;

/// Identifier of a joint, valid within one [`Graph`].
pub type JointId = u32;

pub const DEFAULT_ALTITUDE_METERS: i16 = 0;

/// A position on the road network. Two junctions are equal when their coordinates are.
#[derive(Debug, Clone, Copy)]
pub struct Junction {
    pub point: Point,
    pub altitude: i16,
}

impl Junction {
    pub fn new(point: Point) -> Self {
        Junction {
            point,
            altitude: DEFAULT_ALTITUDE_METERS,
        }
    }
}

impl PartialEq for Junction {
    fn eq(&self, other: &Self) -> bool {
        self.point == other.point
    }
}

#[derive(Debug, Clone)]
pub struct Joint {
    pub id: JointId,
    pub junction: Junction,
    pub road_points: SmallVec<[RoadPoint; 4]>,
}

/// A directed traversal of one feature between two neighbouring joints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub from: RoadPoint,
    pub to: RoadPoint,
    pub weight: Weight,
}

impl Edge {
    #[inline]
    pub fn feature(&self) -> FeatureId {
        self.from.feature
    }

    /// Whether the edge follows the vertex order of its feature.
    #[inline]
    pub fn is_forward(&self) -> bool {
        self.to.point > self.from.point
    }
}

/// Per segment travel times of one accessible road.
#[derive(Debug, Clone)]
pub struct RoadWeights {
    pub forward: Vec<Weight>,
    /// Absent on one-way roads.
    pub backward: Option<Vec<Weight>>,
}

pub struct Graph {
    graph: DiGraph<Joint, Edge, u32>,
    roads: FxHashMap<FeatureId, Road>,
    weights: FxHashMap<FeatureId, RoadWeights>,
    road_joints: FxHashMap<FeatureId, Vec<(u32, JointId)>>,
    lookup: FxHashMap<RoadPoint, JointId>,
    restrictions: RestrictionSet,
}

impl Debug for Graph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Graph with {} joints, {} edges, {} roads",
            self.graph.node_count(),
            self.graph.edge_count(),
            self.roads.len()
        )
    }
}

impl Graph {
    /// Builds the graph of a routing section for one vehicle profile.
    ///
    /// Road ends missing from the section's joint list are added as joints.
    /// Edges are created along every road the model may use, backwards too
    /// unless the road is one-way for the model. Closed segments drop the
    /// edges crossing them.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all))]
    pub fn build(
        section: &RoutingSection,
        model: &dyn VehicleModel,
        estimator: &dyn EdgeEstimator,
        traffic: Option<&TrafficColoring>,
    ) -> Result<Graph, GraphError> {
        let start_time = Instant::now();

        let mut roads = FxHashMap::default();
        for road in &section.roads {
            if road.points.len() < 2 {
                return Err(GraphError::DegenerateRoad(road.id));
            }

            if roads.insert(road.id, road.clone()).is_some() {
                return Err(GraphError::DuplicateFeature(road.id));
            }
        }

        let mut graph = DiGraph::with_capacity(section.joints.len(), section.joints.len() * 2);
        let mut lookup = FxHashMap::default();

        for (index, road_points) in section.joints.iter().enumerate() {
            let first = road_points.first().ok_or(GraphError::EmptyJoint(index))?;
            let point = vertex(&roads, *first)?;
            let id = graph.node_count() as JointId;

            for road_point in road_points {
                vertex(&roads, *road_point)?;
                if lookup.insert(*road_point, id).is_some() {
                    return Err(GraphError::RoadPointReused(*road_point));
                }
            }

            graph.add_node(Joint {
                id,
                junction: Junction::new(point),
                road_points: road_points.iter().copied().collect(),
            });
        }

        let mut features = roads.keys().copied().collect::<Vec<_>>();
        features.sort_unstable();

        for feature in &features {
            let road = &roads[feature];
            for point in [0, road.last_point()] {
                let road_point = RoadPoint::new(road.id, point);
                if lookup.contains_key(&road_point) {
                    continue;
                }

                debug!("Road end {road_point:?} is not a joint, adding one");
                let id = graph.node_count() as JointId;
                lookup.insert(road_point, id);
                graph.add_node(Joint {
                    id,
                    junction: Junction::new(road.points[point as usize]),
                    road_points: SmallVec::from_elem(road_point, 1),
                });
            }
        }

        let mut road_joints: FxHashMap<FeatureId, Vec<(u32, JointId)>> = FxHashMap::default();
        for (road_point, joint) in &lookup {
            road_joints
                .entry(road_point.feature)
                .or_default()
                .push((road_point.point, *joint));
        }
        road_joints.values_mut().for_each(|joints| joints.sort_unstable());

        // A span leaving and re-entering the same joint is a loop. A joint at
        // an interior vertex splits it into two edges.
        for feature in &features {
            let road = &roads[feature];
            let Some(joints) = road_joints.get_mut(feature) else {
                continue;
            };

            let splits = joints
                .windows(2)
                .filter(|pair| pair[0].1 == pair[1].1 && pair[1].0 - pair[0].0 >= 2)
                .map(|pair| (pair[0].0 + pair[1].0) / 2)
                .collect::<SmallVec<[u32; 2]>>();

            for point in splits {
                let Some(position) = road.point(point) else {
                    continue;
                };

                let road_point = RoadPoint::new(road.id, point);
                debug!("Splitting loop of feature {feature} at {road_point:?}");

                let id = graph.node_count() as JointId;
                lookup.insert(road_point, id);
                graph.add_node(Joint {
                    id,
                    junction: Junction::new(position),
                    road_points: SmallVec::from_elem(road_point, 1),
                });
                joints.push((point, id));
            }

            joints.sort_unstable();
        }

        let mut weights = FxHashMap::default();
        for feature in &features {
            let road = &roads[feature];
            if !model.is_accessible(road) {
                continue;
            }

            let segments = road.segment_count() as u32;
            let forward = (0..segments)
                .map(|segment| estimator.segment_weight(road, segment, true, model, traffic))
                .collect::<Vec<_>>();

            let backward = (!model.is_one_way(road)).then(|| {
                (0..segments)
                    .map(|segment| estimator.segment_weight(road, segment, false, model, traffic))
                    .collect::<Vec<_>>()
            });

            for pair in road_joints[feature].windows(2) {
                let &[(a_point, a), (b_point, b)] = pair else {
                    continue;
                };

                if a == b {
                    debug!("Skipping loop of feature {feature} through joint {a}");
                    continue;
                }

                let span = a_point as usize..b_point as usize;
                let from = RoadPoint::new(*feature, a_point);
                let to = RoadPoint::new(*feature, b_point);

                let weight = forward[span.clone()].iter().sum::<Weight>();
                if weight.is_finite() {
                    graph.add_edge(node(a), node(b), Edge { from, to, weight });
                }

                if let Some(backward) = &backward {
                    let weight = backward[span].iter().sum::<Weight>();
                    if weight.is_finite() {
                        graph.add_edge(node(b), node(a), Edge { from: to, to: from, weight });
                    }
                }
            }

            weights.insert(*feature, RoadWeights { forward, backward });
        }

        debug!(
            "Graph build took {:?}: {} joints, {} edges",
            start_time.elapsed(),
            graph.node_count(),
            graph.edge_count()
        );

        Ok(Graph {
            graph,
            roads,
            weights,
            road_joints,
            lookup,
            restrictions: RestrictionSet::default(),
        })
    }

    /// Registers turn restrictions and resolves them to forbidden joint triples.
    ///
    /// Restrictions naming unknown features, or features without a common
    /// joint, are skipped. Returns the number of restrictions applied.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all))]
    pub fn apply_restrictions(&mut self, restrictions: &[Restriction]) -> usize {
        let mut applied = 0;

        for restriction in restrictions {
            let (Some(from), Some(to)) = (
                self.road_joints.get(&restriction.from),
                self.road_joints.get(&restriction.to),
            ) else {
                debug!("Skipping {restriction:?}: unknown feature");
                continue;
            };

            let mut shared = from
                .iter()
                .map(|(_, joint)| *joint)
                .filter(|joint| to.iter().any(|(_, other)| other == joint))
                .collect::<SmallVec<[JointId; 2]>>();
            shared.sort_unstable();
            shared.dedup();

            if shared.is_empty() {
                debug!("Skipping {restriction:?}: features share no joint");
                continue;
            }

            for via in shared {
                self.restrictions.add_rule(restriction, via);
            }
            applied += 1;
        }

        let blocked = self.resolve_blocked();
        debug!(
            "Applied {applied} of {} restrictions, {} transitions blocked",
            restrictions.len(),
            blocked.len()
        );

        self.restrictions.set_blocked(blocked);
        applied
    }

    // A triple is blocked only when no pair of parallel edges makes the turn legal.
    fn resolve_blocked(&self) -> FxHashSet<(JointId, JointId, JointId)> {
        let mut blocked = FxHashSet::default();

        for (feature, via) in self.restrictions.rule_keys() {
            for (prev, edge) in self.ingoing(via) {
                if edge.feature() != feature {
                    continue;
                }

                for (next, _) in self.outgoing(via) {
                    let allowed = self
                        .edges_between(prev, via)
                        .any(|inbound| {
                            self.edges_between(via, next).any(|outbound| {
                                self.restrictions.is_turn_allowed(
                                    inbound.feature(),
                                    via,
                                    outbound.feature(),
                                )
                            })
                        });

                    if !allowed {
                        blocked.insert((prev, via, next));
                    }
                }
            }
        }

        blocked
    }

    #[inline]
    pub fn joint_count(&self) -> u32 {
        self.graph.node_count() as u32
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        self.graph.node_weight(node(id))
    }

    pub fn junction(&self, id: JointId) -> Option<Junction> {
        self.joint(id).map(|joint| joint.junction)
    }

    /// The joint located at a road point, if that vertex is one.
    #[inline]
    pub fn joint_at(&self, road_point: RoadPoint) -> Option<JointId> {
        self.lookup.get(&road_point).copied()
    }

    pub fn road(&self, feature: FeatureId) -> Option<&Road> {
        self.roads.get(&feature)
    }

    /// Segment weights of a road, `None` when the profile may not use it.
    pub fn road_weights(&self, feature: FeatureId) -> Option<&RoadWeights> {
        self.weights.get(&feature)
    }

    /// Joints along a feature as `(vertex index, joint)`, in vertex order.
    pub fn road_joints(&self, feature: FeatureId) -> &[(u32, JointId)] {
        self.road_joints
            .get(&feature)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn outgoing(&self, id: JointId) -> impl Iterator<Item = (JointId, &Edge)> + '_ {
        self.graph
            .edges_directed(node(id), Direction::Outgoing)
            .map(|edge| (edge.target().index() as JointId, edge.weight()))
    }

    pub fn ingoing(&self, id: JointId) -> impl Iterator<Item = (JointId, &Edge)> + '_ {
        self.graph
            .edges_directed(node(id), Direction::Incoming)
            .map(|edge| (edge.source().index() as JointId, edge.weight()))
    }

    pub fn edges_between(&self, from: JointId, to: JointId) -> impl Iterator<Item = &Edge> + '_ {
        self.graph
            .edges_connecting(node(from), node(to))
            .map(|edge| edge.weight())
    }

    pub fn restrictions(&self) -> &RestrictionSet {
        &self.restrictions
    }

    #[inline]
    pub fn is_transition_allowed(&self, prev: JointId, via: JointId, next: JointId) -> bool {
        self.restrictions.is_transition_allowed(prev, via, next)
    }

    #[inline]
    pub fn is_turn_allowed(&self, from: FeatureId, via: JointId, to: FeatureId) -> bool {
        self.restrictions.is_turn_allowed(from, via, to)
    }
}

#[inline]
fn node(id: JointId) -> NodeIndex<u32> {
    NodeIndex::new(id as usize)
}

fn vertex(roads: &FxHashMap<FeatureId, Road>, road_point: RoadPoint) -> Result<Point, GraphError> {
    roads
        .get(&road_point.feature)
        .and_then(|road| road.point(road_point.point))
        .ok_or(GraphError::UnknownRoadPoint(road_point))
}
