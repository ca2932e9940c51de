use approx::assert_relative_eq;
use geo::Point;
use mwm_fixtures::{at, grid, straight_road};

use crate::codec::{RoadPoint, RoutingSection};
use crate::estimator::TravelTimeEstimator;
use crate::graph::{Graph, JointId, Junction};
use crate::model::SpeedTable;
use crate::route::{DirectionsEngine, RouteBuilder, RouteError, SegmentDirectionsEngine};
use crate::search::BidirectionalAStar;
use crate::starter::{Anchor, Starter};
use crate::traffic::{SegmentKey, SpeedGroup, TrafficColoring};

const NAME: &str = "test-router";

fn car_graph(section: &RoutingSection) -> Graph {
    Graph::build(section, &SpeedTable::car(), &TravelTimeEstimator, None).expect("graph must build")
}

fn route_joints(starter: &Starter) -> Vec<JointId> {
    let result = BidirectionalAStar
        .find_path(starter, starter.start_vertex(), starter.finish_vertex(), &mut ())
        .expect("route exists");

    let mut joints = result.path.iter().map(|vertex| vertex.curr).collect::<Vec<_>>();
    joints.dedup();
    joints
}

/// Drops the last junction it is given.
#[derive(Debug)]
struct ShrinkingEngine;

impl DirectionsEngine for ShrinkingEngine {
    fn generate(&self, junctions: &mut Vec<Junction>) -> Vec<Junction> {
        junctions.pop();
        junctions.clone()
    }
}

/// Returns the junctions unchanged, without duplicating interior ones.
#[derive(Debug)]
struct PassThroughEngine;

impl DirectionsEngine for PassThroughEngine {
    fn generate(&self, junctions: &mut Vec<Junction>) -> Vec<Junction> {
        junctions.clone()
    }
}

#[test]
fn segment_engine_duplicates_interior_junctions() {
    let mut junctions = vec![
        Junction::new(at(0.0, 0.0)),
        Junction::new(at(1.0, 0.0)),
        Junction::new(at(2.0, 0.0)),
    ];

    let poly = SegmentDirectionsEngine.generate(&mut junctions);
    assert_eq!(junctions.len(), 3);
    assert_eq!(poly.len(), 4);
    assert_eq!(poly[1], poly[2]);
    assert_eq!(poly[0], junctions[0]);
    assert_eq!(poly[3], junctions[2]);
}

#[test_log::test]
fn time_table_follows_polyline_layout() {
    let fixture = grid(4);
    let graph = car_graph(&fixture.routing);
    let model = SpeedTable::car();

    let start = Anchor::new(RoadPoint::new(0, 0), at(0.5, 0.0));
    let finish = Anchor::new(RoadPoint::new(3, 2), at(2.5, 3.0));
    let starter = Starter::new(&graph, &model, &TravelTimeEstimator, start, finish).expect("valid anchors");
    let joints = route_joints(&starter);

    let route = RouteBuilder::new(NAME)
        .build(&joints, &starter, &SegmentDirectionsEngine, None, at(0.5, 0.1), at(2.5, 3.1))
        .expect("route builds");

    let count = joints.len();
    assert!(count >= 3);
    assert_eq!(route.name, NAME);
    assert_eq!(route.poly.len(), 2 * (count - 1));
    assert_eq!(route.times.len(), route.poly.len());
    assert_eq!(route.times.first().map(|(index, _)| *index), Some(0));
    assert_eq!(route.times.last().map(|(index, _)| *index), Some(route.poly.len() - 1));

    assert!(route.times.windows(2).all(|pair| pair[0].0 < pair[1].0));
    assert!(route.times.windows(2).all(|pair| pair[0].1 <= pair[1].1));

    for index in 1..count - 1 {
        assert_eq!(route.times[2 * index - 1].1, route.times[2 * index].1);
    }

    assert!(route.total_time() > 0.0);
    assert!(route.traffic.is_empty());
}

#[test_log::test]
fn total_time_matches_search_weight() {
    let fixture = straight_road();
    let graph = car_graph(&fixture.routing);
    let model = SpeedTable::car();

    let start = Anchor::new(RoadPoint::new(1, 1), at(1.5, 0.0));
    let finish = Anchor::new(RoadPoint::new(1, 8), at(8.5, 0.0));
    let starter = Starter::new(&graph, &model, &TravelTimeEstimator, start, finish).expect("valid anchors");

    let result = BidirectionalAStar
        .find_path(&starter, starter.start_vertex(), starter.finish_vertex(), &mut ())
        .expect("route exists");
    let joints = route_joints(&starter);

    let route = RouteBuilder::new(NAME)
        .build(&joints, &starter, &SegmentDirectionsEngine, None, at(1.5, 0.0), at(8.5, 0.0))
        .expect("route builds");

    assert_relative_eq!(route.total_time(), result.distance, epsilon = 1e-6);
    assert_eq!(route.poly.len(), 2);
    assert_relative_eq!(route.length(), 7.0 * 67.7, max_relative = 0.01);
    assert_eq!(route.line_string().0.len(), 2);
}

#[test_log::test]
fn single_joint_route() {
    let fixture = straight_road();
    let graph = car_graph(&fixture.routing);
    let model = SpeedTable::car();

    let anchor = Anchor::new(RoadPoint::new(1, 3), at(3.5, 0.0));
    let starter = Starter::new(&graph, &model, &TravelTimeEstimator, anchor, anchor).expect("valid anchors");

    let route = RouteBuilder::new(NAME)
        .build(
            &[starter.start_joint()],
            &starter,
            &SegmentDirectionsEngine,
            None,
            at(3.5, 0.0),
            at(3.5, 0.0),
        )
        .expect("route builds");

    assert_eq!(route.poly, vec![Junction::new(at(3.5, 0.0))]);
    assert_eq!(route.times, vec![(0, 0.0)]);
    assert_eq!(route.total_time(), 0.0);
    assert_eq!(route.length(), 0.0);
}

#[test_log::test]
fn engine_faults_are_reported() {
    let fixture = straight_road();
    let graph = car_graph(&fixture.routing);
    let model = SpeedTable::car();

    let start = Anchor::new(RoadPoint::new(1, 1), at(1.5, 0.0));
    let finish = Anchor::new(RoadPoint::new(1, 8), at(8.5, 0.0));
    let starter = Starter::new(&graph, &model, &TravelTimeEstimator, start, finish).expect("valid anchors");
    let joints = route_joints(&starter);
    let builder = RouteBuilder::new(NAME);
    let (from, to) = (Point::new(0.0, 0.0), Point::new(0.0, 0.0));

    let error = builder
        .build(&joints, &starter, &ShrinkingEngine, None, from, to)
        .err();
    assert_eq!(error, Some(RouteError::JunctionCountChanged { before: 2, after: 1 }));

    let error = builder
        .build(&joints, &starter, &PassThroughEngine, None, from, to)
        .err();
    assert_eq!(error, None);

    let fixture = grid(3);
    let graph = car_graph(&fixture.routing);
    let start = Anchor::new(RoadPoint::new(0, 0), at(0.5, 0.0));
    let finish = Anchor::new(RoadPoint::new(2, 1), at(1.5, 2.0));
    let starter = Starter::new(&graph, &model, &TravelTimeEstimator, start, finish).expect("valid anchors");
    let joints = route_joints(&starter);

    let error = builder
        .build(&joints, &starter, &PassThroughEngine, None, from, to)
        .err();
    assert_eq!(
        error,
        Some(RouteError::PolylineMismatch {
            expected: 2 * (joints.len() - 1),
            found: joints.len(),
        })
    );

    let error = builder.build(&[], &starter, &SegmentDirectionsEngine, None, from, to).err();
    assert!(matches!(error, Some(RouteError::Redress(_))));
}

#[test_log::test]
fn legs_carry_slowest_speed_group() {
    let fixture = straight_road();
    let mut coloring = TrafficColoring::default();
    coloring.insert(SegmentKey::new(1, 3, true), SpeedGroup::G4);
    coloring.insert(SegmentKey::new(1, 5, true), SpeedGroup::G1);

    let graph = Graph::build(&fixture.routing, &SpeedTable::car(), &TravelTimeEstimator, Some(&coloring))
        .expect("graph must build");
    let model = SpeedTable::car();

    let start = Anchor::new(RoadPoint::new(1, 0), at(0.0, 0.0));
    let finish = Anchor::new(RoadPoint::new(1, 9), at(10.0, 0.0));
    let starter = Starter::new(&graph, &model, &TravelTimeEstimator, start, finish).expect("valid anchors");
    let joints = route_joints(&starter);

    let route = RouteBuilder::new(NAME)
        .build(&joints, &starter, &SegmentDirectionsEngine, Some(&coloring), at(0.0, 0.0), at(10.0, 0.0))
        .expect("route builds");

    assert_eq!(route.traffic, vec![SpeedGroup::G1]);
}
