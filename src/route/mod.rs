//! Turns a joint sequence into the final route: polyline, time table and
//! per-leg traffic.

pub mod error;

#[cfg(test)]
mod test;

#[doc(inline)]
pub use error::RouteError;

use std::fmt::Debug;

use geo::{Distance, Haversine, LineString, Point};
use itertools::Itertools;
use log::debug;
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::codec::RoadPoint;
use crate::estimator::Weight;
use crate::graph::{JointId, Junction};
use crate::starter::Starter;
use crate::traffic::{SegmentKey, SpeedGroup, TrafficColoring};

/// A road point on the route and the time elapsed when reaching it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePoint {
    pub road_point: RoadPoint,
    pub junction: Junction,
    /// Seconds since the start.
    pub time: Weight,
}

impl RoutePoint {
    pub fn new(road_point: RoadPoint, junction: Junction, time: Weight) -> Self {
        RoutePoint {
            road_point,
            junction,
            time,
        }
    }
}

/// Reconstructs the drawable polyline from the junctions of a route.
pub trait DirectionsEngine: Debug + Send + Sync {
    /// Returns the polyline. May rewrite `junctions`, but must not change their count.
    fn generate(&self, junctions: &mut Vec<Junction>) -> Vec<Junction>;
}

/// Emits every leg as its two end points, so interior junctions appear twice.
#[derive(Debug, Default, Clone, Copy)]
pub struct SegmentDirectionsEngine;

impl DirectionsEngine for SegmentDirectionsEngine {
    fn generate(&self, junctions: &mut Vec<Junction>) -> Vec<Junction> {
        if junctions.len() < 2 {
            return junctions.clone();
        }

        junctions
            .windows(2)
            .flat_map(|leg| [leg[0], leg[1]])
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub name: String,
    /// Requested start and finish, before snapping onto the network.
    pub start: Point,
    pub finish: Point,
    pub poly: Vec<Junction>,
    /// `(polyline index, seconds since start)`, indices strictly increasing.
    pub times: Vec<(usize, Weight)>,
    /// Slowest speed group of every leg. Empty without traffic data.
    pub traffic: Vec<SpeedGroup>,
}

impl Route {
    pub fn total_time(&self) -> Weight {
        self.times.last().map_or(0.0, |(_, time)| *time)
    }

    /// Great-circle length of the polyline in meters.
    pub fn length(&self) -> f64 {
        self.poly
            .iter()
            .tuple_windows()
            .map(|(from, to)| Haversine.distance(from.point, to.point))
            .sum()
    }

    pub fn line_string(&self) -> LineString {
        self.poly.iter().map(|junction| junction.point).collect()
    }
}

/// Assembles [`Route`]s named after the router producing them.
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    name: String,
}

impl RouteBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        RouteBuilder { name: name.into() }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all))]
    pub fn build(
        &self,
        joints: &[JointId],
        starter: &Starter,
        directions: &dyn DirectionsEngine,
        traffic: Option<&TrafficColoring>,
        start: Point,
        finish: Point,
    ) -> Result<Route, RouteError> {
        let redressed = starter.redress_route(joints)?;

        let legs = traffic
            .map(|coloring| {
                redressed
                    .chunks_exact(2)
                    .filter(|edge| edge[0].junction != edge[1].junction)
                    .map(|edge| leg_traffic(coloring, edge[0].road_point, edge[1].road_point))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let mut points = redressed;
        points.dedup_by(|next, kept| next.junction == kept.junction);

        let mut junctions = points
            .iter()
            .map(|point| Junction::new(point.junction.point))
            .collect::<Vec<_>>();

        let count = junctions.len();
        let poly = directions.generate(&mut junctions);
        if junctions.len() != count {
            return Err(RouteError::JunctionCountChanged {
                before: count,
                after: junctions.len(),
            });
        }

        if count < 2 {
            return Ok(Route {
                name: self.name.clone(),
                start,
                finish,
                poly: junctions,
                times: vec![(0, 0.0)],
                traffic: Vec::new(),
            });
        }

        let expected = 2 * (count - 1);
        if poly.len() != expected {
            return Err(RouteError::PolylineMismatch {
                expected,
                found: poly.len(),
            });
        }

        let mut times = Vec::with_capacity(expected);
        times.push((0, points[0].time));
        for (index, point) in points.iter().enumerate().take(count - 1).skip(1) {
            times.push((2 * index - 1, point.time));
            times.push((2 * index, point.time));
        }
        times.push((expected - 1, points[count - 1].time));

        debug!(
            "Route of {count} junctions, {} polyline points, {:.1} s",
            poly.len(),
            points[count - 1].time
        );

        Ok(Route {
            name: self.name.clone(),
            start,
            finish,
            poly,
            times,
            traffic: legs,
        })
    }
}

/// Slowest coloured group over the segments an edge spans.
fn leg_traffic(coloring: &TrafficColoring, from: RoadPoint, to: RoadPoint) -> SpeedGroup {
    let forward = to.point >= from.point;
    let (low, high) = if forward {
        (from.point, to.point)
    } else {
        (to.point, from.point)
    };

    (low..high.max(low + 1))
        .filter_map(|segment| coloring.get(&SegmentKey::new(from.feature, segment, forward)))
        .copied()
        .min_by_key(|group| group.speed_percent().unwrap_or(0))
        .unwrap_or(SpeedGroup::Unknown)
}
