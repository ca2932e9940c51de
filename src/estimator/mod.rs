//! Travel time of road segments and the lower bound used to guide the search.


use std::fmt::Debug;

use geo::{Distance, Haversine, Point};

use crate::codec::Road;
use crate::model::VehicleModel;
use crate::traffic::{SegmentKey, TrafficColoring};

/// Travel time in seconds.
pub type Weight = f64;

const KMH_TO_MS: f64 = 1.0 / 3.6;

pub trait EdgeEstimator: Debug + Send + Sync {
    /// Time to traverse segment `segment` of `road`, against the vertex order
    /// when `forward` is false. Closed segments weigh [`f64::INFINITY`].
    fn segment_weight(
        &self,
        road: &Road,
        segment: u32,
        forward: bool,
        model: &dyn VehicleModel,
        traffic: Option<&TrafficColoring>,
    ) -> Weight;

    /// A lower bound of the travel time between two points.
    fn heuristic(&self, from: Point, to: Point, model: &dyn VehicleModel) -> Weight;
}

/// Estimates travel time as great-circle length over the (traffic adjusted) model speed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TravelTimeEstimator;

impl EdgeEstimator for TravelTimeEstimator {
    fn segment_weight(
        &self,
        road: &Road,
        segment: u32,
        forward: bool,
        model: &dyn VehicleModel,
        traffic: Option<&TrafficColoring>,
    ) -> Weight {
        let (Some(from), Some(to)) = (road.point(segment), road.point(segment + 1)) else {
            return Weight::INFINITY;
        };

        let length = Haversine.distance(from, to);
        if length == 0.0 {
            return 0.0;
        }

        let factor = match traffic.and_then(|coloring| {
            coloring.get(&SegmentKey::new(road.id, segment, forward))
        }) {
            Some(group) => match group.factor() {
                Some(factor) => factor,
                None => return Weight::INFINITY,
            },
            None => 1.0,
        };

        let speed = model.speed(road) * KMH_TO_MS * factor;
        if speed <= 0.0 {
            return Weight::INFINITY;
        }

        length / speed
    }

    fn heuristic(&self, from: Point, to: Point, model: &dyn VehicleModel) -> Weight {
        Haversine.distance(from, to) / (model.max_speed() * KMH_TO_MS)
    }
}
