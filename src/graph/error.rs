use thiserror::Error;

use crate::codec::{FeatureId, RoadPoint};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("feature {0} appears more than once")]
    DuplicateFeature(FeatureId),

    #[error("feature {0} has fewer than two vertices")]
    DegenerateRoad(FeatureId),

    #[error("joint {0} holds no road points")]
    EmptyJoint(usize),

    #[error("joint references unknown road point {0:?}")]
    UnknownRoadPoint(RoadPoint),

    #[error("road point {0:?} belongs to more than one joint")]
    RoadPointReused(RoadPoint),
}
