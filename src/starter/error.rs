use thiserror::Error;

use crate::codec::{FeatureId, RoadPoint};
use crate::graph::JointId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StarterError {
    #[error("anchor {0:?} does not lie on a segment of the graph")]
    InvalidAnchor(RoadPoint),

    #[error("feature {0} cannot be used by this vehicle")]
    InaccessibleRoad(FeatureId),

    #[error("joint {0} is unknown")]
    UnknownJoint(JointId),

    #[error("no edge from joint {from} to joint {to}")]
    MissingEdge { from: JointId, to: JointId },

    #[error("route holds no joints")]
    EmptyRoute,
}
