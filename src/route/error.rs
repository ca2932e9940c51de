use thiserror::Error;

use crate::starter::StarterError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("failed to expand joints: {0}")]
    Redress(#[from] StarterError),

    #[error("directions engine changed the junction count from {before} to {after}")]
    JunctionCountChanged { before: usize, after: usize },

    #[error("polyline holds {found} points, expected {expected}")]
    PolylineMismatch { expected: usize, found: usize },
}
