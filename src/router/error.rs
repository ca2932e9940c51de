use strum::{AsRefStr, EnumString};
use thiserror::Error;

use crate::codec::CodecError;
use crate::graph::GraphError;
use crate::route::RouteError;
use crate::search::SearchError;
use crate::starter::StarterError;
use crate::tile::{TileError, TileId};

/// Outcome of a route computation, as reported to callers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ResultCode {
    #[error("route calculated")]
    NoError,

    #[error("routing data of the tile is missing or unreadable")]
    RouteFileNotExist,

    #[error("no road near the start point")]
    StartPointNotFound,

    #[error("no road near the end point")]
    EndPointNotFound,

    #[error("start and end point are not connected")]
    RouteNotFound,

    #[error("route calculation was cancelled")]
    Cancelled,

    #[error("internal routing error")]
    InternalError,
}

/// Everything that can go wrong inside one route computation.
#[derive(Error, Debug)]
pub(crate) enum RouterFault {
    #[error("tile {0} is not available")]
    TileUnavailable(TileId),

    #[error("no accessible road near the start point")]
    StartNotFound,

    #[error("no accessible road near the end point")]
    EndNotFound,

    #[error(transparent)]
    Tile(#[from] TileError),

    #[error("routing section is corrupt: {0}")]
    Codec(#[from] CodecError),

    #[error("graph build failed: {0}")]
    Graph(#[from] GraphError),

    #[error("could not attach route ends: {0}")]
    Starter(#[from] StarterError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("path of {0} vertices does not end at the finish pseudo vertex")]
    UnterminatedPath(usize),

    #[error("route reconstruction failed: {0}")]
    Route(#[from] RouteError),

    #[error("cancelled by the delegate")]
    Cancelled,
}

impl RouterFault {
    pub(crate) fn code(&self) -> ResultCode {
        match self {
            RouterFault::TileUnavailable(_)
            | RouterFault::Tile(_)
            | RouterFault::Codec(_)
            | RouterFault::Graph(_) => ResultCode::RouteFileNotExist,
            RouterFault::StartNotFound => ResultCode::StartPointNotFound,
            RouterFault::EndNotFound => ResultCode::EndPointNotFound,
            RouterFault::Search(SearchError::NoPath) => ResultCode::RouteNotFound,
            RouterFault::Search(SearchError::Cancelled) | RouterFault::Cancelled => ResultCode::Cancelled,
            RouterFault::Starter(_) | RouterFault::UnterminatedPath(_) | RouterFault::Route(_) => {
                ResultCode::InternalError
            }
        }
    }
}
