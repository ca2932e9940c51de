#![doc = include_str!("../readme.md")]

#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;
#[cfg_attr(feature = "mimalloc", global_allocator)]
#[cfg(feature = "mimalloc")]
static GLOBAL: MiMalloc = MiMalloc;

#[doc(hidden)]
pub mod estimator;
#[doc(hidden)]
pub mod graph;
#[doc(hidden)]
pub mod model;
#[doc(hidden)]
pub mod proximity;
#[doc(hidden)]
pub mod route;
#[doc(hidden)]
pub mod router;
#[doc(hidden)]
pub mod search;
#[doc(hidden)]
pub mod starter;
#[doc(hidden)]
pub mod tile;
#[doc(hidden)]
pub mod traffic;

pub use mwm_codec as codec;

#[doc(inline)]
pub use estimator::{EdgeEstimator, TravelTimeEstimator, Weight};
#[doc(inline)]
pub use graph::{Graph, GraphError, JointId, Junction};
#[doc(inline)]
pub use model::{DefaultModelFactory, VehicleModel, VehicleModelFactory, VehicleType};
#[doc(inline)]
pub use proximity::{find_closest_edge, ClosestEdge, RTreeRoadIndex, RoadIndex};
#[doc(inline)]
pub use route::{DirectionsEngine, Route, RouteBuilder, RouteError, RoutePoint, SegmentDirectionsEngine};
#[doc(inline)]
pub use router::{CancelFlag, NullDelegate, ResultCode, Router, RouterConfig, RouterDelegate};
#[doc(inline)]
pub use search::{AStarProgress, BidirectionalAStar, SearchError, SearchGraph, SearchObserver};
#[doc(inline)]
pub use starter::{Anchor, SearchVertex, Starter, StarterError};
#[doc(inline)]
pub use tile::{DirectoryTile, MemoryRepository, MemoryTile, Tile, TileError, TileId, TileRepository};
#[doc(inline)]
pub use traffic::{SpeedGroup, TrafficCache, TrafficColoring, TrafficGuard, TrafficSource};
