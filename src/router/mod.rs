//! The routing facade: resolves the route ends, builds the tile graph and
//! runs the search, reporting every failure as a [`ResultCode`].

pub mod config;
pub mod delegate;
pub mod error;


#[doc(inline)]
pub use config::RouterConfig;
#[doc(inline)]
pub use delegate::{CancelFlag, NullDelegate, RouterDelegate};
#[doc(inline)]
pub use error::ResultCode;

use std::fmt::{Debug, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use geo::Point;
use log::{debug, error, info, warn};
use measure_time::debug_time;
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::codec::{RestrictionSection, RoutingSection, RESTRICTIONS_SECTION, ROUTING_SECTION};
use crate::estimator::{EdgeEstimator, TravelTimeEstimator};
use crate::graph::Graph;
use crate::model::{DefaultModelFactory, VehicleModel, VehicleModelFactory, VehicleType};
use crate::proximity::{find_closest_edge, ClosestEdge, RoadIndex};
use crate::route::{DirectionsEngine, Route, RouteBuilder, SegmentDirectionsEngine};
use crate::search::{AStarProgress, BidirectionalAStar, SearchObserver};
use crate::starter::{SearchVertex, Starter};
use crate::tile::{Tile, TileError, TileId, TileRepository};
use crate::traffic::TrafficCache;
use error::RouterFault;

pub struct Router {
    name: String,
    repository: Arc<dyn TileRepository>,
    index: Arc<dyn RoadIndex>,
    models: Arc<dyn VehicleModelFactory>,
    estimator: Arc<dyn EdgeEstimator>,
    directions: Arc<dyn DirectionsEngine>,
    traffic: Arc<TrafficCache>,
    config: RouterConfig,
}

impl Debug for Router {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Router {} ({:?})", self.name, self.models.vehicle())
    }
}

impl Router {
    pub fn new(
        name: impl Into<String>,
        repository: Arc<dyn TileRepository>,
        index: Arc<dyn RoadIndex>,
        models: Arc<dyn VehicleModelFactory>,
        estimator: Arc<dyn EdgeEstimator>,
        directions: Arc<dyn DirectionsEngine>,
    ) -> Self {
        Router {
            name: name.into(),
            repository,
            index,
            models,
            estimator,
            directions,
            traffic: Arc::new(TrafficCache::default()),
            config: RouterConfig::default(),
        }
    }

    /// A router for `vehicle` using the stock estimator and directions engine.
    pub fn for_vehicle(
        vehicle: VehicleType,
        repository: Arc<dyn TileRepository>,
        index: Arc<dyn RoadIndex>,
    ) -> Self {
        Router::new(
            format!("astar-bidirectional-{vehicle}"),
            repository,
            index,
            Arc::new(DefaultModelFactory::new(vehicle)),
            Arc::new(TravelTimeEstimator),
            Arc::new(SegmentDirectionsEngine),
        )
    }

    pub fn car(repository: Arc<dyn TileRepository>, index: Arc<dyn RoadIndex>) -> Self {
        Router::for_vehicle(VehicleType::Car, repository, index)
    }

    pub fn bicycle(repository: Arc<dyn TileRepository>, index: Arc<dyn RoadIndex>) -> Self {
        Router::for_vehicle(VehicleType::Bicycle, repository, index)
    }

    pub fn pedestrian(repository: Arc<dyn TileRepository>, index: Arc<dyn RoadIndex>) -> Self {
        Router::for_vehicle(VehicleType::Pedestrian, repository, index)
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares a traffic cache, typically with the routers of other profiles.
    pub fn with_traffic(mut self, traffic: Arc<TrafficCache>) -> Self {
        self.traffic = traffic;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Computes the fastest route between two points of one tile.
    ///
    /// Never panics: faults of any stage, panics included, are logged and
    /// reported as a [`ResultCode`].
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip(self, delegate)))]
    pub fn calculate_route(
        &self,
        tile: &TileId,
        start: Point,
        finish: Point,
        delegate: &dyn RouterDelegate,
    ) -> Result<Route, ResultCode> {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.compute(tile, start, finish, delegate)));

        match outcome {
            Ok(Ok(route)) => {
                info!(
                    "{}: route in {tile} from {start:?} to {finish:?} computed in {:?}",
                    self.name,
                    started.elapsed()
                );
                Ok(route)
            }
            Ok(Err(fault)) => {
                let code = fault.code();
                error!("{}: routing in {tile} from {start:?} to {finish:?} failed ({code:?}): {fault}", self.name);
                Err(code)
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|message| message.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_default();

                error!("{}: routing in {tile} from {start:?} to {finish:?} panicked: {message}", self.name);
                Err(ResultCode::InternalError)
            }
        }
    }

    fn compute(
        &self,
        tile_id: &TileId,
        start: Point,
        finish: Point,
        delegate: &dyn RouterDelegate,
    ) -> Result<Route, RouterFault> {
        let tile = self
            .repository
            .tile(tile_id)
            .filter(|tile| tile.is_alive())
            .ok_or_else(|| RouterFault::TileUnavailable(tile_id.clone()))?;

        let model = self.models.model_for_country(tile.country());

        let start_edge = self.closest_edge(tile_id, start, model.as_ref()).ok_or(RouterFault::StartNotFound)?;
        let finish_edge = self.closest_edge(tile_id, finish, model.as_ref()).ok_or(RouterFault::EndNotFound)?;

        let traffic = self.traffic.acquire(tile_id);

        let section = load_routing(tile.as_ref())?;
        let mut graph = {
            debug_time!("graph build for {tile_id}");
            Graph::build(&section, model.as_ref(), self.estimator.as_ref(), traffic.coloring())?
        };

        if let Some(restrictions) = load_restrictions(tile.as_ref()) {
            graph.apply_restrictions(&restrictions.restrictions);
        }

        let starter = Starter::new(
            &graph,
            model.as_ref(),
            self.estimator.as_ref(),
            start_edge.anchor(),
            finish_edge.anchor(),
        )?;

        let mut observer = DelegateObserver {
            delegate,
            starter: &starter,
            progress: AStarProgress::new(start_edge.junction.point, finish_edge.junction.point),
            config: &self.config,
            reported: 0.0,
            visits: 0,
        };

        let result = {
            debug_time!("bidirectional search in {tile_id}");
            BidirectionalAStar.find_path(&starter, starter.start_vertex(), starter.finish_vertex(), &mut observer)?
        };

        let mut joints = result.path.iter().map(|vertex| vertex.curr).collect::<Vec<_>>();
        if joints.len() >= 2 {
            match joints.as_slice() {
                [.., previous, last] if previous == last => {
                    joints.pop();
                }
                _ => return Err(RouterFault::UnterminatedPath(joints.len())),
            }
        }

        debug!(
            "{}: {} joints, estimated {:.1} s",
            self.name,
            joints.len(),
            result.distance
        );

        let route = RouteBuilder::new(&self.name).build(
            &joints,
            &starter,
            self.directions.as_ref(),
            traffic.coloring(),
            start,
            finish,
        )?;

        if delegate.is_cancelled() {
            return Err(RouterFault::Cancelled);
        }

        Ok(route)
    }

    fn closest_edge(&self, tile: &TileId, point: Point, model: &dyn VehicleModel) -> Option<ClosestEdge> {
        find_closest_edge(
            self.index.as_ref(),
            tile,
            point,
            self.config.max_road_candidates,
            |candidate| model.is_accessible_by(candidate.class, candidate.mask),
        )
    }
}

fn load_routing(tile: &dyn Tile) -> Result<RoutingSection, RouterFault> {
    let started = Instant::now();
    let bytes = tile.section(ROUTING_SECTION)?;
    let section = RoutingSection::decode(&bytes)?;

    info!(
        "Routing section for {} loaded in {:.3}s",
        tile.country(),
        started.elapsed().as_secs_f64()
    );

    Ok(section)
}

/// Restrictions of a tile. Unreadable data is tolerated and routes without them.
fn load_restrictions(tile: &dyn Tile) -> Option<RestrictionSection> {
    match tile.section(RESTRICTIONS_SECTION) {
        Ok(bytes) => match RestrictionSection::decode(&bytes) {
            Ok(section) => Some(section),
            Err(error) => {
                warn!("Ignoring malformed restrictions of {}: {error}", tile.id());
                None
            }
        },
        Err(TileError::SectionMissing { .. }) => {
            debug!("Tile {} has no restrictions", tile.id());
            None
        }
        Err(error) => {
            warn!("Could not read restrictions of {}: {error}", tile.id());
            None
        }
    }
}

/// Forwards search progress to a [`RouterDelegate`].
struct DelegateObserver<'a> {
    delegate: &'a dyn RouterDelegate,
    starter: &'a Starter<'a>,
    progress: AStarProgress,
    config: &'a RouterConfig,
    reported: f32,
    visits: usize,
}

impl SearchObserver<SearchVertex> for DelegateObserver<'_> {
    fn on_visit(&mut self, vertex: &SearchVertex, target: &SearchVertex) {
        let (Some(point), Some(target)) = (self.starter.point(vertex.curr), self.starter.point(target.curr)) else {
            return;
        };

        let value = self.progress.on_visit(point.point, target.point);
        if value - self.reported > self.config.progress_interval {
            self.delegate.on_progress(value);
            self.reported = value;
        }

        if self.config.draw_points_period > 0 && self.visits % self.config.draw_points_period == 0 {
            self.delegate.on_point_check(point.point);
        }
        self.visits += 1;
    }

    fn is_cancelled(&self) -> bool {
        self.delegate.is_cancelled()
    }
}
