//! Computes one route inside a tile directory.
//!
//! Usage: `route <tile-dir> <profile> <lat> <lon> <lat> <lon>`
//!
//! Router tunables may be overridden through `MWM_ROUTER_MAX_ROAD_CANDIDATES`,
//! `MWM_ROUTER_PROGRESS_INTERVAL` and `MWM_ROUTER_DRAW_POINTS_PERIOD`, read
//! from the environment or a `.env` file.

use std::env;
use std::error::Error;
use std::str::FromStr;
use std::sync::Arc;

use dotenv::dotenv;
use geo::Point;
use log::{debug, info};
use wkt::ToWkt;

use mwm_router::{DirectoryTile, MemoryRepository, RTreeRoadIndex, Router, RouterConfig, RouterDelegate, Tile, VehicleType};

const USAGE: &str = "usage: route <tile-dir> <car|bicycle|pedestrian> <lat> <lon> <lat> <lon>";

struct LoggingDelegate;

impl RouterDelegate for LoggingDelegate {
    fn on_progress(&self, percent: f32) {
        info!("Progress {percent:.1}%");
    }

    fn on_point_check(&self, point: Point) {
        debug!("Exploring {:.6}, {:.6}", point.y(), point.x());
    }
}

fn initialize_logging() {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();

    #[cfg(not(feature = "tracing"))]
    env_logger::init();
}

fn override_from_env<T: FromStr>(key: &str, value: &mut T) -> Result<(), Box<dyn Error>> {
    if let Ok(raw) = env::var(key) {
        *value = raw
            .parse()
            .map_err(|_| format!("{key} holds an invalid value: {raw}"))?;
    }

    Ok(())
}

fn config_from_env() -> Result<RouterConfig, Box<dyn Error>> {
    let mut config = RouterConfig::default();
    override_from_env("MWM_ROUTER_MAX_ROAD_CANDIDATES", &mut config.max_road_candidates)?;
    override_from_env("MWM_ROUTER_PROGRESS_INTERVAL", &mut config.progress_interval)?;
    override_from_env("MWM_ROUTER_DRAW_POINTS_PERIOD", &mut config.draw_points_period)?;
    Ok(config)
}

fn coordinate(args: &[String], index: usize) -> Result<f64, Box<dyn Error>> {
    let raw = args.get(index).ok_or(USAGE)?;
    raw.parse::<f64>()
        .map_err(|_| format!("not a coordinate: {raw}").into())
}

fn main() -> Result<(), Box<dyn Error>> {
    // A missing `.env` file is fine.
    dotenv().ok();
    initialize_logging();

    let args = env::args().collect::<Vec<_>>();
    let directory = args.get(1).ok_or(USAGE)?;
    let vehicle = VehicleType::from_str(args.get(2).ok_or(USAGE)?)?;

    let start = Point::new(coordinate(&args, 4)?, coordinate(&args, 3)?);
    let finish = Point::new(coordinate(&args, 6)?, coordinate(&args, 5)?);

    let tile = DirectoryTile::open(directory)?;
    let tile_id = tile.id().clone();
    let repository = Arc::new(MemoryRepository::new().with(tile));
    let index = Arc::new(RTreeRoadIndex::from_repository(repository.as_ref()));

    let router = Router::for_vehicle(vehicle, repository, index).with_config(config_from_env()?);

    match router.calculate_route(&tile_id, start, finish, &LoggingDelegate) {
        Ok(route) => {
            println!("result: {}", mwm_router::ResultCode::NoError.as_ref());
            println!("time: {:.1} s", route.total_time());
            println!("length: {:.1} m", route.length());
            println!("{}", route.line_string().wkt_string());
        }
        Err(code) => {
            println!("result: {}", code.as_ref());
            std::process::exit(1);
        }
    }

    Ok(())
}
