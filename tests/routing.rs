use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use geo::{Distance, Haversine, Point};

use mwm_fixtures::{
    at, disconnected_pair, grid, lollipop, mandatory_crossing, one_way_loop, restricted_crossing, ring_with_spur,
    straight_road, Fixture, FIXTURE_COUNTRY,
};
use mwm_router::codec::{
    Road, RoadClass, RoutingSection, VehicleMask, RESTRICTIONS_SECTION, ROUTING_SECTION,
};
use mwm_router::model::SpeedTable;
use mwm_router::traffic::{SegmentKey, TrafficColoring};
use mwm_router::{
    CancelFlag, DefaultModelFactory, DirectionsEngine, EdgeEstimator, Junction, MemoryRepository, MemoryTile,
    NullDelegate, RTreeRoadIndex, ResultCode, Router, RouterDelegate, SegmentDirectionsEngine, SpeedGroup,
    TileId, TrafficCache, TrafficSource, TravelTimeEstimator, VehicleType, Weight,
};

const TILE: &str = "fixture";

fn tile_id() -> TileId {
    TileId::from(TILE)
}

fn mount(fixture: &Fixture) -> (Arc<MemoryRepository>, Arc<RTreeRoadIndex>) {
    let mut tile = MemoryTile::new(TILE, FIXTURE_COUNTRY).with_section(ROUTING_SECTION, fixture.routing_bytes());
    if let Some(bytes) = fixture.restriction_bytes() {
        tile = tile.with_section(RESTRICTIONS_SECTION, bytes);
    }

    let repository = Arc::new(MemoryRepository::new().with(tile));
    let index = Arc::new(RTreeRoadIndex::from_repository(repository.as_ref()));
    (repository, index)
}

fn car_router(fixture: &Fixture) -> Router {
    let (repository, index) = mount(fixture);
    Router::car(repository, index)
}

fn car_weight(fixture: &Fixture, feature: u32, segment: u32) -> Weight {
    let road = fixture.road(feature).expect("fixture road");
    TravelTimeEstimator.segment_weight(road, segment, true, &SpeedTable::car(), None)
}

#[derive(Default)]
struct RecordingDelegate {
    progress: Mutex<Vec<f32>>,
    point_checks: AtomicUsize,
    checked_points: Mutex<Vec<Point>>,
    cancel_after_checks: Option<usize>,
}

impl RouterDelegate for RecordingDelegate {
    fn on_progress(&self, percent: f32) {
        if let Ok(mut progress) = self.progress.lock() {
            progress.push(percent);
        }
    }

    fn on_point_check(&self, point: Point) {
        if let Ok(mut points) = self.checked_points.lock() {
            points.push(point);
        }
        self.point_checks.fetch_add(1, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_after_checks
            .is_some_and(|limit| self.point_checks.load(Ordering::SeqCst) >= limit)
    }
}

#[derive(Debug)]
struct ShrinkingEngine;

impl DirectionsEngine for ShrinkingEngine {
    fn generate(&self, junctions: &mut Vec<Junction>) -> Vec<Junction> {
        junctions.pop();
        junctions.clone()
    }
}

#[derive(Debug)]
struct PanickingEngine;

impl DirectionsEngine for PanickingEngine {
    fn generate(&self, _junctions: &mut Vec<Junction>) -> Vec<Junction> {
        panic!("directions engine failure");
    }
}

/// Closes segment 4 of feature 1 in its forward direction.
struct ClosedSegment;

impl TrafficSource for ClosedSegment {
    fn coloring(&self, _tile: &TileId) -> Option<TrafficColoring> {
        let mut coloring = TrafficColoring::default();
        coloring.insert(SegmentKey::new(1, 4, true), SpeedGroup::TempBlock);
        Some(coloring)
    }
}

fn router_with_engine(fixture: &Fixture, directions: Arc<dyn DirectionsEngine>) -> Router {
    let (repository, index) = mount(fixture);
    Router::new(
        "custom",
        repository,
        index,
        Arc::new(DefaultModelFactory::new(VehicleType::Car)),
        Arc::new(TravelTimeEstimator),
        directions,
    )
}

#[test_log::test]
fn straight_road_travel_time_in_both_directions() {
    let fixture = straight_road();
    let router = car_router(&fixture);
    let expected: Weight = (0..10).map(|segment| car_weight(&fixture, 1, segment)).sum();

    let east = router
        .calculate_route(&tile_id(), at(0.0, 0.0), at(10.0, 0.0), &NullDelegate)
        .expect("eastbound route");
    let west = router
        .calculate_route(&tile_id(), at(10.0, 0.0), at(0.0, 0.0), &NullDelegate)
        .expect("westbound route");

    assert_relative_eq!(east.total_time(), expected, max_relative = 1e-3);
    assert_relative_eq!(west.total_time(), expected, max_relative = 1e-3);
    assert_eq!(east.name, "astar-bidirectional-car");
    assert_eq!(east.poly.len(), 2);
    assert_relative_eq!(
        east.length(),
        Haversine.distance(at(0.0, 0.0), at(10.0, 0.0)),
        max_relative = 1e-3
    );
}

#[test_log::test]
fn five_meter_route_on_one_segment() {
    let fixture = straight_road();
    let router = car_router(&fixture);

    let segment_length = Haversine.distance(at(5.0, 0.0), at(6.0, 0.0));
    let offset = 5.0 / segment_length;
    let start = at(5.1, 0.0);
    let finish = at(5.1 + offset, 0.0);

    let route = router
        .calculate_route(&tile_id(), start, finish, &NullDelegate)
        .expect("short route");

    assert_eq!(route.poly.len(), 2);
    assert_relative_eq!(route.length(), 5.0, max_relative = 1e-3);
    assert_relative_eq!(route.total_time(), car_weight(&fixture, 1, 5) * offset, max_relative = 1e-3);
    assert_eq!(route.times, vec![(0, 0.0), (1, route.total_time())]);
}

#[test_log::test]
fn same_point_gives_single_junction_route() {
    let router = car_router(&straight_road());

    let route = router
        .calculate_route(&tile_id(), at(3.3, 0.0), at(3.3, 0.0), &NullDelegate)
        .expect("trivial route");

    assert_eq!(route.poly.len(), 1);
    assert_eq!(route.times, vec![(0, 0.0)]);
    assert_eq!(route.total_time(), 0.0);
}

#[test_log::test]
fn forbidden_turn_is_avoided() {
    let fixture = restricted_crossing();
    let start = at(2.0, 0.5);
    let finish = at(3.5, 2.0);

    let straight = 0.5 * car_weight(&fixture, 4, 0)
        + car_weight(&fixture, 4, 1)
        + car_weight(&fixture, 2, 0)
        + 0.5 * car_weight(&fixture, 2, 1);

    let mut unrestricted = fixture.clone();
    unrestricted.restrictions = None;

    let free = car_router(&unrestricted)
        .calculate_route(&tile_id(), start, finish, &NullDelegate)
        .expect("route without restrictions");
    assert_relative_eq!(free.total_time(), straight, max_relative = 1e-3);

    let detour = car_router(&fixture)
        .calculate_route(&tile_id(), start, finish, &NullDelegate)
        .expect("route around the forbidden turn");
    assert!(detour.total_time() > straight * 1.1);
    assert!(detour.length() > free.length());
}

#[test_log::test]
fn mandatory_turn_is_followed() {
    let fixture = mandatory_crossing();
    let start = at(2.0, 0.5);
    let finish = at(0.5, 2.0);

    let straight = 0.5 * car_weight(&fixture, 4, 0)
        + car_weight(&fixture, 4, 1)
        + car_weight(&fixture, 1, 1)
        + 0.5 * car_weight(&fixture, 1, 0);

    let route = car_router(&fixture)
        .calculate_route(&tile_id(), start, finish, &NullDelegate)
        .expect("route through the northern arm");

    assert!(route.total_time() > straight * 1.1);
}

#[test_log::test]
fn one_way_loop_forces_a_detour_for_cars_only() {
    let fixture = one_way_loop();
    let (repository, index) = mount(&fixture);

    let start = at(1.0, 0.0);
    let finish = at(2.0, 1.0);

    let drive = Router::car(repository.clone(), index.clone())
        .calculate_route(&tile_id(), start, finish, &NullDelegate)
        .expect("car route around the loop");
    let walk = Router::pedestrian(repository, index)
        .calculate_route(&tile_id(), start, finish, &NullDelegate)
        .expect("walking route");

    assert!(drive.length() > 2.5 * walk.length());
    assert_relative_eq!(
        walk.length(),
        Haversine.distance(at(1.0, 0.0), at(2.0, 0.0)) + Haversine.distance(at(2.0, 0.0), at(2.0, 1.0)),
        max_relative = 1e-3
    );
}

#[test_log::test]
fn time_table_law_on_a_grid() {
    let router = car_router(&grid(8));

    let route = router
        .calculate_route(&tile_id(), at(0.3, 0.0), at(6.6, 7.0), &NullDelegate)
        .expect("grid route");

    let len = route.poly.len();
    assert!(len >= 4);
    assert_eq!(len % 2, 0);
    assert_eq!(route.times.len(), len);
    assert_eq!(route.times[0].0, 0);
    assert_eq!(route.times[len - 1].0, len - 1);

    for (index, (poly_index, _)) in route.times.iter().enumerate() {
        assert_eq!(*poly_index, index);
    }
    assert!(route.times.windows(2).all(|pair| pair[0].1 <= pair[1].1));
    for pair in route.poly[1..len - 1].chunks(2) {
        assert_eq!(pair[0], pair[1]);
    }
}

#[test_log::test]
fn disconnected_roads_have_no_route() {
    let router = car_router(&disconnected_pair());

    let result = router.calculate_route(&tile_id(), at(1.0, 0.0), at(1.0, 10.0), &NullDelegate);
    assert_eq!(result.err(), Some(ResultCode::RouteNotFound));
}

#[test_log::test]
fn missing_or_corrupt_routing_data() {
    let fixture = straight_road();
    let index = Arc::new(RTreeRoadIndex::from_section(&tile_id(), &fixture.routing));

    let empty = Arc::new(MemoryRepository::new().with(MemoryTile::new(TILE, FIXTURE_COUNTRY)));
    let result = Router::car(empty, index.clone()).calculate_route(
        &tile_id(),
        at(1.0, 0.0),
        at(4.0, 0.0),
        &NullDelegate,
    );
    assert_eq!(result.err(), Some(ResultCode::RouteFileNotExist));

    let mut bytes = fixture.routing_bytes().to_vec();
    bytes[20] ^= 0xff;
    let corrupt = Arc::new(
        MemoryRepository::new()
            .with(MemoryTile::new(TILE, FIXTURE_COUNTRY).with_section(ROUTING_SECTION, bytes.into())),
    );
    let result = Router::car(corrupt, index.clone()).calculate_route(
        &tile_id(),
        at(1.0, 0.0),
        at(4.0, 0.0),
        &NullDelegate,
    );
    assert_eq!(result.err(), Some(ResultCode::RouteFileNotExist));

    let retired = Arc::new(
        MemoryRepository::new().with(
            MemoryTile::new(TILE, FIXTURE_COUNTRY)
                .with_section(ROUTING_SECTION, fixture.routing_bytes())
                .retired(),
        ),
    );
    let result = Router::car(retired, index).calculate_route(&tile_id(), at(1.0, 0.0), at(4.0, 0.0), &NullDelegate);
    assert_eq!(result.err(), Some(ResultCode::RouteFileNotExist));
}

#[test_log::test]
fn malformed_restrictions_are_ignored() {
    let fixture = restricted_crossing();
    let tile = MemoryTile::new(TILE, FIXTURE_COUNTRY)
        .with_section(ROUTING_SECTION, fixture.routing_bytes())
        .with_section(RESTRICTIONS_SECTION, bytes::Bytes::from_static(b"not a section"));

    let repository = Arc::new(MemoryRepository::new().with(tile));
    let index = Arc::new(RTreeRoadIndex::from_repository(repository.as_ref()));

    let route = Router::car(repository, index)
        .calculate_route(&tile_id(), at(2.0, 0.5), at(3.5, 2.0), &NullDelegate)
        .expect("route ignoring restrictions");

    let straight = 0.5 * car_weight(&fixture, 4, 0)
        + car_weight(&fixture, 4, 1)
        + car_weight(&fixture, 2, 0)
        + 0.5 * car_weight(&fixture, 2, 1);
    assert_relative_eq!(route.total_time(), straight, max_relative = 1e-3);
}

#[test_log::test]
fn ends_far_from_usable_roads() {
    // Footway segments crowd the start so no car road is among the nearest candidates.
    let footway = Road::new(
        1,
        RoadClass::Footway,
        (0..=8).map(|step| at(0.1 * step as f64, 0.0)).collect(),
    )
    .with_mask(VehicleMask::PEDESTRIAN);
    let street = Road::new(2, RoadClass::Residential, vec![at(0.0, 20.0), at(5.0, 20.0)]);

    let section = RoutingSection::from_roads(vec![footway, street]);
    let repository = Arc::new(
        MemoryRepository::new()
            .with(MemoryTile::new(TILE, FIXTURE_COUNTRY).with_section(ROUTING_SECTION, section.encode())),
    );
    let index = Arc::new(RTreeRoadIndex::from_repository(repository.as_ref()));
    let router = Router::car(repository, index);

    let near_footway = at(0.4, 0.05);
    let near_street = at(2.0, 20.0);

    let result = router.calculate_route(&tile_id(), near_footway, near_street, &NullDelegate);
    assert_eq!(result.err(), Some(ResultCode::StartPointNotFound));

    let result = router.calculate_route(&tile_id(), near_street, near_footway, &NullDelegate);
    assert_eq!(result.err(), Some(ResultCode::EndPointNotFound));
}

#[test_log::test]
fn cancellation_is_reported() {
    let router = car_router(&grid(10));

    let flag = CancelFlag::new();
    flag.cancel();
    let result = router.calculate_route(&tile_id(), at(0.2, 0.0), at(8.8, 9.0), &flag);
    assert_eq!(result.err(), Some(ResultCode::Cancelled));

    let delegate = RecordingDelegate {
        cancel_after_checks: Some(1),
        ..RecordingDelegate::default()
    };
    let result = router.calculate_route(&tile_id(), at(0.2, 0.0), at(8.8, 9.0), &delegate);
    assert_eq!(result.err(), Some(ResultCode::Cancelled));
    assert_eq!(delegate.point_checks.load(Ordering::SeqCst), 1);

    let checked = delegate.checked_points.lock().map(|points| points.clone()).unwrap_or_default();
    let [first] = checked.as_slice() else {
        panic!("expected one point check, got {checked:?}");
    };
    assert_relative_eq!(first.x(), at(0.2, 0.0).x(), epsilon = 1e-9);
    assert_relative_eq!(first.y(), at(0.2, 0.0).y(), epsilon = 1e-9);
}

#[test_log::test]
fn progress_is_monotone_and_bounded() {
    let router = car_router(&grid(12));
    let delegate = RecordingDelegate::default();

    router
        .calculate_route(&tile_id(), at(0.2, 0.0), at(10.8, 11.0), &delegate)
        .expect("grid route");

    let progress = delegate.progress.lock().map(|values| values.clone()).unwrap_or_default();
    assert!(!progress.is_empty());
    assert!(progress.iter().all(|value| (0.0..=100.0).contains(value)));
    assert!(progress.windows(2).all(|pair| pair[1] - pair[0] > 2.0));
    assert!(delegate.point_checks.load(Ordering::SeqCst) > 0);
}

#[test_log::test]
fn directions_faults_become_internal_errors() {
    let fixture = grid(4);

    let shrinking = router_with_engine(&fixture, Arc::new(ShrinkingEngine));
    let result = shrinking.calculate_route(&tile_id(), at(0.5, 0.0), at(2.5, 3.0), &NullDelegate);
    assert_eq!(result.err(), Some(ResultCode::InternalError));

    let panicking = router_with_engine(&fixture, Arc::new(PanickingEngine));
    let result = panicking.calculate_route(&tile_id(), at(0.5, 0.0), at(2.5, 3.0), &NullDelegate);
    assert_eq!(result.err(), Some(ResultCode::InternalError));

    let stock = router_with_engine(&fixture, Arc::new(SegmentDirectionsEngine));
    assert!(stock
        .calculate_route(&tile_id(), at(0.5, 0.0), at(2.5, 3.0), &NullDelegate)
        .is_ok());
}

#[test_log::test]
fn closed_segment_blocks_one_direction() {
    let fixture = straight_road();
    let traffic = Arc::new(TrafficCache::new(Arc::new(ClosedSegment)));
    let router = car_router(&fixture).with_traffic(traffic.clone());

    let east = router.calculate_route(&tile_id(), at(0.0, 0.0), at(10.0, 0.0), &NullDelegate);
    assert_eq!(east.err(), Some(ResultCode::RouteNotFound));

    let west = router
        .calculate_route(&tile_id(), at(10.0, 0.0), at(0.0, 0.0), &NullDelegate)
        .expect("westbound lane is open");
    assert_eq!(west.traffic, vec![SpeedGroup::Unknown]);
    assert_eq!(traffic.held(), 0);
}

#[test_log::test]
fn concurrent_routes_share_the_traffic_cache() {
    let fixture = grid(6);
    let traffic = Arc::new(TrafficCache::default());
    let router = car_router(&fixture).with_traffic(traffic.clone());

    let requests = [
        (at(0.2, 0.0), at(4.8, 5.0)),
        (at(5.0, 0.4), at(0.0, 4.6)),
        (at(2.5, 2.0), at(3.0, 4.5)),
        (at(0.0, 0.5), at(5.0, 0.5)),
    ];

    let times = std::thread::scope(|scope| {
        let handles = requests
            .iter()
            .map(|(start, finish)| {
                let router = &router;
                scope.spawn(move || router.calculate_route(&tile_id(), *start, *finish, &NullDelegate))
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().ok().and_then(Result::ok).map(|route| route.total_time()))
            .collect::<Vec<_>>()
    });

    assert!(times.iter().all(|time| time.is_some_and(|time| time > 0.0)));
    assert_eq!(traffic.held(), 0);
}

#[test_log::test]
fn route_from_the_closing_span_of_a_ring() {
    let fixture = ring_with_spur();
    let router = car_router(&fixture);

    let route = router
        .calculate_route(&tile_id(), at(0.0, 1.0), at(3.0, 2.0), &NullDelegate)
        .expect("route from the closing span");
    let expected = 0.5 * car_weight(&fixture, 1, 3) + car_weight(&fixture, 1, 2) + 0.5 * car_weight(&fixture, 2, 0);
    assert_relative_eq!(route.total_time(), expected, max_relative = 1e-3);

    let back = router
        .calculate_route(&tile_id(), at(3.0, 2.0), at(0.0, 1.0), &NullDelegate)
        .expect("route onto the closing span");
    assert_relative_eq!(back.total_time(), expected, max_relative = 1e-3);

    let inner = router
        .calculate_route(&tile_id(), at(2.0, 1.0), at(3.0, 2.0), &NullDelegate)
        .expect("route from an inner span");
    let expected = 0.5 * car_weight(&fixture, 1, 1) + 0.5 * car_weight(&fixture, 2, 0);
    assert_relative_eq!(inner.total_time(), expected, max_relative = 1e-3);
}

#[test_log::test]
fn route_into_a_loop_hanging_off_one_joint() {
    let fixture = lollipop();
    let router = car_router(&fixture);

    let route = router
        .calculate_route(&tile_id(), at(1.0, 0.0), at(4.0, 1.0), &NullDelegate)
        .expect("route into the loop");
    let expected = 0.5 * car_weight(&fixture, 1, 0) + car_weight(&fixture, 2, 0) + 0.5 * car_weight(&fixture, 2, 1);
    assert_relative_eq!(route.total_time(), expected, max_relative = 1e-3);

    let closing = router
        .calculate_route(&tile_id(), at(1.0, 0.0), at(2.0, 1.0), &NullDelegate)
        .expect("route onto the closing span of the loop");
    let expected = 0.5 * car_weight(&fixture, 1, 0) + 0.5 * car_weight(&fixture, 2, 3);
    assert_relative_eq!(closing.total_time(), expected, max_relative = 1e-3);
}
