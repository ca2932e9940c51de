//! Small synthetic road networks, encoded the same way a tile stores them.
//!
//! Every network is laid out on a regular lattice of [`STEP`] degrees around
//! [`ORIGIN`], so distances are easy to reason about in tests.

use bytes::Bytes;
use geo::{Point, point};
use mwm_codec::{
    FeatureId, Restriction, RestrictionSection, Road, RoadClass, RoutingSection, VehicleMask,
};

/// South-west corner of every fixture, in degrees.
pub const ORIGIN: (f64, f64) = (13.4000000, 52.5000000);

/// Lattice spacing in degrees (roughly 68 m of longitude, 111 m of latitude).
pub const STEP: f64 = 0.001;

/// Tile identifier used when a fixture is mounted into a repository.
pub const FIXTURE_COUNTRY: &str = "Fixtureland";

#[derive(Debug, Clone)]
pub struct Fixture {
    pub name: &'static str,
    pub routing: RoutingSection,
    pub restrictions: Option<RestrictionSection>,
}

impl Fixture {
    fn new(name: &'static str, roads: Vec<Road>) -> Self {
        Fixture {
            name,
            routing: RoutingSection::from_roads(roads),
            restrictions: None,
        }
    }

    fn restricted(mut self, restrictions: Vec<Restriction>) -> Self {
        self.restrictions = Some(RestrictionSection::new(restrictions));
        self
    }

    pub fn routing_bytes(&self) -> Bytes {
        self.routing.encode()
    }

    pub fn restriction_bytes(&self) -> Option<Bytes> {
        self.restrictions.as_ref().map(RestrictionSection::encode)
    }

    pub fn road(&self, id: FeatureId) -> Option<&Road> {
        self.routing.roads.iter().find(|road| road.id == id)
    }
}

/// Lattice coordinate `(column, row)` as a point.
pub fn at(column: f64, row: f64) -> Point {
    point! { x: ORIGIN.0 + column * STEP, y: ORIGIN.1 + row * STEP }
}

fn line(columns: impl IntoIterator<Item = (f64, f64)>) -> Vec<Point> {
    columns.into_iter().map(|(x, y)| at(x, y)).collect()
}

/// A single two-way primary road running east along row 0,
/// from column 0 to column 10, with a vertex at every column.
pub fn straight_road() -> Fixture {
    let road = Road::new(
        1,
        RoadClass::Primary,
        line((0..=10).map(|column| (column as f64, 0.0))),
    );

    Fixture::new("straight_road", vec![road])
}

/// An `n` by `n` lattice of two-way residential streets.
///
/// Rows are features `0..n` (running east), columns are features `n..2n`
/// (running north). Every crossing is a joint.
pub fn grid(n: u32) -> Fixture {
    let rows = (0..n).map(|row| {
        Road::new(
            row,
            RoadClass::Residential,
            line((0..n).map(|column| (column as f64, row as f64))),
        )
    });

    let columns = (0..n).map(|column| {
        Road::new(
            n + column,
            RoadClass::Residential,
            line((0..n).map(|row| (column as f64, row as f64))),
        )
    });

    Fixture::new("grid", rows.chain(columns).collect())
}

/// A four-armed crossing at `(2, 2)` with a ring road joining the northern
/// and eastern arm ends.
///
/// ```text
///        3 ---- 5 ----+
///        |            |
///  1 --- + ---- 2 ----+
///        |
///        4
/// ```
///
/// Turning from the southern arm (4) onto the eastern arm (2) is forbidden,
/// so a route from the south to the east must go around through 3 and 5.
pub fn restricted_crossing() -> Fixture {
    let roads = vec![
        Road::new(1, RoadClass::Secondary, line([(0.0, 2.0), (1.0, 2.0), (2.0, 2.0)])),
        Road::new(2, RoadClass::Secondary, line([(2.0, 2.0), (3.0, 2.0), (4.0, 2.0)])),
        Road::new(3, RoadClass::Tertiary, line([(2.0, 2.0), (2.0, 3.0), (2.0, 4.0)])),
        Road::new(4, RoadClass::Tertiary, line([(2.0, 0.0), (2.0, 1.0), (2.0, 2.0)])),
        Road::new(
            5,
            RoadClass::Residential,
            line([(2.0, 4.0), (4.0, 4.0), (4.0, 2.0)]),
        ),
    ];

    Fixture::new("restricted_crossing", roads).restricted(vec![Restriction::no(4, 2)])
}

/// The crossing of [`restricted_crossing`] where the southern arm may only
/// continue north.
pub fn mandatory_crossing() -> Fixture {
    let mut fixture = restricted_crossing().restricted(vec![Restriction::only(4, 3)]);
    fixture.name = "mandatory_crossing";
    fixture
}

/// A clockwise one-way square with a two-way spur leaving its south-west corner.
///
/// ```text
///  (0,2) -> (2,2)
///    ^        |
///    |        v
///  (0,0) <- (2,0) ---- spur to (4,0)
/// ```
pub fn one_way_loop() -> Fixture {
    let roads = vec![
        Road::new(1, RoadClass::Tertiary, line([(0.0, 0.0), (0.0, 2.0)])).one_way(),
        Road::new(2, RoadClass::Tertiary, line([(0.0, 2.0), (2.0, 2.0)])).one_way(),
        Road::new(3, RoadClass::Tertiary, line([(2.0, 2.0), (2.0, 0.0)])).one_way(),
        Road::new(4, RoadClass::Tertiary, line([(2.0, 0.0), (0.0, 0.0)])).one_way(),
        Road::new(5, RoadClass::Residential, line([(2.0, 0.0), (4.0, 0.0)])),
    ];

    Fixture::new("one_way_loop", roads)
}

/// A closed two-way ring through `(0, 0)`, `(2, 0)`, `(2, 2)` and `(0, 2)`,
/// with a spur leaving its north-east corner towards `(4, 2)`.
///
/// The ring starts and ends at `(0, 0)`, so its first and last vertex share
/// a joint.
pub fn ring_with_spur() -> Fixture {
    let roads = vec![
        Road::new(
            1,
            RoadClass::Tertiary,
            line([(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]),
        ),
        Road::new(2, RoadClass::Tertiary, line([(2.0, 2.0), (4.0, 2.0)])),
    ];

    Fixture::new("ring_with_spur", roads)
}

/// A stem from `(0, 0)` to `(2, 0)` ending in a loop through `(4, 0)`,
/// `(4, 2)` and `(2, 2)`. The loop touches the rest of the network at a
/// single joint only.
pub fn lollipop() -> Fixture {
    let roads = vec![
        Road::new(1, RoadClass::Tertiary, line([(0.0, 0.0), (2.0, 0.0)])),
        Road::new(
            2,
            RoadClass::Tertiary,
            line([(2.0, 0.0), (4.0, 0.0), (4.0, 2.0), (2.0, 2.0), (2.0, 0.0)]),
        ),
    ];

    Fixture::new("lollipop", roads)
}

/// Two roads with no shared vertex, ten rows apart.
pub fn disconnected_pair() -> Fixture {
    let roads = vec![
        Road::new(1, RoadClass::Residential, line([(0.0, 0.0), (3.0, 0.0)])),
        Road::new(2, RoadClass::Residential, line([(0.0, 10.0), (3.0, 10.0)])),
    ];

    Fixture::new("disconnected_pair", roads)
}

/// A footway crossing a motorway: only pedestrians may use the footway,
/// only cars may use the motorway.
pub fn mixed_access() -> Fixture {
    let roads = vec![
        Road::new(1, RoadClass::Motorway, line([(0.0, 2.0), (2.0, 2.0), (4.0, 2.0)]))
            .with_mask(VehicleMask::CAR)
            .with_max_speed(110),
        Road::new(2, RoadClass::Footway, line([(2.0, 0.0), (2.0, 2.0), (2.0, 4.0)]))
            .with_mask(VehicleMask::PEDESTRIAN),
    ];

    Fixture::new("mixed_access", roads)
}
