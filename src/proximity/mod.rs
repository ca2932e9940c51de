//! Resolution of a free point onto the closest road segment.


use std::time::Instant;

use geo::{Closest, ClosestPoint, Distance, Euclidean, Line, Point};
use log::{debug, info, warn};
use rayon::prelude::*;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::codec::{FeatureId, RoadClass, RoadPoint, RoutingSection, VehicleMask, ROUTING_SECTION};
use crate::graph::Junction;
use crate::starter::Anchor;
use crate::tile::{TileId, TileRepository};

/// One road segment, indexed by its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeCandidate {
    pub tile: TileId,
    pub feature: FeatureId,
    pub segment: u32,
    pub line: Line,
    pub class: RoadClass,
    pub mask: VehicleMask,
}

impl EdgeCandidate {
    /// The point of the segment nearest to `point`, clamped to its ends.
    pub fn project(&self, point: Point) -> Option<Point> {
        match self.line.closest_point(&point) {
            Closest::Intersection(projected) | Closest::SinglePoint(projected) => Some(projected),
            Closest::Indeterminate => None,
        }
    }
}

impl RTreeObject for EdgeCandidate {
    type Envelope = AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.line.start_point(), self.line.end_point())
    }
}

impl PointDistance for EdgeCandidate {
    fn distance_2(&self, point: &Point) -> f64 {
        self.project(*point)
            .map_or(f64::INFINITY, |projected| Euclidean.distance(projected, *point).powi(2))
    }
}

/// Source of the segments closest to a point.
pub trait RoadIndex: Send + Sync {
    /// Up to `count` candidates, closest first.
    fn nearest(&self, point: Point, count: usize) -> Vec<&EdgeCandidate>;
}

#[derive(Debug, Default)]
pub struct RTreeRoadIndex {
    tree: RTree<EdgeCandidate>,
}

impl RTreeRoadIndex {
    pub fn from_section(tile: &TileId, section: &RoutingSection) -> Self {
        RTreeRoadIndex {
            tree: RTree::bulk_load(candidates(tile, section)),
        }
    }

    /// Indexes the routing section of every tile, skipping tiles whose section
    /// is missing or unreadable.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all))]
    pub fn from_repository(repository: &dyn TileRepository) -> Self {
        let start = Instant::now();
        let tiles = repository.tiles();

        let segments = tiles
            .par_iter()
            .flat_map_iter(|tile| {
                let section = tile
                    .section(ROUTING_SECTION)
                    .map_err(|error| error.to_string())
                    .and_then(|bytes| RoutingSection::decode(&bytes).map_err(|error| error.to_string()));

                match section {
                    Ok(section) => candidates(tile.id(), &section),
                    Err(error) => {
                        warn!("Not indexing tile {}: {error}", tile.id());
                        Vec::new()
                    }
                }
            })
            .collect::<Vec<_>>();

        info!(
            "Indexed {} segments of {} tiles in {:?}",
            segments.len(),
            tiles.len(),
            start.elapsed()
        );

        RTreeRoadIndex {
            tree: RTree::bulk_load(segments),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl RoadIndex for RTreeRoadIndex {
    fn nearest(&self, point: Point, count: usize) -> Vec<&EdgeCandidate> {
        self.tree.nearest_neighbor_iter(&point).take(count).collect()
    }
}

fn candidates(tile: &TileId, section: &RoutingSection) -> Vec<EdgeCandidate> {
    section
        .roads
        .iter()
        .flat_map(|road| {
            road.points
                .windows(2)
                .enumerate()
                .map(move |(segment, pair)| EdgeCandidate {
                    tile: tile.clone(),
                    feature: road.id,
                    segment: segment as u32,
                    line: Line::new(pair[0], pair[1]),
                    class: road.class,
                    mask: road.mask,
                })
        })
        .collect()
}

/// A point snapped onto the road network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestEdge {
    /// Feature and segment index.
    pub road_point: RoadPoint,
    pub junction: Junction,
    /// Planar distance in degrees between the query and the projection.
    pub distance: f64,
}

impl ClosestEdge {
    pub fn anchor(&self) -> Anchor {
        Anchor::new(self.road_point, self.junction.point)
    }
}

/// Snaps `point` onto the closest accepted segment of `tile`, among the
/// `max_candidates` segments nearest to it.
pub fn find_closest_edge<F>(
    index: &dyn RoadIndex,
    tile: &TileId,
    point: Point,
    max_candidates: usize,
    accept: F,
) -> Option<ClosestEdge>
where
    F: Fn(&EdgeCandidate) -> bool,
{
    let closest = index
        .nearest(point, max_candidates)
        .into_iter()
        .filter(|candidate| &candidate.tile == tile && accept(candidate))
        .filter_map(|candidate| {
            let projected = candidate.project(point)?;
            Some(ClosestEdge {
                road_point: RoadPoint::new(candidate.feature, candidate.segment),
                junction: Junction::new(projected),
                distance: Euclidean.distance(projected, point),
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance));

    if closest.is_none() {
        debug!("No accepted segment of tile {tile} near {point:?}");
    }

    closest
}
