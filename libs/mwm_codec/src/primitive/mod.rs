//! Road network primitives shared by the section codec and the router.

pub mod class;
pub mod mask;

pub use class::RoadClass;
pub use mask::VehicleMask;

use geo::Point;

/// Identifier of a road feature within one tile.
pub type FeatureId = u32;

/// A directed reference to the vertex `point` of the feature `feature`.
///
/// The segment with the same index runs from vertex `point` to vertex `point + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoadPoint {
    pub feature: FeatureId,
    pub point: u32,
}

impl RoadPoint {
    pub const fn new(feature: FeatureId, point: u32) -> Self {
        Self { feature, point }
    }
}

/// A single routable feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Road {
    pub id: FeatureId,
    pub class: RoadClass,
    pub one_way: bool,
    /// Explicit speed limit in km/h, overriding the class speed of a vehicle model.
    pub max_speed: Option<u16>,
    pub mask: VehicleMask,
    pub points: Vec<Point>,
}

impl Road {
    pub fn new(id: FeatureId, class: RoadClass, points: Vec<Point>) -> Self {
        Road {
            id,
            class,
            one_way: false,
            max_speed: None,
            mask: VehicleMask::all(),
            points,
        }
    }

    pub fn one_way(mut self) -> Self {
        self.one_way = true;
        self
    }

    pub fn with_max_speed(mut self, kmh: u16) -> Self {
        self.max_speed = Some(kmh);
        self
    }

    pub fn with_mask(mut self, mask: VehicleMask) -> Self {
        self.mask = mask;
        self
    }

    /// Number of segments, one less than the vertex count.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    #[inline]
    pub fn point(&self, index: u32) -> Option<Point> {
        self.points.get(index as usize).copied()
    }

    /// Returns the index of the final vertex.
    #[inline]
    pub fn last_point(&self) -> u32 {
        self.points.len().saturating_sub(1) as u32
    }
}
