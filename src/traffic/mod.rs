//! Live traffic colouring and its shared, reference counted cache.


use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;
use strum::{Display, EnumString};

use crate::codec::FeatureId;
use crate::tile::TileId;

/// Observed speed on a segment, as a share of the free-flow speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SpeedGroup {
    G0,
    G1,
    G2,
    G3,
    G4,
    G5,
    /// The segment is closed.
    TempBlock,
    Unknown,
}

impl SpeedGroup {
    /// Percentage of the free-flow speed, `None` when the segment is closed.
    pub fn speed_percent(self) -> Option<u8> {
        match self {
            SpeedGroup::G0 => Some(8),
            SpeedGroup::G1 => Some(16),
            SpeedGroup::G2 => Some(33),
            SpeedGroup::G3 => Some(58),
            SpeedGroup::G4 => Some(83),
            SpeedGroup::G5 | SpeedGroup::Unknown => Some(100),
            SpeedGroup::TempBlock => None,
        }
    }

    pub fn factor(self) -> Option<f64> {
        self.speed_percent().map(|percent| percent as f64 / 100.0)
    }
}

/// A directed road segment. `forward` follows increasing vertex order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentKey {
    pub feature: FeatureId,
    pub segment: u32,
    pub forward: bool,
}

impl SegmentKey {
    pub const fn new(feature: FeatureId, segment: u32, forward: bool) -> Self {
        SegmentKey {
            feature,
            segment,
            forward,
        }
    }
}

pub type TrafficColoring = FxHashMap<SegmentKey, SpeedGroup>;

/// Provider of the current colouring for a tile.
pub trait TrafficSource: Send + Sync {
    fn coloring(&self, tile: &TileId) -> Option<TrafficColoring>;
}

type Slot = (usize, Option<Arc<TrafficColoring>>);

/// Shares traffic snapshots between concurrent route computations.
///
/// A snapshot is loaded on the first [`TrafficCache::acquire`] of a tile and
/// evicted once the last [`TrafficGuard`] for that tile is dropped.
pub struct TrafficCache {
    source: Option<Arc<dyn TrafficSource>>,
    entries: scc::HashMap<TileId, Slot>,
}

impl Debug for TrafficCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TrafficCache with {} tiles held", self.entries.len())
    }
}

impl Default for TrafficCache {
    fn default() -> Self {
        TrafficCache {
            source: None,
            entries: scc::HashMap::new(),
        }
    }
}

impl TrafficCache {
    pub fn new(source: Arc<dyn TrafficSource>) -> Self {
        TrafficCache {
            source: Some(source),
            entries: scc::HashMap::new(),
        }
    }

    pub fn acquire(&self, tile: &TileId) -> TrafficGuard<'_> {
        let mut entry = self.entries.entry(tile.clone()).or_insert_with(|| {
            let coloring = self
                .source
                .as_ref()
                .and_then(|source| source.coloring(tile))
                .map(Arc::new);

            debug!(
                "Loaded traffic for {tile}: {} coloured segments",
                coloring.as_ref().map_or(0, |coloring| coloring.len())
            );

            (0, coloring)
        });

        let (holders, coloring) = entry.get_mut();
        *holders += 1;

        TrafficGuard {
            cache: self,
            tile: tile.clone(),
            coloring: coloring.clone(),
        }
    }

    /// Number of tiles with at least one live guard.
    pub fn held(&self) -> usize {
        self.entries.len()
    }

    fn release(&self, tile: &TileId) {
        let evicted = self.entries.remove_if(tile, |(holders, _)| {
            *holders = holders.saturating_sub(1);
            *holders == 0
        });

        if evicted.is_some() {
            debug!("Evicted traffic for {tile}");
        }
    }
}

/// Keeps a tile's traffic snapshot alive for the duration of one route computation.
pub struct TrafficGuard<'a> {
    cache: &'a TrafficCache,
    tile: TileId,
    coloring: Option<Arc<TrafficColoring>>,
}

impl TrafficGuard<'_> {
    pub fn coloring(&self) -> Option<&TrafficColoring> {
        self.coloring.as_deref()
    }
}

impl Drop for TrafficGuard<'_> {
    fn drop(&mut self) {
        self.cache.release(&self.tile);
    }
}
