use serde::Deserialize;

pub const MAX_ROAD_CANDIDATES: usize = 6;
pub const PROGRESS_INTERVAL: f32 = 2.0;
pub const DRAW_POINTS_PERIOD: usize = 10;

/// Tunables of a [`Router`](crate::router::Router).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Segments considered when snapping a point onto the network.
    pub max_road_candidates: usize,
    /// Minimal progress gain, in percent, before the delegate hears of it.
    pub progress_interval: f32,
    /// Settled vertices between two point checks.
    pub draw_points_period: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            max_road_candidates: MAX_ROAD_CANDIDATES,
            progress_interval: PROGRESS_INTERVAL,
            draw_points_period: DRAW_POINTS_PERIOD,
        }
    }
}
