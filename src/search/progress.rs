use geo::{Distance, Haversine, Point};

/// Estimates how far a bidirectional search has come, in percent.
///
/// Each wave reports the point it just settled together with its own target.
/// The remaining distances of both waves are compared with the initial
/// start-to-finish distance; the reported value never decreases.
#[derive(Debug, Clone)]
pub struct AStarProgress {
    start: Point,
    finish: Point,
    initial: f64,
    forward: f64,
    backward: f64,
    last: f32,
}

impl AStarProgress {
    pub fn new(start: Point, finish: Point) -> Self {
        let initial = Haversine.distance(start, finish);

        AStarProgress {
            start,
            finish,
            initial,
            forward: initial,
            backward: initial,
            last: 0.0,
        }
    }

    /// Records a settled point, returning the updated progress in `0..=100`.
    pub fn on_visit(&mut self, point: Point, target: Point) -> f32 {
        if self.initial <= 0.0 {
            self.last = 100.0;
            return self.last;
        }

        if target == self.finish {
            self.forward = Haversine.distance(point, self.finish);
        } else {
            self.backward = Haversine.distance(point, self.start);
        }

        let value = 100.0 * (2.0 - (self.forward + self.backward) / self.initial);
        self.last = (value as f32).clamp(self.last, 100.0);
        self.last
    }

    pub fn last_value(&self) -> f32 {
        self.last
    }
}
