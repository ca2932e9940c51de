//! Bidirectional A* over any graph exposing weighted adjacency in both directions.
//!
//! Both waves share the potential `pf(v) = (h(v, t) - h(v, s)) / 2` (the
//! backward wave uses `-pf`), so every edge has the same non-negative reduced
//! weight in either direction and the search is a bidirectional Dijkstra over
//! reduced weights. The waves alternate; a meeting is recorded whenever one
//! wave labels a vertex the other has labelled, and the search ends once the
//! sum of both queue tops reaches the best meeting.

pub mod progress;


#[doc(inline)]
pub use progress::AStarProgress;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;
use std::hash::{BuildHasherDefault, Hash};
use std::time::Instant;

use indexmap::map::Entry;
use indexmap::IndexMap;
use log::debug;
use rustc_hash::FxHasher;
use thiserror::Error;
#[cfg(feature = "tracing")]
use tracing::Level;

use crate::estimator::Weight;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

const NO_PARENT: usize = usize::MAX;

pub trait SearchGraph {
    type Vertex: Copy + Eq + Hash + Debug;

    /// Fills `out` with the successors of `vertex` and the weight to reach each.
    fn outgoing(&self, vertex: &Self::Vertex, out: &mut Vec<(Self::Vertex, Weight)>);

    /// Fills `out` with the predecessors of `vertex` and the weight from each.
    fn ingoing(&self, vertex: &Self::Vertex, out: &mut Vec<(Self::Vertex, Weight)>);

    /// A consistent lower bound of the weight between two vertices.
    fn heuristic(&self, from: &Self::Vertex, to: &Self::Vertex) -> Weight;
}

/// Receives every settled vertex and may stop the search.
pub trait SearchObserver<V> {
    /// `target` is the finish for the forward wave and the start for the backward one.
    fn on_visit(&mut self, _vertex: &V, _target: &V) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<V> SearchObserver<V> for () {}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    #[error("no path between start and finish")]
    NoPath,

    #[error("search was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<V> {
    pub path: Vec<V>,
    pub distance: Weight,
}

#[derive(Debug)]
struct SmallestHolder {
    cost: Weight,
    index: usize,
}

impl PartialEq for SmallestHolder {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}

impl Eq for SmallestHolder {}

impl PartialOrd for SmallestHolder {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SmallestHolder {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost)
    }
}

#[derive(Debug, Clone, Copy)]
struct Label {
    distance: Weight,
    parent: usize,
    settled: bool,
}

struct Wave<V> {
    target: V,
    queue: BinaryHeap<SmallestHolder>,
    labels: FxIndexMap<V, Label>,
}

impl<V> Wave<V>
where
    V: Copy + Eq + Hash,
{
    fn new(root: V, target: V) -> Self {
        let mut labels = FxIndexMap::with_capacity_and_hasher(256, BuildHasherDefault::<FxHasher>::default());
        labels.insert(
            root,
            Label {
                distance: 0.0,
                parent: NO_PARENT,
                settled: false,
            },
        );

        let mut queue = BinaryHeap::with_capacity(256);
        queue.push(SmallestHolder {
            cost: 0.0,
            index: 0,
        });

        Wave {
            target,
            queue,
            labels,
        }
    }

    fn is_stale(&self, holder: &SmallestHolder) -> bool {
        self.labels
            .get_index(holder.index)
            .is_none_or(|(_, label)| label.settled || holder.cost > label.distance)
    }

    /// Smallest live key in the queue.
    fn top(&mut self) -> Option<Weight> {
        while let Some(holder) = self.queue.peek() {
            if !self.is_stale(holder) {
                return Some(holder.cost);
            }
            self.queue.pop();
        }

        None
    }

    fn settle(&mut self) -> Option<(usize, V, Weight)> {
        while let Some(holder) = self.queue.pop() {
            if self.is_stale(&holder) {
                continue;
            }

            if let Some((vertex, label)) = self.labels.get_index_mut(holder.index) {
                label.settled = true;
                return Some((holder.index, *vertex, label.distance));
            }
        }

        None
    }

    /// Offers a new distance to `vertex`, returning its label afterwards.
    fn relax(&mut self, vertex: V, parent: usize, distance: Weight) -> Weight {
        match self.labels.entry(vertex) {
            Entry::Vacant(slot) => {
                let index = slot.index();
                slot.insert(Label {
                    distance,
                    parent,
                    settled: false,
                });

                self.queue.push(SmallestHolder {
                    cost: distance,
                    index,
                });
                distance
            }
            Entry::Occupied(mut slot) => {
                let index = slot.index();
                let label = slot.get_mut();

                if !label.settled && distance < label.distance {
                    label.distance = distance;
                    label.parent = parent;
                    self.queue.push(SmallestHolder {
                        cost: distance,
                        index,
                    });
                }

                label.distance
            }
        }
    }

    fn distance(&self, vertex: &V) -> Option<Weight> {
        self.labels.get(vertex).map(|label| label.distance)
    }

    /// Vertices from the labelled `vertex` back to the root of the wave.
    fn unwind(&self, vertex: &V) -> Vec<V> {
        let mut path = Vec::new();
        let mut index = self.labels.get_index_of(vertex).unwrap_or(NO_PARENT);

        while let Some((vertex, label)) = self.labels.get_index(index) {
            path.push(*vertex);
            index = label.parent;
        }

        path
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BidirectionalAStar;

impl BidirectionalAStar {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all))]
    pub fn find_path<G>(
        &self,
        graph: &G,
        start: G::Vertex,
        finish: G::Vertex,
        observer: &mut dyn SearchObserver<G::Vertex>,
    ) -> Result<SearchResult<G::Vertex>, SearchError>
    where
        G: SearchGraph,
    {
        if observer.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        if start == finish {
            return Ok(SearchResult {
                path: vec![start],
                distance: 0.0,
            });
        }

        let start_time = Instant::now();
        let potential =
            |vertex: &G::Vertex| 0.5 * (graph.heuristic(vertex, &finish) - graph.heuristic(vertex, &start));

        let mut forward = Wave::new(start, finish);
        let mut backward = Wave::new(finish, start);

        let mut best: Option<(Weight, G::Vertex)> = None;
        let mut neighbours = Vec::new();
        let mut settled = 0usize;
        let mut forward_turn = true;

        loop {
            let (Some(top_forward), Some(top_backward)) = (forward.top(), backward.top()) else {
                break;
            };

            if best.is_some_and(|(length, _)| top_forward + top_backward >= length) {
                break;
            }

            let (wave, other, sign) = if forward_turn {
                (&mut forward, &backward, 1.0)
            } else {
                (&mut backward, &forward, -1.0)
            };
            forward_turn = !forward_turn;

            let Some((index, vertex, distance)) = wave.settle() else {
                break;
            };
            settled += 1;

            observer.on_visit(&vertex, &wave.target);
            if observer.is_cancelled() {
                debug!("Search cancelled after settling {settled} vertices");
                return Err(SearchError::Cancelled);
            }

            if sign > 0.0 {
                graph.outgoing(&vertex, &mut neighbours);
            } else {
                graph.ingoing(&vertex, &mut neighbours);
            }

            let vertex_potential = sign * potential(&vertex);
            for (next, weight) in neighbours.drain(..) {
                let reduced = (weight + sign * potential(&next) - vertex_potential).max(0.0);
                let label = wave.relax(next, index, distance + reduced);

                if let Some(opposite) = other.distance(&next) {
                    let length = label + opposite;
                    if best.is_none_or(|(best_length, _)| length < best_length) {
                        best = Some((length, next));
                    }
                }
            }
        }

        let Some((length, meeting)) = best else {
            debug!("No path after settling {settled} vertices in {:?}", start_time.elapsed());
            return Err(SearchError::NoPath);
        };

        let mut path = forward.unwind(&meeting);
        path.reverse();
        path.extend(backward.unwind(&meeting).into_iter().skip(1));

        let distance = length - (potential(&finish) - potential(&start));
        debug!(
            "Found path of {} vertices, weight {distance:.2}, settling {settled} vertices in {:?}",
            path.len(),
            start_time.elapsed()
        );

        Ok(SearchResult { path, distance })
    }
}
