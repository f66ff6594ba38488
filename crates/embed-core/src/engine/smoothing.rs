//! Triangle-inequality bound smoothing.
//!
//! Upper bounds are tightened to all-pairs shortest paths over the sparse
//! constraint graph (one Dijkstra run per index). Lower bounds follow the
//! hard-sphere placeholder policy: every pair without a bound of its own
//! receives one shared lower bound taken from the sparse input, capped at the
//! pair's tightened upper bound. No lower-bound propagation is attempted.

use crate::core::models::bounds::{
    AllPairsBoundsMatrix, BOUND_TOLERANCE, Bound, SparseBoundsMatrix,
};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SmoothingError {
    #[error("No finite upper bound between indices {i} and {j}")]
    UnboundedUpper { i: usize, j: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Frontier {
    cost: f64,
    node: usize,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Smooths a sparse bounds matrix into a dense one.
///
/// Holds a private copy of its input, so later changes to the caller's
/// matrix never leak into the smoothed result.
#[derive(Debug, Clone)]
pub struct BoundsSmoother {
    bounds: SparseBoundsMatrix,
}

impl BoundsSmoother {
    pub fn new(bounds: &SparseBoundsMatrix) -> Self {
        Self {
            bounds: bounds.clone(),
        }
    }

    pub fn bounds(&self) -> &SparseBoundsMatrix {
        &self.bounds
    }

    /// The lower bound applied to every pair the sparse input leaves undefined:
    /// the lower bound of the first stored contact, or the backbone lower bound
    /// when there are no contacts.
    pub fn hard_sphere_bound(&self) -> f64 {
        self.bounds
            .contacts()
            .next()
            .map(|(_, bound)| bound.lower())
            .unwrap_or_else(|| self.bounds.backbone_bound().lower())
    }

    #[instrument(level = "debug", skip_all, fields(size = self.bounds.size(), defined = self.bounds.len()))]
    pub fn smooth(&self) -> Result<AllPairsBoundsMatrix, SmoothingError> {
        let n = self.bounds.size();
        let uppers = self.shortest_paths();
        let placeholder = self.hard_sphere_bound();

        let mut smoothed = AllPairsBoundsMatrix::from_rows(
            self.bounds.index().clone(),
            self.bounds.backbone_bound(),
            vec![Bound { lower: 0.0, upper: 0.0 }; n * n],
        );
        let mut crossed = 0usize;
        for i in 0..n {
            for j in (i + 1)..n {
                let upper = uppers[i * n + j];
                if !upper.is_finite() {
                    return Err(SmoothingError::UnboundedUpper { i, j });
                }
                let lower = match self.bounds.get(i, j) {
                    Some(bound) => {
                        if bound.lower() > upper + BOUND_TOLERANCE {
                            crossed += 1;
                            warn!(
                                i,
                                j,
                                lower = bound.lower(),
                                upper,
                                "Tightened upper bound falls below the defined lower bound; lower bound clamped"
                            );
                        }
                        bound.lower().min(upper)
                    }
                    None => placeholder.min(upper),
                };
                smoothed.set(i, j, Bound { lower, upper });
            }
        }

        if crossed > 0 {
            info!(crossed, "Smoothing clamped inconsistent lower bounds");
        }
        debug!(placeholder, "Bounds smoothed");
        Ok(smoothed)
    }

    /// Row-major `n x n` matrix of shortest-path lengths over the upper bounds.
    fn shortest_paths(&self) -> Vec<f64> {
        let n = self.bounds.size();
        let mut all = vec![f64::INFINITY; n * n];
        let mut heap = BinaryHeap::new();
        for source in 0..n {
            let row = &mut all[source * n..(source + 1) * n];
            row[source] = 0.0;
            heap.push(Frontier {
                cost: 0.0,
                node: source,
            });
            while let Some(Frontier { cost, node }) = heap.pop() {
                if cost > row[node] {
                    continue;
                }
                for (neighbor, bound) in self.bounds.neighbors(node) {
                    let next = cost + bound.upper();
                    if next < row[neighbor] {
                        row[neighbor] = next;
                        heap.push(Frontier {
                            cost: next,
                            node: neighbor,
                        });
                    }
                }
            }
        }
        // Dijkstra from both ends can differ in the last bit; keep the matrix symmetric.
        for i in 0..n {
            for j in (i + 1)..n {
                let value = all[i * n + j].min(all[j * n + i]);
                all[i * n + j] = value;
                all[j * n + i] = value;
            }
        }
        all
    }
}
