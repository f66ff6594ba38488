//! Drawing concrete distance matrices from smoothed bounds.
//!
//! Uniform sampling draws every pair independently from its interval. Metrization
//! fixes pairs one at a time. After each fix the upper bounds are kept as the
//! shortest-path closure over the fixed distances, and every draw takes its lower
//! bound from the triangle inequality against that closure, so the fixed
//! distances never contradict each other.

use super::utils::sampling::sample_distinct_indices;
use crate::core::models::bounds::{AllPairsBoundsMatrix, BOUND_TOLERANCE};
use crate::core::models::distance::DistanceMatrix;
use nalgebra::{DMatrix, Scalar};
use rand::prelude::*;
use serde::Deserialize;
use tracing::{instrument, trace, warn};

pub const DEFAULT_PARTIAL_METRIZATION_ROOTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "method")]
pub enum SamplingStrategy {
    /// Every pair drawn independently from its smoothed interval.
    Uniform,
    /// Every pair fixed in random order against the triangle closure of the
    /// pairs fixed before it.
    ///
    /// Each draw scans all pairs for its lower bound, so one matrix costs
    /// O(n^4). Above a few dozen residues prefer [`SamplingStrategy::partial`].
    FullMetrization,
    /// All pairs involving `roots` random indices are metrized; the rest are
    /// drawn independently, bounded through the fixed root distances.
    PartialMetrization { roots: usize },
}

impl SamplingStrategy {
    /// Maps the plain on/off switch onto a strategy. Switching metrization on
    /// selects partial metrization with the default number of roots.
    pub fn from_metrization_flag(use_metrization: bool) -> Self {
        if use_metrization {
            Self::partial()
        } else {
            Self::Uniform
        }
    }

    pub fn partial() -> Self {
        Self::PartialMetrization {
            roots: DEFAULT_PARTIAL_METRIZATION_ROOTS,
        }
    }
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        Self::Uniform
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampledDistances {
    pub distances: DistanceMatrix,
    /// Distinct pairs whose lower bound ended up above their upper bound
    /// during metrization and had to be clamped. Always zero for uniform
    /// sampling.
    pub infeasible_pairs: usize,
}

struct WorkingBounds {
    lower: DMatrix<f64>,
    /// Shortest-path closure of the upper bounds, kept exact across fixes.
    upper: DMatrix<f64>,
    flagged: DMatrix<bool>,
}

impl WorkingBounds {
    fn new(bounds: &AllPairsBoundsMatrix) -> Self {
        let n = bounds.size();
        Self {
            lower: DMatrix::from_fn(n, n, |i, j| bounds.lower(i, j)),
            upper: DMatrix::from_fn(n, n, |i, j| bounds.upper(i, j)),
            flagged: DMatrix::from_element(n, n, false),
        }
    }

    fn size(&self) -> usize {
        self.lower.nrows()
    }

    fn set_symmetric<T: Scalar + Copy>(
        matrix: &mut DMatrix<T>,
        i: usize,
        j: usize,
        value: T,
    ) {
        matrix[(i, j)] = value;
        matrix[(j, i)] = value;
    }

    /// Marks `(i, j)` infeasible. Returns `true` the first time only.
    fn flag(&mut self, i: usize, j: usize, lower: f64, upper: f64) -> bool {
        if self.flagged[(i, j)] {
            return false;
        }
        Self::set_symmetric(&mut self.flagged, i, j, true);
        warn!(i, j, lower, upper, "Metrization found a lower bound above its upper bound; clamping");
        true
    }

    fn draw_between(lower: f64, upper: f64, rng: &mut impl Rng) -> f64 {
        lower + rng.r#gen::<f64>() * (upper - lower)
    }

    /// Draws from the stored interval without looking at other pairs.
    fn draw(&self, i: usize, j: usize, rng: &mut impl Rng) -> f64 {
        Self::draw_between(self.lower[(i, j)], self.upper[(i, j)], rng)
    }

    /// Tightest lower bound for `(a, b)` implied by the triangle inequality:
    /// `max(l_ab, l_kl - u_ak - u_lb)` over every ordered pair `(k, l)`.
    fn effective_lower(&self, a: usize, b: usize) -> f64 {
        let n = self.size();
        let mut best = self.lower[(a, b)];
        for k in 0..n {
            let to_k = self.upper[(a, k)];
            for l in 0..n {
                let candidate = self.lower[(k, l)] - to_k - self.upper[(l, b)];
                if candidate > best {
                    best = candidate;
                }
            }
        }
        best
    }

    /// Draws `(a, b)` against the current closure and fixes it. Returns the
    /// drawn distance and the number of newly infeasible pairs.
    fn metrize(&mut self, a: usize, b: usize, rng: &mut impl Rng) -> (f64, usize) {
        let upper = self.upper[(a, b)];
        let mut lower = self.effective_lower(a, b);
        let mut infeasible = 0;
        if lower > upper {
            if lower - upper > BOUND_TOLERANCE && self.flag(a, b, lower, upper) {
                infeasible += 1;
            }
            lower = upper;
        }
        let value = Self::draw_between(lower, upper, rng);
        infeasible += self.fix(a, b, value);
        (value, infeasible)
    }

    /// Fixes pair `(a, b)` to `value` and tightens every other upper bound
    /// through it. Returns the number of pairs that became infeasible for the
    /// first time.
    fn fix(&mut self, a: usize, b: usize, value: f64) -> usize {
        Self::set_symmetric(&mut self.lower, a, b, value);
        Self::set_symmetric(&mut self.upper, a, b, value);

        let via_a = self.upper.column(a).clone_owned();
        let via_b = self.upper.column(b).clone_owned();
        let n = self.size();
        let mut infeasible = 0;
        for k in 0..n {
            for l in (k + 1)..n {
                let through = (via_a[k] + value + via_b[l]).min(via_b[k] + value + via_a[l]);
                if through >= self.upper[(k, l)] {
                    continue;
                }
                Self::set_symmetric(&mut self.upper, k, l, through);
                let lower = self.lower[(k, l)];
                if lower > through {
                    if lower - through > BOUND_TOLERANCE && self.flag(k, l, lower, through) {
                        infeasible += 1;
                    }
                    Self::set_symmetric(&mut self.lower, k, l, through);
                }
            }
        }
        infeasible
    }

    /// Interval for a pair bounded only through the fixed distances to `roots`.
    fn root_interval(&self, i: usize, j: usize, roots: &[usize]) -> (f64, f64) {
        let upper = self.upper[(i, j)];
        let lower = roots
            .iter()
            .map(|&r| (self.upper[(i, r)] - self.upper[(r, j)]).abs())
            .fold(self.lower[(i, j)], f64::max);
        (lower, upper)
    }
}

/// Draws one complete distance matrix from `bounds`.
#[instrument(level = "trace", skip_all, fields(size = bounds.size(), ?strategy))]
pub fn sample_distances(
    bounds: &AllPairsBoundsMatrix,
    strategy: SamplingStrategy,
    rng: &mut impl Rng,
) -> SampledDistances {
    let n = bounds.size();
    let mut working = WorkingBounds::new(bounds);
    let mut distances = DistanceMatrix::zeros(n);
    let mut infeasible_pairs = 0;

    match strategy {
        SamplingStrategy::Uniform => {
            for ((i, j), _) in bounds.iter_pairs() {
                distances.set(i, j, working.draw(i, j, rng));
            }
        }
        SamplingStrategy::FullMetrization => {
            let mut pairs: Vec<(usize, usize)> = bounds.iter_pairs().map(|(pair, _)| pair).collect();
            pairs.shuffle(rng);
            for (i, j) in pairs {
                let (value, infeasible) = working.metrize(i, j, rng);
                infeasible_pairs += infeasible;
                distances.set(i, j, value);
            }
        }
        SamplingStrategy::PartialMetrization { roots } => {
            let mut fixed = DMatrix::from_element(n, n, false);
            // Clamped to the population, so sampling cannot fail.
            let mut chosen = sample_distinct_indices(n, roots.min(n), rng).unwrap_or_default();
            chosen.shuffle(rng);
            for &root in &chosen {
                let mut others: Vec<usize> = (0..n).filter(|&k| k != root).collect();
                others.shuffle(rng);
                for other in others {
                    if fixed[(root, other)] {
                        continue;
                    }
                    let (value, infeasible) = working.metrize(root, other, rng);
                    infeasible_pairs += infeasible;
                    distances.set(root, other, value);
                    fixed[(root, other)] = true;
                    fixed[(other, root)] = true;
                }
            }
            for ((i, j), _) in bounds.iter_pairs() {
                if fixed[(i, j)] {
                    continue;
                }
                let (mut lower, upper) = working.root_interval(i, j, &chosen);
                if lower > upper {
                    if lower - upper > BOUND_TOLERANCE && working.flag(i, j, lower, upper) {
                        infeasible_pairs += 1;
                    }
                    lower = upper;
                }
                distances.set(i, j, WorkingBounds::draw_between(lower, upper, rng));
            }
        }
    }

    trace!(infeasible_pairs, "Distance matrix sampled");
    SampledDistances {
        distances,
        infeasible_pairs,
    }
}
