use rand::prelude::*;
use rand::seq::index;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SamplingError {
    #[error("Cannot sample {requested} distinct indices from a population of {population}")]
    InsufficientPopulation { requested: usize, population: usize },
}

/// Draws `count` distinct indices from `0..population`, returned in ascending order.
#[instrument(level = "trace", skip_all, fields(population, count))]
pub fn sample_distinct_indices(
    population: usize,
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<usize>, SamplingError> {
    if count > population {
        return Err(SamplingError::InsufficientPopulation {
            requested: count,
            population,
        });
    }
    let mut indices = index::sample(rng, population, count).into_vec();
    indices.sort_unstable();
    Ok(indices)
}

/// One independent seed per unit of work, drawn up front so that results do
/// not depend on the order in which the units are executed.
pub fn draw_seeds(count: usize, rng: &mut impl Rng) -> Vec<u64> {
    (0..count).map(|_| rng.next_u64()).collect()
}

#[inline]
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
