use crate::core::models::bounds::SparseBoundsMatrix;
use crate::engine::config::DistillConfig;
use crate::engine::error::{EngineError, PartialRun};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::scoring::Scorer;
use crate::engine::utils::sampling::{draw_seeds, sample_distinct_indices, seeded_rng};
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A random contact subset and its score. Lower scores are better.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetScore {
    pub score: f64,
    /// Non-backbone contacts of the subset, as index pairs `(i, j)` with `i < j`.
    pub contacts: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreStatistics {
    pub mean: f64,
    pub standard_error: f64,
}

/// Contacts of the best-scoring trials, weighted by how often they occur.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusGraph {
    /// Share of the merged trials that contain each contact, in `(0, 1]`.
    pub frequencies: BTreeMap<(usize, usize), f64>,
    pub mean_score: f64,
    pub trials: usize,
}

impl ConsensusGraph {
    /// Contacts present in at least `min_frequency` of the merged trials.
    pub fn contacts_above(&self, min_frequency: f64) -> Vec<(usize, usize)> {
        self.frequencies
            .iter()
            .filter(|&(_, &frequency)| frequency >= min_frequency)
            .map(|(&pair, _)| pair)
            .collect()
    }
}

/// All trials of one distillation run, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct Distillation {
    trials: Vec<SubsetScore>,
    candidates: usize,
    subset_size: usize,
    consensus_percentile: f64,
}

impl Distillation {
    pub fn trials(&self) -> &[SubsetScore] {
        &self.trials
    }

    /// Number of contacts eligible for sampling.
    pub fn candidates(&self) -> usize {
        self.candidates
    }

    pub fn subset_size(&self) -> usize {
        self.subset_size
    }

    /// The minimum-score subset, the "essence" of the contact map.
    pub fn best(&self) -> Option<&SubsetScore> {
        self.trials.first()
    }

    /// The maximum-score subset, the most redundant one.
    pub fn worst(&self) -> Option<&SubsetScore> {
        self.trials.last()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.score).collect()
    }

    /// Mean score and its standard error over every trial.
    pub fn score_statistics(&self) -> Option<ScoreStatistics> {
        let n = self.trials.len();
        if n == 0 {
            return None;
        }
        let mean = self.trials.iter().map(|t| t.score).sum::<f64>() / n as f64;
        let standard_error = if n > 1 {
            let variance = self
                .trials
                .iter()
                .map(|t| (t.score - mean).powi(2))
                .sum::<f64>()
                / (n - 1) as f64;
            (variance / n as f64).sqrt()
        } else {
            0.0
        };
        Some(ScoreStatistics {
            mean,
            standard_error,
        })
    }

    /// Consensus over the configured share of best trials.
    pub fn consensus(&self) -> Result<ConsensusGraph, EngineError> {
        self.consensus_of(self.consensus_percentile)
    }

    /// Consensus over the best `percentile` of trials (`0.1` = top 10%).
    pub fn consensus_of(&self, percentile: f64) -> Result<ConsensusGraph, EngineError> {
        let total = self.trials.len();
        let top = (total as f64 * percentile).floor() as usize;
        if top == 0 || top > total {
            return Err(EngineError::EmptyConsensus {
                trials: total,
                percentile,
            });
        }

        let selected = &self.trials[..top];
        let mut counts: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        for trial in selected {
            for &pair in &trial.contacts {
                *counts.entry(pair).or_default() += 1;
            }
        }
        let frequencies = counts
            .into_iter()
            .map(|(pair, count)| (pair, count as f64 / top as f64))
            .collect();
        let mean_score = selected.iter().map(|t| t.score).sum::<f64>() / top as f64;
        Ok(ConsensusGraph {
            frequencies,
            mean_score,
            trials: top,
        })
    }
}

/// Estimates how much geometric information random contact subsets retain.
///
/// Every trial keeps the backbone plus a random `fraction` of the eligible
/// contacts, smooths the result and scores it against the smoothed full map.
#[derive(Debug, Clone)]
pub struct Distiller {
    full: SparseBoundsMatrix,
    scorer: Scorer,
    config: DistillConfig,
}

impl Distiller {
    pub fn new(full: &SparseBoundsMatrix, config: DistillConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let scorer = Scorer::new(full, config.deviation)?;
        Ok(Self {
            full: full.clone(),
            scorer,
            config,
        })
    }

    pub fn config(&self) -> &DistillConfig {
        &self.config
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Contacts eligible for subset sampling, in the full map's insertion order.
    pub fn candidate_contacts(&self) -> Vec<(usize, usize)> {
        self.full
            .contacts()
            .map(|(pair, _)| pair)
            .filter(|&(i, j)| j - i >= self.config.min_sequence_separation)
            .collect()
    }

    /// The full map restricted to the backbone plus `contacts`.
    pub fn subset_bounds(&self, contacts: &[(usize, usize)]) -> Result<SparseBoundsMatrix, EngineError> {
        Ok(self.full.subset(contacts.iter().copied())?)
    }

    /// Scores an arbitrary subset of the full map's contacts.
    pub fn score_subset(&self, contacts: &[(usize, usize)]) -> Result<f64, EngineError> {
        let subset = self.subset_bounds(contacts)?;
        Ok(self.scorer.score(&subset)?)
    }

    #[instrument(skip_all, name = "distill_workflow", fields(fraction = self.config.fraction, trials = self.config.trials))]
    pub fn distill(
        &self,
        rng: &mut impl Rng,
        reporter: &ProgressReporter,
    ) -> Result<Distillation, EngineError> {
        let candidates = self.candidate_contacts();
        let subset_size = (candidates.len() as f64 * self.config.fraction).floor() as usize;
        info!(
            candidates = candidates.len(),
            subset_size,
            deviation = ?self.config.deviation,
            "Starting distillation."
        );
        reporter.report(Progress::PhaseStart { name: "Distillation" });
        reporter.report(Progress::TaskStart {
            total_steps: self.config.trials as u64,
        });

        let seeds = draw_seeds(self.config.trials, rng);

        #[cfg(not(feature = "parallel"))]
        let iterator = seeds.iter();

        #[cfg(feature = "parallel")]
        let iterator = seeds.par_iter();

        let outcomes: Vec<Option<Result<SubsetScore, EngineError>>> = iterator
            .map(|&seed| {
                if reporter.is_cancelled() {
                    return None;
                }
                let trial = self.run_trial(seed, &candidates, subset_size);
                reporter.report(Progress::TaskIncrement);
                Some(trial)
            })
            .collect();

        reporter.report(Progress::TaskFinish);
        let mut trials = Vec::with_capacity(self.config.trials);
        for outcome in outcomes.into_iter().flatten() {
            trials.push(outcome?);
        }
        reporter.report(Progress::PhaseFinish);
        if trials.len() < self.config.trials {
            warn!(
                completed = trials.len(),
                requested = self.config.trials,
                "Distillation cancelled."
            );
            trials.sort_by(|a, b| a.score.total_cmp(&b.score));
            return Err(EngineError::Cancelled {
                completed: trials.len(),
                partial: Box::new(PartialRun::Distillation(Distillation {
                    trials,
                    candidates: candidates.len(),
                    subset_size,
                    consensus_percentile: self.config.consensus_percentile,
                })),
            });
        }

        trials.sort_by(|a, b| a.score.total_cmp(&b.score));
        let distillation = Distillation {
            trials,
            candidates: candidates.len(),
            subset_size,
            consensus_percentile: self.config.consensus_percentile,
        };
        if let (Some(best), Some(worst)) = (distillation.best(), distillation.worst()) {
            info!(
                best = best.score,
                worst = worst.score,
                "Distillation complete."
            );
        }
        Ok(distillation)
    }

    fn run_trial(
        &self,
        seed: u64,
        candidates: &[(usize, usize)],
        subset_size: usize,
    ) -> Result<SubsetScore, EngineError> {
        let mut rng = seeded_rng(seed);
        let picked = sample_distinct_indices(candidates.len(), subset_size, &mut rng)?;
        let contacts: Vec<(usize, usize)> = picked.into_iter().map(|k| candidates[k]).collect();
        let score = self.score_subset(&contacts)?;
        debug!(seed, score, "Trial scored.");
        Ok(SubsetScore { score, contacts })
    }
}
