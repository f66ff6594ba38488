use thiserror::Error;

use super::config::ConfigError;
use super::embedding::EmbedError;
use super::scoring::ScoringError;
use super::smoothing::SmoothingError;
use super::utils::sampling::SamplingError;
use crate::core::models::bounds::BoundsError;
use crate::core::restraints::builder::BuildError;
use crate::core::restraints::table::TableLoadError;
use crate::workflows::distill::Distillation;
use crate::workflows::reconstruct::Ensemble;

/// Work finished before a run was cancelled.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialRun {
    Reconstruction(Ensemble),
    Distillation(Distillation),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Bounds matrix error: {source}")]
    Bounds {
        #[from]
        source: BoundsError,
    },

    #[error("Failed to load distance bounds table: {source}")]
    Table {
        #[from]
        source: TableLoadError,
    },

    #[error("Failed to convert contact map into bounds: {source}")]
    Build {
        #[from]
        source: BuildError,
    },

    #[error("Bounds smoothing failed: {source}")]
    Smoothing {
        #[from]
        source: SmoothingError,
    },

    #[error("Subset scoring failed: {source}")]
    Scoring {
        #[from]
        source: ScoringError,
    },

    #[error("Embedding failed: {source}")]
    Embedding {
        #[from]
        source: EmbedError,
    },

    #[error("Random selection failed: {source}")]
    Sampling {
        #[from]
        source: SamplingError,
    },

    #[error("Cancelled after {completed} completed units of work")]
    Cancelled {
        completed: usize,
        partial: Box<PartialRun>,
    },

    #[error("The best {percentile} of {trials} trials contains no trial to build a consensus from")]
    EmptyConsensus { trials: usize, percentile: f64 },
}
