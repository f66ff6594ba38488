//! Scoring how much of a contact map's geometry a subset of it retains.
//!
//! The subset is smoothed and its inferred upper bounds are compared with the
//! smoothed upper bounds of the full map, over every pair the full map defines.
//! Lower scores mean the subset carries more information.

use super::smoothing::{BoundsSmoother, SmoothingError};
use crate::core::models::bounds::{AllPairsBoundsMatrix, SparseBoundsMatrix};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("Subset covers {found} residues but the reference covers {expected}")]
    SizeMismatch { expected: usize, found: usize },
    #[error("Failed to smooth bounds: {source}")]
    Smoothing {
        #[from]
        source: SmoothingError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviationFunction {
    /// `max(0, inferred - reference)`: only looser bounds are penalized.
    #[default]
    PositiveOnly,
    /// `(inferred - reference)^2`.
    Squared,
}

impl DeviationFunction {
    #[inline]
    pub fn deviation(self, inferred: f64, reference: f64) -> f64 {
        match self {
            Self::PositiveOnly => (inferred - reference).max(0.0),
            Self::Squared => (inferred - reference).powi(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scorer {
    reference: AllPairsBoundsMatrix,
    pairs: Vec<(usize, usize)>,
    deviation: DeviationFunction,
}

impl Scorer {
    /// Smooths `full` once and keeps it as the reference for every later score.
    pub fn new(full: &SparseBoundsMatrix, deviation: DeviationFunction) -> Result<Self, SmoothingError> {
        let reference = BoundsSmoother::new(full).smooth()?;
        let pairs = full.iter().map(|(pair, _)| pair).collect();
        Ok(Self {
            reference,
            pairs,
            deviation,
        })
    }

    pub fn reference(&self) -> &AllPairsBoundsMatrix {
        &self.reference
    }

    pub fn deviation(&self) -> DeviationFunction {
        self.deviation
    }

    /// Mean deviation per residue between the subset's inferred upper bounds
    /// and the reference's.
    pub fn score(&self, subset: &SparseBoundsMatrix) -> Result<f64, ScoringError> {
        if subset.size() != self.reference.size() {
            return Err(ScoringError::SizeMismatch {
                expected: self.reference.size(),
                found: subset.size(),
            });
        }
        let inferred = BoundsSmoother::new(subset).smooth()?;
        Ok(self.score_smoothed(&inferred))
    }

    pub(crate) fn score_smoothed(&self, inferred: &AllPairsBoundsMatrix) -> f64 {
        let n = self.reference.size();
        if n == 0 {
            return 0.0;
        }
        let total: f64 = self
            .pairs
            .iter()
            .map(|&(i, j)| {
                self.deviation
                    .deviation(inferred.upper(i, j), self.reference.upper(i, j))
            })
            .sum();
        total / n as f64
    }
}
