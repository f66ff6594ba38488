//! Classical metric-matrix embedding of a squared-distance matrix into 3D.
//!
//! The squared distances are converted to squared distances from the
//! mass-weighted centroid, then to the metric (Gram) matrix
//! `A[i][j] = (Do[i] + Do[j] - D[i][j]) / 2`. The three largest eigenpairs of
//! the weighted metric matrix `W A W` give the coordinates, which are finally
//! rescaled to match the input's size.

use crate::core::models::distance::DistanceMatrix;
use crate::core::restraints::table::BACKBONE_CA_DISTANCE;
use crate::core::utils::geometry::radius_of_gyration;
use nalgebra::{DMatrix, DVector, Point3, SymmetricEigen};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub const EMBEDDING_DIMENSIONS: usize = 3;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbedError {
    #[error("Distance matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("Expected {expected} masses, got {found}")]
    MassLengthMismatch { expected: usize, found: usize },
    #[error("Expected {expected} weights, got {found}")]
    WeightLengthMismatch { expected: usize, found: usize },
    #[error("Weight {value} at index {index} is not strictly positive")]
    NonPositiveWeight { index: usize, value: f64 },
    #[error("Total mass must be strictly positive, got {0}")]
    NonPositiveTotalMass(f64),
}

/// How an embedding is rescaled after the eigendecomposition.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "method")]
pub enum ScalingMethod {
    /// Leave the coordinates as produced by the eigendecomposition.
    Unscaled,
    /// Match the radius of gyration implied by the input distances.
    RadiusOfGyration,
    /// Match the mean distance between consecutive points to `reference`.
    ConsecutiveDistance { reference: f64 },
}

impl ScalingMethod {
    pub fn backbone() -> Self {
        Self::ConsecutiveDistance {
            reference: BACKBONE_CA_DISTANCE,
        }
    }
}

impl Default for ScalingMethod {
    fn default() -> Self {
        Self::RadiusOfGyration
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub points: Vec<Point3<f64>>,
    /// The chosen eigenvalues, largest first. Missing dimensions (fewer than
    /// three points) are reported as zero.
    pub eigenvalues: [f64; EMBEDDING_DIMENSIONS],
    /// Number of chosen eigenvalues that were negative, a sign that the
    /// input distances are not realizable in three dimensions.
    pub negative_eigenvalues: usize,
    /// Factor the coordinates were multiplied by during scaling.
    pub scale: f64,
}

#[derive(Debug, Clone)]
pub struct Embedder {
    squared: DMatrix<f64>,
    masses: DVector<f64>,
    weights: DVector<f64>,
}

impl Embedder {
    /// An embedder with unit masses and unit weights.
    pub fn new(squared_distances: DMatrix<f64>) -> Result<Self, EmbedError> {
        let n = Self::check_square(&squared_distances)?;
        Ok(Self {
            squared: squared_distances,
            masses: DVector::from_element(n, 1.0),
            weights: DVector::from_element(n, 1.0),
        })
    }

    pub fn from_distances(distances: &DistanceMatrix) -> Result<Self, EmbedError> {
        Self::new(distances.squared())
    }

    pub fn with_masses_and_weights(
        squared_distances: DMatrix<f64>,
        masses: Vec<f64>,
        weights: Vec<f64>,
    ) -> Result<Self, EmbedError> {
        let n = Self::check_square(&squared_distances)?;
        if masses.len() != n {
            return Err(EmbedError::MassLengthMismatch {
                expected: n,
                found: masses.len(),
            });
        }
        if weights.len() != n {
            return Err(EmbedError::WeightLengthMismatch {
                expected: n,
                found: weights.len(),
            });
        }
        if let Some((index, &value)) = weights.iter().enumerate().find(|&(_, &w)| w.is_nan() || w <= 0.0) {
            return Err(EmbedError::NonPositiveWeight { index, value });
        }
        let total: f64 = masses.iter().sum();
        if n > 0 && (total.is_nan() || total <= 0.0) {
            return Err(EmbedError::NonPositiveTotalMass(total));
        }
        Ok(Self {
            squared: squared_distances,
            masses: DVector::from_vec(masses),
            weights: DVector::from_vec(weights),
        })
    }

    fn check_square(matrix: &DMatrix<f64>) -> Result<usize, EmbedError> {
        if matrix.nrows() != matrix.ncols() {
            return Err(EmbedError::NotSquare {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
            });
        }
        Ok(matrix.nrows())
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.squared.nrows()
    }

    /// Squared distance of every point to the mass-weighted centroid.
    fn centroid_distances(&self) -> DVector<f64> {
        let n = self.size();
        let total_mass: f64 = self.masses.sum();
        let mut pair_sum = 0.0;
        for j in 0..n {
            for k in (j + 1)..n {
                pair_sum += self.masses[j] * self.masses[k] * self.squared[(j, k)];
            }
        }
        let spread = pair_sum / (total_mass * total_mass);
        DVector::from_fn(n, |i, _| {
            let weighted: f64 = (0..n).map(|j| self.masses[j] * self.squared[(i, j)]).sum();
            weighted / total_mass - spread
        })
    }

    #[instrument(level = "debug", skip_all, fields(size = self.size(), ?scaling))]
    pub fn embed(&self, scaling: ScalingMethod) -> Embedding {
        let n = self.size();
        if n == 0 {
            return Embedding {
                points: Vec::new(),
                eigenvalues: [0.0; EMBEDDING_DIMENSIONS],
                negative_eigenvalues: 0,
                scale: 1.0,
            };
        }

        let d_o = self.centroid_distances();
        let metric = DMatrix::from_fn(n, n, |i, j| 0.5 * (d_o[i] + d_o[j] - self.squared[(i, j)]));
        let weighted = DMatrix::from_fn(n, n, |i, j| self.weights[i] * metric[(i, j)] * self.weights[j]);

        let eigen = SymmetricEigen::new(weighted);
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let mut eigenvalues = [0.0; EMBEDDING_DIMENSIONS];
        let mut coords = DMatrix::<f64>::zeros(n, EMBEDDING_DIMENSIONS);
        for (dim, &k) in order.iter().take(EMBEDDING_DIMENSIONS).enumerate() {
            let lambda = eigen.eigenvalues[k];
            eigenvalues[dim] = lambda;
            let factor = lambda.max(0.0).sqrt();
            for i in 0..n {
                coords[(i, dim)] = eigen.eigenvectors[(i, k)] * factor / self.weights[i];
            }
        }

        let negative_eigenvalues = eigenvalues.iter().filter(|&&l| l < 0.0).count();
        if negative_eigenvalues > 0 {
            warn!(
                ?eigenvalues,
                "Some of the three largest eigenvalues are negative; distances are not embeddable in 3D"
            );
        }

        let mut points: Vec<Point3<f64>> = (0..n)
            .map(|i| Point3::new(coords[(i, 0)], coords[(i, 1)], coords[(i, 2)]))
            .collect();
        let scale = self.scale_factor(&points, scaling);
        if scale != 1.0 {
            for point in &mut points {
                point.coords *= scale;
            }
        }
        debug!(?eigenvalues, scale, "Embedding computed");

        Embedding {
            points,
            eigenvalues,
            negative_eigenvalues,
            scale,
        }
    }

    /// Radius of gyration implied by the squared distances:
    /// `Rg^2 = sum_{i<j} D[i][j] / n^2`.
    pub fn input_radius_of_gyration(&self) -> f64 {
        let n = self.size();
        if n == 0 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                sum += self.squared[(i, j)];
            }
        }
        (sum / (n * n) as f64).sqrt()
    }

    fn scale_factor(&self, points: &[Point3<f64>], scaling: ScalingMethod) -> f64 {
        let (target, actual) = match scaling {
            ScalingMethod::Unscaled => return 1.0,
            ScalingMethod::RadiusOfGyration => (
                self.input_radius_of_gyration(),
                radius_of_gyration(points).unwrap_or(0.0),
            ),
            ScalingMethod::ConsecutiveDistance { reference } => {
                let steps = points.len().saturating_sub(1);
                let total: f64 = points
                    .windows(2)
                    .map(|w| nalgebra::distance(&w[0], &w[1]))
                    .sum();
                let mean = if steps > 0 { total / steps as f64 } else { 0.0 };
                (reference, mean)
            }
        };
        if actual <= f64::EPSILON || !actual.is_finite() {
            warn!(?scaling, actual, "Embedding has no extent to scale; leaving it unscaled");
            return 1.0;
        }
        target / actual
    }
}
