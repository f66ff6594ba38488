use crate::core::models::bounds::{
    AllPairsBoundsMatrix, BOUND_TOLERANCE, BoundViolations, SparseBoundsMatrix,
};
use crate::core::models::distance::DistanceMatrix;
use crate::core::models::index::ResidueIndex;
use crate::core::restraints::builder::{ContactSource, build_bounds_matrix};
use crate::core::restraints::table::DistanceBoundsTable;
use crate::engine::config::ReconstructionConfig;
use crate::engine::embedding::{EMBEDDING_DIMENSIONS, Embedder};
use crate::engine::error::{EngineError, PartialRun};
use crate::engine::metrization::sample_distances;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::smoothing::BoundsSmoother;
use crate::engine::utils::sampling::{draw_seeds, seeded_rng};
use nalgebra::Point3;
use rand::Rng;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One reconstructed conformation.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Coordinates, index-aligned with the residue index of the ensemble.
    pub points: Vec<Point3<f64>>,
    pub eigenvalues: [f64; EMBEDDING_DIMENSIONS],
    pub negative_eigenvalues: usize,
    /// Pairs that metrization had to clamp while sampling this model.
    pub infeasible_pairs: usize,
    /// Realized distances outside their smoothed bounds, when requested.
    pub violations: Option<BoundViolations>,
}

/// Independent reconstructions of the same bounds matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Ensemble {
    pub models: Vec<Model>,
    residue_index: ResidueIndex,
}

impl Ensemble {
    #[inline]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn residue_index(&self) -> &ResidueIndex {
        &self.residue_index
    }

    /// The coordinates of model `model` paired with their residue serials.
    pub fn labeled_points(&self, model: usize) -> Option<Vec<(isize, Point3<f64>)>> {
        let model = self.models.get(model)?;
        Some(
            self.residue_index
                .serials()
                .iter()
                .copied()
                .zip(model.points.iter().copied())
                .collect(),
        )
    }
}

/// Repeated sample-and-embed draws over one smoothed bounds matrix.
///
/// Smoothing happens once, at construction, on a private copy of the input.
#[derive(Debug, Clone)]
pub struct Reconstructer {
    bounds: SparseBoundsMatrix,
    all_pairs: AllPairsBoundsMatrix,
}

impl Reconstructer {
    #[instrument(skip_all, fields(size = bounds.size(), defined = bounds.len()))]
    pub fn new(bounds: &SparseBoundsMatrix) -> Result<Self, EngineError> {
        let smoother = BoundsSmoother::new(bounds);
        let all_pairs = smoother.smooth()?;
        info!(
            residues = all_pairs.size(),
            hard_sphere_bound = smoother.hard_sphere_bound(),
            "Bounds smoothed for reconstruction."
        );
        Ok(Self {
            bounds: bounds.clone(),
            all_pairs,
        })
    }

    pub fn from_contacts<S: ContactSource>(
        source: &S,
        table: &DistanceBoundsTable,
    ) -> Result<Self, EngineError> {
        let bounds = build_bounds_matrix(source, table)?;
        Self::new(&bounds)
    }

    pub fn bounds(&self) -> &SparseBoundsMatrix {
        &self.bounds
    }

    pub fn all_pairs_bounds(&self) -> &AllPairsBoundsMatrix {
        &self.all_pairs
    }

    /// Runs `config.num_models` independent draws.
    ///
    /// One seed per draw is taken from `rng` before any draw starts, so the
    /// ensemble is the same whether the draws run sequentially or in parallel.
    /// Cancellation is checked before every draw.
    #[instrument(skip_all, name = "reconstruct_workflow", fields(models = config.num_models, sampling = ?config.sampling))]
    pub fn reconstruct(
        &self,
        config: &ReconstructionConfig,
        rng: &mut impl Rng,
        reporter: &ProgressReporter,
    ) -> Result<Ensemble, EngineError> {
        config.validate()?;
        reporter.report(Progress::PhaseStart {
            name: "Reconstruction",
        });
        reporter.report(Progress::TaskStart {
            total_steps: config.num_models as u64,
        });

        let seeds = draw_seeds(config.num_models, rng);

        #[cfg(not(feature = "parallel"))]
        let iterator = seeds.iter();

        #[cfg(feature = "parallel")]
        let iterator = seeds.par_iter();

        let outcomes: Vec<Option<Result<Model, EngineError>>> = iterator
            .map(|&seed| {
                if reporter.is_cancelled() {
                    return None;
                }
                let model = self.draw(seed, config);
                reporter.report(Progress::TaskIncrement);
                Some(model)
            })
            .collect();

        reporter.report(Progress::TaskFinish);
        let mut models = Vec::with_capacity(config.num_models);
        for outcome in outcomes.into_iter().flatten() {
            models.push(outcome?);
        }
        if models.len() < config.num_models {
            warn!(
                completed = models.len(),
                requested = config.num_models,
                "Reconstruction cancelled."
            );
            reporter.report(Progress::PhaseFinish);
            return Err(EngineError::Cancelled {
                completed: models.len(),
                partial: Box::new(PartialRun::Reconstruction(Ensemble {
                    models,
                    residue_index: self.all_pairs.index().clone(),
                })),
            });
        }

        let infeasible: usize = models.iter().map(|m| m.infeasible_pairs).sum();
        info!(
            models = models.len(),
            infeasible_pairs = infeasible,
            "Reconstruction complete."
        );
        reporter.report(Progress::PhaseFinish);
        Ok(Ensemble {
            models,
            residue_index: self.all_pairs.index().clone(),
        })
    }

    fn draw(&self, seed: u64, config: &ReconstructionConfig) -> Result<Model, EngineError> {
        let mut rng = seeded_rng(seed);
        let sampled = sample_distances(&self.all_pairs, config.sampling, &mut rng);
        let embedding = Embedder::from_distances(&sampled.distances)?.embed(config.scaling);

        let violations = config.check_violations.then(|| {
            let realized = DistanceMatrix::from_points(&embedding.points);
            self.all_pairs.count_violations(&realized, BOUND_TOLERANCE)
        });
        debug!(
            seed,
            infeasible_pairs = sampled.infeasible_pairs,
            negative_eigenvalues = embedding.negative_eigenvalues,
            ?violations,
            "Model drawn."
        );

        Ok(Model {
            points: embedding.points,
            eigenvalues: embedding.eigenvalues,
            negative_eigenvalues: embedding.negative_eigenvalues,
            infeasible_pairs: sampled.infeasible_pairs,
            violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::bounds::Bound;
    use crate::core::models::residue::AminoAcid;
    use crate::core::restraints::builder::ContactMap;
    use crate::core::utils::geometry::superpose;
    use crate::engine::config::ReconstructionConfigBuilder;
    use crate::engine::embedding::ScalingMethod;
    use crate::engine::metrization::SamplingStrategy;
    use crate::engine::progress::CancellationToken;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn helix(n: usize) -> Vec<Point3<f64>> {
        (0..n)
            .map(|i| {
                let t = i as f64 * 100f64.to_radians();
                Point3::new(2.3 * t.cos(), 2.3 * t.sin(), 1.5 * i as f64)
            })
            .collect()
    }

    fn helix_contact_map(n: usize) -> ContactMap {
        let residues: Vec<_> = (1..=n as isize).map(|s| (s, AminoAcid::Alanine)).collect();
        ContactMap::from_coordinates("Ca", 8.0, &residues, &helix(n))
    }

    fn config(num_models: usize, strategy: SamplingStrategy) -> ReconstructionConfig {
        ReconstructionConfigBuilder::new()
            .num_models(num_models)
            .sampling(strategy)
            .check_violations(true)
            .build()
            .unwrap()
    }

    #[test]
    fn reconstruct_produces_requested_number_of_models() {
        let reconstructer =
            Reconstructer::from_contacts(&helix_contact_map(14), &DistanceBoundsTable::default())
                .unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let ensemble = reconstructer
            .reconstruct(
                &config(3, SamplingStrategy::Uniform),
                &mut rng,
                &ProgressReporter::new(),
            )
            .unwrap();

        assert_eq!(ensemble.len(), 3);
        assert_eq!(ensemble.residue_index().len(), 14);
        for model in &ensemble.models {
            assert_eq!(model.points.len(), 14);
            assert!(model.points.iter().all(|p| p.coords.iter().all(|c| c.is_finite())));
            assert!(model.violations.is_some());
            assert_eq!(model.infeasible_pairs, 0);
        }
        let labeled = ensemble.labeled_points(0).unwrap();
        assert_eq!(labeled[0].0, 1);
        assert_eq!(labeled[13].0, 14);
        assert!(ensemble.labeled_points(3).is_none());
    }

    #[test]
    fn reconstruct_is_reproducible_for_a_seed() {
        let reconstructer =
            Reconstructer::from_contacts(&helix_contact_map(10), &DistanceBoundsTable::default())
                .unwrap();
        let run = |seed| {
            reconstructer
                .reconstruct(
                    &config(2, SamplingStrategy::partial()),
                    &mut StdRng::seed_from_u64(seed),
                    &ProgressReporter::new(),
                )
                .unwrap()
        };
        assert_eq!(run(5), run(5));
        assert_ne!(run(5).models[0].points, run(6).models[0].points);
    }

    #[test]
    fn exact_distances_reconstruct_the_original_structure() {
        // Helix whose consecutive residues sit exactly one backbone step apart.
        let radius = 2.3;
        let chord = 2.0 * radius * 50f64.to_radians().sin();
        let rise = (3.8f64.powi(2) - chord.powi(2)).sqrt();
        let points: Vec<Point3<f64>> = (0..9)
            .map(|i| {
                let t = i as f64 * 100f64.to_radians();
                Point3::new(radius * t.cos(), radius * t.sin(), rise * i as f64)
            })
            .collect();
        let mut bounds = SparseBoundsMatrix::with_size(9, Bound::fixed(3.8).unwrap());
        for i in 0..9 {
            for j in (i + 2)..9 {
                let d = nalgebra::distance(&points[i], &points[j]);
                bounds.insert(i, j, Bound::fixed(d).unwrap()).unwrap();
            }
        }
        let reconstructer = Reconstructer::new(&bounds).unwrap();
        for strategy in [SamplingStrategy::Uniform, SamplingStrategy::FullMetrization] {
            let ensemble = reconstructer
                .reconstruct(
                    &config(1, strategy),
                    &mut StdRng::seed_from_u64(1),
                    &ProgressReporter::new(),
                )
                .unwrap();
            let model = &ensemble.models[0];
            let fit = superpose(&points, &model.points, true).unwrap();
            assert!(fit.rmsd < 1e-6, "rmsd = {}", fit.rmsd);
            assert_eq!(model.violations.unwrap().total(), 0);
            assert_eq!(model.negative_eigenvalues, 0);
        }
    }

    #[test]
    fn consecutive_distance_scaling_restores_backbone_length() {
        let reconstructer =
            Reconstructer::from_contacts(&helix_contact_map(12), &DistanceBoundsTable::default())
                .unwrap();
        let config = ReconstructionConfigBuilder::new()
            .num_models(1)
            .use_metrization(true)
            .scaling(ScalingMethod::backbone())
            .build()
            .unwrap();
        let ensemble = reconstructer
            .reconstruct(&config, &mut StdRng::seed_from_u64(3), &ProgressReporter::new())
            .unwrap();
        let points = &ensemble.models[0].points;
        let mean: f64 = points
            .windows(2)
            .map(|w| nalgebra::distance(&w[0], &w[1]))
            .sum::<f64>()
            / (points.len() - 1) as f64;
        assert!((mean - 3.8).abs() < 1e-9);
        assert!(ensemble.models[0].violations.is_none());
    }

    #[test]
    fn reconstruct_does_not_see_later_changes_to_the_input() {
        let mut bounds = SparseBoundsMatrix::with_size(6, Bound::fixed(3.8).unwrap());
        bounds.insert(0, 5, Bound::new(2.8, 8.0).unwrap()).unwrap();
        let reconstructer = Reconstructer::new(&bounds).unwrap();
        bounds.insert(0, 5, Bound::new(2.8, 4.0).unwrap()).unwrap();
        assert_eq!(
            reconstructer.bounds().get(0, 5),
            Some(Bound::new(2.8, 8.0).unwrap())
        );
        assert!((reconstructer.all_pairs_bounds().upper(0, 5) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn reconstruct_stops_when_cancelled_before_starting() {
        let reconstructer =
            Reconstructer::from_contacts(&helix_contact_map(8), &DistanceBoundsTable::default())
                .unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let reporter = ProgressReporter::new().cancellable(token);
        let result = reconstructer.reconstruct(
            &config(4, SamplingStrategy::Uniform),
            &mut StdRng::seed_from_u64(1),
            &reporter,
        );
        match result {
            Err(EngineError::Cancelled { completed, partial }) => {
                assert_eq!(completed, 0);
                let PartialRun::Reconstruction(ensemble) = *partial else {
                    panic!("expected a partial reconstruction");
                };
                assert!(ensemble.models.is_empty());
                assert_eq!(ensemble.residue_index.len(), 8);
            }
            other => panic!("expected cancellation, got {other:?}"),
        }
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn reconstruct_stops_between_draws_when_cancelled() {
        let reconstructer =
            Reconstructer::from_contacts(&helix_contact_map(8), &DistanceBoundsTable::default())
                .unwrap();
        let token = CancellationToken::new();
        let trigger = token.clone();
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            if matches!(event, Progress::TaskIncrement) {
                trigger.cancel();
            }
        }))
        .cancellable(token);
        let result = reconstructer.reconstruct(
            &config(4, SamplingStrategy::Uniform),
            &mut StdRng::seed_from_u64(1),
            &reporter,
        );
        match result {
            Err(EngineError::Cancelled { completed, partial }) => {
                assert_eq!(completed, 1);
                let PartialRun::Reconstruction(ensemble) = *partial else {
                    panic!("expected a partial reconstruction");
                };
                assert_eq!(ensemble.models.len(), 1);
                assert_eq!(ensemble.models[0].points.len(), 8);
            }
            other => panic!("expected cancellation, got {other:?}"),
        }
    }

    #[test]
    fn reconstruct_rejects_invalid_configs() {
        let reconstructer = Reconstructer::new(&SparseBoundsMatrix::with_size(
            4,
            Bound::fixed(3.8).unwrap(),
        ))
        .unwrap();
        let config = ReconstructionConfig {
            num_models: 0,
            sampling: SamplingStrategy::Uniform,
            scaling: ScalingMethod::RadiusOfGyration,
            check_violations: false,
        };
        let result = reconstructer.reconstruct(
            &config,
            &mut StdRng::seed_from_u64(1),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::Config { .. })));
    }
}
