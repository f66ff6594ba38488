use super::embedding::ScalingMethod;
use super::metrization::SamplingStrategy;
use super::scoring::DeviationFunction;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_MIN_SEQUENCE_SEPARATION: usize = 2;
pub const DEFAULT_CONSENSUS_PERCENTILE: f64 = 0.1;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ReconstructionConfig {
    pub num_models: usize,
    #[serde(default)]
    pub sampling: SamplingStrategy,
    #[serde(default)]
    pub scaling: ScalingMethod,
    /// Count realized distances outside their smoothed bounds for every model.
    #[serde(default)]
    pub check_violations: bool,
}

impl ReconstructionConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_models == 0 {
            return Err(invalid("num_models", "at least one model is required"));
        }
        if let SamplingStrategy::PartialMetrization { roots: 0 } = self.sampling {
            return Err(invalid("sampling", "partial metrization needs at least one root"));
        }
        if let ScalingMethod::ConsecutiveDistance { reference } = self.scaling {
            if !(reference.is_finite() && reference > 0.0) {
                return Err(invalid(
                    "scaling",
                    format!("reference distance must be positive, got {reference}"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct ReconstructionConfigBuilder {
    num_models: Option<usize>,
    sampling: Option<SamplingStrategy>,
    scaling: Option<ScalingMethod>,
    check_violations: bool,
}

impl ReconstructionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_models(mut self, n: usize) -> Self {
        self.num_models = Some(n);
        self
    }
    pub fn sampling(mut self, strategy: SamplingStrategy) -> Self {
        self.sampling = Some(strategy);
        self
    }
    pub fn use_metrization(mut self, enabled: bool) -> Self {
        self.sampling = Some(SamplingStrategy::from_metrization_flag(enabled));
        self
    }
    pub fn scaling(mut self, method: ScalingMethod) -> Self {
        self.scaling = Some(method);
        self
    }
    pub fn check_violations(mut self, enabled: bool) -> Self {
        self.check_violations = enabled;
        self
    }

    pub fn build(self) -> Result<ReconstructionConfig, ConfigError> {
        let config = ReconstructionConfig {
            num_models: self
                .num_models
                .ok_or(ConfigError::MissingParameter("num_models"))?,
            sampling: self.sampling.unwrap_or_default(),
            scaling: self.scaling.unwrap_or_default(),
            check_violations: self.check_violations,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DistillConfig {
    /// Fraction of candidate contacts kept in every random subset, in `[0, 1]`.
    pub fraction: f64,
    pub trials: usize,
    #[serde(default)]
    pub deviation: DeviationFunction,
    /// Contacts between residues closer than this in sequence are never candidates.
    #[serde(default = "default_min_sequence_separation")]
    pub min_sequence_separation: usize,
    /// Share of best-scoring trials merged into the consensus graph, in `(0, 1]`.
    #[serde(default = "default_consensus_percentile")]
    pub consensus_percentile: f64,
}

fn default_min_sequence_separation() -> usize {
    DEFAULT_MIN_SEQUENCE_SEPARATION
}

fn default_consensus_percentile() -> f64 {
    DEFAULT_CONSENSUS_PERCENTILE
}

impl DistillConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.fraction) {
            return Err(invalid(
                "fraction",
                format!("must lie in [0, 1], got {}", self.fraction),
            ));
        }
        if self.trials == 0 {
            return Err(invalid("trials", "at least one trial is required"));
        }
        if self.min_sequence_separation < 2 {
            return Err(invalid(
                "min_sequence_separation",
                "adjacent residues are always bound by the backbone; use 2 or more",
            ));
        }
        if !(self.consensus_percentile > 0.0 && self.consensus_percentile <= 1.0) {
            return Err(invalid(
                "consensus_percentile",
                format!("must lie in (0, 1], got {}", self.consensus_percentile),
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct DistillConfigBuilder {
    fraction: Option<f64>,
    trials: Option<usize>,
    deviation: Option<DeviationFunction>,
    min_sequence_separation: Option<usize>,
    consensus_percentile: Option<f64>,
}

impl DistillConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fraction(mut self, fraction: f64) -> Self {
        self.fraction = Some(fraction);
        self
    }
    pub fn trials(mut self, n: usize) -> Self {
        self.trials = Some(n);
        self
    }
    pub fn deviation(mut self, deviation: DeviationFunction) -> Self {
        self.deviation = Some(deviation);
        self
    }
    pub fn min_sequence_separation(mut self, separation: usize) -> Self {
        self.min_sequence_separation = Some(separation);
        self
    }
    pub fn consensus_percentile(mut self, percentile: f64) -> Self {
        self.consensus_percentile = Some(percentile);
        self
    }

    pub fn build(self) -> Result<DistillConfig, ConfigError> {
        let config = DistillConfig {
            fraction: self
                .fraction
                .ok_or(ConfigError::MissingParameter("fraction"))?,
            trials: self.trials.ok_or(ConfigError::MissingParameter("trials"))?,
            deviation: self.deviation.unwrap_or_default(),
            min_sequence_separation: self
                .min_sequence_separation
                .unwrap_or(DEFAULT_MIN_SEQUENCE_SEPARATION),
            consensus_percentile: self
                .consensus_percentile
                .unwrap_or(DEFAULT_CONSENSUS_PERCENTILE),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconstruction_builder_requires_num_models() {
        assert_eq!(
            ReconstructionConfigBuilder::new().build(),
            Err(ConfigError::MissingParameter("num_models"))
        );
    }

    #[test]
    fn reconstruction_builder_applies_defaults_and_metrization_flag() {
        let config = ReconstructionConfigBuilder::new()
            .num_models(5)
            .use_metrization(true)
            .build()
            .unwrap();
        assert_eq!(config.num_models, 5);
        assert_eq!(config.sampling, SamplingStrategy::partial());
        assert_eq!(config.scaling, ScalingMethod::RadiusOfGyration);
        assert!(!config.check_violations);
    }

    #[test]
    fn reconstruction_builder_rejects_invalid_values() {
        let zero_models = ReconstructionConfigBuilder::new().num_models(0).build();
        assert!(matches!(
            zero_models,
            Err(ConfigError::InvalidParameter { name: "num_models", .. })
        ));
        let zero_roots = ReconstructionConfigBuilder::new()
            .num_models(1)
            .sampling(SamplingStrategy::PartialMetrization { roots: 0 })
            .build();
        assert!(matches!(
            zero_roots,
            Err(ConfigError::InvalidParameter { name: "sampling", .. })
        ));
    }

    #[test]
    fn reconstruction_config_parses_from_toml() {
        let config = ReconstructionConfig::from_toml_str(
            r#"
            num-models = 10
            check-violations = true

            [sampling]
            method = "partial-metrization"
            roots = 4

            [scaling]
            method = "consecutive-distance"
            reference = 3.8
            "#,
        )
        .unwrap();
        assert_eq!(config.num_models, 10);
        assert!(config.check_violations);
        assert_eq!(config.sampling, SamplingStrategy::PartialMetrization { roots: 4 });
        assert_eq!(config.scaling, ScalingMethod::backbone());
    }

    #[test]
    fn reconstruction_config_rejects_unknown_keys() {
        let result = ReconstructionConfig::from_toml_str("num-models = 1\nseed = 3\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn distill_builder_requires_fraction_and_trials() {
        assert_eq!(
            DistillConfigBuilder::new().trials(3).build(),
            Err(ConfigError::MissingParameter("fraction"))
        );
        assert_eq!(
            DistillConfigBuilder::new().fraction(0.5).build(),
            Err(ConfigError::MissingParameter("trials"))
        );
    }

    #[test]
    fn distill_builder_validates_ranges() {
        for fraction in [-0.1, 1.5, f64::NAN] {
            let result = DistillConfigBuilder::new().fraction(fraction).trials(1).build();
            assert!(matches!(
                result,
                Err(ConfigError::InvalidParameter { name: "fraction", .. })
            ));
        }
        let result = DistillConfigBuilder::new()
            .fraction(0.5)
            .trials(1)
            .consensus_percentile(0.0)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "consensus_percentile", .. })
        ));
        let result = DistillConfigBuilder::new()
            .fraction(0.5)
            .trials(1)
            .min_sequence_separation(1)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { name: "min_sequence_separation", .. })
        ));
    }

    #[test]
    fn distill_config_parses_from_toml_with_defaults() {
        let config = DistillConfig::from_toml_str(
            r#"
            fraction = 0.2
            trials = 50
            deviation = "squared"
            "#,
        )
        .unwrap();
        assert_eq!(config.fraction, 0.2);
        assert_eq!(config.trials, 50);
        assert_eq!(config.deviation, DeviationFunction::Squared);
        assert_eq!(config.min_sequence_separation, DEFAULT_MIN_SEQUENCE_SEPARATION);
        assert_eq!(config.consensus_percentile, DEFAULT_CONSENSUS_PERCENTILE);
    }
}
