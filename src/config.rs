//! Simulation settings loaded from TOML.
//!
//! Every section and field is optional; anything left out takes the value
//! the widgets start with.
//!
//! ```toml
//! seed = 42
//!
//! [clt]
//! population = "exponential"
//! sample_size = 30
//! tick_period_ms = 200
//!
//! [confidence]
//! level = 99
//!
//! [network]
//! p_smoking = 0.4
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::causal::NetworkParams;
use crate::clt::{self, DEFAULT_MEANS_BINS, MAX_MEANS};
use crate::confidence::ConfidenceLevel;
use crate::distributions::Population;
use crate::error::{check_sample_size, Result, SimError};

/// Central Limit Theorem run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CltConfig {
    pub population: Population,
    pub sample_size: usize,
    pub tick_period_ms: u64,
    pub max_means: usize,
    /// Bins of the sample-means histogram.
    pub means_bins: usize,
}

impl Default for CltConfig {
    fn default() -> Self {
        Self {
            population: Population::Dice,
            sample_size: 30,
            tick_period_ms: 200,
            max_means: MAX_MEANS,
            means_bins: DEFAULT_MEANS_BINS,
        }
    }
}

/// Repeated-sampling settings, consumed by
/// [`SamplingStudy::from_config`](crate::confidence::SamplingStudy::from_config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Level in percent; must be one of the supported levels.
    pub level: f64,
    pub researchers: usize,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            level: 95.0,
            researchers: 100,
        }
    }
}

impl ConfidenceConfig {
    pub fn confidence_level(&self) -> Result<ConfidenceLevel> {
        ConfidenceLevel::try_from(self.level)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed RNG seed; `None` seeds from the operating system.
    pub seed: Option<u64>,
    pub clt: CltConfig,
    pub confidence: ConfidenceConfig,
    pub network: NetworkParams,
}

impl SimConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(contents).map_err(|e| {
            warn!(error = %e, "failed to parse simulation config");
            SimError::Config(e.to_string())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to read simulation config");
            SimError::Config(format!("{}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), "loaded simulation config");
        Ok(config)
    }

    /// Serializes back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SimError::Config(e.to_string()))
    }

    /// Checks every field against the range the simulations accept.
    pub fn validate(&self) -> Result<()> {
        check_sample_size(self.clt.sample_size, 1)?;
        check_sample_size(self.clt.max_means, 1)?;
        clt::check_tick_period(std::time::Duration::from_millis(self.clt.tick_period_ms))?;
        if self.clt.means_bins == 0 {
            return Err(SimError::InvalidBinCount);
        }
        self.confidence.confidence_level()?;
        self.network.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_widgets() {
        let config = SimConfig::default();
        assert_eq!(config.seed, None);
        assert_eq!(config.clt.population, Population::Dice);
        assert_eq!(config.clt.sample_size, 30);
        assert_eq!(config.clt.tick_period_ms, 200);
        assert_eq!(config.clt.max_means, 1000);
        assert_eq!(config.clt.means_bins, 40);
        assert_eq!(config.confidence.confidence_level(), Ok(ConfidenceLevel::P95));
        assert_eq!(config.confidence.researchers, 100);
        assert_eq!(config.network, NetworkParams::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(SimConfig::from_toml_str("").unwrap(), SimConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
            seed = 42

            [clt]
            population = "skewed"
            sample_size = 5

            [confidence]
            level = 99.5

            [network]
            p_smoking = 0.4
        "#;
        let config = SimConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.clt.population, Population::Skewed);
        assert_eq!(config.clt.sample_size, 5);
        assert_eq!(config.clt.tick_period_ms, 200);
        assert_eq!(config.confidence.confidence_level(), Ok(ConfidenceLevel::P99_5));
        assert_eq!(config.network.p_smoking, 0.4);
        assert_eq!(config.network.p_income, 0.30);
    }

    #[test]
    fn test_uniform_population_name() {
        let config = SimConfig::from_toml_str("[clt]\npopulation = \"uniform\"").unwrap();
        assert_eq!(config.clt.population, Population::Dice);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(
            SimConfig::from_toml_str("[clt]\ntick_period_ms = 10"),
            Err(SimError::InvalidTickPeriod(10))
        );
        assert!(matches!(
            SimConfig::from_toml_str("[confidence]\nlevel = 97"),
            Err(SimError::UnsupportedConfidenceLevel(_))
        ));
        assert!(SimConfig::from_toml_str("[clt]\nsample_size = 0").is_err());
        assert_eq!(
            SimConfig::from_toml_str("[clt]\nmeans_bins = 0"),
            Err(SimError::InvalidBinCount)
        );
        assert!(matches!(
            SimConfig::from_toml_str("[network]\np_genetics = 1.5"),
            Err(SimError::InvalidProbability { name: "p_genetics", .. })
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            SimConfig::from_toml_str("[clt\nsample_size = 3"),
            Err(SimError::Config(_))
        ));
        assert!(matches!(
            SimConfig::from_toml_str("[clt]\npopulation = \"cauchy\""),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn test_from_file_roundtrip() {
        let mut config = SimConfig::default();
        config.seed = Some(7);
        config.clt.population = Population::Bimodal;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes()).unwrap();
        assert_eq!(SimConfig::from_file(file.path()).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(SimConfig::from_file(missing), Err(SimError::Config(_))));
    }
}
