use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::audio::{load_test_signal, synthesize, AudioBuffer};
use crate::checks::RandomizationOptions;

/// Run settings. Loaded from an optional JSON file, then overridden by CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateConfig {
    /// Directory holding the plug-ins. `None` scans the standard CLAP locations.
    pub plugins_dir: Option<PathBuf>,
    /// Audio file used as the test signal. `None` synthesizes one.
    pub input: Option<PathBuf>,
    pub sample_rate: u32,
    pub block_size: u32,
    pub tolerance: f64,
    pub seed: Option<u64>,
    /// Length of the synthesized signal.
    pub signal_seconds: f32,
    pub recursive: bool,
    pub fail_fast: bool,
    pub require_change: bool,
    pub dump_dir: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            plugins_dir: None,
            input: None,
            sample_rate: 44_100,
            block_size: 512,
            tolerance: 1e-3,
            seed: None,
            signal_seconds: 2.0,
            recursive: true,
            fail_fast: false,
            require_change: false,
            dump_dir: None,
            report: None,
        }
    }
}

impl ValidateConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("{} is not a valid config file", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            anyhow::bail!("sample rate must be positive");
        }
        if self.block_size == 0 {
            anyhow::bail!("block size must be positive");
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            anyhow::bail!("tolerance must be a non-negative number, got {}", self.tolerance);
        }
        if self.input.is_none() && !(self.signal_seconds > 0.0) {
            anyhow::bail!("signal length must be positive when no input file is given");
        }
        Ok(())
    }

    /// Picks a random seed when none is configured. Every seeded step of a
    /// run reads the same value, so the reported seed replays the run.
    pub fn resolve_seed(&mut self) -> u64 {
        *self.seed.get_or_insert_with(rand::random)
    }

    /// Decodes `input` at the run rate, or synthesizes a signal from the run seed.
    pub fn test_signal(&mut self) -> Result<AudioBuffer> {
        match &self.input {
            Some(path) => load_test_signal(path, self.sample_rate)
                .with_context(|| format!("failed to load test signal {}", path.display())),
            None => {
                let seed = self.resolve_seed();
                Ok(synthesize(self.sample_rate, self.signal_seconds, seed))
            }
        }
    }

    pub fn randomization(&self) -> RandomizationOptions {
        RandomizationOptions {
            tolerance: self.tolerance,
            require_change: self.require_change,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("validate.json");
        fs::write(&path, r#"{ "sample_rate": 48000, "seed": 42 }"#).unwrap();
        let config = ValidateConfig::from_json_file(&path).unwrap();
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.block_size, 512);
        assert!(config.recursive);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = ValidateConfig::default();
        assert!(config.validate().is_ok());
        config.block_size = 0;
        assert!(config.validate().is_err());
        config.block_size = 64;
        config.tolerance = -1.0;
        assert!(config.validate().is_err());
        config.tolerance = 0.0;
        config.signal_seconds = 0.0;
        assert!(config.validate().is_err());
        config.input = Some(PathBuf::from("signal.wav"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn seed_is_resolved_once() {
        let mut config = ValidateConfig::default();
        let seed = config.resolve_seed();
        assert_eq!(config.seed, Some(seed));
        assert_eq!(config.resolve_seed(), seed);
    }

    #[test]
    fn missing_input_names_the_file() {
        let mut config = ValidateConfig {
            input: Some(PathBuf::from("/no/such/signal.wav")),
            ..ValidateConfig::default()
        };
        let err = config.test_signal().unwrap_err();
        assert!(err.to_string().contains("signal.wav"));
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ sample_rate: }").unwrap();
        let err = ValidateConfig::from_json_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
