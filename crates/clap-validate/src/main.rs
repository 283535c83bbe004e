use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use clap_validate::{default_search_paths, discover_in, discover_plugins, ValidateConfig, Validator};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Smoke-test every CLAP effect in a directory")]
struct Cli {
    /// Directory to scan for `.clap` plug-ins. Defaults to the standard CLAP locations.
    dir: Option<PathBuf>,
    /// Audio file used as the test signal. A synthetic signal is used otherwise.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    sample_rate: Option<u32>,
    #[arg(long)]
    block_size: Option<u32>,
    /// MSE threshold for the parameter randomization check.
    #[arg(long)]
    tolerance: Option<f64>,
    /// Seed for parameter randomization; printed on every run.
    #[arg(long)]
    seed: Option<u64>,
    /// Length of the synthetic signal in seconds.
    #[arg(long)]
    seconds: Option<f32>,
    /// JSON config file; flags given on the command line take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write a JSON report here.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Write each processed buffer as a WAV file into this directory.
    #[arg(long)]
    dump_dir: Option<PathBuf>,
    /// Stop at the first plug-in that fails.
    #[arg(long)]
    fail_fast: bool,
    /// Fail the randomization check when the output does not differ from the input.
    #[arg(long)]
    require_change: bool,
    /// Only scan the top level of the directory.
    #[arg(long)]
    no_recursive: bool,
}

impl Cli {
    fn into_config(self) -> Result<ValidateConfig> {
        let mut config = match &self.config {
            Some(path) => ValidateConfig::from_json_file(path)?,
            None => ValidateConfig::default(),
        };
        if let Some(dir) = self.dir {
            config.plugins_dir = Some(dir);
        }
        if let Some(input) = self.input {
            config.input = Some(input);
        }
        if let Some(sample_rate) = self.sample_rate {
            config.sample_rate = sample_rate;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(seconds) = self.seconds {
            config.signal_seconds = seconds;
        }
        if let Some(report) = self.report {
            config.report = Some(report);
        }
        if let Some(dump_dir) = self.dump_dir {
            config.dump_dir = Some(dump_dir);
        }
        config.fail_fast |= self.fail_fast;
        config.require_change |= self.require_change;
        if self.no_recursive {
            config.recursive = false;
        }
        config.validate()?;
        config.resolve_seed();
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .ok();

    let mut config = Cli::parse().into_config()?;

    let plugins = match &config.plugins_dir {
        Some(dir) => discover_plugins(dir, config.recursive)?,
        None => discover_in(&default_search_paths(), config.recursive)?,
    };
    if plugins.is_empty() {
        tracing::warn!("no .clap plug-ins found");
    }

    let signal = config.test_signal()?;
    if let Some(dir) = &config.dump_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let report_path = config.report.clone();
    let mut validator = Validator::new(config, signal);
    let report = validator.run(&plugins);

    if let Some(path) = report_path {
        report.write_json(&path)?;
        tracing::info!("wrote report to {}", path.display());
    }

    println!(
        "{} passed, {} failed (seed {})",
        report.passed(),
        report.failed(),
        report.seed
    );
    for plugin in report.plugins.iter().filter(|plugin| !plugin.passed()) {
        for failure in plugin.failures() {
            println!(
                "  {} [{}]: {}",
                plugin.name,
                failure.check,
                failure.message.as_deref().unwrap_or("failed")
            );
        }
    }

    if !report.all_passed() {
        anyhow::bail!("{} plug-in(s) failed validation", report.failed());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn parse(args: &[&str]) -> Result<ValidateConfig> {
        let args = std::iter::once("clap-validate").chain(args.iter().copied());
        Cli::try_parse_from(args)?.into_config()
    }

    fn write_config(dir: &Path, json: &str) -> String {
        let path = dir.join("validate.json");
        fs::write(&path, json).unwrap();
        path.display().to_string()
    }

    #[test]
    fn file_values_survive_without_flags() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{ "sample_rate": 48000, "block_size": 128, "seed": 9, "fail_fast": true,
                 "require_change": true, "plugins_dir": "/opt/clap" }"#,
        );
        let config = parse(&["--config", &path]).unwrap();
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.block_size, 128);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.plugins_dir.as_deref(), Some(Path::new("/opt/clap")));
        assert!(config.fail_fast);
        assert!(config.require_change);
        assert!(config.recursive);
    }

    #[test]
    fn flags_override_the_file() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{ "sample_rate": 48000, "tolerance": 0.5, "seed": 9, "plugins_dir": "/opt/clap" }"#,
        );
        let config = parse(&[
            "/home/me/.clap",
            "--config",
            &path,
            "--sample-rate",
            "96000",
            "--seed",
            "3",
            "--seconds",
            "0.5",
        ])
        .unwrap();
        assert_eq!(config.sample_rate, 96_000);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.signal_seconds, 0.5);
        assert_eq!(config.plugins_dir.as_deref(), Some(Path::new("/home/me/.clap")));
        assert_eq!(config.tolerance, 0.5);
    }

    #[test]
    fn boolean_flags_combine_with_the_file() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), r#"{ "fail_fast": true, "recursive": true }"#);

        let config = parse(&["--config", &path, "--no-recursive", "--require-change"]).unwrap();
        assert!(!config.recursive);
        assert!(config.fail_fast);
        assert!(config.require_change);

        let path = write_config(dir.path(), r#"{ "recursive": false, "require_change": true }"#);
        let config = parse(&["--config", &path, "--fail-fast"]).unwrap();
        assert!(!config.recursive);
        assert!(config.fail_fast);
        assert!(config.require_change);
    }

    #[test]
    fn merged_config_always_carries_a_seed() {
        let config = parse(&[]).unwrap();
        assert!(config.seed.is_some());
        assert_eq!(config, ValidateConfig { seed: config.seed, ..ValidateConfig::default() });
    }

    #[test]
    fn merged_values_are_validated() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), r#"{ "block_size": 64 }"#);
        assert!(parse(&["--config", &path, "--block-size", "0"]).is_err());
        assert!(parse(&["--config", "/no/such/validate.json"]).is_err());
    }
}
