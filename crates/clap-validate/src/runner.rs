//! Drives the checks over every discovered plug-in.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap_host::{ClapLibrary, HostShim, PluginDiscovery};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::audio::AudioBuffer;
use crate::checks::{self, CheckOutcome};
use crate::clap_effect::ClapEffect;
use crate::config::ValidateConfig;
use crate::discover::PluginBinary;
use crate::effect::EffectUnderTest;
use crate::report::{PluginReport, RunReport};

const HOST_NAME: &str = "clap-validate";

pub struct Validator {
    config: ValidateConfig,
    mono: AudioBuffer,
    stereo: AudioBuffer,
    rng: StdRng,
    seed: u64,
    host: Arc<HostShim>,
}

impl Validator {
    /// `signal` is expected at `config.sample_rate`; it is folded to the
    /// stereo and mono buffers the audio checks use.
    pub fn new(mut config: ValidateConfig, signal: AudioBuffer) -> Self {
        let seed = config.resolve_seed();
        let stereo = signal.to_stereo();
        let mono = stereo.to_mono();
        Self {
            config,
            mono,
            stereo,
            rng: StdRng::seed_from_u64(seed),
            seed,
            host: Arc::new(HostShim::new(
                HOST_NAME,
                HOST_NAME,
                env!("CARGO_PKG_VERSION"),
            )),
        }
    }

    pub fn run(&mut self, plugins: &[PluginBinary]) -> RunReport {
        tracing::info!(
            "validating {} plug-in binaries at {} Hz (seed {})",
            plugins.len(),
            self.config.sample_rate,
            self.seed
        );
        let mut reports = Vec::new();
        for plugin in plugins {
            let binary_reports = self.validate_binary(plugin);
            let failed = binary_reports.iter().any(|report| !report.passed());
            reports.extend(binary_reports);
            if failed && self.config.fail_fast {
                tracing::warn!("stopping at the first failed plug-in");
                break;
            }
        }
        RunReport {
            sample_rate: self.config.sample_rate,
            seed: self.seed,
            plugins: reports,
        }
    }

    pub fn validate_binary(&mut self, plugin: &PluginBinary) -> Vec<PluginReport> {
        let binary = plugin.binary.clone();
        self.validate_library(&plugin.path, move || unsafe { ClapLibrary::load(&binary) })
    }

    /// Validates every plug-in `load` exposes. `path` names the plug-in in
    /// reports and log lines.
    pub fn validate_library<F>(&mut self, path: &Path, load: F) -> Vec<PluginReport>
    where
        F: FnOnce() -> Result<ClapLibrary>,
    {
        let file = file_label(path);
        let loaded = load().and_then(|library| {
            tracing::debug!("loaded {}", library.path().display());
            let descriptors = PluginDiscovery::new(library.factory()?).list();
            if descriptors.is_empty() {
                anyhow::bail!("factory exports no plug-ins");
            }
            Ok((Arc::new(library), descriptors))
        });
        let (library, descriptors) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::info!("Testing {file}");
                let mut report = PluginReport::new(path, None, file);
                let (outcome, _) = checks::test_load::<(), _>(path, || Err(err));
                report.record(outcome);
                report.skip_remaining("plug-in failed to load");
                log_result(&report);
                return vec![report];
            }
        };

        let mut reports = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let name = if descriptors.len() == 1 {
                file.clone()
            } else {
                format!("{file}#{}", descriptor.id)
            };
            tracing::info!("Testing {name}");
            let mut report = PluginReport::new(path, Some(descriptor.id.clone()), name.clone());
            let host = Arc::clone(&self.host);
            let block_size = self.config.block_size;
            let (outcome, effect) = checks::test_load(path, || {
                ClapEffect::load(Arc::clone(&library), host, descriptor, name, block_size)
            });
            report.record(outcome);
            match effect {
                Some(mut effect) => self.validate_effect(&mut effect, &mut report),
                None => report.skip_remaining("plug-in failed to load"),
            }
            log_result(&report);
            let failed = !report.passed();
            reports.push(report);
            if failed && self.config.fail_fast {
                break;
            }
        }
        reports
    }

    /// Runs every check after `load` against an already created plug-in.
    pub fn validate_effect(&mut self, effect: &mut dyn EffectUnderTest, report: &mut PluginReport) {
        let outcome = checks::test_effect(effect);
        let is_effect = !outcome.is_failure();
        report.record(outcome);
        if !is_effect {
            report.skip_remaining("plug-in is not an audio effect");
            return;
        }

        let sample_rate = self.config.sample_rate;
        let (outcome, output) = checks::test_audio_mono(effect, &self.mono, sample_rate);
        self.finish_audio_check(report, outcome, output);
        effect.reset();

        let (outcome, output) = checks::test_audio_stereo(effect, &self.stereo, sample_rate);
        self.finish_audio_check(report, outcome, output);
        effect.reset();

        let (outcome, output) = checks::test_audio_param_randomization(
            effect,
            &self.stereo,
            sample_rate,
            self.config.randomization(),
            &mut self.rng,
        );
        self.finish_audio_check(report, outcome, output);
    }

    fn finish_audio_check(
        &self,
        report: &mut PluginReport,
        outcome: CheckOutcome,
        output: Option<AudioBuffer>,
    ) {
        if let (Some(dir), Some(output)) = (&self.config.dump_dir, &output) {
            let path = dir.join(format!("{}-{}.wav", sanitize(&report.name), outcome.check));
            match output.write_wav(&path) {
                Ok(()) => tracing::debug!("wrote {}", path.display()),
                Err(err) => tracing::warn!("failed to write {}: {err}", path.display()),
            }
        }
        report.record(outcome);
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

fn log_result(report: &PluginReport) {
    if report.passed() {
        tracing::info!("Passed {}", report.name);
        return;
    }
    let failed: Vec<&str> = report.failures().map(|outcome| outcome.check.label()).collect();
    tracing::error!("Failed {}: {}", report.name, failed.join(", "));
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::checks::tests::MockEffect;
    use crate::checks::CheckKind;
    use crate::checks::CheckStatus;

    const AUDIO_CHECKS: [CheckKind; 3] = [
        CheckKind::AudioMono,
        CheckKind::AudioStereo,
        CheckKind::ParamRandomization,
    ];

    fn signal() -> AudioBuffer {
        crate::audio::synthesize(8_000, 0.05, 7)
    }

    fn config() -> ValidateConfig {
        ValidateConfig {
            sample_rate: 8_000,
            seed: Some(11),
            ..ValidateConfig::default()
        }
    }

    #[test]
    fn effect_runs_every_check_and_resets_between_them() {
        let mut validator = Validator::new(config(), signal());
        let mut effect = MockEffect::gain(0.5);
        let mut report = PluginReport::new("/p/mock.clap", None, "Mock");
        report.record(CheckOutcome::passed(CheckKind::Load));
        validator.validate_effect(&mut effect, &mut report);

        let statuses: Vec<_> = report.checks.iter().map(|c| (c.check, c.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (CheckKind::Load, CheckStatus::Passed),
                (CheckKind::Effect, CheckStatus::Passed),
                (CheckKind::AudioMono, CheckStatus::Passed),
                (CheckKind::AudioStereo, CheckStatus::Passed),
                (CheckKind::ParamRandomization, CheckStatus::Passed),
            ]
        );
        assert_eq!(effect.resets, 2);
        assert!(report.passed());
    }

    #[test]
    fn non_effects_skip_audio_checks() {
        let mut validator = Validator::new(config(), signal());
        let mut effect = MockEffect::gain(1.0);
        effect.effect = false;
        let mut report = PluginReport::new("/p/synth.clap", None, "Mock");
        validator.validate_effect(&mut effect, &mut report);
        assert!(!report.passed());
        for check in AUDIO_CHECKS {
            assert_eq!(report.outcome(check).unwrap().status, CheckStatus::Skipped);
        }
        assert!(effect.set_calls.is_empty());
    }

    #[test]
    fn same_seed_draws_same_parameters() {
        let draw = || {
            let mut validator = Validator::new(config(), signal());
            let mut effect = MockEffect::gain(1.0);
            let mut report = PluginReport::new("/p/mock.clap", None, "Mock");
            validator.validate_effect(&mut effect, &mut report);
            effect.set_calls
        };
        assert_eq!(draw(), draw());
    }

    #[test]
    fn unseeded_run_replays_from_its_reported_seed() {
        let run = |seed: Option<u64>| {
            let mut config = ValidateConfig {
                seed,
                signal_seconds: 0.05,
                ..config()
            };
            let signal = config.test_signal().unwrap();
            let mut validator = Validator::new(config, signal.clone());
            let mut effect = MockEffect::gain(1.0);
            let mut report = PluginReport::new("/p/mock.clap", None, "Mock");
            validator.validate_effect(&mut effect, &mut report);
            (validator.run(&[]).seed, signal, effect.set_calls)
        };

        let (seed, signal, draws) = run(None);
        let (replayed_seed, replayed_signal, replayed_draws) = run(Some(seed));
        assert_eq!(replayed_seed, seed);
        assert_eq!(replayed_signal, signal);
        assert_eq!(replayed_draws, draws);
        assert!(!draws.is_empty());
    }

    #[test]
    fn dumps_are_written_per_check() {
        let dir = tempdir().unwrap();
        let config = ValidateConfig {
            dump_dir: Some(dir.path().to_path_buf()),
            ..config()
        };
        let mut validator = Validator::new(config, signal());
        let mut report = PluginReport::new("/p/mock.clap", None, "vendor#gain");
        validator.validate_effect(&mut MockEffect::gain(1.0), &mut report);
        assert!(dir.path().join("vendor_gain-audio_mono.wav").is_file());
        assert!(dir.path().join("vendor_gain-audio_stereo.wav").is_file());
        assert!(dir.path().join("vendor_gain-param_randomization.wav").is_file());
    }

    #[test]
    fn load_failure_skips_everything_else() {
        let mut validator = Validator::new(config(), signal());
        let reports = validator.validate_library(Path::new("/p/broken.clap"), || {
            Err(anyhow::anyhow!("missing clap_entry"))
        });
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.name, "broken.clap");
        assert_eq!(report.checks[0].status, CheckStatus::Failed);
        assert_eq!(
            report.checks[0].message.as_deref(),
            Some("Failed to load /p/broken.clap: missing clap_entry")
        );
        assert_eq!(report.checks.len(), CheckKind::ALL.len());
    }

    #[test]
    fn fail_fast_stops_after_first_failure() {
        let missing = |name: &str| PluginBinary {
            path: PathBuf::from(format!("/no/such/{name}.clap")),
            binary: PathBuf::from(format!("/no/such/{name}.clap")),
        };
        let plugins = vec![missing("a"), missing("b")];

        let mut validator = Validator::new(config(), signal());
        let report = validator.run(&plugins);
        assert_eq!(report.plugins.len(), 2);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.seed, 11);

        let fail_fast = ValidateConfig {
            fail_fast: true,
            ..config()
        };
        let mut validator = Validator::new(fail_fast, signal());
        assert_eq!(validator.run(&plugins).plugins.len(), 1);
    }

    #[test]
    fn empty_run_passes() {
        let mut validator = Validator::new(config(), signal());
        let report = validator.run(&[]);
        assert!(report.plugins.is_empty());
        assert!(report.all_passed());
    }
}
