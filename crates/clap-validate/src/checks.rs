//! The individual smoke tests run against every plug-in.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use rand::Rng;
use serde::Serialize;

use crate::audio::AudioBuffer;
use crate::effect::EffectUnderTest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Load,
    Effect,
    AudioMono,
    AudioStereo,
    ParamRandomization,
}

impl CheckKind {
    pub const ALL: [CheckKind; 5] = [
        CheckKind::Load,
        CheckKind::Effect,
        CheckKind::AudioMono,
        CheckKind::AudioStereo,
        CheckKind::ParamRandomization,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CheckKind::Load => "load",
            CheckKind::Effect => "effect",
            CheckKind::AudioMono => "audio_mono",
            CheckKind::AudioStereo => "audio_stereo",
            CheckKind::ParamRandomization => "param_randomization",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub check: CheckKind,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, f64>,
}

impl CheckOutcome {
    pub fn passed(check: CheckKind) -> Self {
        Self {
            check,
            status: CheckStatus::Passed,
            message: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn failed(check: CheckKind, message: impl Into<String>) -> Self {
        Self {
            check,
            status: CheckStatus::Failed,
            message: Some(message.into()),
            metrics: BTreeMap::new(),
        }
    }

    pub fn skipped(check: CheckKind, reason: impl Into<String>) -> Self {
        Self {
            check,
            status: CheckStatus::Skipped,
            message: Some(reason.into()),
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == CheckStatus::Failed
    }
}

/// Settings for [`test_audio_param_randomization`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomizationOptions {
    pub tolerance: f64,
    /// Fail when every channel's MSE against the input stays within `tolerance`.
    pub require_change: bool,
}

impl Default for RandomizationOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            require_change: false,
        }
    }
}

/// Runs `load` and reports whether it produced a plug-in.
pub fn test_load<T, F>(plugin_path: &Path, load: F) -> (CheckOutcome, Option<T>)
where
    F: FnOnce() -> anyhow::Result<T>,
{
    match load() {
        Ok(value) => (CheckOutcome::passed(CheckKind::Load), Some(value)),
        Err(err) => (
            CheckOutcome::failed(
                CheckKind::Load,
                format!("Failed to load {}: {err:#}", plugin_path.display()),
            ),
            None,
        ),
    }
}

pub fn test_effect(plugin: &dyn EffectUnderTest) -> CheckOutcome {
    if plugin.is_effect() {
        CheckOutcome::passed(CheckKind::Effect)
    } else {
        CheckOutcome::failed(
            CheckKind::Effect,
            format!("{} is not an effect", plugin.name()),
        )
    }
}

pub fn test_audio_mono(
    plugin: &mut dyn EffectUnderTest,
    audio: &AudioBuffer,
    sample_rate: u32,
) -> (CheckOutcome, Option<AudioBuffer>) {
    process_checked(plugin, audio, sample_rate, CheckKind::AudioMono, "mono")
}

pub fn test_audio_stereo(
    plugin: &mut dyn EffectUnderTest,
    audio: &AudioBuffer,
    sample_rate: u32,
) -> (CheckOutcome, Option<AudioBuffer>) {
    process_checked(plugin, audio, sample_rate, CheckKind::AudioStereo, "stereo")
}

/// Sets every writable parameter to a random value, then processes `audio`.
pub fn test_audio_param_randomization<R: Rng>(
    plugin: &mut dyn EffectUnderTest,
    audio: &AudioBuffer,
    sample_rate: u32,
    options: RandomizationOptions,
    rng: &mut R,
) -> (CheckOutcome, Option<AudioBuffer>) {
    let check = CheckKind::ParamRandomization;
    let mut randomized = 0usize;
    for param in plugin.parameters() {
        if param.read_only {
            continue;
        }
        let raw: f64 = rng.gen();
        let value = param.denormalize(raw);
        if let Err(err) = plugin.set_parameter(param.id, value) {
            return (
                CheckOutcome::failed(
                    check,
                    format!("{} rejected parameter {}: {err}", plugin.name(), param.name),
                ),
                None,
            );
        }
        let text = plugin
            .parameter_text(param.id, value)
            .unwrap_or_else(|| format!("{value:.3}"));
        let (min, max) = param.range();
        tracing::info!(
            "Setting {} to {}, raw_value = {:.3}, range = [{}, {}]",
            param.name,
            text,
            raw,
            min,
            max
        );
        randomized += 1;
    }

    let (outcome, output) = process_checked(plugin, audio, sample_rate, check, "randomized");
    let Some(output) = output else {
        return (outcome, None);
    };
    if outcome.is_failure() {
        return (outcome, Some(output));
    }

    let mse = output.mean_squared_error(audio);
    let mut outcome = outcome.with_metric("parameters", randomized as f64);
    for (channel, value) in mse.iter().enumerate() {
        outcome = outcome.with_metric(format!("mse_ch{channel}"), *value);
    }
    let changed = !mse.is_empty() && mse.iter().all(|value| *value > options.tolerance);
    if !changed {
        tracing::warn!(
            "{} output stayed within {} of the input after randomizing {} parameters",
            plugin.name(),
            options.tolerance,
            randomized
        );
        if options.require_change {
            outcome.status = CheckStatus::Failed;
            outcome.message = Some(format!(
                "{} output did not change after parameter randomization",
                plugin.name()
            ));
        }
    }
    (outcome, Some(output))
}

fn process_checked(
    plugin: &mut dyn EffectUnderTest,
    audio: &AudioBuffer,
    sample_rate: u32,
    check: CheckKind,
    what: &str,
) -> (CheckOutcome, Option<AudioBuffer>) {
    let output = match plugin.process(audio, sample_rate) {
        Ok(output) => output,
        Err(err) => {
            return (
                CheckOutcome::failed(
                    check,
                    format!("{} failed to process {what} audio: {err}", plugin.name()),
                ),
                None,
            )
        }
    };
    if output.shape() != audio.shape() {
        let message = format!(
            "{} changed the shape of the audio: {:?} -> {:?}",
            plugin.name(),
            audio.shape(),
            output.shape()
        );
        return (CheckOutcome::failed(check, message), Some(output));
    }
    if !output.is_finite() {
        return (
            CheckOutcome::failed(
                check,
                format!("{} produced non-finite samples from {what} audio", plugin.name()),
            ),
            Some(output),
        );
    }
    let outcome = CheckOutcome::passed(check).with_metric("peak", f64::from(output.peak()));
    (outcome, Some(output))
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::effect::ParameterInfo;
    use crate::error::ValidationError;

    /// Scriptable effect used across the unit tests.
    pub(crate) struct MockEffect {
        pub name: String,
        pub effect: bool,
        pub gain: f32,
        pub params: Vec<ParameterInfo>,
        pub set_calls: Vec<(u32, f64)>,
        pub drop_frame: bool,
        pub emit_nan: bool,
        pub fail_process: bool,
        pub resets: usize,
    }

    impl MockEffect {
        pub(crate) fn gain(gain: f32) -> Self {
            Self {
                name: "Mock".into(),
                effect: true,
                gain,
                params: vec![
                    ParameterInfo {
                        id: 1,
                        name: "Gain".into(),
                        min: 0.0,
                        max: 2.0,
                        default: 1.0,
                        stepped: false,
                        read_only: false,
                    },
                    ParameterInfo {
                        id: 2,
                        name: "Meter".into(),
                        min: 0.0,
                        max: 1.0,
                        default: 0.0,
                        stepped: false,
                        read_only: true,
                    },
                ],
                set_calls: Vec::new(),
                drop_frame: false,
                emit_nan: false,
                fail_process: false,
                resets: 0,
            }
        }
    }

    impl EffectUnderTest for MockEffect {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_effect(&self) -> bool {
            self.effect
        }

        fn process(
            &mut self,
            audio: &AudioBuffer,
            sample_rate: u32,
        ) -> Result<AudioBuffer, ValidationError> {
            if self.fail_process {
                return Err(ValidationError::NoOutputPort);
            }
            let mut channels: Vec<Vec<f32>> = audio
                .channels()
                .iter()
                .map(|channel| channel.iter().map(|s| s * self.gain).collect())
                .collect();
            if self.drop_frame {
                for channel in &mut channels {
                    channel.pop();
                }
            }
            if self.emit_nan {
                channels[0][0] = f32::NAN;
            }
            Ok(AudioBuffer::new(sample_rate, channels))
        }

        fn parameters(&self) -> Vec<ParameterInfo> {
            self.params.clone()
        }

        fn set_parameter(&mut self, id: u32, value: f64) -> Result<(), ValidationError> {
            if !self.params.iter().any(|param| param.id == id) {
                return Err(ValidationError::UnknownParameter(id));
            }
            self.set_calls.push((id, value));
            if id == 1 {
                self.gain = value as f32;
            }
            Ok(())
        }

        fn parameter_value(&self, id: u32) -> Option<f64> {
            (id == 1).then_some(f64::from(self.gain))
        }

        fn parameter_text(&self, id: u32, value: f64) -> Option<String> {
            (id == 1).then(|| format!("{value:.2}x"))
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    fn signal() -> AudioBuffer {
        AudioBuffer::new(48_000, vec![vec![0.5, -0.5, 0.25, 0.0], vec![0.1, 0.2, 0.3, 0.4]])
    }

    #[test]
    fn load_failure_names_the_path() {
        let (outcome, value): (_, Option<()>) =
            test_load(Path::new("/plugins/broken.clap"), || Err(anyhow::anyhow!("no clap_entry")));
        assert!(value.is_none());
        assert_eq!(outcome.status, CheckStatus::Failed);
        assert_eq!(
            outcome.message.as_deref(),
            Some("Failed to load /plugins/broken.clap: no clap_entry")
        );
    }

    #[test]
    fn instruments_are_not_effects() {
        let mut plugin = MockEffect::gain(1.0);
        assert_eq!(test_effect(&plugin).status, CheckStatus::Passed);
        plugin.effect = false;
        let outcome = test_effect(&plugin);
        assert_eq!(outcome.message.as_deref(), Some("Mock is not an effect"));
    }

    #[test]
    fn mono_and_stereo_pass_for_shape_preserving_effect() {
        let mut plugin = MockEffect::gain(0.5);
        let stereo = signal();
        let mono = stereo.to_mono();
        let (mono_outcome, mono_out) = test_audio_mono(&mut plugin, &mono, 48_000);
        let (stereo_outcome, _) = test_audio_stereo(&mut plugin, &stereo, 48_000);
        assert_eq!(mono_outcome.status, CheckStatus::Passed);
        assert_eq!(stereo_outcome.status, CheckStatus::Passed);
        assert_eq!(mono_out.unwrap().shape(), (1, 4));
        assert_eq!(stereo_outcome.metrics.get("peak"), Some(&0.25));
    }

    #[test]
    fn shape_change_is_reported() {
        let mut plugin = MockEffect::gain(1.0);
        plugin.drop_frame = true;
        let (outcome, _) = test_audio_stereo(&mut plugin, &signal(), 48_000);
        assert_eq!(outcome.status, CheckStatus::Failed);
        assert!(outcome
            .message
            .unwrap()
            .starts_with("Mock changed the shape of the audio"));
    }

    #[test]
    fn processing_errors_and_nan_fail() {
        let mut plugin = MockEffect::gain(1.0);
        plugin.fail_process = true;
        let (outcome, output) = test_audio_mono(&mut plugin, &signal().to_mono(), 48_000);
        assert!(output.is_none());
        assert!(outcome
            .message
            .unwrap()
            .starts_with("Mock failed to process mono audio"));

        let mut plugin = MockEffect::gain(1.0);
        plugin.emit_nan = true;
        let (outcome, _) = test_audio_stereo(&mut plugin, &signal(), 48_000);
        assert_eq!(
            outcome.message.as_deref(),
            Some("Mock produced non-finite samples from stereo audio")
        );
    }

    #[test]
    fn randomization_skips_read_only_and_records_mse() {
        let mut plugin = MockEffect::gain(1.0);
        let mut rng = StdRng::seed_from_u64(3);
        let (outcome, output) = test_audio_param_randomization(
            &mut plugin,
            &signal(),
            48_000,
            RandomizationOptions::default(),
            &mut rng,
        );
        assert_eq!(outcome.status, CheckStatus::Passed);
        assert!(output.is_some());
        assert_eq!(plugin.set_calls.len(), 1);
        assert_eq!(plugin.set_calls[0].0, 1);
        assert_eq!(outcome.metrics.get("parameters"), Some(&1.0));
        assert!(outcome.metrics.contains_key("mse_ch0"));
        assert!(outcome.metrics.contains_key("mse_ch1"));
    }

    #[test]
    fn invalid_randomized_output_keeps_its_own_failure() {
        let mut plugin = MockEffect::gain(1.0);
        plugin.emit_nan = true;
        let mut rng = StdRng::seed_from_u64(8);
        let strict = RandomizationOptions {
            require_change: true,
            ..RandomizationOptions::default()
        };
        let (outcome, output) =
            test_audio_param_randomization(&mut plugin, &signal(), 48_000, strict, &mut rng);
        assert!(output.is_some());
        assert_eq!(outcome.status, CheckStatus::Failed);
        assert_eq!(
            outcome.message.as_deref(),
            Some("Mock produced non-finite samples from randomized audio")
        );
        assert!(!outcome.metrics.keys().any(|name| name.starts_with("mse_")));
    }

    #[test]
    fn unchanged_output_only_fails_when_required() {
        let mut plugin = MockEffect::gain(1.0);
        plugin.params.clear();
        let mut rng = StdRng::seed_from_u64(1);
        let lenient = RandomizationOptions::default();
        let (outcome, _) =
            test_audio_param_randomization(&mut plugin, &signal(), 48_000, lenient, &mut rng);
        assert_eq!(outcome.status, CheckStatus::Passed);

        let strict = RandomizationOptions {
            require_change: true,
            ..lenient
        };
        let (outcome, _) =
            test_audio_param_randomization(&mut plugin, &signal(), 48_000, strict, &mut rng);
        assert_eq!(outcome.status, CheckStatus::Failed);
        assert_eq!(
            outcome.message.as_deref(),
            Some("Mock output did not change after parameter randomization")
        );
    }
}
