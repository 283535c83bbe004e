use serde::Serialize;

use crate::audio::AudioBuffer;
use crate::error::ValidationError;

/// A parameter as the checks see it. Values are plain, within `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub id: u32,
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub stepped: bool,
    pub read_only: bool,
}

impl ParameterInfo {
    /// Maps a raw value in `[0, 1]` into the parameter's range. Stepped
    /// parameters land on whole numbers.
    pub fn denormalize(&self, raw: f64) -> f64 {
        let raw = raw.clamp(0.0, 1.0);
        let value = self.min + raw * (self.max - self.min);
        if self.stepped {
            value.round().clamp(self.min.min(self.max), self.max.max(self.min))
        } else {
            value
        }
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

/// The surface of a loaded plug-in the smoke tests drive.
pub trait EffectUnderTest {
    fn name(&self) -> &str;

    /// Whether the plug-in self-reports as an audio effect.
    fn is_effect(&self) -> bool;

    /// Runs `audio` through the plug-in and returns what it produced.
    fn process(&mut self, audio: &AudioBuffer, sample_rate: u32)
        -> Result<AudioBuffer, ValidationError>;

    fn parameters(&self) -> Vec<ParameterInfo>;

    /// Queues a plain value; it takes effect on the next `process` call.
    fn set_parameter(&mut self, id: u32, value: f64) -> Result<(), ValidationError>;

    fn parameter_value(&self, id: u32) -> Option<f64>;

    fn parameter_text(&self, id: u32, value: f64) -> Option<String>;

    /// Clears internal state (delay lines, envelopes) between checks.
    fn reset(&mut self);
}
