//! Reference CLAP effect: a gain stage with a polarity switch.
//!
//! Build with `cargo build -p clap-testgain --release` and point
//! `clap-validate` at the directory holding the renamed `.clap` file.

use clap_plugin_authoring::{
    clap_export, AudioProcessor, ParamSpec, Params, Plugin, PluginDescriptor, PluginFactory,
};
use clap_sys::{
    clap_host, clap_process, clap_process_status, CLAP_PARAM_IS_AUTOMATABLE,
    CLAP_PARAM_IS_STEPPED, CLAP_PROCESS_CONTINUE, CLAP_PROCESS_ERROR,
};

pub const PARAM_GAIN: u32 = 0;
pub const PARAM_INVERT: u32 = 1;

static DESCRIPTORS: [PluginDescriptor; 1] = [PluginDescriptor {
    id: "dev.clap-validate.testgain",
    name: "Test Gain",
    vendor: "clap-validate",
    url: "",
    version: env!("CARGO_PKG_VERSION"),
    description: "A reference CLAP effect that applies a gain",
    features: &["audio-effect", "stereo"],
}];

static PARAMS: [ParamSpec; 2] = [
    ParamSpec {
        id: PARAM_GAIN,
        name: "Gain",
        module: "",
        min: 0.0,
        max: 2.0,
        default: 0.5,
        flags: CLAP_PARAM_IS_AUTOMATABLE,
    },
    ParamSpec {
        id: PARAM_INVERT,
        name: "Invert",
        module: "",
        min: 0.0,
        max: 1.0,
        default: 0.0,
        flags: CLAP_PARAM_IS_STEPPED | CLAP_PARAM_IS_AUTOMATABLE,
    },
];

pub struct TestGain {
    gain: f64,
    invert: bool,
}

impl Default for TestGain {
    fn default() -> Self {
        Self {
            gain: PARAMS[0].default,
            invert: false,
        }
    }
}

impl TestGain {
    fn factor(&self) -> f32 {
        let factor = self.gain as f32;
        if self.invert {
            -factor
        } else {
            factor
        }
    }
}

impl AudioProcessor for TestGain {
    fn process(&mut self, process: &mut clap_process) -> clap_process_status {
        if process.audio_outputs_count == 0 || process.audio_outputs.is_null() {
            return CLAP_PROCESS_ERROR;
        }
        let factor = self.factor();
        let frames = process.frames_count as usize;
        unsafe {
            let output = &*process.audio_outputs;
            let input = if process.audio_inputs_count > 0 && !process.audio_inputs.is_null() {
                Some(&*process.audio_inputs)
            } else {
                None
            };
            if output.data32.is_null() {
                return CLAP_PROCESS_ERROR;
            }
            for channel in 0..output.channel_count as usize {
                let out = std::slice::from_raw_parts_mut(*output.data32.add(channel), frames);
                match input.filter(|input| {
                    !input.data32.is_null() && (channel as u32) < input.channel_count
                }) {
                    Some(input) => {
                        let samples =
                            std::slice::from_raw_parts(*input.data32.add(channel), frames);
                        for (out, sample) in out.iter_mut().zip(samples) {
                            *out = sample * factor;
                        }
                    }
                    None => out.fill(0.0),
                }
            }
        }
        CLAP_PROCESS_CONTINUE
    }
}

impl Params for TestGain {
    fn params(&self) -> &'static [ParamSpec] {
        &PARAMS
    }

    fn param_value(&self, id: u32) -> Option<f64> {
        match id {
            PARAM_GAIN => Some(self.gain),
            PARAM_INVERT => Some(if self.invert { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    fn set_param_value(&mut self, id: u32, value: f64) {
        match id {
            PARAM_GAIN => self.gain = value.clamp(PARAMS[0].min, PARAMS[0].max),
            PARAM_INVERT => self.invert = value >= 0.5,
            _ => {}
        }
    }

    fn param_text(&self, id: u32, value: f64) -> Option<String> {
        match id {
            PARAM_GAIN => Some(format!("{:.1} dB", 20.0 * value.max(1e-6).log10())),
            PARAM_INVERT => Some(if value >= 0.5 { "On" } else { "Off" }.to_string()),
            _ => None,
        }
    }
}

impl Plugin for TestGain {
    fn descriptor(&self) -> &'static PluginDescriptor {
        &DESCRIPTORS[0]
    }
}

pub struct TestGainFactory;

impl PluginFactory for TestGainFactory {
    type Plugin = TestGain;

    fn descriptors() -> &'static [PluginDescriptor] {
        &DESCRIPTORS
    }

    fn new_plugin(_descriptor_id: &str, _host: *const clap_host) -> anyhow::Result<Self::Plugin> {
        Ok(TestGain::default())
    }
}

clap_export!(TestGainFactory);
