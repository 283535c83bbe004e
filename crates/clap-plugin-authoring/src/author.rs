use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::Mutex;

use anyhow::Result;
use clap_sys::{clap_host, clap_plugin_descriptor_t, clap_process, clap_process_status};
use once_cell::sync::Lazy;

/// Description of a plug-in that can be exported via CLAP.
#[derive(Clone)]
pub struct PluginDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub vendor: &'static str,
    pub url: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub features: &'static [&'static str],
}

// Raw descriptors are built once per id and live for the rest of the process.
static RAW_DESCRIPTORS: Lazy<Mutex<HashMap<&'static str, usize>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

impl PluginDescriptor {
    pub fn to_raw(&'static self) -> &'static clap_plugin_descriptor_t {
        let mut cache = RAW_DESCRIPTORS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let address = *cache.entry(self.id).or_insert_with(|| {
            let raw: &'static clap_plugin_descriptor_t =
                Box::leak(Box::new(clap_plugin_descriptor_t {
                    clap_version: clap_sys::CLAP_VERSION_LATEST,
                    id: leak_c_string(self.id),
                    name: leak_c_string(self.name),
                    vendor: leak_c_string(self.vendor),
                    url: leak_c_string(self.url),
                    manual_url: ::core::ptr::null(),
                    support_url: ::core::ptr::null(),
                    version: leak_c_string(self.version),
                    description: leak_c_string(self.description),
                    features: leak_feature_list(self.features),
                }));
            raw as *const clap_plugin_descriptor_t as usize
        });
        unsafe { &*(address as *const clap_plugin_descriptor_t) }
    }
}

fn leak_c_string(input: &'static str) -> *const c_char {
    CString::new(input)
        .expect("descriptor strings must not contain null bytes")
        .into_raw() as *const c_char
}

fn leak_feature_list(features: &'static [&'static str]) -> *const *const c_char {
    let mut c_strings: Vec<*const c_char> = features
        .iter()
        .map(|feature| leak_c_string(feature))
        .collect();
    c_strings.push(::core::ptr::null());
    Box::leak(c_strings.into_boxed_slice()).as_ptr()
}

pub struct ActivationContext {
    pub sample_rate: f64,
    pub min_frames_count: u32,
    pub max_frames_count: u32,
}

/// A parameter exposed through `clap.params`. Values are plain (not normalised).
#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub id: u32,
    pub name: &'static str,
    pub module: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub flags: u32,
}

/// Channel counts of the single main input and output port. Zero means no port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioPortLayout {
    pub inputs: u32,
    pub outputs: u32,
}

impl AudioPortLayout {
    pub const MONO_EFFECT: Self = Self {
        inputs: 1,
        outputs: 1,
    };
    pub const STEREO_EFFECT: Self = Self {
        inputs: 2,
        outputs: 2,
    };
    pub const STEREO_INSTRUMENT: Self = Self {
        inputs: 0,
        outputs: 2,
    };
}

pub trait AudioProcessor {
    fn process(&mut self, process: &mut clap_process) -> clap_process_status;
}

/// Parameter surface of a plug-in. Every method has a no-parameter default.
pub trait Params {
    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    fn param_value(&self, _id: u32) -> Option<f64> {
        None
    }

    fn set_param_value(&mut self, _id: u32, _value: f64) {}

    fn param_text(&self, id: u32, value: f64) -> Option<String> {
        self.params()
            .iter()
            .find(|spec| spec.id == id)
            .map(|_| format!("{value:.2}"))
    }
}

pub trait Plugin: AudioProcessor + Params + Send + 'static {
    fn descriptor(&self) -> &'static PluginDescriptor;
    fn init(&mut self) -> Result<()> {
        Ok(())
    }
    fn activate(&mut self, _context: &ActivationContext) -> Result<()> {
        Ok(())
    }
    fn deactivate(&mut self) {}
    fn reset(&mut self) {}
    fn on_main_thread(&mut self) {}
    fn audio_ports(&self) -> AudioPortLayout {
        AudioPortLayout::STEREO_EFFECT
    }
}

pub trait PluginFactory {
    type Plugin: Plugin;

    fn descriptors() -> &'static [PluginDescriptor];
    fn new_plugin(descriptor_id: &str, host: *const clap_host) -> Result<Self::Plugin>;
}
