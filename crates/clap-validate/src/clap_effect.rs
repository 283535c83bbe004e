use std::cell::OnceCell;
use std::sync::Arc;

use clap_host::{
    AudioConfig, AudioPortBuffer, ClapInstance, ClapLibrary, ClapPluginDescriptor, HostShim,
    InputEventList, OutputEventSink, ParamValue,
};

use crate::audio::AudioBuffer;
use crate::effect::{EffectUnderTest, ParameterInfo};
use crate::error::ValidationError;

/// Channel count assumed for plug-ins without the audio-ports extension.
const DEFAULT_PORT_CHANNELS: usize = 2;

/// [`EffectUnderTest`] backed by a CLAP instance.
pub struct ClapEffect {
    // Field order matters: the instance is destroyed before the host and library.
    instance: ClapInstance,
    host: Arc<HostShim>,
    _library: Arc<ClapLibrary>,
    name: String,
    block_size: u32,
    pending: Vec<ParamValue>,
    out_events: OutputEventSink,
    param_cache: OnceCell<Vec<ParameterInfo>>,
}

impl ClapEffect {
    /// Creates and initialises `descriptor` from `library`.
    pub fn load(
        library: Arc<ClapLibrary>,
        host: Arc<HostShim>,
        descriptor: &ClapPluginDescriptor,
        name: impl Into<String>,
        block_size: u32,
    ) -> anyhow::Result<Self> {
        let factory = library.factory()?;
        host.clear_requests();
        let instance = unsafe { ClapInstance::create(factory, descriptor, host.as_raw()) }?;
        Ok(Self {
            instance,
            host,
            _library: library,
            name: name.into(),
            block_size: block_size.max(1),
            pending: Vec::new(),
            out_events: OutputEventSink::new(),
            param_cache: OnceCell::new(),
        })
    }

    pub fn descriptor(&self) -> &ClapPluginDescriptor {
        self.instance.descriptor()
    }

    fn ensure_active(&mut self, sample_rate: u32) -> Result<(), ValidationError> {
        if sample_rate == 0 {
            return Err(ValidationError::InvalidSampleRate(sample_rate));
        }
        let config = AudioConfig {
            sample_rate: f64::from(sample_rate),
            min_frames_count: 1,
            max_frames_count: self.block_size,
        };
        unsafe {
            if self.instance.config() != Some(config) {
                tracing::debug!(
                    "activating {} at {} Hz, {} frame blocks",
                    self.name,
                    sample_rate,
                    self.block_size
                );
                self.instance.activate(config)?;
            }
            self.instance.start_processing()?;
        }
        Ok(())
    }

    fn cached_parameters(&self) -> &[ParameterInfo] {
        self.param_cache.get_or_init(|| {
            let Some(params) = self.instance.params() else {
                return Vec::new();
            };
            params
                .list()
                .into_iter()
                .map(|info| ParameterInfo {
                    id: info.id,
                    stepped: info.is_stepped(),
                    read_only: info.is_read_only(),
                    name: info.name,
                    min: info.min_value,
                    max: info.max_value,
                    default: info.default_value,
                })
                .collect()
        })
    }

    /// Honours what the plug-in asked of the host while processing.
    fn handle_host_requests(&mut self) {
        if self.host.take_callback_request() {
            tracing::debug!("running main-thread callback for {}", self.name);
            unsafe { self.instance.on_main_thread() };
        }
        if self.host.restart_requested() {
            tracing::warn!("{} requested a restart; plug-ins are not restarted", self.name);
        }
        self.host.clear_requests();
    }

    fn port_channels(&self, is_input: bool) -> usize {
        match self.instance.audio_ports() {
            Some(ports) => ports
                .main_port(is_input)
                .map(|port| port.channel_count as usize)
                .unwrap_or(0),
            None => DEFAULT_PORT_CHANNELS,
        }
    }
}

impl EffectUnderTest for ClapEffect {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_effect(&self) -> bool {
        self.instance.descriptor().is_audio_effect()
    }

    fn process(
        &mut self,
        audio: &AudioBuffer,
        sample_rate: u32,
    ) -> Result<AudioBuffer, ValidationError> {
        self.ensure_active(sample_rate)?;
        let in_channels = self.port_channels(true);
        let out_channels = self.port_channels(false);
        if out_channels == 0 {
            return Err(ValidationError::NoOutputPort);
        }

        let frames = audio.frames();
        if frames == 0 {
            return Ok(audio.clone());
        }
        let source = audio.remix(in_channels);
        let block = self.block_size as usize;
        let mut input = AudioPortBuffer::new(in_channels, block);
        let mut output = AudioPortBuffer::new(out_channels, block);
        let mut rendered = vec![Vec::with_capacity(frames); out_channels];
        let mut events = InputEventList::from_param_values(&self.pending);
        self.out_events.clear();

        let mut offset = 0;
        while offset < frames {
            let len = block.min(frames - offset);
            for channel in 0..in_channels {
                let target = input.channel_mut(channel);
                target[..len].copy_from_slice(&source.channel(channel)[offset..offset + len]);
                target[len..].fill(0.0);
            }
            output.clear();
            unsafe {
                self.instance.process_audio(
                    &mut input,
                    &mut output,
                    len as u32,
                    &mut events,
                    &self.out_events,
                )?;
            }
            if offset == 0 {
                events.clear();
                self.pending.clear();
            }
            for (channel, samples) in rendered.iter_mut().enumerate() {
                samples.extend_from_slice(&output.channel(channel)[..len]);
            }
            offset += len;
        }

        self.handle_host_requests();
        if !self.out_events.param_values().is_empty() {
            tracing::debug!(
                "{} reported {} parameter changes while processing",
                self.name,
                self.out_events.param_values().len()
            );
        }

        Ok(AudioBuffer::new(sample_rate, rendered).remix(audio.channel_count()))
    }

    fn parameters(&self) -> Vec<ParameterInfo> {
        self.cached_parameters().to_vec()
    }

    fn set_parameter(&mut self, id: u32, value: f64) -> Result<(), ValidationError> {
        if !self.cached_parameters().iter().any(|param| param.id == id) {
            return Err(ValidationError::UnknownParameter(id));
        }
        self.pending.retain(|pending| pending.id != id);
        self.pending.push(ParamValue { id, value });
        Ok(())
    }

    fn parameter_value(&self, id: u32) -> Option<f64> {
        self.instance.params()?.value(id)
    }

    fn parameter_text(&self, id: u32, value: f64) -> Option<String> {
        self.instance.params()?.value_to_text(id, value)
    }

    fn reset(&mut self) {
        unsafe { self.instance.reset() };
    }
}
