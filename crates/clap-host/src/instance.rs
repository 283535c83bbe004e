use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use clap_sys::{
    clap_audio_buffer_t, clap_host, clap_plugin, clap_plugin_audio_ports_t, clap_plugin_factory_t,
    clap_plugin_params_t, clap_process, clap_process_status, CLAP_EXT_AUDIO_PORTS, CLAP_EXT_PARAMS,
    CLAP_PROCESS_ERROR,
};
use thiserror::Error;

use crate::discover::ClapPluginDescriptor;
use crate::events::{InputEventList, OutputEventSink};
use crate::params::PluginParams;
use crate::ports::{AudioPortBuffer, PluginAudioPorts};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioConfig {
    pub sample_rate: f64,
    pub min_frames_count: u32,
    pub max_frames_count: u32,
}

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("plug-in refused to activate")]
    ActivationFailed,
    #[error("plug-in returned null instance")]
    NullInstance,
    #[error("plug-in refused to init")]
    InitFailed,
    #[error("factory missing create_plugin entry point")]
    MissingCreatePlugin,
    #[error("plug-in id {0:?} contains a nul byte")]
    InvalidId(String),
    #[error("plug-in refused to start processing")]
    StartProcessingFailed,
}

#[derive(Debug, Error, PartialEq)]
pub enum ProcessError {
    #[error("plug-in is not activated")]
    NotActivated,
    #[error("plug-in is not processing")]
    NotProcessing,
    #[error("block of {frames} frames exceeds the activated maximum of {max}")]
    BlockTooLarge { frames: u32, max: u32 },
    #[error("buffer holds {available} frames but {frames} were requested")]
    BufferTooShort { frames: u32, available: usize },
    #[error("plug-in has no process entry point")]
    MissingProcess,
    #[error("plug-in returned CLAP_PROCESS_ERROR")]
    PluginError,
}

/// Represents a running CLAP plug-in instance.
pub struct ClapInstance {
    plugin: *const clap_plugin,
    descriptor: ClapPluginDescriptor,
    config: Option<AudioConfig>,
    processing: bool,
    steady_time: i64,
}

unsafe impl Send for ClapInstance {}
unsafe impl Sync for ClapInstance {}

impl ClapInstance {
    /// Creates and initialises a plug-in from `factory`.
    ///
    /// # Safety
    /// `factory` and `host` must stay valid for the lifetime of the instance.
    pub unsafe fn create(
        factory: &clap_plugin_factory_t,
        descriptor: &ClapPluginDescriptor,
        host: *const clap_host,
    ) -> Result<Self, ActivationError> {
        let id = CString::new(descriptor.id.clone())
            .map_err(|_| ActivationError::InvalidId(descriptor.id.clone()))?;
        let Some(create_plugin) = factory.create_plugin else {
            return Err(ActivationError::MissingCreatePlugin);
        };
        let plugin = create_plugin(factory, host, id.as_ptr());
        if plugin.is_null() {
            return Err(ActivationError::NullInstance);
        }

        let plugin_ref = &*plugin;
        if let Some(init) = plugin_ref.init {
            if !init(plugin) {
                if let Some(destroy) = plugin_ref.destroy {
                    destroy(plugin);
                }
                return Err(ActivationError::InitFailed);
            }
        }

        Ok(Self {
            plugin,
            descriptor: descriptor.clone(),
            config: None,
            processing: false,
            steady_time: 0,
        })
    }

    pub fn descriptor(&self) -> &ClapPluginDescriptor {
        &self.descriptor
    }

    pub fn config(&self) -> Option<AudioConfig> {
        self.config
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub unsafe fn activate(&mut self, config: AudioConfig) -> Result<(), ActivationError> {
        if self.config == Some(config) {
            return Ok(());
        }
        self.deactivate();
        let plugin = &*self.plugin;
        if let Some(activate) = plugin.activate {
            if !activate(
                self.plugin,
                config.sample_rate,
                config.min_frames_count,
                config.max_frames_count,
            ) {
                return Err(ActivationError::ActivationFailed);
            }
        }
        self.config = Some(config);
        self.steady_time = 0;
        Ok(())
    }

    pub unsafe fn deactivate(&mut self) {
        if self.config.is_none() {
            return;
        }
        self.stop_processing();
        let plugin = &*self.plugin;
        if let Some(deactivate) = plugin.deactivate {
            deactivate(self.plugin);
        }
        self.config = None;
    }

    pub unsafe fn start_processing(&mut self) -> Result<(), ActivationError> {
        if self.processing {
            return Ok(());
        }
        let plugin = &*self.plugin;
        if let Some(start_processing) = plugin.start_processing {
            if !start_processing(self.plugin) {
                return Err(ActivationError::StartProcessingFailed);
            }
        }
        self.processing = true;
        Ok(())
    }

    pub unsafe fn stop_processing(&mut self) {
        if !self.processing {
            return;
        }
        let plugin = &*self.plugin;
        if let Some(stop_processing) = plugin.stop_processing {
            stop_processing(self.plugin);
        }
        self.processing = false;
    }

    pub unsafe fn reset(&mut self) {
        let plugin = &*self.plugin;
        if let Some(reset) = plugin.reset {
            reset(self.plugin);
        }
    }

    /// Runs the plug-in's main-thread callback, for hosts honouring
    /// `request_callback`.
    pub unsafe fn on_main_thread(&mut self) {
        let plugin = &*self.plugin;
        if let Some(on_main_thread) = plugin.on_main_thread {
            on_main_thread(self.plugin);
        }
    }

    pub unsafe fn process(&mut self, process: *const clap_process) -> clap_process_status {
        let plugin = &*self.plugin;
        if let Some(process_fn) = plugin.process {
            return process_fn(self.plugin, process);
        }
        CLAP_PROCESS_ERROR
    }

    /// Runs one block through the main input and output ports.
    ///
    /// An `input` with zero channels is passed as "no input port".
    pub unsafe fn process_audio(
        &mut self,
        input: &mut AudioPortBuffer,
        output: &mut AudioPortBuffer,
        frames: u32,
        in_events: &mut InputEventList,
        out_events: &OutputEventSink,
    ) -> Result<clap_process_status, ProcessError> {
        let config = self.config.ok_or(ProcessError::NotActivated)?;
        if !self.processing {
            return Err(ProcessError::NotProcessing);
        }
        if frames > config.max_frames_count {
            return Err(ProcessError::BlockTooLarge {
                frames,
                max: config.max_frames_count,
            });
        }
        for buffer in [&*input, &*output] {
            if buffer.channel_count() > 0 && buffer.frames() < frames as usize {
                return Err(ProcessError::BufferTooShort {
                    frames,
                    available: buffer.frames(),
                });
            }
        }
        if (*self.plugin).process.is_none() {
            return Err(ProcessError::MissingProcess);
        }

        let raw_input: clap_audio_buffer_t = input.as_raw();
        let mut raw_output: clap_audio_buffer_t = output.as_raw();
        let process = clap_process {
            steady_time: self.steady_time,
            frames_count: frames,
            transport: std::ptr::null(),
            audio_inputs: &raw_input,
            audio_outputs: &mut raw_output,
            audio_inputs_count: u32::from(input.channel_count() > 0),
            audio_outputs_count: u32::from(output.channel_count() > 0),
            in_events: in_events.as_raw(),
            out_events: out_events.as_raw(),
        };

        #[cfg(feature = "rt_debug")]
        log::trace!(
            "process {} frames at steady time {} with {} events",
            frames,
            self.steady_time,
            in_events.len()
        );

        let status = self.process(&process);
        self.steady_time += i64::from(frames);
        if status == CLAP_PROCESS_ERROR {
            return Err(ProcessError::PluginError);
        }
        Ok(status)
    }

    unsafe fn extension(&self, id: &[u8]) -> *const c_void {
        let plugin = &*self.plugin;
        match plugin.get_extension {
            Some(get_extension) => get_extension(self.plugin, id.as_ptr() as *const c_char),
            None => std::ptr::null(),
        }
    }

    pub fn params(&self) -> Option<PluginParams<'_>> {
        let ext = unsafe { self.extension(CLAP_EXT_PARAMS) } as *const clap_plugin_params_t;
        if ext.is_null() {
            return None;
        }
        Some(PluginParams::new(self.plugin, unsafe { &*ext }))
    }

    pub fn audio_ports(&self) -> Option<PluginAudioPorts<'_>> {
        let ext =
            unsafe { self.extension(CLAP_EXT_AUDIO_PORTS) } as *const clap_plugin_audio_ports_t;
        if ext.is_null() {
            return None;
        }
        Some(PluginAudioPorts::new(self.plugin, unsafe { &*ext }))
    }
}

impl Drop for ClapInstance {
    fn drop(&mut self) {
        unsafe {
            self.deactivate();
            let plugin = &*self.plugin;
            if let Some(destroy) = plugin.destroy {
                destroy(self.plugin);
            }
        }
    }
}
