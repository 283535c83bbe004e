use std::ffi::{c_void, CStr};
use std::marker::PhantomData;
use std::os::raw::c_char;

use clap_sys::{
    clap_audio_port_info_t, clap_event_param_value_t, clap_host, clap_input_events_t, clap_id,
    clap_output_events_t, clap_param_info_t, clap_plugin, clap_plugin_audio_ports_t,
    clap_plugin_factory_t, clap_plugin_params_t, clap_process, clap_process_status, write_c_str,
    CLAP_AUDIO_PORT_IS_MAIN, CLAP_CORE_EVENT_SPACE_ID, CLAP_EVENT_PARAM_VALUE,
    CLAP_EXT_AUDIO_PORTS, CLAP_EXT_PARAMS, CLAP_INVALID_ID, CLAP_PORT_MONO, CLAP_PORT_STEREO,
    CLAP_PROCESS_ERROR,
};

use crate::author::{ActivationContext, AudioProcessor, Params, Plugin, PluginFactory};

#[doc(hidden)]
pub struct Instance<F: PluginFactory> {
    plugin: F::Plugin,
    params_ext: clap_plugin_params_t,
    ports_ext: clap_plugin_audio_ports_t,
}

impl<F: PluginFactory> Instance<F> {
    unsafe fn from_plugin<'a>(plugin: *const clap_plugin) -> &'a mut Self {
        let data = (*plugin).plugin_data as *mut Instance<F>;
        &mut *data
    }

    unsafe fn apply_param_events(&mut self, events: *const clap_input_events_t) {
        if events.is_null() {
            return;
        }
        let list = &*events;
        let (Some(size), Some(get)) = (list.size, list.get) else {
            return;
        };
        for index in 0..size(events) {
            let header = get(events, index);
            if header.is_null() {
                continue;
            }
            if (*header).space_id == CLAP_CORE_EVENT_SPACE_ID
                && (*header).type_ == CLAP_EVENT_PARAM_VALUE
            {
                let event = &*(header as *const clap_event_param_value_t);
                self.plugin.set_param_value(event.param_id, event.value);
            }
        }
    }

    unsafe extern "C" fn init(plugin: *const clap_plugin) -> bool {
        let this = Self::from_plugin(plugin);
        this.plugin.init().is_ok()
    }

    unsafe extern "C" fn destroy(plugin: *const clap_plugin) {
        if plugin.is_null() {
            return;
        }
        let plugin = plugin as *mut clap_plugin;
        let data = (*plugin).plugin_data as *mut Instance<F>;
        if !data.is_null() {
            drop(Box::from_raw(data));
        }
        (*plugin).plugin_data = ::core::ptr::null_mut();
        drop(Box::from_raw(plugin));
    }

    unsafe extern "C" fn activate(
        plugin: *const clap_plugin,
        sample_rate: f64,
        min_frames_count: u32,
        max_frames_count: u32,
    ) -> bool {
        let this = Self::from_plugin(plugin);
        this.plugin
            .activate(&ActivationContext {
                sample_rate,
                min_frames_count,
                max_frames_count,
            })
            .is_ok()
    }

    unsafe extern "C" fn deactivate(plugin: *const clap_plugin) {
        let this = Self::from_plugin(plugin);
        this.plugin.deactivate();
    }

    unsafe extern "C" fn start_processing(plugin: *const clap_plugin) -> bool {
        let _ = Self::from_plugin(plugin);
        true
    }

    unsafe extern "C" fn stop_processing(plugin: *const clap_plugin) {
        let this = Self::from_plugin(plugin);
        this.plugin.reset();
    }

    unsafe extern "C" fn reset(plugin: *const clap_plugin) {
        let this = Self::from_plugin(plugin);
        this.plugin.reset();
    }

    unsafe extern "C" fn process(
        plugin: *const clap_plugin,
        process: *const clap_process,
    ) -> clap_process_status {
        let this = Self::from_plugin(plugin);
        if process.is_null() {
            return CLAP_PROCESS_ERROR;
        }
        let mut process = *process;
        this.apply_param_events(process.in_events);
        this.plugin.process(&mut process)
    }

    unsafe extern "C" fn get_extension(
        plugin: *const clap_plugin,
        id: *const c_char,
    ) -> *const c_void {
        if id.is_null() {
            return ::core::ptr::null();
        }
        let this = Self::from_plugin(plugin);
        let id = CStr::from_ptr(id).to_bytes_with_nul();
        if id == CLAP_EXT_PARAMS && !this.plugin.params().is_empty() {
            &this.params_ext as *const clap_plugin_params_t as *const c_void
        } else if id == CLAP_EXT_AUDIO_PORTS {
            &this.ports_ext as *const clap_plugin_audio_ports_t as *const c_void
        } else {
            ::core::ptr::null()
        }
    }

    unsafe extern "C" fn on_main_thread(plugin: *const clap_plugin) {
        let this = Self::from_plugin(plugin);
        this.plugin.on_main_thread();
    }

    // clap.params

    unsafe extern "C" fn params_count(plugin: *const clap_plugin) -> u32 {
        Self::from_plugin(plugin).plugin.params().len() as u32
    }

    unsafe extern "C" fn params_get_info(
        plugin: *const clap_plugin,
        param_index: u32,
        param_info: *mut clap_param_info_t,
    ) -> bool {
        let this = Self::from_plugin(plugin);
        let Some(spec) = this.plugin.params().get(param_index as usize) else {
            return false;
        };
        if param_info.is_null() {
            return false;
        }
        let info = &mut *param_info;
        info.id = spec.id;
        info.flags = spec.flags;
        info.cookie = ::core::ptr::null_mut();
        write_c_str(&mut info.name, spec.name);
        write_c_str(&mut info.module, spec.module);
        info.min_value = spec.min;
        info.max_value = spec.max;
        info.default_value = spec.default;
        true
    }

    unsafe extern "C" fn params_get_value(
        plugin: *const clap_plugin,
        param_id: clap_id,
        out_value: *mut f64,
    ) -> bool {
        let this = Self::from_plugin(plugin);
        match this.plugin.param_value(param_id) {
            Some(value) if !out_value.is_null() => {
                *out_value = value;
                true
            }
            _ => false,
        }
    }

    unsafe extern "C" fn params_value_to_text(
        plugin: *const clap_plugin,
        param_id: clap_id,
        value: f64,
        out_buffer: *mut c_char,
        out_buffer_capacity: u32,
    ) -> bool {
        let this = Self::from_plugin(plugin);
        if out_buffer.is_null() || out_buffer_capacity == 0 {
            return false;
        }
        let Some(text) = this.plugin.param_text(param_id, value) else {
            return false;
        };
        let buffer = std::slice::from_raw_parts_mut(out_buffer, out_buffer_capacity as usize);
        write_c_str(buffer, &text);
        true
    }

    unsafe extern "C" fn params_text_to_value(
        plugin: *const clap_plugin,
        param_id: clap_id,
        param_value_text: *const c_char,
        out_value: *mut f64,
    ) -> bool {
        let this = Self::from_plugin(plugin);
        if param_value_text.is_null() || out_value.is_null() {
            return false;
        }
        if !this.plugin.params().iter().any(|spec| spec.id == param_id) {
            return false;
        }
        match CStr::from_ptr(param_value_text)
            .to_str()
            .ok()
            .and_then(|text| text.trim().parse::<f64>().ok())
        {
            Some(value) => {
                *out_value = value;
                true
            }
            None => false,
        }
    }

    unsafe extern "C" fn params_flush(
        plugin: *const clap_plugin,
        in_: *const clap_input_events_t,
        _out: *const clap_output_events_t,
    ) {
        Self::from_plugin(plugin).apply_param_events(in_);
    }

    // clap.audio-ports

    unsafe extern "C" fn ports_count(plugin: *const clap_plugin, is_input: bool) -> u32 {
        let layout = Self::from_plugin(plugin).plugin.audio_ports();
        let channels = if is_input { layout.inputs } else { layout.outputs };
        u32::from(channels > 0)
    }

    unsafe extern "C" fn ports_get(
        plugin: *const clap_plugin,
        index: u32,
        is_input: bool,
        info: *mut clap_audio_port_info_t,
    ) -> bool {
        let layout = Self::from_plugin(plugin).plugin.audio_ports();
        let channels = if is_input { layout.inputs } else { layout.outputs };
        if index != 0 || channels == 0 || info.is_null() {
            return false;
        }
        let info = &mut *info;
        info.id = 0;
        write_c_str(&mut info.name, if is_input { "Main In" } else { "Main Out" });
        info.flags = CLAP_AUDIO_PORT_IS_MAIN;
        info.channel_count = channels;
        info.port_type = match channels {
            1 => CLAP_PORT_MONO.as_ptr() as *const c_char,
            2 => CLAP_PORT_STEREO.as_ptr() as *const c_char,
            _ => ::core::ptr::null(),
        };
        info.in_place_pair = CLAP_INVALID_ID;
        true
    }
}

#[doc(hidden)]
pub struct FactoryShim<F: PluginFactory> {
    _marker: PhantomData<F>,
}

impl<F: PluginFactory> FactoryShim<F> {
    pub unsafe extern "C" fn get_plugin_count(_factory: *const clap_plugin_factory_t) -> u32 {
        F::descriptors().len() as u32
    }

    pub unsafe extern "C" fn get_plugin_descriptor(
        _factory: *const clap_plugin_factory_t,
        index: u32,
    ) -> *const clap_sys::clap_plugin_descriptor_t {
        F::descriptors()
            .get(index as usize)
            .map(|descriptor| descriptor.to_raw())
            .map(|raw| raw as *const _)
            .unwrap_or(::core::ptr::null())
    }

    pub unsafe extern "C" fn create_plugin(
        _factory: *const clap_plugin_factory_t,
        host: *const clap_host,
        plugin_id: *const c_char,
    ) -> *const clap_plugin {
        if plugin_id.is_null() {
            return ::core::ptr::null();
        }
        let plugin_id = match CStr::from_ptr(plugin_id).to_str() {
            Ok(id) => id,
            Err(_) => return ::core::ptr::null(),
        };
        let descriptor = match F::descriptors().iter().find(|desc| desc.id == plugin_id) {
            Some(desc) => desc,
            None => return ::core::ptr::null(),
        };
        let plugin = match F::new_plugin(plugin_id, host) {
            Ok(plugin) => plugin,
            Err(err) => {
                log::error!("Failed to create CLAP plugin {}: {err}", plugin_id);
                return ::core::ptr::null();
            }
        };
        let instance = Box::new(Instance::<F> {
            plugin,
            params_ext: clap_plugin_params_t {
                count: Some(Instance::<F>::params_count),
                get_info: Some(Instance::<F>::params_get_info),
                get_value: Some(Instance::<F>::params_get_value),
                value_to_text: Some(Instance::<F>::params_value_to_text),
                text_to_value: Some(Instance::<F>::params_text_to_value),
                flush: Some(Instance::<F>::params_flush),
            },
            ports_ext: clap_plugin_audio_ports_t {
                count: Some(Instance::<F>::ports_count),
                get: Some(Instance::<F>::ports_get),
            },
        });
        let raw = Box::new(clap_plugin {
            desc: descriptor.to_raw(),
            plugin_data: Box::into_raw(instance) as *mut _,
            init: Some(Instance::<F>::init),
            destroy: Some(Instance::<F>::destroy),
            activate: Some(Instance::<F>::activate),
            deactivate: Some(Instance::<F>::deactivate),
            start_processing: Some(Instance::<F>::start_processing),
            stop_processing: Some(Instance::<F>::stop_processing),
            reset: Some(Instance::<F>::reset),
            process: Some(Instance::<F>::process),
            get_extension: Some(Instance::<F>::get_extension),
            on_main_thread: Some(Instance::<F>::on_main_thread),
        });
        Box::into_raw(raw)
    }
}

/// Builds a `clap_plugin_entry_t` value for `$factory`. Used by [`clap_export!`].
#[doc(hidden)]
#[macro_export]
macro_rules! clap_entry_value {
    ($factory:path) => {{
        static FACTORY: $crate::clap_sys::clap_plugin_factory_t =
            $crate::clap_sys::clap_plugin_factory_t {
                get_plugin_count: Some(<$crate::export::FactoryShim<$factory>>::get_plugin_count),
                get_plugin_descriptor: Some(
                    <$crate::export::FactoryShim<$factory>>::get_plugin_descriptor,
                ),
                create_plugin: Some(<$crate::export::FactoryShim<$factory>>::create_plugin),
            };

        unsafe extern "C" fn __clap_entry_init(_path: *const ::core::ffi::c_char) -> bool {
            true
        }

        unsafe extern "C" fn __clap_entry_deinit() {}

        unsafe extern "C" fn __clap_entry_get_factory(
            factory_id: *const ::core::ffi::c_char,
        ) -> *const ::core::ffi::c_void {
            if factory_id.is_null() {
                return ::core::ptr::null();
            }
            let id = ::std::ffi::CStr::from_ptr(factory_id);
            if id.to_bytes_with_nul() == $crate::clap_sys::CLAP_PLUGIN_FACTORY_ID {
                &FACTORY as *const _ as *const ::core::ffi::c_void
            } else {
                ::core::ptr::null()
            }
        }

        $crate::clap_sys::clap_plugin_entry_t {
            clap_version: $crate::clap_sys::CLAP_VERSION_LATEST,
            init: Some(__clap_entry_init),
            deinit: Some(__clap_entry_deinit),
            get_factory: Some(__clap_entry_get_factory),
        }
    }};
}

/// Exports `$factory` as the library's `clap_entry` symbol. The two-argument form
/// defines a plain static instead, for plug-ins linked into a host process.
#[macro_export]
macro_rules! clap_export {
    ($factory:path) => {
        #[no_mangle]
        pub static clap_entry: $crate::clap_sys::clap_plugin_entry_t =
            $crate::clap_entry_value!($factory);
    };
    ($factory:path, $entry:ident) => {
        pub static $entry: $crate::clap_sys::clap_plugin_entry_t =
            $crate::clap_entry_value!($factory);
    };
}
