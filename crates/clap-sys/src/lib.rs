#![cfg_attr(not(test), no_std)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]

//! Raw `#[repr(C)]` bindings for the part of the CLAP ABI used by the host and the
//! authoring helpers: entry, factory, plug-in, host, process, events, `clap.params`
//! and `clap.audio-ports`.

use core::ffi::c_void;

use cty::c_char;

pub type clap_id = u32;
pub const CLAP_INVALID_ID: clap_id = u32::MAX;

pub const CLAP_NAME_SIZE: usize = 256;
pub const CLAP_PATH_SIZE: usize = 1024;

pub const CLAP_VERSION_MAJOR: u32 = 1;
pub const CLAP_VERSION_MINOR: u32 = 2;
pub const CLAP_VERSION_REVISION: u32 = 2;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct clap_version {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
}
pub type clap_version_t = clap_version;

/// CLAP SDK version tuple compiled with these bindings.
pub const CLAP_VERSION_LATEST: clap_version_t = clap_version_t {
    major: CLAP_VERSION_MAJOR,
    minor: CLAP_VERSION_MINOR,
    revision: CLAP_VERSION_REVISION,
};

/// Plug-ins built against 1.x are ABI compatible with any 1.x host.
pub const fn clap_version_is_compatible(version: clap_version_t) -> bool {
    version.major >= 1
}

// ---------------------------------------------------------------------------
// entry + factory
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct clap_plugin_entry {
    pub clap_version: clap_version_t,
    pub init: Option<unsafe extern "C" fn(plugin_path: *const c_char) -> bool>,
    pub deinit: Option<unsafe extern "C" fn()>,
    pub get_factory: Option<unsafe extern "C" fn(factory_id: *const c_char) -> *const c_void>,
}
pub type clap_plugin_entry_t = clap_plugin_entry;

unsafe impl Sync for clap_plugin_entry {}

pub const CLAP_PLUGIN_FACTORY_ID: &[u8] = b"clap.plugin-factory\0";

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct clap_plugin_descriptor {
    pub clap_version: clap_version_t,
    pub id: *const c_char,
    pub name: *const c_char,
    pub vendor: *const c_char,
    pub url: *const c_char,
    pub manual_url: *const c_char,
    pub support_url: *const c_char,
    pub version: *const c_char,
    pub description: *const c_char,
    /// Null-terminated array of feature strings.
    pub features: *const *const c_char,
}
pub type clap_plugin_descriptor_t = clap_plugin_descriptor;

unsafe impl Sync for clap_plugin_descriptor {}
unsafe impl Send for clap_plugin_descriptor {}

pub const CLAP_PLUGIN_FEATURE_INSTRUMENT: &str = "instrument";
pub const CLAP_PLUGIN_FEATURE_AUDIO_EFFECT: &str = "audio-effect";
pub const CLAP_PLUGIN_FEATURE_NOTE_EFFECT: &str = "note-effect";
pub const CLAP_PLUGIN_FEATURE_ANALYZER: &str = "analyzer";
pub const CLAP_PLUGIN_FEATURE_STEREO: &str = "stereo";
pub const CLAP_PLUGIN_FEATURE_MONO: &str = "mono";

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct clap_plugin_factory {
    pub get_plugin_count: Option<unsafe extern "C" fn(factory: *const clap_plugin_factory) -> u32>,
    pub get_plugin_descriptor: Option<
        unsafe extern "C" fn(
            factory: *const clap_plugin_factory,
            index: u32,
        ) -> *const clap_plugin_descriptor_t,
    >,
    pub create_plugin: Option<
        unsafe extern "C" fn(
            factory: *const clap_plugin_factory,
            host: *const clap_host,
            plugin_id: *const c_char,
        ) -> *const clap_plugin,
    >,
}
pub type clap_plugin_factory_t = clap_plugin_factory;

unsafe impl Sync for clap_plugin_factory {}

// ---------------------------------------------------------------------------
// host
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct clap_host {
    pub clap_version: clap_version_t,
    pub host_data: *mut c_void,
    pub name: *const c_char,
    pub vendor: *const c_char,
    pub url: *const c_char,
    pub version: *const c_char,
    pub get_extension:
        Option<unsafe extern "C" fn(host: *const clap_host, extension_id: *const c_char) -> *const c_void>,
    pub request_restart: Option<unsafe extern "C" fn(host: *const clap_host)>,
    pub request_process: Option<unsafe extern "C" fn(host: *const clap_host)>,
    pub request_callback: Option<unsafe extern "C" fn(host: *const clap_host)>,
}
pub type clap_host_t = clap_host;

// ---------------------------------------------------------------------------
// plug-in
// ---------------------------------------------------------------------------

pub type clap_process_status = i32;
pub const CLAP_PROCESS_ERROR: clap_process_status = 0;
pub const CLAP_PROCESS_CONTINUE: clap_process_status = 1;
pub const CLAP_PROCESS_CONTINUE_IF_NOT_QUIET: clap_process_status = 2;
pub const CLAP_PROCESS_TAIL: clap_process_status = 3;
pub const CLAP_PROCESS_SLEEP: clap_process_status = 4;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct clap_plugin {
    pub desc: *const clap_plugin_descriptor_t,
    pub plugin_data: *mut c_void,
    pub init: Option<unsafe extern "C" fn(plugin: *const clap_plugin) -> bool>,
    pub destroy: Option<unsafe extern "C" fn(plugin: *const clap_plugin)>,
    pub activate: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin,
            sample_rate: f64,
            min_frames_count: u32,
            max_frames_count: u32,
        ) -> bool,
    >,
    pub deactivate: Option<unsafe extern "C" fn(plugin: *const clap_plugin)>,
    pub start_processing: Option<unsafe extern "C" fn(plugin: *const clap_plugin) -> bool>,
    pub stop_processing: Option<unsafe extern "C" fn(plugin: *const clap_plugin)>,
    pub reset: Option<unsafe extern "C" fn(plugin: *const clap_plugin)>,
    pub process: Option<
        unsafe extern "C" fn(plugin: *const clap_plugin, process: *const clap_process) -> clap_process_status,
    >,
    pub get_extension:
        Option<unsafe extern "C" fn(plugin: *const clap_plugin, id: *const c_char) -> *const c_void>,
    pub on_main_thread: Option<unsafe extern "C" fn(plugin: *const clap_plugin)>,
}
pub type clap_plugin_t = clap_plugin;

// ---------------------------------------------------------------------------
// audio buffers + process
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct clap_audio_buffer {
    pub data32: *mut *mut f32,
    pub data64: *mut *mut f64,
    pub channel_count: u32,
    pub latency: u32,
    pub constant_mask: u64,
}
pub type clap_audio_buffer_t = clap_audio_buffer;

/// Opaque for this host: transport is always passed as null (free running).
#[repr(C)]
pub struct clap_event_transport {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct clap_process {
    pub steady_time: i64,
    pub frames_count: u32,
    pub transport: *const clap_event_transport,
    pub audio_inputs: *const clap_audio_buffer_t,
    pub audio_outputs: *mut clap_audio_buffer_t,
    pub audio_inputs_count: u32,
    pub audio_outputs_count: u32,
    pub in_events: *const clap_input_events,
    pub out_events: *const clap_output_events,
}
pub type clap_process_t = clap_process;

// ---------------------------------------------------------------------------
// events
// ---------------------------------------------------------------------------

pub const CLAP_CORE_EVENT_SPACE_ID: u16 = 0;

pub const CLAP_EVENT_NOTE_ON: u16 = 0;
pub const CLAP_EVENT_NOTE_OFF: u16 = 1;
pub const CLAP_EVENT_PARAM_VALUE: u16 = 5;
pub const CLAP_EVENT_PARAM_MOD: u16 = 6;
pub const CLAP_EVENT_PARAM_GESTURE_BEGIN: u16 = 7;
pub const CLAP_EVENT_PARAM_GESTURE_END: u16 = 8;

pub const CLAP_EVENT_IS_LIVE: u32 = 1 << 0;
pub const CLAP_EVENT_DONT_RECORD: u32 = 1 << 1;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct clap_event_header {
    pub size: u32,
    pub time: u32,
    pub space_id: u16,
    pub type_: u16,
    pub flags: u32,
}
pub type clap_event_header_t = clap_event_header;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct clap_event_param_value {
    pub header: clap_event_header_t,
    pub param_id: clap_id,
    pub cookie: *mut c_void,
    pub note_id: i32,
    pub port_index: i16,
    pub channel: i16,
    pub key: i16,
    pub value: f64,
}
pub type clap_event_param_value_t = clap_event_param_value;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct clap_input_events {
    pub ctx: *mut c_void,
    pub size: Option<unsafe extern "C" fn(list: *const clap_input_events) -> u32>,
    pub get: Option<
        unsafe extern "C" fn(list: *const clap_input_events, index: u32) -> *const clap_event_header_t,
    >,
}
pub type clap_input_events_t = clap_input_events;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct clap_output_events {
    pub ctx: *mut c_void,
    pub try_push: Option<
        unsafe extern "C" fn(list: *const clap_output_events, event: *const clap_event_header_t) -> bool,
    >,
}
pub type clap_output_events_t = clap_output_events;

// ---------------------------------------------------------------------------
// clap.params
// ---------------------------------------------------------------------------

pub const CLAP_EXT_PARAMS: &[u8] = b"clap.params\0";

pub type clap_param_info_flags = u32;
pub const CLAP_PARAM_IS_STEPPED: clap_param_info_flags = 1 << 0;
pub const CLAP_PARAM_IS_PERIODIC: clap_param_info_flags = 1 << 1;
pub const CLAP_PARAM_IS_HIDDEN: clap_param_info_flags = 1 << 2;
pub const CLAP_PARAM_IS_READONLY: clap_param_info_flags = 1 << 3;
pub const CLAP_PARAM_IS_BYPASS: clap_param_info_flags = 1 << 4;
pub const CLAP_PARAM_IS_AUTOMATABLE: clap_param_info_flags = 1 << 5;

#[repr(C)]
#[derive(Copy, Clone)]
pub struct clap_param_info {
    pub id: clap_id,
    pub flags: clap_param_info_flags,
    pub cookie: *mut c_void,
    pub name: [c_char; CLAP_NAME_SIZE],
    pub module: [c_char; CLAP_PATH_SIZE],
    pub min_value: f64,
    pub max_value: f64,
    pub default_value: f64,
}
pub type clap_param_info_t = clap_param_info;

impl Default for clap_param_info {
    fn default() -> Self {
        Self {
            id: CLAP_INVALID_ID,
            flags: 0,
            cookie: core::ptr::null_mut(),
            name: [0; CLAP_NAME_SIZE],
            module: [0; CLAP_PATH_SIZE],
            min_value: 0.0,
            max_value: 0.0,
            default_value: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct clap_plugin_params {
    pub count: Option<unsafe extern "C" fn(plugin: *const clap_plugin_t) -> u32>,
    pub get_info: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin_t,
            param_index: u32,
            param_info: *mut clap_param_info_t,
        ) -> bool,
    >,
    pub get_value: Option<
        unsafe extern "C" fn(plugin: *const clap_plugin_t, param_id: clap_id, out_value: *mut f64) -> bool,
    >,
    pub value_to_text: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin_t,
            param_id: clap_id,
            value: f64,
            out_buffer: *mut c_char,
            out_buffer_capacity: u32,
        ) -> bool,
    >,
    pub text_to_value: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin_t,
            param_id: clap_id,
            param_value_text: *const c_char,
            out_value: *mut f64,
        ) -> bool,
    >,
    pub flush: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin_t,
            in_: *const clap_input_events_t,
            out: *const clap_output_events_t,
        ),
    >,
}
pub type clap_plugin_params_t = clap_plugin_params;

// ---------------------------------------------------------------------------
// clap.audio-ports
// ---------------------------------------------------------------------------

pub const CLAP_EXT_AUDIO_PORTS: &[u8] = b"clap.audio-ports\0";

pub const CLAP_PORT_MONO: &[u8] = b"mono\0";
pub const CLAP_PORT_STEREO: &[u8] = b"stereo\0";

pub const CLAP_AUDIO_PORT_IS_MAIN: u32 = 1 << 0;
pub const CLAP_AUDIO_PORT_SUPPORTS_64BITS: u32 = 1 << 1;
pub const CLAP_AUDIO_PORT_PREFERS_64BITS: u32 = 1 << 2;
pub const CLAP_AUDIO_PORT_REQUIRES_COMMON_SAMPLE_SIZE: u32 = 1 << 3;

#[repr(C)]
#[derive(Copy, Clone)]
pub struct clap_audio_port_info {
    pub id: clap_id,
    pub name: [c_char; CLAP_NAME_SIZE],
    pub flags: u32,
    pub channel_count: u32,
    pub port_type: *const c_char,
    pub in_place_pair: clap_id,
}
pub type clap_audio_port_info_t = clap_audio_port_info;

impl Default for clap_audio_port_info {
    fn default() -> Self {
        Self {
            id: CLAP_INVALID_ID,
            name: [0; CLAP_NAME_SIZE],
            flags: 0,
            channel_count: 0,
            port_type: core::ptr::null(),
            in_place_pair: CLAP_INVALID_ID,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct clap_plugin_audio_ports {
    pub count: Option<unsafe extern "C" fn(plugin: *const clap_plugin_t, is_input: bool) -> u32>,
    pub get: Option<
        unsafe extern "C" fn(
            plugin: *const clap_plugin_t,
            index: u32,
            is_input: bool,
            info: *mut clap_audio_port_info_t,
        ) -> bool,
    >,
}
pub type clap_plugin_audio_ports_t = clap_plugin_audio_ports;

/// Copies `src` into a fixed-size, null-terminated C buffer, truncating if needed.
pub fn write_c_str(dst: &mut [c_char], src: &str) {
    if dst.is_empty() {
        return;
    }
    let len = src.len().min(dst.len() - 1);
    for (slot, byte) in dst.iter_mut().zip(src.as_bytes()[..len].iter()) {
        *slot = *byte as c_char;
    }
    dst[len] = 0;
}
