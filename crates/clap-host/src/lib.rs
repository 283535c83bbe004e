//! Safe(-ish) wrappers around the CLAP ABI for hosting plug-ins.

mod discover;
mod events;
mod host;
mod instance;
mod params;
mod ports;

pub use discover::{ClapLibrary, ClapPluginDescriptor, PluginDiscovery};
pub use events::{InputEventList, OutputEventSink};
pub use host::HostShim;
pub use instance::{ActivationError, AudioConfig, ClapInstance, ProcessError};
pub use params::{ParamInfo, ParamValue, PluginParams};
pub use ports::{AudioPortBuffer, AudioPortInfo, PluginAudioPorts};

/// Re-export the raw bindings for users that need to drop down to the ABI.
pub use clap_sys as ffi;
