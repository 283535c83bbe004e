//! Helpers for exporting CLAP plug-ins with safe Rust wrappers.

mod author;
pub mod export;

pub use author::{
    ActivationContext, AudioPortLayout, AudioProcessor, ParamSpec, Params, Plugin,
    PluginDescriptor, PluginFactory,
};

#[doc(hidden)]
pub use clap_sys;
