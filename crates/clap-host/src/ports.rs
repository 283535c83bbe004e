use std::ffi::CStr;
use std::os::raw::c_char;

use crate::ffi::{
    clap_audio_buffer_t, clap_audio_port_info_t, clap_plugin, clap_plugin_audio_ports_t,
    CLAP_AUDIO_PORT_IS_MAIN,
};

/// Owned description of one audio port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioPortInfo {
    pub id: u32,
    pub name: String,
    pub channel_count: u32,
    pub flags: u32,
    pub port_type: Option<String>,
}

impl AudioPortInfo {
    pub fn is_main(&self) -> bool {
        self.flags & CLAP_AUDIO_PORT_IS_MAIN != 0
    }
}

/// Query helper for a plug-in's `clap.audio-ports` extension.
pub struct PluginAudioPorts<'a> {
    plugin: *const clap_plugin,
    ext: &'a clap_plugin_audio_ports_t,
}

impl<'a> PluginAudioPorts<'a> {
    pub(crate) fn new(plugin: *const clap_plugin, ext: &'a clap_plugin_audio_ports_t) -> Self {
        Self { plugin, ext }
    }

    pub fn count(&self, is_input: bool) -> u32 {
        match self.ext.count {
            Some(count) => unsafe { count(self.plugin, is_input) },
            None => 0,
        }
    }

    pub fn get(&self, index: u32, is_input: bool) -> Option<AudioPortInfo> {
        let get = self.ext.get?;
        let mut raw = clap_audio_port_info_t::default();
        if !unsafe { get(self.plugin, index, is_input, &mut raw) } {
            return None;
        }
        let name = name_of(&raw.name);
        let port_type = if raw.port_type.is_null() {
            None
        } else {
            Some(
                unsafe { CStr::from_ptr(raw.port_type) }
                    .to_string_lossy()
                    .into_owned(),
            )
        };
        Some(AudioPortInfo {
            id: raw.id,
            name,
            channel_count: raw.channel_count,
            flags: raw.flags,
            port_type,
        })
    }

    pub fn list(&self, is_input: bool) -> Vec<AudioPortInfo> {
        (0..self.count(is_input))
            .filter_map(|index| self.get(index, is_input))
            .collect()
    }

    /// The port flagged as main, or the first port when none is flagged.
    pub fn main_port(&self, is_input: bool) -> Option<AudioPortInfo> {
        let ports = self.list(is_input);
        ports
            .iter()
            .find(|port| port.is_main())
            .cloned()
            .or_else(|| ports.into_iter().next())
    }
}

/// Planar `f32` storage for one audio port plus the pointer table CLAP expects.
pub struct AudioPortBuffer {
    channels: Vec<Vec<f32>>,
    pointers: Vec<*mut f32>,
}

impl AudioPortBuffer {
    pub fn new(channel_count: usize, frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; channel_count],
            pointers: Vec::with_capacity(channel_count),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Builds the ABI view. The returned struct borrows this buffer's storage and
    /// must not outlive the next mutation of `self`.
    pub fn as_raw(&mut self) -> clap_audio_buffer_t {
        self.pointers.clear();
        self.pointers
            .extend(self.channels.iter_mut().map(|channel| channel.as_mut_ptr()));
        clap_audio_buffer_t {
            data32: if self.pointers.is_empty() {
                std::ptr::null_mut()
            } else {
                self.pointers.as_mut_ptr()
            },
            data64: std::ptr::null_mut(),
            channel_count: self.channels.len() as u32,
            latency: 0,
            constant_mask: 0,
        }
    }
}

fn name_of(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|byte| **byte != 0)
        .map(|byte| *byte as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
