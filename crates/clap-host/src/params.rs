use std::ffi::CStr;
use std::os::raw::c_char;

use crate::events::{InputEventList, OutputEventSink};
use crate::ffi::{
    clap_id, clap_param_info_t, clap_plugin, clap_plugin_params_t, CLAP_PARAM_IS_READONLY,
    CLAP_PARAM_IS_STEPPED,
};

/// Lightweight wrapper for a CLAP parameter value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamValue {
    pub id: u32,
    pub value: f64,
}

/// Owned copy of a `clap_param_info`.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamInfo {
    pub id: clap_id,
    pub name: String,
    pub module: String,
    pub min_value: f64,
    pub max_value: f64,
    pub default_value: f64,
    pub flags: u32,
}

impl ParamInfo {
    pub fn from_raw(raw: &clap_param_info_t) -> Self {
        Self {
            id: raw.id,
            name: fixed_c_string(&raw.name),
            module: fixed_c_string(&raw.module),
            min_value: raw.min_value,
            max_value: raw.max_value,
            default_value: raw.default_value,
            flags: raw.flags,
        }
    }

    pub fn is_stepped(&self) -> bool {
        self.flags & CLAP_PARAM_IS_STEPPED != 0
    }

    pub fn is_read_only(&self) -> bool {
        self.flags & CLAP_PARAM_IS_READONLY != 0
    }
}

fn fixed_c_string(buffer: &[c_char]) -> String {
    let bytes: Vec<u8> = buffer
        .iter()
        .take_while(|byte| **byte != 0)
        .map(|byte| *byte as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Query helper for a plug-in's `clap.params` extension.
pub struct PluginParams<'a> {
    plugin: *const clap_plugin,
    ext: &'a clap_plugin_params_t,
}

impl<'a> PluginParams<'a> {
    pub(crate) fn new(plugin: *const clap_plugin, ext: &'a clap_plugin_params_t) -> Self {
        Self { plugin, ext }
    }

    pub fn count(&self) -> u32 {
        match self.ext.count {
            Some(count) => unsafe { count(self.plugin) },
            None => 0,
        }
    }

    pub fn info(&self, index: u32) -> Option<ParamInfo> {
        let get_info = self.ext.get_info?;
        let mut raw = clap_param_info_t::default();
        if unsafe { get_info(self.plugin, index, &mut raw) } {
            Some(ParamInfo::from_raw(&raw))
        } else {
            None
        }
    }

    /// All parameters the plug-in reports; indices that fail `get_info` are skipped.
    pub fn list(&self) -> Vec<ParamInfo> {
        (0..self.count())
            .filter_map(|index| {
                let info = self.info(index);
                if info.is_none() {
                    log::warn!("get_info failed for parameter index {index}");
                }
                info
            })
            .collect()
    }

    pub fn value(&self, id: clap_id) -> Option<f64> {
        let get_value = self.ext.get_value?;
        let mut value = 0.0;
        if unsafe { get_value(self.plugin, id, &mut value) } {
            Some(value)
        } else {
            None
        }
    }

    pub fn value_to_text(&self, id: clap_id, value: f64) -> Option<String> {
        let value_to_text = self.ext.value_to_text?;
        let mut buffer = [0 as c_char; 128];
        let ok = unsafe {
            value_to_text(
                self.plugin,
                id,
                value,
                buffer.as_mut_ptr(),
                buffer.len() as u32,
            )
        };
        if !ok {
            return None;
        }
        // Guard against plug-ins that fill the buffer without a terminator.
        buffer[buffer.len() - 1] = 0;
        let text = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        Some(text.to_string_lossy().into_owned())
    }

    /// Applies parameter events outside of `process`. Only legal while the plug-in
    /// is not processing.
    pub fn flush(&self, input: &mut InputEventList, output: &OutputEventSink) {
        if let Some(flush) = self.ext.flush {
            unsafe { flush(self.plugin, input.as_raw(), output.as_raw()) };
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ffi::write_c_str;

    #[test]
    fn info_copies_name_and_flags() {
        let mut raw = clap_param_info_t::default();
        raw.id = 4;
        raw.flags = CLAP_PARAM_IS_STEPPED | CLAP_PARAM_IS_READONLY;
        raw.min_value = 0.0;
        raw.max_value = 3.0;
        raw.default_value = 1.0;
        write_c_str(&mut raw.name, "Mode");
        write_c_str(&mut raw.module, "Global/Routing");

        let info = ParamInfo::from_raw(&raw);
        assert_eq!(info.name, "Mode");
        assert_eq!(info.module, "Global/Routing");
        assert!(info.is_stepped());
        assert!(info.is_read_only());
    }
}
