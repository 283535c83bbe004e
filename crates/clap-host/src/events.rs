use std::ffi::c_void;

use crate::ffi::{
    clap_event_header_t, clap_event_param_value_t, clap_input_events, clap_output_events,
    CLAP_CORE_EVENT_SPACE_ID, CLAP_EVENT_PARAM_VALUE,
};
use crate::params::ParamValue;

/// Host-owned `clap_input_events` list. Only parameter value events are queued.
pub struct InputEventList {
    events: Vec<clap_event_param_value_t>,
    raw: Box<clap_input_events>,
}

impl InputEventList {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            raw: Box::new(clap_input_events {
                ctx: std::ptr::null_mut(),
                size: Some(input_size),
                get: Some(input_get),
            }),
        }
    }

    pub fn from_param_values(values: &[ParamValue]) -> Self {
        let mut list = Self::new();
        for value in values {
            list.push_param_value(*value, 0);
        }
        list
    }

    pub fn push_param_value(&mut self, value: ParamValue, time: u32) {
        self.events.push(clap_event_param_value_t {
            header: clap_event_header_t {
                size: std::mem::size_of::<clap_event_param_value_t>() as u32,
                time,
                space_id: CLAP_CORE_EVENT_SPACE_ID,
                type_: CLAP_EVENT_PARAM_VALUE,
                flags: 0,
            },
            param_id: value.id,
            cookie: std::ptr::null_mut(),
            note_id: -1,
            port_index: -1,
            channel: -1,
            key: -1,
            value: value.value,
        });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Pointer to pass as `in_events`. Valid until the list is mutated or dropped.
    pub fn as_raw(&mut self) -> *const clap_input_events {
        self.raw.ctx = &self.events as *const Vec<clap_event_param_value_t> as *mut c_void;
        &*self.raw
    }
}

impl Default for InputEventList {
    fn default() -> Self {
        Self::new()
    }
}

unsafe extern "C" fn input_size(list: *const clap_input_events) -> u32 {
    if list.is_null() || (*list).ctx.is_null() {
        return 0;
    }
    let events = &*((*list).ctx as *const Vec<clap_event_param_value_t>);
    events.len() as u32
}

unsafe extern "C" fn input_get(
    list: *const clap_input_events,
    index: u32,
) -> *const clap_event_header_t {
    if list.is_null() || (*list).ctx.is_null() {
        return std::ptr::null();
    }
    let events = &*((*list).ctx as *const Vec<clap_event_param_value_t>);
    events
        .get(index as usize)
        .map(|event| &event.header as *const clap_event_header_t)
        .unwrap_or(std::ptr::null())
}

/// Host-owned `clap_output_events`. Parameter value events the plug-in emits are
/// kept so the caller can inspect them; everything else is counted and dropped.
pub struct OutputEventSink {
    state: Box<SinkState>,
    raw: Box<clap_output_events>,
}

#[derive(Default)]
struct SinkState {
    param_values: Vec<ParamValue>,
    dropped: usize,
}

impl OutputEventSink {
    pub fn new() -> Self {
        let mut state = Box::<SinkState>::default();
        let raw = Box::new(clap_output_events {
            ctx: &mut *state as *mut SinkState as *mut c_void,
            try_push: Some(output_try_push),
        });
        Self { state, raw }
    }

    pub fn as_raw(&self) -> *const clap_output_events {
        &*self.raw
    }

    pub fn param_values(&self) -> &[ParamValue] {
        &self.state.param_values
    }

    pub fn other_events(&self) -> usize {
        self.state.dropped
    }

    pub fn clear(&mut self) {
        self.state.param_values.clear();
        self.state.dropped = 0;
    }
}

impl Default for OutputEventSink {
    fn default() -> Self {
        Self::new()
    }
}

unsafe extern "C" fn output_try_push(
    list: *const clap_output_events,
    event: *const clap_event_header_t,
) -> bool {
    if list.is_null() || (*list).ctx.is_null() || event.is_null() {
        return false;
    }
    let state = &mut *((*list).ctx as *mut SinkState);
    let header = &*event;
    if header.space_id == CLAP_CORE_EVENT_SPACE_ID && header.type_ == CLAP_EVENT_PARAM_VALUE {
        let value = &*(event as *const clap_event_param_value_t);
        state.param_values.push(ParamValue {
            id: value.param_id,
            value: value.value,
        });
    } else {
        state.dropped += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn input_list_exposes_param_events() {
        let mut list = InputEventList::from_param_values(&[
            ParamValue { id: 3, value: 0.25 },
            ParamValue { id: 7, value: -1.0 },
        ]);
        let raw = list.as_raw();
        unsafe {
            assert_eq!(((*raw).size.unwrap())(raw), 2);
            let header = ((*raw).get.unwrap())(raw, 1);
            assert_eq!((*header).type_, CLAP_EVENT_PARAM_VALUE);
            let event = &*(header as *const clap_event_param_value_t);
            assert_eq!(event.param_id, 7);
            assert_eq!(event.value, -1.0);
            assert!(((*raw).get.unwrap())(raw, 2).is_null());
        }
    }

    #[test]
    fn output_sink_collects_param_values() {
        let mut sink = OutputEventSink::new();
        let mut list = InputEventList::from_param_values(&[ParamValue { id: 1, value: 0.5 }]);
        let raw_in = list.as_raw();
        let raw_out = sink.as_raw();
        unsafe {
            let header = ((*raw_in).get.unwrap())(raw_in, 0);
            assert!(((*raw_out).try_push.unwrap())(raw_out, header));
            let other = clap_event_header_t {
                type_: crate::ffi::CLAP_EVENT_PARAM_GESTURE_BEGIN,
                ..Default::default()
            };
            assert!(((*raw_out).try_push.unwrap())(raw_out, &other));
        }
        assert_eq!(sink.param_values(), &[ParamValue { id: 1, value: 0.5 }]);
        assert_eq!(sink.other_events(), 1);
        sink.clear();
        assert!(sink.param_values().is_empty());
    }
}
