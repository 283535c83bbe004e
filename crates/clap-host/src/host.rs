use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::ffi::{clap_host, CLAP_VERSION_LATEST};

const RESTART_REQUESTED: u32 = 1 << 0;
const PROCESS_REQUESTED: u32 = 1 << 1;
const CALLBACK_REQUESTED: u32 = 1 << 2;

struct HostState {
    requests: AtomicU32,
}

/// The `clap_host` handed to plug-ins. Callbacks only record requests;
/// the caller decides whether to honour them.
pub struct HostShim {
    raw: Box<clap_host>,
    state: Box<HostState>,
    _name: CString,
    _vendor: CString,
    _url: CString,
    _version: CString,
}

unsafe impl Send for HostShim {}
unsafe impl Sync for HostShim {}

impl HostShim {
    pub fn new(name: &str, vendor: &str, version: &str) -> Self {
        let name = owned_c_string(name);
        let vendor = owned_c_string(vendor);
        let url = owned_c_string("");
        let version = owned_c_string(version);
        let mut state = Box::new(HostState {
            requests: AtomicU32::new(0),
        });
        let raw = Box::new(clap_host {
            clap_version: CLAP_VERSION_LATEST,
            host_data: &mut *state as *mut HostState as *mut c_void,
            name: name.as_ptr(),
            vendor: vendor.as_ptr(),
            url: url.as_ptr(),
            version: version.as_ptr(),
            get_extension: Some(get_extension),
            request_restart: Some(request_restart),
            request_process: Some(request_process),
            request_callback: Some(request_callback),
        });
        Self {
            raw,
            state,
            _name: name,
            _vendor: vendor,
            _url: url,
            _version: version,
        }
    }

    pub fn as_raw(&self) -> *const clap_host {
        &*self.raw
    }

    pub fn restart_requested(&self) -> bool {
        self.state.requests.load(Ordering::Acquire) & RESTART_REQUESTED != 0
    }

    /// Returns and clears the pending main-thread callback request.
    pub fn take_callback_request(&self) -> bool {
        self.state
            .requests
            .fetch_and(!CALLBACK_REQUESTED, Ordering::AcqRel)
            & CALLBACK_REQUESTED
            != 0
    }

    pub fn clear_requests(&self) {
        self.state.requests.store(0, Ordering::Release);
    }
}

fn owned_c_string(value: &str) -> CString {
    CString::new(value.replace('\0', "")).unwrap_or_default()
}

unsafe fn record(host: *const clap_host, flag: u32, what: &str) {
    if host.is_null() || (*host).host_data.is_null() {
        return;
    }
    let state = &*((*host).host_data as *const HostState);
    state.requests.fetch_or(flag, Ordering::AcqRel);
    log::trace!("plug-in requested {what}");
}

unsafe extern "C" fn get_extension(
    _host: *const clap_host,
    _extension_id: *const c_char,
) -> *const c_void {
    std::ptr::null()
}

unsafe extern "C" fn request_restart(host: *const clap_host) {
    record(host, RESTART_REQUESTED, "restart");
}

unsafe extern "C" fn request_process(host: *const clap_host) {
    record(host, PROCESS_REQUESTED, "process");
}

unsafe extern "C" fn request_callback(host: *const clap_host) {
    record(host, CALLBACK_REQUESTED, "main-thread callback");
}
