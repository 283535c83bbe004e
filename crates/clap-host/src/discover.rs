use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use libloading::Library;

use crate::ffi::{
    clap_plugin_descriptor_t, clap_plugin_entry_t, clap_plugin_factory_t,
    clap_version_is_compatible, CLAP_PLUGIN_FACTORY_ID, CLAP_PLUGIN_FEATURE_AUDIO_EFFECT,
    CLAP_PLUGIN_FEATURE_INSTRUMENT,
};

/// Represents a dynamically loaded CLAP library.
pub struct ClapLibrary {
    path: PathBuf,
    entry: *const clap_plugin_entry_t,
    initialized: bool,
    // Declared last so the entry is deinitialised before the library is unmapped.
    _lib: Option<Library>,
}

unsafe impl Send for ClapLibrary {}
unsafe impl Sync for ClapLibrary {}

impl ClapLibrary {
    /// Opens the shared object at `path` and initialises its `clap_entry`.
    ///
    /// # Safety
    /// Loading a library runs its static initialisers; the binary must be trusted.
    pub unsafe fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let lib = Library::new(&path_buf)
            .with_context(|| format!("Failed to load CLAP library: {}", path_buf.display()))?;
        let entry = {
            let entry_sym: libloading::Symbol<*const clap_plugin_entry_t> =
                lib.get(b"clap_entry\0").with_context(|| {
                    format!("CLAP library missing entry symbol: {}", path_buf.display())
                })?;
            *entry_sym
        };
        Self::initialise(path_buf, entry, Some(lib))
    }

    /// Wraps an entry point that is linked into the current process.
    ///
    /// # Safety
    /// `entry` must follow the CLAP ABI for the whole lifetime of the returned value.
    pub unsafe fn from_entry<P: AsRef<Path>>(
        path: P,
        entry: &'static clap_plugin_entry_t,
    ) -> Result<Self> {
        Self::initialise(path.as_ref().to_path_buf(), entry, None)
    }

    unsafe fn initialise(
        path: PathBuf,
        entry: *const clap_plugin_entry_t,
        lib: Option<Library>,
    ) -> Result<Self> {
        if entry.is_null() {
            anyhow::bail!("CLAP library {} has null entry", path.display());
        }
        let version = (*entry).clap_version;
        if !clap_version_is_compatible(version) {
            anyhow::bail!(
                "CLAP library {} targets incompatible CLAP version {}.{}.{}",
                path.display(),
                version.major,
                version.minor,
                version.revision
            );
        }

        let mut initialized = false;
        if let Some(init) = (*entry).init {
            let c_path = CString::new(path.to_string_lossy().as_bytes())
                .with_context(|| format!("plug-in path contains a nul byte: {}", path.display()))?;
            initialized = init(c_path.as_ptr());
            if !initialized {
                anyhow::bail!("CLAP entry init failed for {}", path.display());
            }
        }
        log::debug!("initialised CLAP entry {}", path.display());

        Ok(Self {
            path,
            entry,
            initialized,
            _lib: lib,
        })
    }

    pub fn factory(&self) -> Result<&clap_plugin_factory_t> {
        let get_factory = unsafe { (*self.entry).get_factory }
            .ok_or_else(|| anyhow::anyhow!("get_factory missing"))?;
        let ptr = unsafe { get_factory(CLAP_PLUGIN_FACTORY_ID.as_ptr() as *const c_char) }
            as *const clap_plugin_factory_t;
        if ptr.is_null() {
            anyhow::bail!("CLAP library {} returned null factory", self.path.display());
        }
        Ok(unsafe { &*ptr })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ClapLibrary {
    fn drop(&mut self) {
        unsafe {
            if self.initialized {
                if let Some(deinit) = (*self.entry).deinit {
                    deinit();
                }
            }
        }
    }
}

/// Lightweight description of a plug-in discovered in a CLAP library.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClapPluginDescriptor {
    pub id: String,
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub features: Vec<String>,
}

impl ClapPluginDescriptor {
    /// Builds an owned descriptor from the raw ABI struct.
    ///
    /// # Safety
    /// Every non-null string pointer in `raw` must be a valid C string and
    /// `features` must be null or a null-terminated array.
    pub unsafe fn from_raw(raw: &clap_plugin_descriptor_t) -> Self {
        let mut features = Vec::new();
        if !raw.features.is_null() {
            let mut cursor = raw.features;
            while !(*cursor).is_null() {
                features.push(c_string(*cursor));
                cursor = cursor.add(1);
            }
        }
        Self {
            id: c_string(raw.id),
            name: c_string(raw.name),
            vendor: c_string(raw.vendor),
            version: c_string(raw.version),
            features,
        }
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|candidate| candidate == feature)
    }

    pub fn is_audio_effect(&self) -> bool {
        self.has_feature(CLAP_PLUGIN_FEATURE_AUDIO_EFFECT)
    }

    pub fn is_instrument(&self) -> bool {
        self.has_feature(CLAP_PLUGIN_FEATURE_INSTRUMENT)
    }
}

unsafe fn c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

pub struct PluginDiscovery<'a> {
    factory: &'a clap_plugin_factory_t,
}

impl<'a> PluginDiscovery<'a> {
    pub fn new(factory: &'a clap_plugin_factory_t) -> Self {
        Self { factory }
    }

    pub fn list(self) -> Vec<ClapPluginDescriptor> {
        let Some(get_plugin_count) = self.factory.get_plugin_count else {
            return Vec::new();
        };
        let count = unsafe { get_plugin_count(self.factory) };
        let mut plugins = Vec::with_capacity(count as usize);
        for index in 0..count {
            let Some(get_plugin_descriptor) = self.factory.get_plugin_descriptor else {
                break;
            };
            unsafe {
                let descriptor = get_plugin_descriptor(self.factory, index);
                if descriptor.is_null() {
                    log::warn!("factory returned null descriptor at index {index}");
                    continue;
                }
                plugins.push(ClapPluginDescriptor::from_raw(&*descriptor));
            }
        }
        plugins
    }
}
