use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use walkdir::WalkDir;

/// A `.clap` found on disk together with the file that actually gets loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginBinary {
    /// The `.clap` file or bundle directory.
    pub path: PathBuf,
    /// The shared object inside `path`; equal to `path` outside macOS bundles.
    pub binary: PathBuf,
}

impl PluginBinary {
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let binary = if path.is_dir() {
            resolve_bundle(&path)?
        } else {
            path.clone()
        };
        Some(Self { path, binary })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

fn is_clap(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("clap"))
        .unwrap_or(false)
}

/// `Foo.clap/Contents/MacOS/Foo`, or the only file in `Contents/MacOS`.
fn resolve_bundle(bundle: &Path) -> Option<PathBuf> {
    let macos = bundle.join("Contents").join("MacOS");
    if let Some(stem) = bundle.file_stem() {
        let candidate = macos.join(stem);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    let mut files = std::fs::read_dir(&macos)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file());
    let first = files.next()?;
    if files.next().is_some() {
        return None;
    }
    Some(first)
}

/// Every `.clap` under `root`, sorted by path. Bundles are not descended into.
pub fn discover_plugins(root: &Path, recursive: bool) -> Result<Vec<PluginBinary>> {
    if !root.exists() {
        anyhow::bail!("plug-in directory {} does not exist", root.display());
    }
    let mut walker = WalkDir::new(root).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut plugins = Vec::new();
    let mut entries = walker.into_iter();
    while let Some(entry) = entries.next() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.depth() == 0 || !is_clap(entry.path()) {
            continue;
        }
        if entry.file_type().is_dir() {
            entries.skip_current_dir();
        }
        match PluginBinary::from_path(entry.path()) {
            Some(plugin) => plugins.push(plugin),
            None => tracing::warn!(
                "skipping {}: bundle has no loadable binary",
                entry.path().display()
            ),
        }
    }
    plugins.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(plugins)
}

/// `$CLAP_PATH` entries followed by the per-user and system CLAP folders.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = env::var_os("CLAP_PATH")
        .map(|value| env::split_paths(&value).collect())
        .unwrap_or_default();
    paths.extend(
        [
            dirs::home_dir().map(|home| home.join(".clap")),
            Some(PathBuf::from("/usr/lib/clap")),
            Some(PathBuf::from("/usr/local/lib/clap")),
        ]
        .into_iter()
        .flatten(),
    );
    paths
}

/// Scans each existing directory in `paths`; duplicates are dropped.
pub fn discover_in(paths: &[PathBuf], recursive: bool) -> Result<Vec<PluginBinary>> {
    let mut plugins = Vec::new();
    for path in paths.iter().filter(|path| path.is_dir()) {
        for plugin in discover_plugins(path, recursive)? {
            if !plugins.contains(&plugin) {
                plugins.push(plugin);
            }
        }
    }
    Ok(plugins)
}
