use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::checks::{CheckKind, CheckOutcome, CheckStatus};

/// Results for one plug-in (one descriptor of one binary).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginReport {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    pub name: String,
    pub checks: Vec<CheckOutcome>,
}

impl PluginReport {
    pub fn new(path: impl Into<PathBuf>, plugin_id: Option<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            plugin_id,
            name: name.into(),
            checks: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: CheckOutcome) {
        match outcome.status {
            CheckStatus::Passed => tracing::debug!("{}: {} passed", self.name, outcome.check),
            CheckStatus::Failed => tracing::error!(
                "{}: {} failed: {}",
                self.name,
                outcome.check,
                outcome.message.as_deref().unwrap_or("")
            ),
            CheckStatus::Skipped => tracing::debug!("{}: {} skipped", self.name, outcome.check),
        }
        self.checks.push(outcome);
    }

    /// Marks every check not yet recorded as skipped.
    pub fn skip_remaining(&mut self, reason: &str) {
        for kind in CheckKind::ALL {
            if !self.checks.iter().any(|outcome| outcome.check == kind) {
                self.checks.push(CheckOutcome::skipped(kind, reason));
            }
        }
    }

    pub fn outcome(&self, check: CheckKind) -> Option<&CheckOutcome> {
        self.checks.iter().find(|outcome| outcome.check == check)
    }

    pub fn passed(&self) -> bool {
        !self.checks.is_empty() && !self.checks.iter().any(CheckOutcome::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|outcome| outcome.is_failure())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub sample_rate: u32,
    pub seed: u64,
    pub plugins: Vec<PluginReport>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.plugins.iter().filter(|plugin| plugin.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.plugins.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))
    }
}
