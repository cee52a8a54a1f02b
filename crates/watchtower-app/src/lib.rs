//! Shared plumbing for the watchtower command-line shell.

use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use watchtower_core::WorldConfig;

pub mod headless;

pub use headless::{HeadlessReport, ReportSummary, run_headless};

/// Read a [`WorldConfig`] from a JSON file; missing fields take defaults.
pub fn load_config(path: &Path) -> Result<WorldConfig> {
    let file =
        File::open(path).with_context(|| format!("failed to open config {}", path.display()))?;
    let config: WorldConfig = serde_json::from_reader(file)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Write `value` as pretty JSON, creating parent directories as needed.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    Ok(())
}
