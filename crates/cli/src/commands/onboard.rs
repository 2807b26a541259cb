//! `scout onboard`: first-time setup.

use anyhow::Context;
use scout_config::AppConfig;
use scout_tools::{Workspace, WELL_KNOWN_DIRS};
use std::path::Path;

pub async fn run(force: bool) -> anyhow::Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("scout: first-time setup");
    println!("=======================\n");

    if write_config(&config_path, force)? {
        println!("  Created {}", config_path.display());
    } else {
        println!("  Config already exists at {}", config_path.display());
        println!("  Edit it manually or re-run with --force.");
    }

    let config = AppConfig::load().context("Failed to load config")?;
    let workspace = Workspace::open(&config.workspace.data_root).context("Failed to create workspace")?;
    println!("\n  Workspace: {}", workspace.root().display());
    for (dir, label) in WELL_KNOWN_DIRS.iter().filter(|(d, _)| !d.is_empty()) {
        println!("    {label:<16} {dir}/");
    }

    println!("\n  Next steps:");
    println!("   1. Add your API key to {} (or set SCOUT_API_KEY)", config_path.display());
    println!("   2. Run: scout agent");
    println!();

    Ok(())
}

/// Write the default config to `path`. Returns `false` when a file is already
/// there and `force` is off.
pub(crate) fn write_config(path: &Path, force: bool) -> anyhow::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, AppConfig::default_toml()).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}
