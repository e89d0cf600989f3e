// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration for the recall CLI.
//!
//! Handles loading, merging, and validation of configuration from multiple sources:
//! - Global config: ~/.recall/config.json
//! - Workspace config: .recall.json, .recall/config.json, .recall/config.yaml or recall.config.json
//! - Local config: .recall.local.json (gitignored, for personal overrides)
//! - CLI options: command-line arguments
//!
//! Configuration is merged with precedence (CLI > local > workspace > global > defaults).

mod loader;
mod merger;
mod types;

pub use loader::{
    find_workspace_root, get_example_config, get_global_config_dir, get_global_config_path,
    init_config, load_config_file, load_global_config, load_local_config, load_workspace_config,
    save_workspace_config, CONFIG_FILES, GLOBAL_CONFIG_DIR, GLOBAL_CONFIG_FILE, LOCAL_CONFIG_FILE,
};

pub use merger::{default_config, merge_config, CliOptions};

pub use types::{
    ResolvedConfig, ReviewPromptConfig, WorkspaceConfig, DEFAULT_DATABASE_FILE,
    DEFAULT_MAX_ITEMS_PER_SESSION,
};

use crate::error::ConfigError;
use std::path::Path;

/// Load, merge and validate all configuration sources for a workspace.
///
/// A relative database path is resolved against `workspace_root`.
pub fn load_config(
    workspace_root: &Path,
    cli_options: CliOptions,
) -> Result<ResolvedConfig, ConfigError> {
    let global = load_global_config()?;
    let workspace = load_workspace_config(workspace_root)?;
    let local = load_local_config(workspace_root)?;

    let mut config = merge_config(global, workspace, local, cli_options);
    if config.database_path.is_relative() {
        config.database_path = workspace_root.join(&config.database_path);
    }
    config.validate()?;

    Ok(config)
}
