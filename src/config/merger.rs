// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configurations from different sources with proper precedence.

use std::path::PathBuf;

use super::types::{ResolvedConfig, WorkspaceConfig};

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub database: Option<PathBuf>,
    pub reviewer: Option<String>,
    pub max_items: Option<usize>,
    pub log_level: Option<String>,
}

/// Default configuration values.
pub fn default_config() -> ResolvedConfig {
    ResolvedConfig::default()
}

/// Merge multiple configurations with precedence.
///
/// Precedence (highest to lowest):
/// 1. CLI options
/// 2. Local config (.recall.local.json)
/// 3. Workspace config (.recall.json)
/// 4. Global config (~/.recall/config.json)
/// 5. Default values
pub fn merge_config(
    global: Option<WorkspaceConfig>,
    workspace: Option<WorkspaceConfig>,
    local: Option<WorkspaceConfig>,
    cli: CliOptions,
) -> ResolvedConfig {
    let mut result = default_config();

    for config in [global, workspace, local].into_iter().flatten() {
        apply_workspace_config(&mut result, &config);
    }

    // CLI options have the last word
    apply_cli_options(&mut result, &cli);

    result
}

fn apply_workspace_config(result: &mut ResolvedConfig, config: &WorkspaceConfig) {
    if let Some(ref database) = config.database {
        result.database_path = PathBuf::from(database);
    }

    if let Some(ref reviewer) = config.reviewer {
        result.reviewer_id = reviewer.clone();
    }

    if let Some(max) = config.max_items_per_session {
        result.max_items_per_session = max;
    }

    if let Some(ref level) = config.log_level {
        result.log_level = level.clone();
    }

    // A stage table replaces the previous one wholesale
    if let Some(ref hours) = config.stage_hours {
        result.stage_hours = hours.clone();
    }

    if let Some(ref review) = config.review {
        if let Some(show) = review.show_notes {
            result.show_notes = show;
        }
        if let Some(show) = review.show_summary {
            result.show_summary = show;
        }
    }
}

fn apply_cli_options(result: &mut ResolvedConfig, cli: &CliOptions) {
    if let Some(ref database) = cli.database {
        result.database_path = database.clone();
    }

    if let Some(ref reviewer) = cli.reviewer {
        result.reviewer_id = reviewer.clone();
    }

    if let Some(max) = cli.max_items {
        result.max_items_per_session = max;
    }

    if let Some(ref level) = cli.log_level {
        result.log_level = level.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ReviewPromptConfig;

    #[test]
    fn test_merge_empty_configs() {
        let result = merge_config(None, None, None, CliOptions::default());
        assert_eq!(result, default_config());
    }

    #[test]
    fn test_merge_global_config() {
        let global = WorkspaceConfig {
            reviewer: Some("ana".to_string()),
            log_level: Some("info".to_string()),
            ..Default::default()
        };

        let result = merge_config(Some(global), None, None, CliOptions::default());
        assert_eq!(result.reviewer_id, "ana");
        assert_eq!(result.log_level, "info");
    }

    #[test]
    fn test_workspace_overrides_global() {
        let global = WorkspaceConfig {
            max_items_per_session: Some(10),
            stage_hours: Some(vec![0, 1]),
            ..Default::default()
        };
        let workspace = WorkspaceConfig {
            max_items_per_session: Some(25),
            ..Default::default()
        };

        let result = merge_config(Some(global), Some(workspace), None, CliOptions::default());
        assert_eq!(result.max_items_per_session, 25);
        assert_eq!(result.stage_hours, vec![0, 1]);
    }

    #[test]
    fn test_local_overrides_workspace() {
        let workspace = WorkspaceConfig {
            review: Some(ReviewPromptConfig {
                show_notes: Some(false),
                show_summary: Some(false),
            }),
            ..Default::default()
        };
        let local = WorkspaceConfig {
            review: Some(ReviewPromptConfig {
                show_notes: Some(true),
                show_summary: None,
            }),
            ..Default::default()
        };

        let result = merge_config(None, Some(workspace), Some(local), CliOptions::default());
        assert!(result.show_notes);
        assert!(!result.show_summary);
    }

    #[test]
    fn test_cli_overrides_all() {
        let workspace = WorkspaceConfig {
            database: Some("deck.db".to_string()),
            reviewer: Some("ana".to_string()),
            ..Default::default()
        };
        let cli = CliOptions {
            database: Some(PathBuf::from("/tmp/other.db")),
            reviewer: Some("ben".to_string()),
            max_items: Some(3),
            log_level: Some("debug".to_string()),
        };

        let result = merge_config(None, Some(workspace), None, cli);
        assert_eq!(result.database_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(result.reviewer_id, "ben");
        assert_eq!(result.max_items_per_session, 3);
        assert_eq!(result.log_level, "debug");
    }
}
