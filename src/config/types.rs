// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! Defines the structure of workspace and resolved configuration,
//! supporting JSON and YAML formats.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::ReviewConfig;
use crate::srs::{StageTable, DEFAULT_STAGE_HOURS};
use crate::types::DEFAULT_REVIEWER;

/// Default database file name, placed in the global config directory.
pub const DEFAULT_DATABASE_FILE: &str = "recall.db";

/// Default cap on items per review session.
pub const DEFAULT_MAX_ITEMS_PER_SESSION: usize = 50;

/// Configuration as written in a config file.
///
/// Can be defined in .recall.json or .recall/config.json in the deck directory.
/// Every field is optional; unset fields fall through to the next source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// SQLite database path. Relative paths resolve against the workspace root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Reviewer id items are tracked under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,

    /// Most items pulled into one review session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items_per_session: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Hours until due, indexed by stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_hours: Option<Vec<u32>>,

    /// Review prompt behavior
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewPromptConfig>,
}

/// Interactive review settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPromptConfig {
    /// Show card notes after each answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_notes: Option<bool>,

    /// Print the session summary when a review ends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_summary: Option<bool>,
}

/// Resolved configuration with all values set.
/// This is the merged result of global, workspace, local, and CLI configs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub database_path: PathBuf,
    pub reviewer_id: String,
    pub max_items_per_session: usize,
    pub log_level: String,
    pub stage_hours: Vec<u32>,
    pub show_notes: bool,
    pub show_summary: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let database_path = super::loader::get_global_config_dir()
            .map(|dir| dir.join(DEFAULT_DATABASE_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE));

        Self {
            database_path,
            reviewer_id: DEFAULT_REVIEWER.to_string(),
            max_items_per_session: DEFAULT_MAX_ITEMS_PER_SESSION,
            log_level: "warn".to_string(),
            stage_hours: DEFAULT_STAGE_HOURS.to_vec(),
            show_notes: true,
            show_summary: true,
        }
    }
}

impl ResolvedConfig {
    /// Check values that cannot be represented in the types alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reviewer_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "reviewer".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.max_items_per_session == 0 {
            return Err(ConfigError::InvalidValue {
                field: "maxItemsPerSession".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.stage_hours.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "stageHours".to_string(),
                message: "needs at least one stage".to_string(),
            });
        }
        Ok(())
    }

    /// Stage table built from `stage_hours`.
    pub fn stage_table(&self) -> Result<StageTable, ConfigError> {
        StageTable::new(self.stage_hours.clone()).ok_or_else(|| ConfigError::InvalidValue {
            field: "stageHours".to_string(),
            message: "needs at least one stage".to_string(),
        })
    }

    /// Settings consumed by the session service.
    pub fn review_config(&self) -> ReviewConfig {
        ReviewConfig {
            reviewer_id: self.reviewer_id.clone(),
            max_items_per_session: self.max_items_per_session,
        }
    }
}
