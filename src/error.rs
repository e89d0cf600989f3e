// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the recall reviewer.
//!
//! This module provides strongly-typed errors for each layer of the application,
//! using `thiserror` for ergonomic error definitions and `anyhow` for error propagation
//! in the binary.

use thiserror::Error;

/// Kind of record referenced by a [`ReviewError::NotFound`] or [`StoreError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Card,
    Item,
    Session,
    Review,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Card => write!(f, "card"),
            RecordKind::Item => write!(f, "item"),
            RecordKind::Session => write!(f, "review session"),
            RecordKind::Review => write!(f, "review"),
        }
    }
}

/// Errors raised by a record store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No {kind} with id {id}")]
    NotFound { kind: RecordKind, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Injected store fault: {0}")]
    Fault(String),
}

impl StoreError {
    /// Create a not-found error.
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Check if this error means the referenced record is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(err.to_string())
            }
            _ => Self::Backend(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Backend(format!("serialization failed: {}", err))
    }
}

/// Errors surfaced by the review core to its callers.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("No {kind} with id {id}")]
    NotFound { kind: RecordKind, id: String },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Session commit failed: {0}")]
    CommitFailure(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl ReviewError {
    /// Create a not-found error.
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create an invalid transition error.
    pub fn transition(message: impl Into<String>) -> Self {
        Self::InvalidTransition(message.into())
    }

    /// Structured error code for the request/response boundary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::CommitFailure(_) => "COMMIT_FAILURE",
            Self::InvalidInput(_) => "BAD_REQUEST",
            Self::Store(StoreError::Conflict(_)) => "CONFLICT",
            Self::Store(_) => "INTERNAL",
        }
    }

    /// Check if the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CommitFailure(_))
    }
}

impl From<StoreError> for ReviewError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => Self::NotFound { kind, id },
            other => Self::Store(other),
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;
