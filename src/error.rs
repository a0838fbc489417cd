//! Error types shared by the profile registry, the path resolver and the organizer.
//!
//! Setup-level problems (unknown profile, bad arguments, missing source directory)
//! are returned as [`OrganizerError`] before any file is touched. Problems with a
//! single file during a batch are never raised; they are collected as
//! [`TransferFailure`] records in the run report instead.

use crate::config::ConfigError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for organizer operations.
pub type Result<T> = std::result::Result<T, OrganizerError>;

/// Errors that abort an operation before or instead of completing it.
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Profile '{name}' not found in {}", .path.display())]
    ProfileNotFound { name: String, path: PathBuf },

    #[error("Profile '{name}' already exists at {}", .path.display())]
    DuplicateProfile { name: String, path: PathBuf },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Profile '{name}' is malformed: {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("Subject '{subject}' is not registered under profile '{profile}'")]
    SubjectNotFound { profile: String, subject: String },

    #[error("Subject '{subject}' has no pass named '{pass}'")]
    PassNotFound { subject: String, pass: String },

    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source folder '{}' does not exist", .0.display())]
    SourceMissing(PathBuf),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl OrganizerError {
    /// Wraps an I/O error together with the path it happened on.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// A single file that could not be transferred during an organize run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    /// Bare file name, as the user sees it in the source folder.
    pub file_name: String,
    /// Full source path of the file.
    pub path: PathBuf,
    /// Human-readable reason reported by the filesystem.
    pub reason: String,
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file_name, self.reason)
    }
}
