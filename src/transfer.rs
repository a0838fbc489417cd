//! Per-file transfer strategies.
//!
//! The organizer never calls `fs::copy` or `fs::rename` directly; it hands each
//! `(source, destination)` pair to a [`Transfer`] implementation. [`TransferMode`]
//! covers the two real strategies, and tests or front ends can supply their own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

/// Moves one file to its destination. Failures are reported, never panicked on.
pub trait Transfer {
    fn transfer(&self, source: &Path, destination: &Path) -> io::Result<()>;
}

/// Whether the source file is kept after transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Copy the file and keep the original.
    #[default]
    Copy,
    /// Move the file, removing it from the source folder.
    Move,
}

impl TransferMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMode::Copy => "copy",
            TransferMode::Move => "move",
        }
    }

    /// Past-tense verb for user-facing messages.
    pub fn verb(&self) -> &'static str {
        match self {
            TransferMode::Copy => "Copied",
            TransferMode::Move => "Moved",
        }
    }
}

impl Transfer for TransferMode {
    fn transfer(&self, source: &Path, destination: &Path) -> io::Result<()> {
        match self {
            TransferMode::Copy => fs::copy(source, destination).map(|_| ()),
            TransferMode::Move => move_file(source, destination),
        }
    }
}

/// Renames when possible, otherwise copies and removes the source
/// (rename cannot cross filesystems).
fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }
    fs::copy(source, destination)?;
    fs::remove_file(source)
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "copy" => Ok(TransferMode::Copy),
            "move" => Ok(TransferMode::Move),
            other => Err(format!("unknown transfer mode '{}', expected copy or move", other)),
        }
    }
}
