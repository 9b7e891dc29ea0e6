//! Output directory creation under an explicit overwrite policy.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while preparing an output directory.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// I/O error when creating or inspecting a directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The path exists but is a regular file
    #[error("{0} exists and is not a directory")]
    NotADirectory(PathBuf),
    /// The directory holds files and the policy forbids reusing it
    #[error("{0} is not empty and overwriting is disabled")]
    NotEmpty(PathBuf),
}

/// What to do with an output directory that already holds files.
///
/// The policy is decided once per run and passed to every
/// [`prepare_directory`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Write into the directory, replacing files of the same name
    Reuse,
    /// Leave the directory alone and report it
    Refuse,
}

impl OverwritePolicy {
    /// Policy for a boolean `overwrite` setting.
    pub fn from_flag(overwrite: bool) -> Self {
        if overwrite {
            OverwritePolicy::Reuse
        } else {
            OverwritePolicy::Refuse
        }
    }
}

/// Makes sure `path` is a directory the run may write into.
///
/// Missing directories (and their parents) are created. An existing empty
/// directory is always accepted; a non-empty one only under
/// [`OverwritePolicy::Reuse`].
pub fn prepare_directory(path: &Path, policy: OverwritePolicy) -> Result<(), WorkspaceError> {
    if path.is_file() {
        return Err(WorkspaceError::NotADirectory(path.to_path_buf()));
    }

    if path.is_dir() {
        let is_empty = fs::read_dir(path)?.next().is_none();
        if is_empty {
            return Ok(());
        }
        return match policy {
            OverwritePolicy::Reuse => {
                warn!("{} is not empty, overwriting files in it", path.display());
                Ok(())
            }
            OverwritePolicy::Refuse => Err(WorkspaceError::NotEmpty(path.to_path_buf())),
        };
    }

    debug!("Creating directory {}", path.display());
    fs::create_dir_all(path)?;
    Ok(())
}
