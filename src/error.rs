//! Error values returned by the patch engine
//!
//! Nothing here is fatal: validation errors stop before any file is read for
//! writing, plan warnings leave the affected file out of the plan, and apply
//! errors are folded into an `ApplyResult` together with the stage that failed.

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::resolution::ResolutionSpec;

/// Where a native-resolution mismatch was observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MismatchOrigin {
    /// The monitor's currently active mode
    ActiveDisplay,
    /// A key in the primary settings file
    ConfigKey(String),
}

impl fmt::Display for MismatchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchOrigin::ActiveDisplay => write!(f, "active display"),
            MismatchOrigin::ConfigKey(key) => write!(f, "config key {key}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ValidationError {
    #[error("invalid resolution '{input}': use WIDTHxHEIGHT with positive numbers (e.g. 2560x1440)")]
    MalformedResolution { input: String },

    #[error("target {target} exceeds native {native} in at least one dimension")]
    TargetExceedsNative {
        native: ResolutionSpec,
        target: ResolutionSpec,
    },

    /// The game was not last run at native fullscreen, or the monitor is not
    /// at the stated native mode
    #[error("{origin} reports '{found}', expected '{expected}' (run the game once at native Fullscreen + Fill, then close it)")]
    NativeMismatch {
        origin: MismatchOrigin,
        expected: String,
        found: String,
    },

    #[error("target equals native {0}; nothing to do")]
    NoOp(ResolutionSpec),
}

/// Non-fatal findings while building a plan
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum PlanWarning {
    #[error("{}: none of the expected keys were found, file left untouched", .path.display())]
    NoRecognizedKeys { path: PathBuf },

    #[error("{}: not found, skipped", .path.display())]
    MissingFile { path: PathBuf },

    #[error("{}: could not be read ({message}), skipped", .path.display())]
    Unreadable { path: PathBuf, message: String },
}

/// Step of the per-file apply state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyStage {
    ReadCurrent,
    Backup,
    WriteTemp,
    Commit,
}

impl fmt::Display for ApplyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApplyStage::ReadCurrent => "READ_CURRENT",
            ApplyStage::Backup => "BACKUP",
            ApplyStage::WriteTemp => "WRITE_TEMP",
            ApplyStage::Commit => "COMMIT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("failed to re-read {}: {source}", .path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    #[error("failed to back up {} to {}: {source}", .path.display(), .backup.display())]
    BackupFailed {
        path: PathBuf,
        backup: PathBuf,
        source: io::Error,
    },

    #[error("failed to write temporary file for {}: {source}", .path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Replacing the original failed, usually because the game still holds it
    #[error(
        "failed to replace {} (is the game still running?): {source}; {}",
        .path.display(),
        rollback_note(.rolled_back)
    )]
    CommitFailed {
        path: PathBuf,
        source: io::Error,
        rolled_back: bool,
    },
}

fn rollback_note(rolled_back: &bool) -> &'static str {
    if *rolled_back {
        "original contents restored"
    } else {
        "restore failed, original is in the .bak file"
    }
}

impl ApplyError {
    pub fn stage(&self) -> ApplyStage {
        match self {
            ApplyError::ReadFailed { .. } => ApplyStage::ReadCurrent,
            ApplyError::BackupFailed { .. } => ApplyStage::Backup,
            ApplyError::WriteFailed { .. } => ApplyStage::WriteTemp,
            ApplyError::CommitFailed { .. } => ApplyStage::Commit,
        }
    }

    /// For COMMIT failures, whether the original contents were put back
    pub fn rolled_back(&self) -> Option<bool> {
        match self {
            ApplyError::CommitFailed { rolled_back, .. } => Some(*rolled_back),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_error_stage_mapping() {
        let err = ApplyError::CommitFailed {
            path: PathBuf::from("a.ini"),
            source: io::Error::other("locked"),
            rolled_back: true,
        };
        assert_eq!(err.stage(), ApplyStage::Commit);
        assert_eq!(err.rolled_back(), Some(true));
        assert!(err.to_string().ends_with("original contents restored"));

        let err = ApplyError::BackupFailed {
            path: PathBuf::from("a.ini"),
            backup: PathBuf::from("a.ini.bak"),
            source: io::Error::other("denied"),
        };
        assert_eq!(err.stage(), ApplyStage::Backup);
        assert_eq!(err.rolled_back(), None);
    }

    #[test]
    fn test_commit_failure_without_restore_points_at_backup() {
        let err = ApplyError::CommitFailed {
            path: PathBuf::from("a.ini"),
            source: io::Error::other("locked"),
            rolled_back: false,
        };
        assert!(err.to_string().contains("original is in the .bak file"));
    }

    #[test]
    fn test_native_mismatch_message_names_origin() {
        let err = ValidationError::NativeMismatch {
            origin: MismatchOrigin::ConfigKey("ResolutionSizeX".to_string()),
            expected: "2560".to_string(),
            found: "1920".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("config key ResolutionSizeX"));
        assert!(msg.contains("'1920'"));
    }
}
