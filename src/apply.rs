//! Crash-safe application of a patch plan
//!
//! Each target file goes through READ_CURRENT -> BACKUP -> WRITE_TEMP -> COMMIT.
//! The file is re-read from disk first, so edits the game made after the
//! preview are kept. The new contents are written to a temporary file in the
//! same directory and renamed over the original; a failed rename writes back
//! the contents read at the start of the run. The `.bak` copy is only created
//! when none exists, so it keeps the settings from before the first apply.
//! Files are independent: a failure stops the run, but files committed before
//! it stay committed.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::constants::backup;
use crate::document::ConfigDocument;
use crate::error::{ApplyError, ApplyStage};
use crate::planner::{PatchPlan, patched_document};

/// Filesystem operations used by the apply engine
///
/// The defaults act on the real filesystem; tests override single steps to
/// inject failures.
pub trait FileOps {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn backup(&self, path: &Path, backup: &Path) -> io::Result<()> {
        fs::copy(path, backup).map(|_| ())
    }

    /// Write `contents` to a fresh temp file next to `target`
    fn write_temp(&self, target: &Path, contents: &str) -> io::Result<NamedTempFile> {
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::Builder::new()
            .prefix(".true-stretch-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        temp.write_all(contents.as_bytes())?;
        temp.as_file().sync_all()?;

        // Keep the original's permissions rather than the temp file's
        if let Ok(meta) = fs::metadata(target) {
            fs::set_permissions(temp.path(), meta.permissions())?;
        }
        Ok(temp)
    }

    /// Atomically replace `target` with `temp`
    fn commit(&self, temp: NamedTempFile, target: &Path) -> io::Result<()> {
        temp.persist(target).map(|_| ()).map_err(|e| e.error)
    }

    /// Put back the contents captured at READ_CURRENT
    fn restore(&self, target: &Path, contents: &str) -> io::Result<()> {
        fs::write(target, contents)
    }
}

/// Real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskOps;

impl FileOps for DiskOps {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyResult {
    /// Files committed, in order
    pub files_written: Vec<PathBuf>,
    pub backup_paths: BTreeMap<PathBuf, PathBuf>,
    /// Files that already matched the plan on re-read
    pub files_unchanged: Vec<PathBuf>,
    pub succeeded: bool,
    pub failure_stage: Option<ApplyStage>,
    pub error: Option<String>,
    /// Set on COMMIT failure: whether the failed file was restored
    pub rolled_back: Option<bool>,
}

enum FileOutcome {
    Written,
    Unchanged,
}

/// `GameUserSettings.ini` -> `GameUserSettings.ini.bak`
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(backup::SUFFIX);
    path.with_file_name(name)
}

pub fn apply(plan: &PatchPlan) -> ApplyResult {
    apply_with(plan, &DiskOps)
}

pub fn apply_with(plan: &PatchPlan, ops: &dyn FileOps) -> ApplyResult {
    let mut result = ApplyResult::default();

    for path in &plan.target_file_paths {
        match apply_file(plan, path, ops, &mut result) {
            Ok(FileOutcome::Written) => {
                info!(path = %path.display(), "Updated");
                result.files_written.push(path.clone());
            }
            Ok(FileOutcome::Unchanged) => {
                info!(path = %path.display(), "No changes needed");
                result.files_unchanged.push(path.clone());
            }
            Err(err) => {
                error!(path = %path.display(), stage = %err.stage(), error = %err, "Apply failed");
                if !result.files_written.is_empty() {
                    warn!(
                        committed = result.files_written.len(),
                        "Files committed before the failure were left patched"
                    );
                }
                result.failure_stage = Some(err.stage());
                result.rolled_back = err.rolled_back();
                result.error = Some(err.to_string());
                return result;
            }
        }
    }

    result.succeeded = true;
    result
}

fn apply_file(
    plan: &PatchPlan,
    path: &Path,
    ops: &dyn FileOps,
    result: &mut ApplyResult,
) -> Result<FileOutcome, ApplyError> {
    // READ_CURRENT
    let text = ops.read(path).map_err(|source| ApplyError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let current = ConfigDocument::parse(&text);
    let patched = patched_document(&current, plan.fields_for(path));
    if patched == current {
        return Ok(FileOutcome::Unchanged);
    }

    // BACKUP
    let backup = backup_path_for(path);
    if ops.exists(&backup) {
        info!(backup = %backup.display(), "Keeping existing backup");
    } else {
        ops.backup(path, &backup)
            .map_err(|source| ApplyError::BackupFailed {
                path: path.to_path_buf(),
                backup: backup.clone(),
                source,
            })?;
    }
    result.backup_paths.insert(path.to_path_buf(), backup.clone());

    // WRITE_TEMP
    let temp = ops
        .write_temp(path, &patched.serialize())
        .map_err(|source| ApplyError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;

    // COMMIT
    if let Err(source) = ops.commit(temp, path) {
        let rolled_back = match ops.restore(path, &text) {
            Ok(()) => {
                info!(path = %path.display(), "Restored original contents");
                true
            }
            Err(e) => {
                error!(path = %path.display(), backup = %backup.display(), error = %e, "Rollback failed, see backup");
                false
            }
        };
        return Err(ApplyError::CommitFailed {
            path: path.to_path_buf(),
            source,
            rolled_back,
        });
    }

    Ok(FileOutcome::Written)
}
