//! Loading and saving the audit file.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::record::AuditSet;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No file found at {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to back up {path} to {backup}: {source}")]
    Backup {
        path: PathBuf,
        backup: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to serialize audit data: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// `<path>.bak`, keeping the original extension.
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, ".bak")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Read the whole audit file.
pub fn load_audit_set(path: &Path) -> Result<AuditSet, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Copy the file at `path` to its `.bak` sibling, then overwrite `path`
/// with `set` as compact JSON.
///
/// Returns the backup path.
pub fn finalize(path: &Path, set: &AuditSet) -> Result<PathBuf, StoreError> {
    let backup = backup_path(path);
    println!("\nBacking up existing data to {}", backup.display());
    fs::copy(path, &backup).map_err(|source| StoreError::Backup {
        path: path.to_path_buf(),
        backup: backup.clone(),
        source,
    })?;

    let mut json = serde_json::to_string(set)?;
    json.push('\n');

    // Write beside the target and rename so a crash never truncates the file
    let tmp = with_suffix(path, ".tmp");
    let write_err = |source: io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, json).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;

    tracing::info!(
        items = set.len(),
        backup = %backup.display(),
        "Saved audit data to {}",
        path.display()
    );
    println!("\nOutput: {}", path.display());
    Ok(backup)
}
