//! Snapshot persistence: one JSON file, written atomically.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use tracing::info;

use crate::errors::SessionError;
use crate::model::SessionSnapshot;

/// Serialize the snapshot and write it with a tmp-then-rename so a crash
/// mid-write never leaves a truncated file behind.
pub fn save_snapshot(path: &Path, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
    let data = serde_json::to_vec_pretty(snapshot).map_err(|err| SessionError::SnapshotCorrupt {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })?;
    write_atomic(path, &data)?;
    info!(path = %path.display(), cookies = snapshot.len(), "snapshot saved");
    Ok(())
}

/// Load a snapshot in full. A missing file and an undecodable file are both
/// fatal, typed errors; restore must never run against silently-defaulted
/// session state.
pub fn load_snapshot(path: &Path) -> Result<SessionSnapshot, SessionError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(SessionError::SnapshotMissing {
                path: path.to_path_buf(),
            })
        }
        Err(err) => return Err(SessionError::Io(err)),
    };

    serde_json::from_str(&content).map_err(|err| SessionError::SnapshotCorrupt {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}
