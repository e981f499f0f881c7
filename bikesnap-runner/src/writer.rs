use bikesnap_core::{Result, SnapshotError};
use std::fs;
use std::path::Path;
use tracing::info;

/// Writes `payload` to `path`, creating missing parent directories and
/// replacing whatever was at that exact path.
pub fn write_snapshot(path: &Path, payload: &[u8]) -> Result<()> {
    let write_error = |source: std::io::Error| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
    }

    fs::write(path, payload).map_err(write_error)?;

    info!(path = %path.display(), bytes = payload.len(), "Saved snapshot");
    Ok(())
}
