use matchmate_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Write `value` as pretty JSON, replacing `path` atomically
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = atomicwrites::AtomicFile::new(path, atomicwrites::AllowOverwrite);
    file.write(|f| serde_json::to_writer_pretty(f, value))
        .map_err(|e| match e {
            atomicwrites::Error::Internal(io) => Error::Io(io),
            atomicwrites::Error::User(json) => Error::from(json),
        })
}

/// Read a JSON file written by [`write_json`]. A missing file is `Ok(None)`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read(path)?;
    Ok(Some(serde_json::from_slice(&data)?))
}
