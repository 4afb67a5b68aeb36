use crate::error::{AppError, Result};
use crate::models::predict_types::RankedOutput;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `result` as 4-space indented JSON, replacing `path` in one rename
/// so a concurrent reader never sees a half-written file.
pub fn write_output(result: &RankedOutput, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| AppError::io(dir, e))?;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    result.serialize(&mut ser)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| AppError::io(dir, e))?;
    tmp.write_all(&buf).map_err(|e| AppError::io(tmp.path(), e))?;
    tmp.flush().map_err(|e| AppError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| AppError::io(path, e.error))?;
    Ok(())
}

pub fn read_output(path: &Path) -> Result<RankedOutput> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
    Ok(serde_json::from_str(&content)?)
}
