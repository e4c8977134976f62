//! Persistence for derived tables.
//!
//! Tables are written to a temporary file in the destination directory and
//! renamed over the target, so a reader never sees a half-written table and a
//! failed run leaves the previous output in place. [`stage_table`] splits the
//! two steps so several tables can be serialized before any of them is replaced.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub fn to_pretty_json(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", to_pretty_json(value)?);
    Ok(())
}

/// File contents written next to their target but not yet moved over it.
/// Dropping a staged file removes it and leaves the target untouched.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renames the staged contents over the target.
    pub fn persist(self) -> Result<()> {
        self.tmp
            .persist(&self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

/// Writes `contents` to a temporary file in the directory of `path`.
pub fn stage(path: &Path, contents: &[u8]) -> Result<StagedFile> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut tmp, contents)?;
    Ok(StagedFile {
        tmp,
        path: path.to_path_buf(),
    })
}

/// Replaces the file at `path` with `contents`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    stage(path, contents)?.persist()
}

/// Serializes `rows` as a CSV table (with header) into a staged file for `path`.
pub fn stage_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<StagedFile> {
    debug!(path = %path.display(), rows = rows.len(), "Staging CSV table");

    let mut writer = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV buffer: {}", e))?;

    stage(path, &bytes)
}

/// Serializes `rows` as a CSV table (with header) and atomically replaces `path`.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    stage_table(path, rows)?.persist()
}
