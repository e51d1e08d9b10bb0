#![allow(clippy::module_name_repetitions)]
//! Canonical file paths under the workspace `data/` directory.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`; falls back to the
/// current directory if the crate is built outside the workspace layout.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the `data/towers/` directory.
#[must_use]
pub fn towers_dir() -> PathBuf {
    data_dir().join("towers")
}

/// Returns the directory holding the extracted `RA.dat`/`CO.dat`/`EN.dat`
/// files.
#[must_use]
pub fn fcc_records_dir() -> PathBuf {
    towers_dir().join("fcc")
}

/// Returns the path for the tower index `DuckDB` file.
#[must_use]
pub fn tower_db_path() -> PathBuf {
    towers_dir().join("tower_index.duckdb")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
