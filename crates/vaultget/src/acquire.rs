//! Reading vault files from disk

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::LookupError;

/// Where `file_path` lives: absolute paths as given, relative ones under `work_dir`
pub fn resolve_path(file_path: &str, work_dir: &Path) -> PathBuf {
    let path = Path::new(file_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        work_dir.join(path)
    }
}

/// Read the raw vault text. Nothing is cached; every call hits the disk.
pub fn read_vault_file(file_path: &str, work_dir: &Path) -> Result<Vec<u8>, LookupError> {
    let path = resolve_path(file_path, work_dir);
    debug!(file = file_path, path = %path.display(), "reading vault file");

    fs::read(&path).map_err(|err| match err.kind() {
        IoErrorKind::NotFound => LookupError::FileNotFound {
            file: file_path.to_string(),
        },
        _ => LookupError::FileReadError {
            file: file_path.to_string(),
            source: err,
        },
    })
}
