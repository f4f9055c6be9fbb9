//! Directory enumeration of candidate ephemeris files

use std::fs;
use std::path::{Path, PathBuf};

use crate::{io_err, Result};

/// List regular files in `dir` whose name ends with `extension`
///
/// Subdirectories are not descended into. Results are sorted by file name so
/// that repeated runs over the same directory produce identical output.
pub fn list_oem_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();

        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// File names (without directory) of [`list_oem_files`], as listed to clients
pub fn list_oem_file_names<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<String>> {
    Ok(list_oem_files(dir, extension)?
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}
