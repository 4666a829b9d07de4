use std::path::{Component, Path, PathBuf};

use crate::TransferError;

/// Maps a logical filename (`/dir/file.bin`) onto a path under `base`.
///
/// Rejects:
/// - Empty names, or names that are only separators
/// - Parent directory traversal (`..`)
/// - Windows prefix components (`C:`, `\\server`)
pub fn local_path_for(base: &Path, filename: &str) -> Result<PathBuf, TransferError> {
    let relative = filename.trim_start_matches('/');
    if relative.is_empty() {
        return Err(TransferError::InvalidPath(format!(
            "no file name in {filename:?}"
        )));
    }

    let path = Path::new(relative);
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory traversal not allowed: {filename}"
                )));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(TransferError::InvalidPath(format!(
                    "absolute path not allowed: {filename}"
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(base.join(path))
}
